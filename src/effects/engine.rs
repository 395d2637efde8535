//! Interprets actions against the owned state and the current sink.

use crate::core::{
    Action, ActionError, Step, Supplier, Transition, TransitionKind, TransitionLog,
    TransitionRecord,
};
use crate::effects::Effects;
use crate::sync::{lock, read, write};
use chrono::Utc;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, trace, warn};

thread_local! {
    /// Address of the engine whose entry or error callback is running on
    /// this thread, or zero.
    static NOTIFYING: Cell<usize> = const { Cell::new(0) };
}

/// What one call to [`Engine::apply`] did.
#[derive(Debug)]
pub struct Applied<S, E> {
    /// Outcome that was committed and recorded.
    pub outcome: TransitionKind,
    /// Background work the caller must schedule, if the turn suspended.
    pub suspended: Option<Supplier<S, E>>,
}

/// Owns one state value and the sink that observes it.
///
/// The engine interprets an action in a single synchronous turn. `Forward`
/// and `Then` results are followed with an explicit stack of pending steps,
/// so long chains do not grow the call stack. The state reached during the
/// turn is only published when the turn ends, and the entry callback fires
/// at most once per turn, with the final state.
///
/// `apply` must not be called concurrently for the same engine;
/// [`Actor`](crate::runtime::Actor) provides that serialization. `project`
/// may be called from anywhere at any time.
pub struct Engine<S, E> {
    state: RwLock<Arc<S>>,
    sink: RwLock<Option<Arc<E>>>,
    log: Mutex<TransitionLog>,
}

impl<S, E> Engine<S, E>
where
    S: Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    pub fn new(state: S) -> Self {
        Self::with_log(state, TransitionLog::default())
    }

    /// Create an engine that continues an existing transition log.
    pub fn with_log(state: S, log: TransitionLog) -> Self {
        Self {
            state: RwLock::new(Arc::new(state)),
            sink: RwLock::new(None),
            log: Mutex::new(log),
        }
    }

    /// Install `effects` as the live sink, returning the previous one.
    ///
    /// # Panics
    ///
    /// When called from inside one of this engine's entry or error
    /// callbacks, which would otherwise wait on itself forever.
    pub fn attach(&self, effects: Arc<E>) -> Option<Arc<E>> {
        self.sink_mut("attach").replace(effects)
    }

    /// Install the stub sink, returning the previous one.
    ///
    /// Once this returns, no entry or error callback is running on the old
    /// sink, and no later step of a running turn is handed it.
    ///
    /// # Panics
    ///
    /// Like [`attach`](Self::attach), when called from inside one of this
    /// engine's callbacks.
    pub fn detach(&self) -> Option<Arc<E>> {
        self.sink_mut("detach").take()
    }

    pub fn is_attached(&self) -> bool {
        read(&self.sink).is_some()
    }

    /// The live sink, if any.
    pub fn effects(&self) -> Option<Arc<E>> {
        read(&self.sink).clone()
    }

    /// The current state.
    pub fn snapshot(&self) -> Arc<S> {
        Arc::clone(&read(&self.state))
    }

    /// Run a read-only query against the current state.
    pub fn project<T>(&self, query: impl FnOnce(&S) -> T) -> T {
        let state = self.snapshot();
        query(&state)
    }

    /// A copy of the transition log.
    pub fn history(&self) -> TransitionLog {
        lock(&self.log).clone()
    }

    /// Interpret `action` in one synchronous turn.
    ///
    /// Each step is handed whichever sink is live when it starts.
    pub fn apply(&self, action: Action<S, E>) -> Applied<S, E> {
        let origin = self.snapshot();
        let mut working = Arc::clone(&origin);
        let mut entered = false;
        let mut steps = 0usize;
        let mut stack: Vec<Step<S, E>> = Vec::new();
        action.push_onto(&mut stack);

        while let Some(step) = stack.pop() {
            steps += 1;
            let effects = self.effects();
            let mut next = invoke(&step, &working, effects.as_deref());
            loop {
                trace!(result = next.name(), steps, "interpreting");
                match next {
                    Transition::Noop => break,
                    Transition::Reenter => {
                        entered = true;
                        break;
                    }
                    Transition::Enter(state) => {
                        working = Arc::new(state);
                        entered = true;
                        break;
                    }
                    Transition::Forward(action) => {
                        action.push_onto(&mut stack);
                        break;
                    }
                    Transition::Then(inner, action) => {
                        action.push_onto(&mut stack);
                        next = *inner;
                    }
                    Transition::Raise(error) => {
                        self.raise(&error, steps);
                        return Applied {
                            outcome: TransitionKind::Raise,
                            suspended: None,
                        };
                    }
                    Transition::Async(supplier) => {
                        if entered {
                            self.commit(&origin, working, steps);
                        }
                        self.record(TransitionKind::Async, steps, None);
                        let supplier = supplier.followed_by(Action::from_stack(stack));
                        return Applied {
                            outcome: TransitionKind::Async,
                            suspended: Some(supplier),
                        };
                    }
                }
            }
        }

        let outcome = if entered {
            self.commit(&origin, working, steps)
        } else {
            self.record(TransitionKind::Noop, steps, None);
            TransitionKind::Noop
        };
        Applied {
            outcome,
            suspended: None,
        }
    }

    /// Publish the working state and notify the sink once.
    fn commit(&self, origin: &Arc<S>, working: Arc<S>, steps: usize) -> TransitionKind {
        let replaced = !Arc::ptr_eq(origin, &working);
        if replaced {
            *write(&self.state) = Arc::clone(&working);
        }
        let kind = if replaced {
            TransitionKind::Enter
        } else {
            TransitionKind::Reenter
        };

        // Held across the callbacks so that detach waits for them.
        let sink = read(&self.sink);
        let _notifying = Notifying::enter(self.id());
        match sink.as_deref() {
            Some(effects) => guarded("on_enter", || {
                if replaced {
                    effects.on_exit(origin, &working);
                }
                effects.on_enter(&working);
            }),
            None => debug!(?kind, "sink detached, entry callback dropped"),
        }
        drop(sink);

        self.record(kind, steps, None);
        kind
    }

    fn raise(&self, error: &ActionError, steps: usize) {
        let sink = read(&self.sink);
        let _notifying = Notifying::enter(self.id());
        match sink.as_deref() {
            Some(effects) => guarded("on_error", || effects.on_error(error)),
            None => debug!(%error, "sink detached, error dropped"),
        }
        drop(sink);

        self.record(TransitionKind::Raise, steps, Some(error.to_string()));
    }

    fn sink_mut(&self, signal: &'static str) -> RwLockWriteGuard<'_, Option<Arc<E>>> {
        if NOTIFYING.with(Cell::get) == self.id() {
            warn!(signal, "sink swapped from inside its own callback");
            panic!("`{signal}` called from inside an effects callback of the same engine");
        }
        write(&self.sink)
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }

    fn record(&self, kind: TransitionKind, steps: usize, error: Option<String>) {
        lock(&self.log).record(TransitionRecord {
            kind,
            timestamp: Utc::now(),
            steps,
            error,
        });
    }
}

/// Marks this thread as running an engine's callbacks until dropped.
struct Notifying {
    previous: usize,
}

impl Notifying {
    fn enter(engine: usize) -> Self {
        Self {
            previous: NOTIFYING.with(|current| current.replace(engine)),
        }
    }
}

impl Drop for Notifying {
    fn drop(&mut self) {
        NOTIFYING.with(|current| current.set(self.previous));
    }
}

fn invoke<S: 'static, E: 'static>(
    step: &Step<S, E>,
    state: &S,
    effects: Option<&E>,
) -> Transition<S, E> {
    catch_unwind(AssertUnwindSafe(|| step(state, effects)))
        .unwrap_or_else(|payload| Transition::Raise(ActionError::from_panic(payload)))
}

fn guarded(callback: &'static str, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        let error = ActionError::from_panic(payload);
        warn!(callback, %error, "effects callback panicked");
    }
}
