//! Serialized execution of actions against one engine.

use crate::builder::ActorConfig;
use crate::core::{Action, ActionError, CancelToken, Supplier, TransitionLog};
use crate::effects::{Effects, Engine};
use crate::lifecycle::LifecycleError;
use crate::runtime::Executor;
use crate::sync::lock;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Serializes actions against a single [`Engine`].
///
/// `exec` never blocks on other callers' work: if another thread is already
/// draining the queue the action is appended and `exec` returns. Otherwise
/// the calling thread drains the queue, including anything enqueued while
/// it does so, and returns once the queue is empty.
///
/// Async results are handed to the configured [`Executor`]. The drain loop
/// moves on immediately, and the supplier's action joins the back of the
/// queue when it completes.
///
/// Cloning an actor clones the handle; all clones drive the same state.
pub struct Actor<S, E> {
    shared: Arc<Shared<S, E>>,
}

struct Shared<S, E> {
    engine: Engine<S, E>,
    admission: Mutex<Admission<S, E>>,
    executor: Arc<dyn Executor>,
    cancel: CancelToken,
    async_timeout: Option<Duration>,
}

struct Admission<S, E> {
    queue: VecDeque<Action<S, E>>,
    running: bool,
    disposed: bool,
}

/// Clears `running` when a panic unwinds out of the drain loop, so the next
/// submission drains again instead of queueing forever.
struct Unwinding<'a, S, E>(&'a Mutex<Admission<S, E>>);

impl<S, E> Drop for Unwinding<'_, S, E> {
    fn drop(&mut self) {
        if thread::panicking() {
            lock(self.0).running = false;
        }
    }
}

impl<S, E> Clone for Actor<S, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, E> fmt::Debug for Actor<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let admission = lock(&self.shared.admission);
        f.debug_struct("Actor")
            .field("queued", &admission.queue.len())
            .field("running", &admission.running)
            .field("disposed", &admission.disposed)
            .finish()
    }
}

impl<S, E> Actor<S, E>
where
    S: Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    /// Create an actor with the default configuration and no sink.
    pub fn new(state: S) -> Self {
        Self::with_config(state, ActorConfig::default())
    }

    pub fn with_config(state: S, config: ActorConfig) -> Self {
        let log = TransitionLog::new(config.history_capacity);
        Self::from_engine(Engine::with_log(state, log), config)
    }

    pub(crate) fn from_engine(engine: Engine<S, E>, config: ActorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine,
                admission: Mutex::new(Admission {
                    queue: VecDeque::new(),
                    running: false,
                    disposed: false,
                }),
                executor: config.executor,
                cancel: CancelToken::new(),
                async_timeout: config.async_timeout,
            }),
        }
    }

    /// Submit an action.
    ///
    /// Returns once the action is applied or queued behind the action
    /// currently being applied. Fails only if the actor has been disposed.
    pub fn exec(&self, action: Action<S, E>) -> Result<(), LifecycleError> {
        Shared::admit(&self.shared, action)
    }

    /// Run a read-only query against a snapshot of the current state.
    pub fn project<T>(&self, query: impl FnOnce(&S) -> T) -> T {
        self.shared.engine.project(query)
    }

    /// Run a procedure against a snapshot of the current state.
    pub fn inspect(&self, proc: impl FnOnce(&S)) {
        self.shared.engine.project(proc)
    }

    /// The current state.
    pub fn state(&self) -> Arc<S> {
        self.shared.engine.snapshot()
    }

    /// Install `effects` as the live sink. No callback fires.
    pub fn attach(&self, effects: E) -> Option<Arc<E>> {
        self.attach_shared(Arc::new(effects))
    }

    pub fn attach_shared(&self, effects: Arc<E>) -> Option<Arc<E>> {
        self.shared.engine.attach(effects)
    }

    /// Install the stub sink. State and in-flight work are kept.
    pub fn detach(&self) -> Option<Arc<E>> {
        self.shared.engine.detach()
    }

    /// The live sink, if any.
    pub fn effects(&self) -> Option<Arc<E>> {
        self.shared.engine.effects()
    }

    /// A copy of the transition log.
    pub fn history(&self) -> TransitionLog {
        self.shared.engine.history()
    }

    /// Number of actions waiting behind the one being applied.
    pub fn pending(&self) -> usize {
        lock(&self.shared.admission).queue.len()
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.shared.admission).disposed
    }

    /// Permanently shut the actor down.
    ///
    /// Queued actions are discarded unapplied, the cancellation token of
    /// every in-flight supplier is cancelled and the sink is detached. Once
    /// this returns no callback fires again, even when a supplier completes
    /// later. Later `exec` calls fail with [`LifecycleError::Disposed`].
    pub fn dispose(&self) {
        let discarded = {
            let mut admission = lock(&self.shared.admission);
            if admission.disposed {
                return;
            }
            admission.disposed = true;
            std::mem::take(&mut admission.queue)
        };
        self.shared.cancel.cancel();
        self.shared.engine.detach();
        debug!(discarded = discarded.len(), "actor disposed");
    }
}

impl<S, E> Shared<S, E>
where
    S: Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    fn admit(shared: &Arc<Self>, action: Action<S, E>) -> Result<(), LifecycleError> {
        {
            let mut admission = lock(&shared.admission);
            if admission.disposed {
                return Err(LifecycleError::Disposed);
            }
            admission.queue.push_back(action);
            if admission.running {
                debug!(queued = admission.queue.len(), "actor busy, action queued");
                return Ok(());
            }
            admission.running = true;
        }
        Self::drain(shared);
        Ok(())
    }

    fn drain(shared: &Arc<Self>) {
        let _unwinding = Unwinding(&shared.admission);
        loop {
            let action = {
                let mut admission = lock(&shared.admission);
                if admission.disposed {
                    admission.queue.clear();
                    admission.running = false;
                    return;
                }
                match admission.queue.pop_front() {
                    Some(action) => action,
                    None => {
                        admission.running = false;
                        return;
                    }
                }
            };

            let applied = shared.engine.apply(action);
            if let Some(supplier) = applied.suspended {
                Self::schedule(shared, supplier);
            }
        }
    }

    fn schedule(shared: &Arc<Self>, supplier: Supplier<S, E>) {
        let token = shared.cancel.child(shared.async_timeout);
        let timeout = shared.async_timeout;
        let weak: Weak<Self> = Arc::downgrade(shared);
        debug!(?timeout, "scheduling async action");

        shared.executor.execute(Box::new(move || {
            let action = match catch_unwind(AssertUnwindSafe(|| supplier.run(&token))) {
                Ok(Ok(action)) => action,
                Ok(Err(error)) => Action::raise(error),
                Err(payload) => Action::raise(ActionError::from_panic(payload)),
            };

            if token.is_cancelled() {
                debug!("actor disposed, dropping continuation");
                return;
            }
            if token.is_expired() {
                warn!(?timeout, "async action timed out, dropping continuation");
                return;
            }
            let Some(shared) = weak.upgrade() else {
                debug!("actor dropped, dropping continuation");
                return;
            };
            if Self::admit(&shared, action).is_err() {
                debug!("actor disposed, dropping continuation");
            }
        }));
    }
}
