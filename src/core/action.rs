//! Actions and their composition.

use crate::core::{ActionError, CancelToken, Transition};
use std::fmt;
use std::ops::Add;
use std::sync::Arc;

/// A single step of an action.
pub(crate) type Step<S, E> = Arc<dyn Fn(&S, Option<&E>) -> Transition<S, E> + Send + Sync>;

/// A reusable state transition function.
///
/// An action is an ordered list of steps. Each step receives the current
/// state and, while the host is active, the effects sink, and returns a
/// [`Transition`]. Steps must not mutate anything they are handed; their
/// only outputs are the transition they return and calls on the sink.
///
/// Composition concatenates step lists, so `a.then(b).then(c)` and
/// `a.then(b.then(c))` are the same action.
///
/// Chains built with [`then`](Self::then) or [`Transition::Forward`] must
/// terminate. The engine interprets them in a loop, so depth is not limited
/// by the call stack, but a chain that forwards to itself forever will spin
/// forever while holding the actor.
///
/// # Example
///
/// ```rust
/// use troupe::core::{Action, Transition};
///
/// let increment: Action<u32, ()> = Action::new(|n| Transition::enter(n + 1));
/// let twice = increment.clone().then(increment);
/// # let _ = twice;
/// ```
pub struct Action<S, E> {
    steps: Vec<Step<S, E>>,
}

impl<S, E> Clone for Action<S, E> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<S, E> fmt::Debug for Action<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl<S: 'static, E: 'static> Action<S, E> {
    /// Action that only looks at the state.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&S) -> Transition<S, E> + Send + Sync + 'static,
    {
        Self::step(Arc::new(move |state: &S, _: Option<&E>| f(state)))
    }

    /// Action that may also use the effects sink. The sink is `None` while
    /// the host is inactive.
    pub fn with_effects<F>(f: F) -> Self
    where
        F: Fn(&S, Option<&E>) -> Transition<S, E> + Send + Sync + 'static,
    {
        Self::step(Arc::new(f))
    }

    /// Action whose errors are raised instead of returned.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&S) -> Result<Transition<S, E>, ActionError> + Send + Sync + 'static,
    {
        Self::new(move |state| f(state).unwrap_or_else(Transition::Raise))
    }

    /// Action that calls `f` on the live sink and leaves the state alone.
    /// Nothing happens while the host is inactive.
    pub fn effect<F>(f: F) -> Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        Self::with_effects(move |_, effects| {
            if let Some(effects) = effects {
                f(effects);
            }
            Transition::Noop
        })
    }

    /// Action that runs `f` on the background executor each time it is
    /// applied.
    pub fn task<F>(f: F) -> Self
    where
        F: Fn(&CancelToken) -> Result<Action<S, E>, ActionError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(move |_| {
            let f = Arc::clone(&f);
            Transition::async_task(move |token| f(token))
        })
    }

    pub fn noop() -> Self {
        Self::new(|_| Transition::Noop)
    }

    pub fn reenter() -> Self {
        Self::new(|_| Transition::Reenter)
    }

    pub fn raise(error: ActionError) -> Self {
        Self::new(move |_| Transition::Raise(error.clone()))
    }

    /// Run this action, then `next` against the resulting state.
    pub fn then(mut self, next: Action<S, E>) -> Self {
        self.steps.extend(next.steps);
        self
    }

    fn step(step: Step<S, E>) -> Self {
        Self { steps: vec![step] }
    }
}

impl<S: Send + Sync + 'static, E: 'static> Action<S, E> {
    /// Action that enters `state` regardless of the current one.
    pub fn enter(state: S) -> Self
    where
        S: Clone,
    {
        Self::new(move |_| Transition::Enter(state.clone()))
    }

    /// Action that enters `f(current)`.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(&S) -> S + Send + Sync + 'static,
    {
        Self::new(move |state| Transition::Enter(f(state)))
    }
}

impl<S, E> Action<S, E> {
    /// Push the steps onto an interpretation stack so that the first step is
    /// popped first.
    pub(crate) fn push_onto(self, stack: &mut Vec<Step<S, E>>) {
        stack.extend(self.steps.into_iter().rev());
    }

    /// Rebuild an action from whatever is left on an interpretation stack.
    pub(crate) fn from_stack(mut stack: Vec<Step<S, E>>) -> Option<Self> {
        if stack.is_empty() {
            return None;
        }
        stack.reverse();
        Some(Self { steps: stack })
    }
}

/// `a + b` is `a.then(b)`.
impl<S: 'static, E: 'static> Add for Action<S, E> {
    type Output = Action<S, E>;

    fn add(self, next: Action<S, E>) -> Self::Output {
        self.then(next)
    }
}
