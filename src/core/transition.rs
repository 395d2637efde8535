//! Transition results and deferred suppliers.

use crate::core::{Action, ActionError, CancelToken};
use std::fmt;
use std::sync::mpsc::{self, TryRecvError};

/// Outcome of applying one action to the current state.
///
/// `Noop`, `Reenter` and `Enter` are terminal. `Forward` and `Then` keep the
/// engine interpreting in the same synchronous turn. `Raise` aborts the
/// turn, and `Async` hands work off to the background executor.
pub enum Transition<S, E> {
    /// No state change and no callback.
    Noop,

    /// Keep the state but fire the entry callback again.
    Reenter,

    /// Replace the state and fire the entry callback with it.
    Enter(S),

    /// Interpret another action against the working state without firing
    /// any callback for this hop.
    Forward(Action<S, E>),

    /// Deliver an error to the sink instead of changing state.
    Raise(ActionError),

    /// Run a supplier in the background; its action is admitted when ready.
    Async(Supplier<S, E>),

    /// Interpret the boxed transition, then continue with the action.
    /// Built by [`Transition::then`].
    Then(Box<Transition<S, E>>, Action<S, E>),
}

impl<S, E> Transition<S, E> {
    pub fn noop() -> Self {
        Self::Noop
    }

    pub fn reenter() -> Self {
        Self::Reenter
    }

    pub fn enter(state: S) -> Self {
        Self::Enter(state)
    }

    pub fn forward(action: Action<S, E>) -> Self {
        Self::Forward(action)
    }

    pub fn raise(error: ActionError) -> Self {
        Self::Raise(error)
    }

    /// Continue with `next` once this transition reaches a terminal result.
    pub fn then(self, next: Action<S, E>) -> Self {
        Self::Then(Box::new(self), next)
    }

    /// Name of the variant, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Noop => "Noop",
            Self::Reenter => "Reenter",
            Self::Enter(_) => "Enter",
            Self::Forward(_) => "Forward",
            Self::Raise(_) => "Raise",
            Self::Async(_) => "Async",
            Self::Then(..) => "Then",
        }
    }
}

impl<S: 'static, E: 'static> Transition<S, E> {
    /// Run `supplier` on the background executor.
    pub fn async_task<F>(supplier: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<Action<S, E>, ActionError> + Send + 'static,
    {
        Self::Async(Supplier::new(supplier))
    }
}

impl<S: Send + 'static, E: 'static> Transition<S, E> {
    /// Hand `block` a [`Continuation`] and suspend until it is resumed.
    ///
    /// The block runs on the background executor and may pass the
    /// continuation to any thread or callback API. The supplier sleeps on
    /// the cancellation token until it is resumed. It gives up with
    /// [`ActionError::Cancelled`] as soon as the actor is disposed or the
    /// async timeout passes, and raises an error if every copy of the
    /// continuation is dropped without resuming.
    pub fn defer<F>(block: F) -> Self
    where
        F: FnOnce(Continuation<S, E>) + Send + 'static,
    {
        Self::async_task(move |token| {
            let (tx, rx) = mpsc::channel();
            block(Continuation {
                tx: Some(tx),
                token: token.clone(),
            });
            token.park(None, || match rx.try_recv() {
                Ok(action) => Some(Ok(action)),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(ActionError::msg(
                    "continuation dropped without being resumed",
                ))),
            })?
        })
    }
}

impl<S: fmt::Debug, E> fmt::Debug for Transition<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter(state) => f.debug_tuple("Enter").field(state).finish(),
            Self::Raise(error) => f.debug_tuple("Raise").field(error).finish(),
            Self::Then(inner, _) => f.debug_tuple("Then").field(inner).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// One-shot background computation that yields the next action.
pub struct Supplier<S, E> {
    run: Box<dyn FnOnce(&CancelToken) -> Result<Action<S, E>, ActionError> + Send>,
}

impl<S: 'static, E: 'static> Supplier<S, E> {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&CancelToken) -> Result<Action<S, E>, ActionError> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Append `rest` to whatever action this supplier produces.
    pub(crate) fn followed_by(self, rest: Option<Action<S, E>>) -> Self {
        match rest {
            None => self,
            Some(rest) => Self::new(move |token| (self.run)(token).map(|a| a.then(rest))),
        }
    }
}

impl<S, E> Supplier<S, E> {
    /// Run the supplier on the current thread.
    pub fn run(self, token: &CancelToken) -> Result<Action<S, E>, ActionError> {
        (self.run)(token)
    }
}

impl<S, E> fmt::Debug for Supplier<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Supplier")
    }
}

/// Handle used to resume a [`Transition::defer`] from elsewhere.
pub struct Continuation<S, E> {
    tx: Option<mpsc::Sender<Action<S, E>>>,
    token: CancelToken,
}

impl<S, E> Clone for Continuation<S, E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            token: self.token.clone(),
        }
    }
}

impl<S, E> Drop for Continuation<S, E> {
    fn drop(&mut self) {
        // Disconnect before waking so the last drop is observed.
        drop(self.tx.take());
        self.token.wake();
    }
}

impl<S: Send + Sync + 'static, E: 'static> Continuation<S, E> {
    /// Resume with the next action. Later calls are ignored.
    pub fn resume(&self, action: Action<S, E>) {
        // The receiver is gone once the first action arrived or the supplier
        // was cancelled.
        if let Some(tx) = &self.tx {
            let _ = tx.send(action);
        }
        self.token.wake();
    }

    /// Resume by entering `state`.
    pub fn ok(&self, state: S)
    where
        S: Clone,
    {
        self.resume(Action::enter(state));
    }

    /// Resume by raising `error`.
    pub fn fail(&self, error: ActionError) {
        self.resume(Action::raise(error));
    }
}
