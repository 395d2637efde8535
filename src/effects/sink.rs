//! The effects sink interface.

use crate::core::ActionError;
use tracing::warn;

/// Capability object the engine notifies when states are entered.
///
/// Only [`on_enter`](Self::on_enter) is required. Domain specific methods
/// belong on the implementing type and are reached from actions built with
/// [`Action::with_effects`](crate::core::Action::with_effects) or
/// [`Action::effect`](crate::core::Action::effect); the engine never calls
/// them.
///
/// # Example
///
/// ```rust
/// use troupe::effects::Effects;
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct Label {
///     text: Mutex<String>,
/// }
///
/// impl Effects<u32> for Label {
///     fn on_enter(&self, count: &u32) {
///         *self.text.lock().unwrap() = format!("count: {count}");
///     }
/// }
///
/// let label = Label::default();
/// label.on_enter(&3);
/// assert_eq!(*label.text.lock().unwrap(), "count: 3");
/// ```
pub trait Effects<S>: Send + Sync {
    /// Called after a synchronous turn entered or reentered a state.
    fn on_enter(&self, state: &S);

    /// Called right before `on_enter` when the turn replaced the state.
    fn on_exit(&self, _from: &S, _to: &S) {}

    /// Called when an action raised an error.
    ///
    /// The default implementation logs the error.
    fn on_error(&self, error: &ActionError) {
        warn!(%error, "unhandled action error");
    }
}

/// Adapts a closure into a sink that only handles entry.
///
/// ```rust
/// use troupe::effects::{Effects, OnEnter};
///
/// let sink = OnEnter(|n: &u32| assert_eq!(*n, 1));
/// sink.on_enter(&1u32);
/// ```
pub struct OnEnter<F>(pub F);

impl<S, F> Effects<S> for OnEnter<F>
where
    F: Fn(&S) + Send + Sync,
{
    fn on_enter(&self, state: &S) {
        (self.0)(state)
    }
}
