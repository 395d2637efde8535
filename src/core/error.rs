//! Errors raised by actions.

use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Error delivered to an effects sink's error channel.
///
/// Produced when an action returns [`Transition::Raise`](crate::core::Transition::Raise),
/// panics, or when an async supplier fails. Cheap to clone so the same error
/// can be logged and handed to the sink.
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    /// The action explicitly raised an error.
    #[error(transparent)]
    Raised(Arc<dyn std::error::Error + Send + Sync>),

    /// The action or supplier panicked while running.
    #[error("action panicked: {0}")]
    Panicked(String),

    /// The supplier observed cancellation or its deadline and gave up.
    #[error("async action cancelled")]
    Cancelled,
}

impl ActionError {
    /// Wrap any error as a raised action error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Raised(Arc::new(error))
    }

    /// Raise an error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Raised(Arc::new(Message(message.into())))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }

    /// Attempt to view the raised error as a concrete type.
    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Raised(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("bad input: {0}")]
    struct BadInput(u32);

    #[test]
    fn raised_error_displays_source() {
        let error = ActionError::new(BadInput(7));
        assert_eq!(error.to_string(), "bad input: 7");
        assert_eq!(error.downcast_ref::<BadInput>(), Some(&BadInput(7)));
    }

    #[test]
    fn message_error_displays_text() {
        let error = ActionError::msg("nope");
        assert_eq!(error.to_string(), "nope");
        assert!(error.downcast_ref::<BadInput>().is_none());
    }

    #[test]
    fn panic_payloads_are_stringified() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        let error = ActionError::from_panic(payload);
        assert!(matches!(error, ActionError::Panicked(ref m) if m == "boom"));

        let payload = std::panic::catch_unwind(|| panic!("{} {}", "formatted", 1)).unwrap_err();
        let error = ActionError::from_panic(payload);
        assert!(matches!(error, ActionError::Panicked(ref m) if m == "formatted 1"));
    }

    #[test]
    fn clones_share_the_source() {
        let error = ActionError::msg("shared");
        let cloned = error.clone();
        assert_eq!(error.to_string(), cloned.to_string());
    }
}
