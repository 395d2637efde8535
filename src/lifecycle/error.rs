//! Lifecycle misuse errors.

use crate::lifecycle::Phase;
use thiserror::Error;

/// Returned when a caller drives an actor or binding in a way its lifecycle
/// does not allow. These are programming errors, not retryable conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("actor has been disposed")]
    Disposed,

    #[error("cannot {event} a host in phase {phase:?}")]
    IllegalLifecycleState { phase: Phase, event: &'static str },

    #[error("no binding for host {0}")]
    UnknownHost(String),
}
