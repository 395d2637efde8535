//! Build errors for actor builders.

use crate::checkpoint::CheckpointError;
use thiserror::Error;

/// Errors that can occur when building an actor.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Initial state not specified. Call .initial(state) or .restore(checkpoint) before .build()")]
    MissingInitialState,

    #[error("Async timeout must be greater than zero")]
    ZeroTimeout,

    #[error("History capacity must be greater than zero")]
    ZeroHistoryCapacity,

    #[error("Cannot restore from checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
}
