//! Checkpoint error types.

use thiserror::Error;

/// Errors that can occur while saving or loading a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("JSON checkpoint: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary checkpoint: {0}")]
    Binary(#[from] bincode::Error),

    /// Written by an incompatible version of the format
    #[error("unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("invalid checkpoint id: {0}")]
    InvalidId(#[from] uuid::Error),
}
