//! Checkpoint and restore for actors.
//!
//! A checkpoint captures an actor's current state together with its
//! transition log, so a host process can persist a screen's state across a
//! restart and rebuild the actor with
//! [`ActorBuilder::restore`](crate::builder::ActorBuilder::restore).
//! Queued actions, in-flight suppliers and the sink are not captured.

use crate::core::TransitionLog;
use crate::effects::Effects;
use crate::runtime::Actor;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable snapshot of an actor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint<S> {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// State at the time of the checkpoint
    pub state: S,

    /// Transition log at the time of the checkpoint
    pub history: TransitionLog,
}

impl<S> Checkpoint<S> {
    pub fn new(state: S, history: TransitionLog) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            state,
            history,
        }
    }

    /// Check that this checkpoint can be restored by this version.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Uuid::parse_str(&self.id)?;
        Ok(())
    }
}

impl<S> Checkpoint<S>
where
    S: Serialize + DeserializeOwned,
{
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and validate a JSON checkpoint.
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, CheckpointError> {
        Ok(bincode::serialize(self)?)
    }

    /// Parse and validate a binary checkpoint.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = bincode::deserialize(bytes)?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }
}

impl<S, E> Actor<S, E>
where
    S: Clone + Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    /// Capture the current state and transition log.
    pub fn checkpoint(&self) -> Checkpoint<S> {
        Checkpoint::new(S::clone(&self.state()), self.history())
    }
}
