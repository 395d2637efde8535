//! Actor configuration.

use crate::core::TransitionLog;
use crate::runtime::{default_executor, Executor};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Settings shared by every actor built from it.
#[derive(Clone)]
pub struct ActorConfig {
    /// Where async suppliers run
    pub executor: Arc<dyn Executor>,
    /// Drop continuations that complete later than this
    pub async_timeout: Option<Duration>,
    /// Number of records kept in the transition log
    pub history_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            executor: default_executor(),
            async_timeout: None,
            history_capacity: TransitionLog::DEFAULT_CAPACITY,
        }
    }
}

impl ActorConfig {
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_async_timeout(mut self, timeout: Duration) -> Self {
        self.async_timeout = Some(timeout);
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}

impl fmt::Debug for ActorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorConfig")
            .field("async_timeout", &self.async_timeout)
            .field("history_capacity", &self.history_capacity)
            .finish_non_exhaustive()
    }
}
