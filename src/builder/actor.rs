//! Builder for constructing actors.

use crate::builder::{ActorConfig, BuildError};
use crate::checkpoint::Checkpoint;
use crate::core::TransitionLog;
use crate::effects::{Effects, Engine};
use crate::runtime::{Actor, Executor};
use std::sync::Arc;
use std::time::Duration;

/// Builder for constructing actors with a fluent API.
///
/// # Example
///
/// ```rust
/// use troupe::builder::ActorBuilder;
/// use troupe::core::Action;
/// use troupe::effects::OnEnter;
/// use troupe::runtime::InlineExecutor;
/// use std::sync::Arc;
///
/// let actor = ActorBuilder::new()
///     .initial(0u32)
///     .effects(OnEnter(|n: &u32| println!("count: {n}")))
///     .executor(Arc::new(InlineExecutor))
///     .build()
///     .unwrap();
///
/// actor.exec(Action::map(|n| n + 1)).unwrap();
/// assert_eq!(actor.project(|n| *n), 1);
/// ```
pub struct ActorBuilder<S, E> {
    initial: Option<S>,
    effects: Option<E>,
    checkpoint: Option<Checkpoint<S>>,
    config: ActorConfig,
}

impl<S, E> ActorBuilder<S, E>
where
    S: Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            initial: None,
            effects: None,
            checkpoint: None,
            config: ActorConfig::default(),
        }
    }

    /// Set the initial state (required unless restoring).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Attach a sink right away. No entry callback is synthesized.
    pub fn effects(mut self, effects: E) -> Self {
        self.effects = Some(effects);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ActorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.config.executor = executor;
        self
    }

    /// Drop continuations of suppliers that take longer than `timeout`.
    pub fn async_timeout(mut self, timeout: Duration) -> Self {
        self.config.async_timeout = Some(timeout);
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Start from a checkpoint's state and history instead of `initial`.
    pub fn restore(mut self, checkpoint: Checkpoint<S>) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    /// Build the actor.
    /// Returns an error if required fields are missing or invalid.
    pub fn build(self) -> Result<Actor<S, E>, BuildError> {
        if self.config.async_timeout == Some(Duration::ZERO) {
            return Err(BuildError::ZeroTimeout);
        }
        if self.config.history_capacity == 0 {
            return Err(BuildError::ZeroHistoryCapacity);
        }

        let engine = match self.checkpoint {
            Some(checkpoint) => {
                checkpoint.validate()?;
                Engine::with_log(checkpoint.state, checkpoint.history)
            }
            None => {
                let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
                Engine::with_log(initial, TransitionLog::new(self.config.history_capacity))
            }
        };

        let actor = Actor::from_engine(engine, self.config);
        if let Some(effects) = self.effects {
            actor.attach(effects);
        }
        Ok(actor)
    }
}

impl<S, E> Default for ActorBuilder<S, E>
where
    S: Send + Sync + 'static,
    E: Effects<S> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{CheckpointError, CHECKPOINT_VERSION};
    use crate::core::{Action, TransitionKind};
    use crate::effects::OnEnter;
    use crate::runtime::InlineExecutor;

    type Sink = OnEnter<fn(&i32)>;

    fn builder() -> ActorBuilder<i32, Sink> {
        ActorBuilder::new().executor(Arc::new(InlineExecutor))
    }

    #[test]
    fn missing_initial_state_fails() {
        let result = builder().build();
        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn zero_timeout_fails() {
        let result = builder().initial(0).async_timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(BuildError::ZeroTimeout)));
    }

    #[test]
    fn zero_history_capacity_fails() {
        let result = builder().initial(0).history_capacity(0).build();
        assert!(matches!(result, Err(BuildError::ZeroHistoryCapacity)));
    }

    #[test]
    fn builds_with_settings() {
        let actor = builder()
            .initial(1)
            .effects(OnEnter(|_: &i32| {}))
            .history_capacity(2)
            .build()
            .unwrap();

        assert!(actor.effects().is_some());
        for _ in 0..3 {
            actor.exec(Action::map(|n| n * 2)).unwrap();
        }

        assert_eq!(actor.project(|n| *n), 8);
        let history = actor.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history.capacity(), 2);
        assert_eq!(history.total(), 3);
    }

    #[test]
    fn restore_resumes_state_and_history() {
        let original = builder().initial(0).build().unwrap();
        original.exec(Action::map(|n| n + 5)).unwrap();
        let checkpoint = original.checkpoint();

        let restored = builder().initial(-1).restore(checkpoint).build().unwrap();
        assert_eq!(restored.project(|n| *n), 5);
        assert_eq!(restored.history().kinds(), vec![TransitionKind::Enter]);
    }

    #[test]
    fn restore_rejects_unknown_version() {
        let mut checkpoint = builder().initial(0).build().unwrap().checkpoint();
        checkpoint.version = CHECKPOINT_VERSION + 1;

        let result = builder().restore(checkpoint).build();
        assert!(matches!(
            result,
            Err(BuildError::Checkpoint(CheckpointError::UnsupportedVersion { .. }))
        ));
    }
}
