//! Troupe: serialized state machines for host components
//!
//! Troupe keeps a screen's state apart from the screen. Behaviour is written as
//! pure [`Action`]s that map a state to a [`Transition`]; an [`Actor`] applies
//! them one at a time and notifies an [`Effects`] sink of every state it
//! enters. The sink belongs to the host and can be swapped or removed at any
//! time, while the actor, its state and its background work carry on.
//!
//! # Core Concepts
//!
//! - **Action**: Reusable, composable function from state to transition
//! - **Transition**: `Noop`, `Reenter`, `Enter`, `Forward`, `Raise` or `Async`
//! - **Effects**: The host's sink for entered states and raised errors
//! - **Actor**: Serializes actions and schedules async work on an [`Executor`]
//! - **Binder**: Keeps one actor per host identity across the host's lifecycle
//!
//! # Example
//!
//! ```rust
//! use troupe::{Action, ActorBuilder, Binder, Effects, InlineExecutor, OnEnter, Transition};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Login {
//!     Idle,
//!     Submitting,
//!     Done(String),
//! }
//!
//! let submit: Action<Login, OnEnter<fn(&Login)>> = Action::new(|state| match state {
//!     Login::Idle => Transition::enter(Login::Submitting).then(Action::task(|_| {
//!         Ok(Action::enter(Login::Done("welcome".to_string())))
//!     })),
//!     _ => Transition::noop(),
//! });
//!
//! let actor = ActorBuilder::new()
//!     .initial(Login::Idle)
//!     .effects(OnEnter((|state: &Login| println!("{state:?}")) as fn(&Login)))
//!     .executor(Arc::new(InlineExecutor))
//!     .build()
//!     .unwrap();
//!
//! actor.exec(submit.clone()).unwrap();
//! assert_eq!(actor.project(|s| s.clone()), Login::Done("welcome".to_string()));
//!
//! // Hosts are bound by identity and may come and go.
//! struct Counter(Arc<Mutex<Vec<u32>>>);
//!
//! impl Effects<u32> for Counter {
//!     fn on_enter(&self, n: &u32) {
//!         self.0.lock().unwrap().push(*n);
//!     }
//! }
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let binder: Binder<&str, u32, Counter> = Binder::new();
//! binder.bind("counter", 0, Counter(Arc::clone(&seen))).unwrap();
//! binder.destroy(&"counter").unwrap();
//! assert_eq!(*seen.lock().unwrap(), vec![0]);
//! ```

pub mod builder;
pub mod checkpoint;
pub mod core;
pub mod effects;
pub mod lifecycle;
pub mod runtime;

mod sync;

// Re-export commonly used types
pub use builder::{ActorBuilder, ActorConfig, BuildError};
pub use checkpoint::{Checkpoint, CheckpointError};
pub use core::{
    Action, ActionError, CancelToken, Continuation, Supplier, Transition, TransitionKind,
    TransitionLog, TransitionRecord,
};
pub use effects::{Effects, Engine, OnEnter};
pub use lifecycle::{Binder, Binding, LifecycleError, LifecycleEvent, Phase};
pub use runtime::{
    default_executor, Actor, Executor, InlineExecutor, ManualExecutor, SerialExecutor,
    ThreadExecutor, TokioExecutor,
};
