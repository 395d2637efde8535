//! The imperative shell around the action algebra.
//!
//! - [`Effects`]: the sink a host supplies to observe state entries
//! - [`Engine`]: owns the state and the sink, interprets actions
//!
//! The engine publishes a new state only at the end of a synchronous turn,
//! so [`Engine::project`] never observes a half-applied chain.

mod engine;
mod sink;

pub use engine::{Applied, Engine};
pub use sink::{Effects, OnEnter};
