//! Builder API for actor construction.
//!
//! [`ActorBuilder`] validates its settings before creating an actor;
//! [`ActorConfig`] is the plain settings value shared with
//! [`Binder`](crate::lifecycle::Binder).

mod actor;
mod config;
pub mod error;

pub use actor::ActorBuilder;
pub use config::ActorConfig;
pub use error::BuildError;
