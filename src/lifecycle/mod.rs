//! Host lifecycle integration.
//!
//! A host (a screen, a view, a window) is created, activated, deactivated
//! and destroyed by its framework, possibly many times for one logical
//! identity. [`Binder`] keeps one [`Actor`](crate::runtime::Actor) per
//! identity and translates the framework's signals into sink swaps:
//!
//! - activate: attach the host's fresh sink and replay the current state
//! - deactivate: swap in the stub sink; work keeps running
//! - destroy: dispose the actor and forget the identity

mod binder;
mod error;

pub use binder::{Binder, Binding, LifecycleEvent, Phase};
pub use error::LifecycleError;
