//! The action algebra.
//!
//! This module holds the pure vocabulary of the toolkit:
//! - [`Action`]s, reusable functions from state to [`Transition`]
//! - [`Transition`]s, the tagged outcome of applying one action
//! - [`Supplier`]s and [`Continuation`]s for background work
//! - [`CancelToken`] for cooperative cancellation of that work
//! - [`TransitionLog`] for recording what each applied action did
//!
//! Nothing here touches a sink or a thread; interpretation lives in
//! [`crate::effects::Engine`] and scheduling in [`crate::runtime::Actor`].

mod action;
mod cancel;
mod error;
mod history;
mod transition;

pub(crate) use action::Step;
pub use action::Action;
pub use cancel::CancelToken;
pub use error::ActionError;
pub use history::{TransitionKind, TransitionLog, TransitionRecord};
pub use transition::{Continuation, Supplier, Transition};
