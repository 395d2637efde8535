//! Scheduling: the [`Actor`] and the executors it hands async work to.

mod actor;
mod executor;

pub use actor::Actor;
pub use executor::{
    default_executor, Executor, InlineExecutor, Job, ManualExecutor, SerialExecutor,
    ThreadExecutor, TokioExecutor,
};
