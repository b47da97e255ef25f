//! Core traits that define the Lanes interfaces.
//!
//! - `ExecutorService` / `TaskFuture`: the thread-pool collaborator
//! - `Scheduler` / `Worker`: the scheduling surface exposed to callers
//! - `Cancellable`: the token returned for every scheduled task

pub mod executor;
pub mod scheduler;

pub use executor::{ExecutorService, Job, TaskFuture};
pub use scheduler::{Cancellable, Scheduler, Worker};
