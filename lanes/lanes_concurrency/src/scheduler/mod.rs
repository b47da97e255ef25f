//! Scheduling on top of an executor.
//!
//! - [`ExecutorScheduler`] submits one-off tasks and creates workers
//! - [`ExecutorWorker`] groups tasks so they can be cancelled together
//! - [`TaskHandle`] cancels a single task, interrupting it if it is running
//!   on another thread

pub mod executor;
pub mod task;
pub mod worker;

pub use executor::ExecutorScheduler;
pub use task::{TaskHandle, TaskState};
pub use worker::ExecutorWorker;
