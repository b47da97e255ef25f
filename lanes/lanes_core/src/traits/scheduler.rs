//! Scheduler, worker and cancellation trait definitions.
//!
//! A [`Scheduler`] submits one-off tasks and creates [`Worker`]s. A worker
//! groups the tasks scheduled through it so they can be torn down together
//! with [`Worker::shutdown`]. Every submission returns a [`Cancellable`]
//! token.

use crate::error::Result;

/// Token returned for every scheduled task.
///
/// Cancellation is idempotent: cancelling twice, or cancelling a task that
/// has already finished, is a silent no-op.
pub trait Cancellable: Send + Sync {
    /// Request cancellation of the task.
    ///
    /// A task that has not started will never start. A task running on
    /// another thread is asked to stop; the request is advisory.
    fn cancel(&self);

    /// Whether the task has reached a terminal state.
    ///
    /// This is `true` both for cancelled tasks and for tasks that ran to
    /// completion, since neither can be cancelled any more.
    fn is_cancelled(&self) -> bool;
}

/// Entry point for submitting work.
pub trait Scheduler: Send + Sync {
    /// Worker type produced by this scheduler.
    type Worker: Worker;

    /// Token type returned for one-off tasks.
    type Token: Cancellable;

    /// Submit a one-off task.
    ///
    /// # Returns
    ///
    /// * `Ok(token)` if the executor accepted the task.
    /// * `Err(Error::Scheduling)` if the executor refused it.
    fn schedule<F>(&self, task: F) -> Result<Self::Token>
    where
        F: FnOnce() + Send + 'static;

    /// Create a new, empty worker bound to the same executor.
    ///
    /// Only [`Worker::shutdown`] terminates the worker. Dropping it leaves the
    /// tasks already scheduled on it running.
    fn create_worker(&self) -> Self::Worker;
}

/// A group of tasks that can be cancelled as a unit.
pub trait Worker: Send + Sync {
    /// Token type returned for tasks scheduled on this worker.
    type Token: Cancellable;

    /// Submit a task on this worker.
    ///
    /// After [`Worker::shutdown`] the task is never run and the returned
    /// token is already cancelled; this is not an error.
    ///
    /// # Returns
    ///
    /// * `Ok(token)` for accepted tasks and for tasks dropped after shutdown.
    /// * `Err(Error::Scheduling)` if the executor refused the task.
    fn schedule<F>(&self, task: F) -> Result<Self::Token>
    where
        F: FnOnce() + Send + 'static;

    /// Cancel every outstanding task and refuse all future ones.
    ///
    /// Calling this more than once is a no-op.
    fn shutdown(&self);
}
