//! Executor trait definitions.
//!
//! These traits describe the thread-pool-like collaborator a scheduler is
//! built on. The executor accepts boxed jobs and hands back a [`TaskFuture`]
//! through which a submitted job can later be cancelled or interrupted.
//! The scheduling layer never creates or shuts down an executor; it only
//! submits to it and asks it to cancel futures.

use std::sync::Arc;

use crate::error::Result;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a job that an executor has accepted.
pub trait TaskFuture: Send + Sync {
    /// Attempt to cancel the job.
    ///
    /// A job that has not started yet must never start once this returns
    /// `true`. When `may_interrupt_if_running` is set and the job is already
    /// running, the executing thread is asked to stop; the request is
    /// cooperative and the job may still run to completion.
    ///
    /// # Returns
    ///
    /// `true` if the job was moved to the cancelled state by this call,
    /// `false` if it had already completed or been cancelled.
    fn cancel(&self, may_interrupt_if_running: bool) -> bool;

    /// Whether the job was cancelled before it completed.
    fn is_cancelled(&self) -> bool;

    /// Whether the job completed or was cancelled.
    fn is_done(&self) -> bool;
}

/// A thread-pool-like executor that runs jobs asynchronously.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use lanes_core::error::Result;
/// use lanes_core::traits::{ExecutorService, Job, TaskFuture};
///
/// struct Done(AtomicBool);
///
/// impl TaskFuture for Done {
///     fn cancel(&self, _may_interrupt_if_running: bool) -> bool {
///         false
///     }
///     fn is_cancelled(&self) -> bool {
///         false
///     }
///     fn is_done(&self) -> bool {
///         self.0.load(Ordering::SeqCst)
///     }
/// }
///
/// struct InlineExecutor;
///
/// impl ExecutorService for InlineExecutor {
///     fn submit(&self, job: Job) -> Result<Arc<dyn TaskFuture>> {
///         job();
///         Ok(Arc::new(Done(AtomicBool::new(true))))
///     }
/// }
///
/// let future = InlineExecutor.submit(Box::new(|| {})).unwrap();
/// assert!(future.is_done());
/// ```
pub trait ExecutorService: Send + Sync {
    /// Submit a job for asynchronous execution.
    ///
    /// # Returns
    ///
    /// * `Ok(future)` if the executor accepted the job.
    /// * `Err(Error::Scheduling)` if the executor refused it.
    fn submit(&self, job: Job) -> Result<Arc<dyn TaskFuture>>;
}

impl<E: ExecutorService + ?Sized> ExecutorService for Arc<E> {
    fn submit(&self, job: Job) -> Result<Arc<dyn TaskFuture>> {
        (**self).submit(job)
    }
}
