//! Scheduler facade over an [`ExecutorService`].

use std::fmt;
use std::sync::Arc;

use lanes_core::error::Result;
use lanes_core::hooks::ErrorSink;
use lanes_core::traits::{ExecutorService, Scheduler};
use log::info;

use super::task::{ScheduledTask, TaskHandle};
use super::worker::ExecutorWorker;

/// Scheduler that hands work to a shared, externally owned executor.
///
/// The scheduler never creates or shuts down the executor. One-off tasks are
/// not tracked anywhere once submitted; use [`Scheduler::create_worker`] to
/// get a group of tasks that can be cancelled together.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use lanes_concurrency::{ExecutorScheduler, ThreadPool};
/// use lanes_core::traits::{Cancellable, Scheduler, Worker};
///
/// let pool = Arc::new(ThreadPool::new(4).unwrap());
/// let scheduler = ExecutorScheduler::new(pool.clone());
///
/// let token = scheduler.schedule(|| println!("one-off")).unwrap();
/// token.cancel();
///
/// let worker = scheduler.create_worker();
/// worker.schedule(|| println!("grouped")).unwrap();
/// worker.shutdown();
/// ```
#[derive(Clone)]
pub struct ExecutorScheduler {
    executor: Arc<dyn ExecutorService>,

    /// Overrides the process-wide dropped-error sink when set
    sink: Option<ErrorSink>,
}

impl ExecutorScheduler {
    /// Create a scheduler over `executor`.
    pub fn new(executor: Arc<dyn ExecutorService>) -> Self {
        info!("Creating executor scheduler");
        Self {
            executor,
            sink: None,
        }
    }

    /// Route errors raised by task bodies to `sink` instead of the
    /// process-wide hook. Workers created afterwards inherit the sink.
    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl Scheduler for ExecutorScheduler {
    type Worker = ExecutorWorker;
    type Token = TaskHandle;

    fn schedule<F>(&self, task: F) -> Result<TaskHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let scheduled = Arc::new(ScheduledTask::detached(self.sink.clone()));
        ScheduledTask::submit(&scheduled, self.executor.as_ref(), task)?;
        Ok(TaskHandle::new(scheduled))
    }

    fn create_worker(&self) -> ExecutorWorker {
        ExecutorWorker::new(Arc::clone(&self.executor), self.sink.clone())
    }
}

impl fmt::Debug for ExecutorScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorScheduler")
            .field("custom_sink", &self.sink.is_some())
            .finish()
    }
}
