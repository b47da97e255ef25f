//! Workers: groups of tasks torn down as a unit.
//!
//! A worker keeps every outstanding task in a registry so that
//! [`Worker::shutdown`] can cancel them all at once. Registration and the
//! shutdown snapshot share one short critical section: a concurrent
//! `schedule` either lands in the registry before the snapshot is taken (and
//! is cancelled with it) or sees the worker terminated and never submits.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lanes_core::error::Result;
use lanes_core::hooks::ErrorSink;
use lanes_core::id::{TaskId, WorkerId};
use lanes_core::traits::{ExecutorService, Worker};
use log::{debug, trace};
use parking_lot::Mutex;

use super::task::{ScheduledTask, TaskHandle};

/// Registry state shared between a worker and its tasks.
pub(crate) struct WorkerShared {
    id: WorkerId,

    /// Fast-path copy of the flag; authoritative only under `tasks`
    terminated: AtomicBool,

    tasks: Mutex<HashMap<TaskId, Arc<ScheduledTask>>>,
}

impl WorkerShared {
    fn new() -> Self {
        Self {
            id: WorkerId::new(),
            terminated: AtomicBool::new(false),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    fn register(&self, task: &Arc<ScheduledTask>) -> bool {
        if self.is_terminated() {
            return false;
        }

        let mut tasks = self.tasks.lock();
        if self.is_terminated() {
            return false;
        }
        tasks.insert(task.id(), Arc::clone(task));
        true
    }

    /// Remove a task that reached a terminal state on its own.
    pub(crate) fn deregister(&self, task_id: TaskId) {
        if self.is_terminated() {
            return;
        }

        let mut tasks = self.tasks.lock();
        if !self.is_terminated() {
            tasks.remove(&task_id);
        }
    }

    fn terminate(&self) {
        if self.is_terminated() {
            return;
        }

        let snapshot = {
            let mut tasks = self.tasks.lock();
            if self.is_terminated() {
                return;
            }
            self.terminated.store(true, Ordering::Release);
            std::mem::take(&mut *tasks)
        };

        debug!(
            "Worker {}: shutting down, cancelling {} outstanding tasks",
            self.id,
            snapshot.len()
        );

        for task in snapshot.into_values() {
            task.cancel();
        }
    }

    fn len(&self) -> usize {
        if self.is_terminated() {
            return 0;
        }
        self.tasks.lock().len()
    }
}

/// Worker backed by an [`ExecutorService`].
///
/// Created by [`ExecutorScheduler::create_worker`](super::ExecutorScheduler).
/// Only [`Worker::shutdown`] terminates it; dropping the worker leaves its
/// outstanding tasks scheduled.
pub struct ExecutorWorker {
    shared: Arc<WorkerShared>,
    executor: Arc<dyn ExecutorService>,
    sink: Option<ErrorSink>,
}

impl ExecutorWorker {
    pub(crate) fn new(executor: Arc<dyn ExecutorService>, sink: Option<ErrorSink>) -> Self {
        let shared = Arc::new(WorkerShared::new());
        debug!("Worker {}: created", shared.id);

        Self {
            shared,
            executor,
            sink,
        }
    }

    /// Unique identifier of the worker.
    pub fn id(&self) -> WorkerId {
        self.shared.id
    }

    /// Whether [`Worker::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.shared.is_terminated()
    }

    /// Number of tasks that are neither finished nor cancelled.
    pub fn active_tasks(&self) -> usize {
        self.shared.len()
    }
}

impl Worker for ExecutorWorker {
    type Token = TaskHandle;

    fn schedule<F>(&self, task: F) -> Result<TaskHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let scheduled = Arc::new(ScheduledTask::for_worker(
            &self.shared,
            self.shared.id,
            self.sink.clone(),
        ));

        if !self.shared.register(&scheduled) {
            trace!(
                "Worker {}: terminated, dropping task {}",
                self.shared.id,
                scheduled.id()
            );
            scheduled.reject();
            return Ok(TaskHandle::new(scheduled));
        }

        ScheduledTask::submit(&scheduled, self.executor.as_ref(), task)?;
        Ok(TaskHandle::new(scheduled))
    }

    fn shutdown(&self) {
        self.shared.terminate();
    }
}

impl fmt::Debug for ExecutorWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorWorker")
            .field("id", &self.shared.id)
            .field("terminated", &self.shared.is_terminated())
            .finish()
    }
}
