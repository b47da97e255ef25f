//! Per-submission cancellation state machine.
//!
//! Each scheduled task owns one atomic slot that moves through
//!
//! ```text
//! Unset ──attach──▶ Attached ──run──▶ Finished
//!   │                  │
//!   └──────cancel──────┴──────────▶ Cancelled
//! ```
//!
//! `Unset` may also go straight to `Finished` when the executor runs the job
//! before the submitting thread gets to attach the returned future. Attach,
//! completion and cancellation race freely through compare-and-swap loops;
//! whichever terminal state lands first is final, and the losers observe it
//! and back off.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use lanes_core::error::Result;
use lanes_core::hooks::{self, DroppedError, ErrorSink};
use lanes_core::id::{TaskId, WorkerId};
use lanes_core::traits::{Cancellable, ExecutorService, Job, TaskFuture};
use log::trace;
use once_cell::sync::OnceCell;

use super::worker::WorkerShared;
use crate::sync::interrupt::{self, NO_THREAD};

/// Observable state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Created, executor future not attached yet
    Unset = 0,
    /// Executor future attached, task queued or running
    Attached = 1,
    /// Task body returned (or panicked) and the task was not cancelled
    Finished = 2,
    /// Task was cancelled
    Cancelled = 3,
}

impl TaskState {
    /// Whether the state can never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

// Internal encoding of `Cancelled` when the running thread cancelled itself
const SELF_CANCELLED: u8 = 4;

impl From<u8> for TaskState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Unset,
            1 => Self::Attached,
            2 => Self::Finished,
            _ => Self::Cancelled,
        }
    }
}

pub(crate) struct ScheduledTask {
    id: TaskId,
    state: AtomicU8,

    /// Published before `state` moves to `Attached`
    future: OnceCell<Arc<dyn TaskFuture>>,

    /// Identity of the thread running the body, `NO_THREAD` otherwise
    current: AtomicU64,

    parent: Option<Weak<WorkerShared>>,
    worker_id: Option<WorkerId>,
    sink: Option<ErrorSink>,
}

impl ScheduledTask {
    /// Task not bound to any worker.
    pub(crate) fn detached(sink: Option<ErrorSink>) -> Self {
        Self::new(None, None, sink)
    }

    /// Task that deregisters itself from `parent` once terminal.
    pub(crate) fn for_worker(
        parent: &Arc<WorkerShared>,
        worker_id: WorkerId,
        sink: Option<ErrorSink>,
    ) -> Self {
        Self::new(Some(Arc::downgrade(parent)), Some(worker_id), sink)
    }

    fn new(
        parent: Option<Weak<WorkerShared>>,
        worker_id: Option<WorkerId>,
        sink: Option<ErrorSink>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            state: AtomicU8::new(TaskState::Unset as u8),
            future: OnceCell::new(),
            current: AtomicU64::new(NO_THREAD),
            parent,
            worker_id,
            sink,
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state.load(Ordering::SeqCst).into()
    }

    fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Hand the task to `executor` and attach the returned future.
    ///
    /// On rejection the task is cancelled before the error is returned.
    pub(crate) fn submit<F>(
        task: &Arc<Self>,
        executor: &dyn ExecutorService,
        work: F,
    ) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let runner = Arc::clone(task);
        let job: Job = Box::new(move || runner.run(work));

        match executor.submit(job) {
            Ok(future) => {
                task.attach(future);
                Ok(())
            }
            Err(e) => {
                trace!("Task {}: submission rejected: {}", task.id, e);
                task.cancel();
                Err(e)
            }
        }
    }

    /// Body executed on the pool thread.
    fn run<F>(&self, work: F)
    where
        F: FnOnce(),
    {
        self.current.store(interrupt::current_id(), Ordering::SeqCst);

        if self.state() == TaskState::Cancelled {
            trace!("Task {}: cancelled before start, skipping body", self.id);
        } else if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
            let error = DroppedError::from_panic(payload.as_ref(), self.id, self.worker_id);
            match &self.sink {
                Some(sink) => hooks::report_to(Some(sink), &error),
                None => hooks::on_error_dropped(&error),
            }
        }

        self.finish();
        self.current.store(NO_THREAD, Ordering::SeqCst);
    }

    fn finish(&self) {
        loop {
            let current = self.state();
            if current == TaskState::Cancelled {
                return;
            }
            if self.transition(current, TaskState::Finished) {
                trace!("Task {}: finished", self.id);
                self.deregister();
                return;
            }
        }
    }

    /// Install the future returned by the executor.
    pub(crate) fn attach(&self, future: Arc<dyn TaskFuture>) {
        if self.future.set(Arc::clone(&future)).is_err() {
            return;
        }

        loop {
            match self.state() {
                TaskState::Finished => {
                    // The body already ran; the late future is simply dropped
                    return;
                }
                TaskState::Cancelled => {
                    if self.state.load(Ordering::SeqCst) == SELF_CANCELLED {
                        future.cancel(false);
                    } else {
                        self.cancel_future(future.as_ref());
                    }
                    return;
                }
                TaskState::Attached => return,
                TaskState::Unset => {
                    if self.transition(TaskState::Unset, TaskState::Attached) {
                        return;
                    }
                }
            }
        }
    }

    /// Cancel the task. Idempotent; a no-op once the task has finished.
    pub(crate) fn cancel(&self) {
        let target = if self.current.load(Ordering::SeqCst) == interrupt::current_id() {
            SELF_CANCELLED
        } else {
            TaskState::Cancelled as u8
        };

        loop {
            let current = self.state();
            if current.is_terminal() {
                return;
            }

            if self
                .state
                .compare_exchange(current as u8, target, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                trace!("Task {}: cancelled from {:?}", self.id, current);
                if current == TaskState::Attached {
                    if let Some(future) = self.future.get() {
                        self.cancel_future(future.as_ref());
                    }
                }
                self.deregister();
                return;
            }
        }
    }

    /// Mark a task that was never submitted as cancelled.
    pub(crate) fn reject(&self) {
        self.transition(TaskState::Unset, TaskState::Cancelled);
    }

    // A task cancelling itself must not interrupt its own thread
    fn cancel_future(&self, future: &dyn TaskFuture) {
        let may_interrupt = self.current.load(Ordering::SeqCst) != interrupt::current_id();
        future.cancel(may_interrupt);
    }

    fn deregister(&self) {
        if let Some(parent) = self.parent.as_ref().and_then(Weak::upgrade) {
            parent.deregister(self.id);
        }
    }
}

/// Token for a scheduled task.
///
/// Cloning the handle shares the underlying task.
#[derive(Clone)]
pub struct TaskHandle {
    task: Arc<ScheduledTask>,
}

impl TaskHandle {
    pub(crate) fn new(task: Arc<ScheduledTask>) -> Self {
        Self { task }
    }

    /// Unique identifier of the task.
    pub fn id(&self) -> TaskId {
        self.task.id
    }

    /// Worker the task was scheduled on, `None` for one-off tasks.
    pub fn worker_id(&self) -> Option<WorkerId> {
        self.task.worker_id
    }

    /// Current state of the task.
    pub fn state(&self) -> TaskState {
        self.task.state()
    }

    /// Whether the task body ran to completion without being cancelled.
    pub fn is_finished(&self) -> bool {
        self.state() == TaskState::Finished
    }

    /// Whether the task ended by cancellation rather than completion.
    pub fn was_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }
}

impl Cancellable for TaskHandle {
    fn cancel(&self) {
        self.task.cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.state().is_terminal()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.task.id)
            .field("worker_id", &self.task.worker_id)
            .field("state", &self.task.state())
            .finish()
    }
}
