//! Cancellable handle to a job queued on the thread pool.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use lanes_core::traits::TaskFuture;
use log::trace;
use once_cell::sync::OnceCell;

use crate::sync::interrupt::{self, Interrupter};

/// Lifecycle of a pooled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FutureState {
    /// Queued, not picked up by a worker thread yet
    Pending = 0,
    /// Running on a worker thread
    Running = 1,
    /// Ran to completion (including a caught panic)
    Completed = 2,
    /// Cancelled before completion
    Cancelled = 3,
    /// Cancelled while running; the runner's interrupt is being raised
    Interrupting = 4,
}

impl From<u8> for FutureState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            4 => Self::Interrupting,
            _ => Self::Cancelled,
        }
    }
}

/// Handle returned by [`ThreadPool::submit`](super::thread::ThreadPool::submit).
#[derive(Debug)]
pub struct PoolFuture {
    state: AtomicU8,

    /// Set by the worker thread before it moves the job to `Running`
    runner: OnceCell<Arc<Interrupter>>,
}

impl PoolFuture {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(FutureState::Pending as u8),
            runner: OnceCell::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FutureState {
        self.state.load(Ordering::SeqCst).into()
    }

    /// Claim the job for the calling thread.
    ///
    /// Returns `false` if the job was cancelled while queued.
    pub(crate) fn try_start(&self) -> bool {
        let _ = self.runner.set(interrupt::current());

        self.state
            .compare_exchange(
                FutureState::Pending as u8,
                FutureState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Block until a cancel that is interrupting this job has raised the flag.
    ///
    /// Called by the runner once the job has returned, before it clears its
    /// interrupt flag and takes the next job.
    pub(crate) fn wait_for_interrupt(&self) {
        while self.state() == FutureState::Interrupting {
            thread::yield_now();
        }
    }

    /// Mark a running job as completed. A job cancelled mid-run stays cancelled.
    pub(crate) fn complete(&self) {
        let _ = self.state.compare_exchange(
            FutureState::Running as u8,
            FutureState::Completed as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }
}

impl TaskFuture for PoolFuture {
    fn cancel(&self, may_interrupt_if_running: bool) -> bool {
        loop {
            let current = self.state();

            match current {
                FutureState::Completed | FutureState::Cancelled | FutureState::Interrupting => {
                    return false
                }
                FutureState::Pending | FutureState::Running => {
                    let interrupting = current == FutureState::Running && may_interrupt_if_running;
                    let target = if interrupting {
                        FutureState::Interrupting
                    } else {
                        FutureState::Cancelled
                    };

                    if self
                        .state
                        .compare_exchange(
                            current as u8,
                            target as u8,
                            Ordering::SeqCst,
                            Ordering::SeqCst,
                        )
                        .is_err()
                    {
                        continue;
                    }

                    if interrupting {
                        if let Some(runner) = self.runner.get() {
                            trace!("Interrupting pool thread {}", runner.id());
                            runner.interrupt();
                        }
                        self.state
                            .store(FutureState::Cancelled as u8, Ordering::SeqCst);
                    }
                    return true;
                }
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        matches!(
            self.state(),
            FutureState::Cancelled | FutureState::Interrupting
        )
    }

    fn is_done(&self) -> bool {
        matches!(
            self.state(),
            FutureState::Completed | FutureState::Cancelled | FutureState::Interrupting
        )
    }
}
