//! Error types for the Lanes scheduling adapter.
//!
//! The root error type, `Error`, wraps the subsystem-specific errors so
//! callers can handle failures uniformly. Only submission failures ever reach
//! a caller: races between attach, completion and cancellation are resolved
//! inside the task state machine and never surface as errors.

use crate::id::TaskId;
use thiserror::Error;

/// Root error type for Lanes.
#[derive(Debug, Error)]
pub enum Error {
    /// The executor refused a unit of work
    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),
}

/// Errors raised when work cannot be handed to an executor.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// The executor is shutting down and accepts no more work
    #[error("Executor is shutting down")]
    ShuttingDown,

    /// The executor queue is saturated
    #[error("Executor queue is full")]
    QueueFull,

    /// The executor rejected the work for another reason
    #[error("Submission rejected: {0}")]
    Rejected(String),
}

/// Errors related to the dropped-error hook.
///
/// Never returned to schedulers; the hook logs them and carries on.
#[derive(Debug, Error)]
pub enum HookError {
    /// The installed sink panicked while handling a dropped error
    #[error("Error sink panicked while handling task {task_id}: {message}")]
    SinkPanicked {
        /// Task whose error was being reported
        task_id: TaskId,

        /// Panic message raised by the sink
        message: String,
    },
}

/// Result type for Lanes operations.
pub type Result<T> = std::result::Result<T, Error>;
