//! Process-wide hook for errors that cannot be propagated.
//!
//! A panic inside a scheduled task body has no caller to return to. It is
//! caught on the executing thread and reported here as a [`DroppedError`].
//! The sink is installed explicitly with [`set_error_sink`]; until then
//! dropped errors are written to the log at error level.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use lanes_core::hooks::{self, DroppedError};
//! use lanes_core::id::TaskId;
//!
//! hooks::set_error_sink(Arc::new(|error: &DroppedError| {
//!     eprintln!("task {} failed: {}", error.task_id, error.message);
//! }));
//! hooks::on_error_dropped(&DroppedError::new("boom", TaskId::new(), None));
//! hooks::reset_error_sink();
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::error;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::HookError;
use crate::id::{TaskId, WorkerId};

/// An error raised by a task body that was caught instead of propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedError {
    /// Description of the failure, usually the panic message
    pub message: String,

    /// Task whose body failed
    pub task_id: TaskId,

    /// Worker the task was scheduled on, if any
    pub worker_id: Option<WorkerId>,
}

impl DroppedError {
    /// Create a new dropped error.
    pub fn new(message: impl Into<String>, task_id: TaskId, worker_id: Option<WorkerId>) -> Self {
        Self {
            message: message.into(),
            task_id,
            worker_id,
        }
    }

    /// Build a dropped error from a caught panic payload.
    pub fn from_panic(
        payload: &(dyn Any + Send),
        task_id: TaskId,
        worker_id: Option<WorkerId>,
    ) -> Self {
        Self::new(panic_message(payload), task_id, worker_id)
    }
}

impl fmt::Display for DroppedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.worker_id {
            Some(worker_id) => write!(
                f,
                "task {} on worker {} failed: {}",
                self.task_id, worker_id, self.message
            ),
            None => write!(f, "task {} failed: {}", self.task_id, self.message),
        }
    }
}

/// Callback receiving dropped errors.
pub type ErrorSink = Arc<dyn Fn(&DroppedError) + Send + Sync>;

static ERROR_SINK: Lazy<RwLock<Option<ErrorSink>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide error sink, replacing any previous one.
pub fn set_error_sink(sink: ErrorSink) {
    *ERROR_SINK.write() = Some(sink);
}

/// Remove the installed sink so dropped errors go back to the log.
pub fn reset_error_sink() {
    *ERROR_SINK.write() = None;
}

/// The currently installed process-wide sink, if any.
pub fn current_error_sink() -> Option<ErrorSink> {
    ERROR_SINK.read().clone()
}

/// Report a dropped error to the process-wide sink.
///
/// Never panics: a panicking sink is contained and logged.
pub fn on_error_dropped(error: &DroppedError) {
    let sink = current_error_sink();
    report_to(sink.as_ref(), error);
}

/// Report a dropped error to `sink`, or to the log when `sink` is `None`.
///
/// Never panics: a panicking sink is contained and logged.
pub fn report_to(sink: Option<&ErrorSink>, error: &DroppedError) {
    match sink {
        Some(sink) => {
            if let Err(e) = deliver(sink, error) {
                error!("{}; original error: {}", e, error);
            }
        }
        None => error!("Dropped error: {}", error),
    }
}

/// Call `sink` with `error`, catching a panic raised by the sink itself.
pub fn deliver(sink: &ErrorSink, error: &DroppedError) -> Result<(), HookError> {
    catch_unwind(AssertUnwindSafe(|| (**sink)(error))).map_err(|payload| HookError::SinkPanicked {
        task_id: error.task_id,
        message: panic_message(payload.as_ref()),
    })
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<unknown panic>".to_string()
    }
}
