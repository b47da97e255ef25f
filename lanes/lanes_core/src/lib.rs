//! # Lanes Core
//!
//! `lanes_core` provides the building blocks shared by the Lanes scheduling
//! adapter: error types, identifiers, the executor and scheduler traits, and
//! the process-wide hook for errors raised inside task bodies.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Lanes components
//! - **id**: Strongly-typed identifier types
//! - **traits**: Executor, scheduler, worker and cancellation interfaces
//! - **hooks**: Dropped-error sink

pub mod error;
pub mod hooks;
pub mod id;
pub mod traits;

// Re-export key types and traits for convenience
pub use error::{Error, HookError, Result, SchedulingError};
pub use hooks::{DroppedError, ErrorSink};
pub use id::{TaskId, WorkerId};
pub use traits::{Cancellable, ExecutorService, Job, Scheduler, TaskFuture, Worker};
