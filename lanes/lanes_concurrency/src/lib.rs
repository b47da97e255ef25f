#![deny(warnings)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Lanes Concurrency
//!
//! Scheduler adapter over a shared executor.
//!
//! This crate provides:
//!
//! - A scheduler that submits work to any [`ExecutorService`](lanes_core::traits::ExecutorService)
//! - Workers whose outstanding tasks are cancelled together on shutdown
//! - Cancellation tokens that interrupt running tasks from other threads
//! - A bundled thread pool with cancellable, interruptible jobs
//!
//! ## Interruption
//!
//! Cancellation of a running task is cooperative. Task bodies that block for
//! long periods should wait through [`sync::interrupt::sleep`] or
//! [`sync::interrupt::park_timeout`], or poll [`sync::interrupt::is_interrupted`].

/// Bundled thread pool executor
pub mod pool;

/// Scheduler, workers and task handles
pub mod scheduler;

/// Atomic bookkeeping and thread interruption
pub mod sync;

// Re-export key types for easier access
pub use pool::thread::{ThreadPool, ThreadPoolConfig, ThreadPoolError};
pub use scheduler::{ExecutorScheduler, ExecutorWorker, TaskHandle, TaskState};
pub use sync::interrupt::Interrupted;
