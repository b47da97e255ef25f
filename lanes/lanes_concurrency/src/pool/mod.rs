//! Bundled executor.
//!
//! A fixed-size thread pool whose jobs can be cancelled while queued and
//! interrupted while running. It implements
//! [`ExecutorService`](lanes_core::traits::ExecutorService), so it can back an
//! [`ExecutorScheduler`](crate::scheduler::ExecutorScheduler) directly.

pub mod future;
pub mod thread;

pub use future::{FutureState, PoolFuture};
pub use thread::{ThreadPool, ThreadPoolConfig, ThreadPoolError, ThreadPoolStats};
