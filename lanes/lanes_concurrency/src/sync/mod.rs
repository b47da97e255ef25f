//! Synchronization primitives.
//!
//! - Atomic counters and sequences for lock-free bookkeeping
//! - Cooperative interruption of pool threads

pub mod atomic;
pub mod interrupt;

// Re-export key types from atomic
pub use atomic::{AtomicCounter, AtomicSequence};

// Re-export key types from interrupt
pub use interrupt::{Interrupted, Interrupter};
