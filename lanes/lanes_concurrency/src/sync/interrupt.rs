//! Cooperative thread interruption.
//!
//! Rust threads cannot be stopped from the outside, so cancelling a running
//! task only raises a per-thread interrupt flag and unparks the thread. Task
//! bodies that may block for long should poll [`is_interrupted`] or wait
//! through [`park_timeout`] / [`sleep`], which return early with
//! [`Interrupted`] once the flag is raised.
//!
//! Every thread also gets a process-unique numeric identity, used to tell
//! whether a cancellation request comes from the thread that is running the
//! task being cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::atomic::AtomicSequence;

/// Identity of "no thread". Never handed out by [`current_id`].
pub const NO_THREAD: u64 = 0;

static THREAD_IDS: AtomicSequence = AtomicSequence::new(NO_THREAD + 1);

thread_local! {
    static CURRENT: Arc<Interrupter> = Arc::new(Interrupter::for_current_thread());
}

/// Returned by blocking helpers when the waiting thread was interrupted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("thread was interrupted")]
pub struct Interrupted;

/// Interrupt state of one thread.
#[derive(Debug)]
pub struct Interrupter {
    id: u64,
    flag: AtomicBool,
    thread: Thread,
}

impl Interrupter {
    fn for_current_thread() -> Self {
        Self {
            id: THREAD_IDS.next(),
            flag: AtomicBool::new(false),
            thread: thread::current(),
        }
    }

    /// Process-unique identity of the thread.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raise the interrupt flag and wake the thread if it is parked.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.thread.unpark();
    }

    /// Whether the flag is raised. Does not clear it.
    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

/// The interrupter of the calling thread.
pub fn current() -> Arc<Interrupter> {
    CURRENT.with(Arc::clone)
}

/// Process-unique identity of the calling thread.
pub fn current_id() -> u64 {
    CURRENT.with(|i| i.id)
}

/// Whether the calling thread has been interrupted. Does not clear the flag.
pub fn is_interrupted() -> bool {
    CURRENT.with(|i| i.is_interrupted())
}

/// Test and clear the calling thread's interrupt flag.
pub fn interrupted() -> bool {
    CURRENT.with(|i| i.take())
}

/// Park the calling thread for at most `timeout`.
///
/// Returns `Err(Interrupted)` and clears the flag if the thread is
/// interrupted before or during the wait. Spurious wakeups return `Ok(())`.
pub fn park_timeout(timeout: Duration) -> Result<(), Interrupted> {
    if interrupted() {
        return Err(Interrupted);
    }

    thread::park_timeout(timeout);

    if interrupted() {
        Err(Interrupted)
    } else {
        Ok(())
    }
}

/// Sleep for `duration` unless interrupted first.
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    let deadline = Instant::now() + duration;

    loop {
        let now = Instant::now();
        if now >= deadline {
            return if interrupted() { Err(Interrupted) } else { Ok(()) };
        }
        park_timeout(deadline - now)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_ids_are_unique_and_stable() {
        let here = current_id();
        assert_ne!(here, NO_THREAD);
        assert_eq!(here, current_id());
        assert_eq!(current().id(), here);

        let there = thread::spawn(current_id).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_interrupted_clears_flag() {
        current().interrupt();
        assert!(is_interrupted());
        assert!(interrupted());
        assert!(!is_interrupted());
        assert!(!interrupted());
    }

    #[test]
    fn test_park_timeout_returns_early_on_interrupt() {
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            tx.send(current()).unwrap();
            let start = Instant::now();
            let result = sleep(Duration::from_secs(10));
            (result, start.elapsed())
        });

        let interrupter = rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        interrupter.interrupt();

        let (result, elapsed) = handle.join().unwrap();
        assert_eq!(result, Err(Interrupted));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_sleep_completes_without_interrupt() {
        let start = Instant::now();
        assert_eq!(sleep(Duration::from_millis(20)), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_pending_interrupt_fails_fast() {
        current().interrupt();
        assert_eq!(park_timeout(Duration::from_secs(10)), Err(Interrupted));
        assert!(!is_interrupted());
    }
}
