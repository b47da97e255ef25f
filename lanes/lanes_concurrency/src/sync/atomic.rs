//! Atomic counters and sequences.
//!
//! Lock-free helpers used for pool statistics and for handing out
//! process-unique thread identities.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A counter that can be incremented and read atomically.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    /// The current value of the counter
    value: AtomicUsize,
}

impl AtomicCounter {
    /// Create a new atomic counter with an initial value.
    pub fn new(initial_value: usize) -> Self {
        Self {
            value: AtomicUsize::new(initial_value),
        }
    }

    /// Increment the counter and return the new value.
    pub fn increment(&self) -> usize {
        self.add(1)
    }

    /// Add `amount` to the counter and return the new value.
    pub fn add(&self, amount: usize) -> usize {
        self.value.fetch_add(amount, Ordering::Relaxed) + amount
    }

    /// Raise the counter to `candidate` if it is larger than the current value.
    ///
    /// Returns the value held after the call.
    pub fn update_max(&self, candidate: usize) -> usize {
        let mut current = self.value.load(Ordering::Relaxed);

        while candidate > current {
            match self.value.compare_exchange(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }

        current
    }

    /// Get the current value of the counter.
    pub fn get(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }
}

/// A sequence number that can be safely incremented across threads.
#[derive(Debug)]
pub struct AtomicSequence {
    /// The next value to hand out
    value: AtomicU64,
}

impl AtomicSequence {
    /// Create a new atomic sequence starting from the specified value.
    pub const fn new(start: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
        }
    }

    /// Get the next sequence number.
    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_atomic_counter() {
        let counter = AtomicCounter::new(5);

        assert_eq!(counter.get(), 5);
        assert_eq!(counter.increment(), 6);
        assert_eq!(counter.add(10), 16);
        assert_eq!(counter.get(), 16);
    }

    #[test]
    fn test_atomic_counter_threads() {
        let counter = Arc::new(AtomicCounter::default());
        let threads = 10;
        let increments_per_thread = 1000;

        let mut handles = vec![];

        for _ in 0..threads {
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..increments_per_thread {
                    counter.increment();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.get(), threads * increments_per_thread);
    }

    #[test]
    fn test_update_max() {
        let counter = AtomicCounter::new(10);

        assert_eq!(counter.update_max(5), 10);
        assert_eq!(counter.update_max(42), 42);
        assert_eq!(counter.get(), 42);
    }

    #[test]
    fn test_update_max_threads() {
        let counter = Arc::new(AtomicCounter::default());

        let handles: Vec<_> = (1..=8)
            .map(|n| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for i in 0..100 {
                        counter.update_max(n * 100 + i);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.get(), 899);
    }

    #[test]
    fn test_atomic_sequence() {
        let seq = AtomicSequence::new(100);

        assert_eq!(seq.next(), 100); // Returns old value
        assert_eq!(seq.next(), 101);
    }

    #[test]
    fn test_atomic_sequence_unique_across_threads() {
        let seq = Arc::new(AtomicSequence::new(1));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let seq = Arc::clone(&seq);
                thread::spawn(move || (0..250).map(|_| seq.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate sequence value {}", value);
            }
        }

        assert_eq!(seen.len(), 1000);
        assert_eq!(seq.next(), 1001);
    }
}
