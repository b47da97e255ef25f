//! Thread pool implementation for parallel execution.
//!
//! A fixed set of named worker threads pulls jobs from a bounded queue. Every
//! job carries a [`PoolFuture`], so a queued job can be cancelled before a
//! worker picks it up and a running one can be interrupted.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use lanes_core::error::{Error as LanesError, Result as LanesResult, SchedulingError};
use lanes_core::traits::{ExecutorService, Job, TaskFuture};
use log::{debug, error, info, trace};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::future::PoolFuture;
use crate::sync::atomic::AtomicCounter;
use crate::sync::interrupt;

/// Error when submitting a task to the thread pool
#[derive(Error, Debug)]
pub enum ThreadPoolError {
    /// The thread pool is shutting down
    #[error("thread pool is shutting down")]
    ShuttingDown,

    /// The task queue is full
    #[error("thread pool queue is full")]
    QueueFull,

    /// A worker thread could not be spawned
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(#[from] std::io::Error),
}

impl From<ThreadPoolError> for SchedulingError {
    fn from(err: ThreadPoolError) -> Self {
        match err {
            ThreadPoolError::ShuttingDown => SchedulingError::ShuttingDown,
            ThreadPoolError::QueueFull => SchedulingError::QueueFull,
            other => SchedulingError::Rejected(other.to_string()),
        }
    }
}

impl From<ThreadPoolError> for LanesError {
    fn from(err: ThreadPoolError) -> Self {
        LanesError::Scheduling(err.into())
    }
}

/// Statistics about the thread pool
#[derive(Debug, Default, Clone)]
pub struct ThreadPoolStats {
    /// Number of tasks queued
    pub tasks_queued: usize,

    /// Number of tasks completed
    pub tasks_completed: usize,

    /// Number of tasks that panicked
    pub tasks_panicked: usize,

    /// Number of tasks cancelled before a worker picked them up
    pub tasks_skipped: usize,

    /// Total task execution time (microseconds)
    pub total_execution_time_us: u64,

    /// Queue wait time (microseconds)
    pub total_queue_time_us: u64,

    /// Maximum task execution time (microseconds)
    pub max_execution_time_us: u64,
}

/// Configuration for the thread pool
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Maximum size of the task queue
    pub queue_size: usize,

    /// Number of worker threads
    pub max_threads: usize,

    /// Name prefix for worker threads
    pub thread_name_prefix: String,

    /// Whether to collect performance statistics
    pub collect_stats: bool,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            queue_size: 1000,
            max_threads: num_cpus::get(),
            thread_name_prefix: "lanes-worker".to_string(),
            collect_stats: true,
        }
    }
}

/// Queued job with metadata for tracking
struct Task {
    /// The closure to execute
    func: Job,

    /// Cancellation state shared with the submitter
    future: Arc<PoolFuture>,

    /// When the task was enqueued
    enqueued_at: Instant,
}

/// Statistics counters shared between the pool and its workers
#[derive(Debug, Default)]
struct PoolCounters {
    tasks_queued: AtomicCounter,
    tasks_completed: AtomicCounter,
    tasks_panicked: AtomicCounter,
    tasks_skipped: AtomicCounter,
    total_execution_time_us: AtomicCounter,
    total_queue_time_us: AtomicCounter,
    max_execution_time_us: AtomicCounter,
}

/// Worker context holding shared state for the worker loop
struct WorkerContext {
    receiver: Receiver<Task>,
    shutdown_flag: Arc<AtomicBool>,
    collect_stats: bool,
    counters: Arc<PoolCounters>,
}

/// A generic thread pool for executing tasks
pub struct ThreadPool {
    /// Channel for sending tasks to worker threads
    task_sender: Sender<Task>,

    /// Worker threads
    workers: Vec<JoinHandle<()>>,

    /// Flag indicating if the pool is shutting down
    is_shutting_down: Arc<AtomicBool>,

    /// Statistics counters
    counters: Arc<PoolCounters>,

    /// Configuration
    config: ThreadPoolConfig,
}

impl ThreadPool {
    /// Create a new thread pool with the given number of threads
    pub fn new(threads: usize) -> Result<Self, ThreadPoolError> {
        let config = ThreadPoolConfig {
            max_threads: threads,
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Create a new thread pool with the specified configuration
    pub fn with_config(config: ThreadPoolConfig) -> Result<Self, ThreadPoolError> {
        let (task_sender, task_receiver) = bounded(config.queue_size);
        let is_shutting_down = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(PoolCounters::default());

        info!(
            "Creating thread pool with {} workers and queue size {}",
            config.max_threads, config.queue_size
        );

        let mut workers = Vec::with_capacity(config.max_threads);

        for id in 0..config.max_threads {
            let ctx = WorkerContext {
                receiver: task_receiver.clone(),
                shutdown_flag: Arc::clone(&is_shutting_down),
                collect_stats: config.collect_stats,
                counters: Arc::clone(&counters),
            };

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name_prefix, id))
                .spawn(move || Self::worker_loop(id, ctx));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    error!("Failed to spawn worker thread {}: {}", id, e);
                    // Stop the workers that did start
                    is_shutting_down.store(true, Ordering::Relaxed);
                    return Err(e.into());
                }
            }
        }

        Ok(Self {
            task_sender,
            workers,
            is_shutting_down,
            counters,
            config,
        })
    }

    /// Worker thread main loop
    fn worker_loop(id: usize, ctx: WorkerContext) {
        debug!("Worker {}: Starting", id);

        while !ctx.shutdown_flag.load(Ordering::Relaxed) {
            // Wait for a task or check shutdown flag every 100ms
            let task = match ctx.receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(task) => task,
                Err(_) => continue,
            };

            // An interrupt aimed at the previous task must not leak into this one
            interrupt::interrupted();

            if !task.future.try_start() {
                trace!("Worker {}: Skipping cancelled task", id);
                if ctx.collect_stats {
                    ctx.counters.tasks_skipped.increment();
                }
                continue;
            }

            let queue_time = task.enqueued_at.elapsed();
            trace!(
                "Worker {}: Executing task (queue time: {:.2}ms)",
                id,
                queue_time.as_micros() as f64 / 1000.0
            );

            let exec_start = Instant::now();
            let func = task.func;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(func));
            let exec_time = exec_start.elapsed();

            task.future.complete();
            // A canceller may still be about to raise the flag for this job
            task.future.wait_for_interrupt();

            if ctx.collect_stats {
                let exec_time_us = exec_time.as_micros() as usize;
                ctx.counters
                    .total_queue_time_us
                    .add(queue_time.as_micros() as usize);
                ctx.counters.total_execution_time_us.add(exec_time_us);
                ctx.counters.max_execution_time_us.update_max(exec_time_us);
            }

            match result {
                Ok(()) => {
                    trace!(
                        "Worker {}: Task completed in {:.2}ms",
                        id,
                        exec_time.as_micros() as f64 / 1000.0
                    );

                    if ctx.collect_stats {
                        ctx.counters.tasks_completed.increment();
                    }
                }
                Err(e) => {
                    error!(
                        "Worker {}: Task panicked: {}",
                        id,
                        lanes_core::hooks::panic_message(e.as_ref())
                    );

                    if ctx.collect_stats {
                        ctx.counters.tasks_panicked.increment();
                    }
                }
            }
        }

        debug!("Worker {}: Shutting down", id);
    }

    /// Submit a job and get a handle that can cancel it
    pub fn submit_job(&self, func: Job) -> Result<Arc<PoolFuture>, ThreadPoolError> {
        if self.is_shutting_down.load(Ordering::Relaxed) {
            return Err(ThreadPoolError::ShuttingDown);
        }

        let future = Arc::new(PoolFuture::new());
        let task = Task {
            func,
            future: Arc::clone(&future),
            enqueued_at: Instant::now(),
        };

        match self.task_sender.try_send(task) {
            Ok(()) => {
                if self.config.collect_stats {
                    self.counters.tasks_queued.increment();
                }
                Ok(future)
            }
            Err(TrySendError::Full(_)) => Err(ThreadPoolError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(ThreadPoolError::ShuttingDown),
        }
    }

    /// Get current statistics for the thread pool
    pub fn get_stats(&self) -> ThreadPoolStats {
        if !self.config.collect_stats {
            return ThreadPoolStats::default();
        }

        let c = &self.counters;
        ThreadPoolStats {
            tasks_queued: c.tasks_queued.get(),
            tasks_completed: c.tasks_completed.get(),
            tasks_panicked: c.tasks_panicked.get(),
            tasks_skipped: c.tasks_skipped.get(),
            total_execution_time_us: c.total_execution_time_us.get() as u64,
            total_queue_time_us: c.total_queue_time_us.get() as u64,
            max_execution_time_us: c.max_execution_time_us.get() as u64,
        }
    }

    /// Stop accepting work. Workers exit once they next check the flag.
    pub fn shutdown(&self) {
        if !self.is_shutting_down.swap(true, Ordering::Relaxed) {
            info!("Shutting down thread pool");
        }
    }

    /// Shut down the thread pool and wait for workers to finish
    pub fn shutdown_and_join(mut self) {
        self.shutdown();

        for worker in self.workers.drain(..) {
            worker.join().unwrap_or_else(|e| {
                error!("Worker thread panicked during shutdown: {:?}", e);
            });
        }

        info!("Thread pool shutdown complete");
    }

    /// Get the number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Check if the thread pool is shutting down
    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Relaxed)
    }
}

impl ExecutorService for ThreadPool {
    fn submit(&self, job: Job) -> LanesResult<Arc<dyn TaskFuture>> {
        let future = self.submit_job(job)?;
        Ok(future)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
        debug!("Thread pool dropped - workers will exit when they next check the shutdown flag");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::future::FutureState;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    fn submit<F>(pool: &ThreadPool, f: F) -> Result<Arc<PoolFuture>, ThreadPoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        pool.submit_job(Box::new(f))
    }

    fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_thread_pool_basic() {
        let pool = ThreadPool::new(4).unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        submit(&pool, move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(wait_until(Duration::from_secs(2), || counter
            .load(Ordering::SeqCst)
            == 1));
        assert_eq!(pool.worker_count(), 4);
    }

    #[test]
    fn test_thread_pool_multiple_tasks() {
        let pool = ThreadPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = counter.clone();
            submit(&pool, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
            })
            .unwrap();
        }

        assert!(wait_until(Duration::from_secs(2), || counter
            .load(Ordering::SeqCst)
            == 10));
    }

    #[test]
    fn test_thread_pool_panic_handling() {
        let pool = ThreadPool::new(1).unwrap();

        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = flag.clone();

        // Task 1: Panics
        submit(&pool, || {
            panic!("This task should panic");
        })
        .unwrap();

        // Task 2: Should still run
        submit(&pool, move || {
            flag_clone.store(true, Ordering::SeqCst);
        })
        .unwrap();

        assert!(wait_until(Duration::from_secs(2), || flag.load(Ordering::SeqCst)));
        assert!(wait_until(Duration::from_secs(2), || pool
            .get_stats()
            .tasks_panicked
            == 1));
    }

    #[test]
    fn test_thread_pool_shutdown() {
        let pool = ThreadPool::new(2).unwrap();
        let barrier = Arc::new(Mutex::new(()));
        let lock = barrier.lock().unwrap();

        let barrier_clone = barrier.clone();
        submit(&pool, move || {
            // This task will block until we release the barrier
            let _lock = barrier_clone.lock().unwrap();
        })
        .unwrap();

        pool.shutdown();
        assert!(pool.is_shutting_down());

        let result = submit(&pool, || {});
        assert!(matches!(result, Err(ThreadPoolError::ShuttingDown)));

        let err: LanesError = result.unwrap_err().into();
        assert!(matches!(
            err,
            LanesError::Scheduling(SchedulingError::ShuttingDown)
        ));

        drop(lock);
    }

    #[test]
    fn test_thread_pool_stats() {
        let pool = ThreadPool::new(1).unwrap();

        for _ in 0..5 {
            submit(&pool, || {
                thread::sleep(Duration::from_millis(10));
            })
            .unwrap();
        }

        submit(&pool, || {
            panic!("This task should panic");
        })
        .unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            let stats = pool.get_stats();
            stats.tasks_completed + stats.tasks_panicked == 6
        }));

        let stats = pool.get_stats();
        assert_eq!(stats.tasks_queued, 6);
        assert_eq!(stats.tasks_completed, 5);
        assert_eq!(stats.tasks_panicked, 1);
        assert!(stats.total_execution_time_us > 0);
        assert!(stats.max_execution_time_us > 0);
    }

    #[test]
    fn test_thread_pool_queue_full() {
        let config = ThreadPoolConfig {
            queue_size: 1,
            max_threads: 1,
            thread_name_prefix: "test".to_string(),
            collect_stats: true,
        };

        let pool = ThreadPool::with_config(config).unwrap();

        let started = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Mutex::new(()));
        let lock = barrier.lock().unwrap();

        let started_clone = started.clone();
        let barrier_clone = barrier.clone();
        submit(&pool, move || {
            started_clone.store(true, Ordering::SeqCst);
            let _lock = barrier_clone.lock().unwrap();
        })
        .unwrap();

        assert!(wait_until(Duration::from_secs(2), || started
            .load(Ordering::SeqCst)));

        // Fill the queue
        submit(&pool, || {}).unwrap();

        let result = submit(&pool, || {});
        assert!(matches!(result, Err(ThreadPoolError::QueueFull)));

        let err: SchedulingError = ThreadPoolError::QueueFull.into();
        assert!(matches!(err, SchedulingError::QueueFull));

        drop(lock);
    }

    #[test]
    fn test_cancelled_job_is_skipped() {
        let pool = ThreadPool::new(1).unwrap();

        let started = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Mutex::new(()));
        let lock = barrier.lock().unwrap();

        let started_clone = started.clone();
        let barrier_clone = barrier.clone();
        submit(&pool, move || {
            started_clone.store(true, Ordering::SeqCst);
            let _lock = barrier_clone.lock().unwrap();
        })
        .unwrap();
        assert!(wait_until(Duration::from_secs(2), || started
            .load(Ordering::SeqCst)));

        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let future = pool
            .submit_job(Box::new(move || ran_clone.store(true, Ordering::SeqCst)))
            .unwrap();

        assert!(future.cancel(false));
        drop(lock);

        assert!(wait_until(Duration::from_secs(2), || pool
            .get_stats()
            .tasks_skipped
            == 1));
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(future.state(), FutureState::Cancelled);
    }

    #[test]
    fn test_running_job_observes_interrupt() {
        let pool = ThreadPool::new(1).unwrap();
        let interrupted = Arc::new(AtomicBool::new(false));
        let interrupted_clone = interrupted.clone();

        let future = pool
            .submit(Box::new(move || {
                if interrupt::sleep(Duration::from_secs(10)).is_err() {
                    interrupted_clone.store(true, Ordering::SeqCst);
                }
            }))
            .unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(future.cancel(true));

        assert!(wait_until(Duration::from_secs(2), || interrupted
            .load(Ordering::SeqCst)));
        assert!(future.is_cancelled());
    }

    #[test]
    fn test_interrupt_does_not_leak_into_next_job() {
        let pool = ThreadPool::new(1).unwrap();

        for _ in 0..20 {
            let started = Arc::new(AtomicBool::new(false));
            let started_clone = started.clone();
            let first = submit(&pool, move || {
                started_clone.store(true, Ordering::SeqCst);
                let _ = interrupt::sleep(Duration::from_secs(10));
            })
            .unwrap();

            let leaked = Arc::new(AtomicBool::new(true));
            let leaked_clone = leaked.clone();
            let second = submit(&pool, move || {
                leaked_clone.store(interrupt::is_interrupted(), Ordering::SeqCst);
            })
            .unwrap();

            assert!(wait_until(Duration::from_secs(2), || started
                .load(Ordering::SeqCst)));
            assert!(first.cancel(true));

            assert!(wait_until(Duration::from_secs(2), || second.is_done()));
            assert!(!leaked.load(Ordering::SeqCst));
        }
    }

    #[test]
    fn test_shutdown_and_join() {
        let pool = ThreadPool::new(2).unwrap();
        submit(&pool, || {}).unwrap();

        let start = Instant::now();
        pool.shutdown_and_join();
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
