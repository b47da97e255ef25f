use lanes_concurrency::{ExecutorScheduler, ThreadPool};
use lanes_core::hooks::{self, DroppedError};
use lanes_core::traits::{Scheduler, Worker};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Single test: the process-wide sink is shared by everything in this binary
#[test]
fn test_panics_reach_global_sink() {
    let seen = Arc::new(Mutex::new(Vec::<DroppedError>::new()));
    let seen_clone = seen.clone();
    hooks::set_error_sink(Arc::new(move |e: &DroppedError| {
        seen_clone.lock().push(e.clone())
    }));

    let pool = Arc::new(ThreadPool::new(2).unwrap());
    let scheduler = ExecutorScheduler::new(pool.clone());
    let worker = scheduler.create_worker();

    let one_off = scheduler.schedule(|| panic!("one-off failed")).unwrap();
    let grouped = worker.schedule(|| panic!("grouped failed")).unwrap();

    let start = Instant::now();
    while seen.lock().len() < 2 && start.elapsed() < Duration::from_secs(2) {
        thread::sleep(Duration::from_millis(5));
    }

    {
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);

        let one_off_error = seen.iter().find(|e| e.task_id == one_off.id()).unwrap();
        assert_eq!(one_off_error.message, "one-off failed");
        assert_eq!(one_off_error.worker_id, None);

        let grouped_error = seen.iter().find(|e| e.task_id == grouped.id()).unwrap();
        assert_eq!(grouped_error.message, "grouped failed");
        assert_eq!(grouped_error.worker_id, Some(worker.id()));
    }

    // A panicking sink is contained
    hooks::set_error_sink(Arc::new(|_: &DroppedError| panic!("sink failed")));
    let handle = scheduler.schedule(|| panic!("again")).unwrap();
    let start = Instant::now();
    while !handle.is_finished() && start.elapsed() < Duration::from_secs(2) {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(handle.is_finished());
    assert_eq!(pool.get_stats().tasks_panicked, 0);

    hooks::reset_error_sink();
}
