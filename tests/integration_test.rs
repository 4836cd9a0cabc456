use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taskmill::{Config, Priority, Scheduler, TaskError};

fn single_worker() -> Scheduler {
    let config = Config::builder()
        .num_workers(1)
        .idle_min_delay(Duration::from_millis(1))
        .idle_max_delay(Duration::from_millis(20))
        .build()
        .unwrap();
    Scheduler::new(config).unwrap()
}

/// Poll until `cond` holds, panicking after a generous deadline. Stats are
/// recorded just after a handle resolves, so assertions on counters need a
/// grace period.
fn wait_for<F: Fn() -> bool>(cond: F, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn priority_order_with_late_started_worker() {
    let scheduler = single_worker();
    let order = Arc::new(Mutex::new(Vec::new()));

    // Submit in reverse-urgency order while no worker is running yet.
    let mut handles = Vec::new();
    for (priority, label) in [
        (Priority::Lowest, "lowest"),
        (Priority::Normal, "normal"),
        (Priority::Critical, "critical"),
    ] {
        let order = order.clone();
        handles.push(
            scheduler
                .submit_fn(priority, move || {
                    order.lock().push(label);
                    Ok(())
                })
                .unwrap(),
        );
    }

    scheduler.start().unwrap();
    for handle in handles {
        assert!(handle.wait().is_ok());
    }

    assert_eq!(*order.lock(), vec!["critical", "normal", "lowest"]);
    scheduler.stop();
}

#[test]
fn fifo_within_one_level() {
    let scheduler = single_worker();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for label in ["a", "b", "c"] {
        let order = order.clone();
        handles.push(
            scheduler
                .submit_fn(Priority::Normal, move || {
                    order.lock().push(label);
                    Ok(())
                })
                .unwrap(),
        );
    }

    scheduler.start().unwrap();
    for handle in handles {
        assert!(handle.wait().is_ok());
    }

    assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    scheduler.stop();
}

#[test]
fn failing_task_does_not_poison_the_worker() {
    let scheduler = single_worker();
    scheduler.start().unwrap();

    let failing = scheduler
        .submit_fn(Priority::Normal, || Err(TaskError::failed("expected")))
        .unwrap();
    let following = scheduler.submit_fn(Priority::Normal, || Ok(())).unwrap();

    assert!(matches!(failing.wait(), Err(TaskError::Failed(_))));
    assert!(following.wait().is_ok());

    wait_for(|| scheduler.stats().failed == 1, "failure counter");
    assert_eq!(scheduler.stats().panicked, 0);
    scheduler.stop();
}

#[test]
fn panicking_task_does_not_poison_the_worker() {
    let scheduler = single_worker();
    scheduler.start().unwrap();

    let panicking = scheduler
        .submit(Priority::Normal, async { panic!("kaboom") })
        .unwrap();
    let following = scheduler.submit_fn(Priority::Normal, || Ok(())).unwrap();

    match panicking.wait() {
        Err(TaskError::Panicked(msg)) => assert_eq!(msg, "kaboom"),
        other => panic!("unexpected resolution: {other:?}"),
    }
    assert!(following.wait().is_ok());

    wait_for(|| scheduler.stats().panicked == 1, "panic counter");
    scheduler.stop();
}

#[test]
fn cancel_all_before_any_worker_claims() {
    let scheduler = single_worker();
    let executed = Arc::new(AtomicUsize::new(0));

    let executed_in_task = executed.clone();
    let handle = scheduler
        .submit_fn(Priority::Critical, move || {
            executed_in_task.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    assert_eq!(scheduler.cancel_all(), 1);
    assert!(matches!(handle.wait(), Err(TaskError::Canceled)));

    // Starting afterwards finds nothing to run.
    scheduler.start().unwrap();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.pending_tasks(), 0);
    scheduler.stop();
}

#[test]
fn post_stop_submission_is_rejected() {
    let scheduler = single_worker();
    scheduler.start().unwrap();
    scheduler.stop();
    scheduler.stop();

    assert!(matches!(
        scheduler.submit(Priority::Normal, async { Ok(()) }),
        Err(taskmill::Error::Stopped)
    ));
    assert!(matches!(
        scheduler.submit_after(Priority::Normal, Duration::from_millis(1), async { Ok(()) }),
        Err(taskmill::Error::Stopped)
    ));
}

#[test]
fn async_task_with_internal_suspension_completes() {
    let scheduler = single_worker();
    scheduler.start().unwrap();

    let handle = scheduler
        .submit(Priority::High, async {
            futures::future::ready(()).await;
            Ok(())
        })
        .unwrap();

    assert!(futures::executor::block_on(handle.join()).is_ok());
    scheduler.stop();
}

#[test]
fn delayed_task_runs_only_after_its_delay() {
    let scheduler = single_worker();
    scheduler.start().unwrap();

    let started = Instant::now();
    let delay = Duration::from_millis(60);
    let handle = scheduler
        .submit_after(Priority::Normal, delay, async { Ok(()) })
        .unwrap();

    assert!(handle.try_result().is_none());
    assert!(handle.wait().is_ok());
    assert!(started.elapsed() >= delay);
    scheduler.stop();
}

#[test]
fn run_one_serves_an_external_tick_source() {
    let scheduler = single_worker();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let counter = counter.clone();
        scheduler
            .submit_fn(Priority::Normal, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
    }

    // One ready task per tick, never more.
    assert!(scheduler.run_one());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(scheduler.run_one());
    assert!(scheduler.run_one());
    assert!(!scheduler.run_one());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}
