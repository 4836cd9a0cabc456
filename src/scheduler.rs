//! The scheduler façade: lifecycle, submission, cancellation, and the
//! tick-driven drain.

use crate::backoff::IdleBackoff;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::handle::CompletionHandle;
use crate::queue::{DelayQueue, PriorityQueueSet};
use crate::task::{Job, JobOutcome, Priority, TaskId, TaskResult};
use crate::worker::Worker;
use futures::Future;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Aggregate execution counters shared by workers and the tick drain.
pub(crate) struct Stats {
    pending: AtomicU64,
    executed: AtomicU64,
    failed: AtomicU64,
    panicked: AtomicU64,
    canceled: AtomicU64,
}

impl Stats {
    fn new() -> Self {
        Self {
            pending: AtomicU64::new(0),
            executed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
            canceled: AtomicU64::new(0),
        }
    }

    pub(crate) fn task_queued(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, outcome: JobOutcome) {
        self.pending.fetch_sub(1, Ordering::Relaxed);
        self.executed.fetch_add(1, Ordering::Relaxed);
        match outcome {
            JobOutcome::Succeeded => {}
            JobOutcome::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            JobOutcome::Panicked => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.panicked.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn record_canceled(&self, count: u64) {
        self.pending.fetch_sub(count, Ordering::Relaxed);
        self.canceled.fetch_add(count, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pending: self.pending.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the scheduler's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Tasks queued (immediate or delayed) and not yet run or canceled.
    pub pending: u64,
    /// Tasks run to completion, whatever their outcome.
    pub executed: u64,
    /// Tasks that resolved with an error, panics included.
    pub failed: u64,
    /// Subset of `failed` that panicked.
    pub panicked: u64,
    /// Tasks discarded before any worker claimed them.
    pub canceled: u64,
}

struct WorkerHandle {
    thread: Option<JoinHandle<()>>,
    unparker: thread::Thread,
}

/// Priority-based asynchronous task scheduler.
///
/// Construction allocates the queue set but spawns nothing; [`start`]
/// brings up the worker pool. Lifecycle is forward-only:
/// created → running → stopped, and a stopped scheduler is terminal —
/// obtain a fresh instance rather than restarting one.
///
/// Submission after [`stop`] is rejected with [`Error::Stopped`] rather
/// than silently queued into a pool that will never drain.
///
/// [`start`]: Scheduler::start
/// [`stop`]: Scheduler::stop
pub struct Scheduler {
    config: Config,
    queues: Arc<PriorityQueueSet>,
    delayed: Arc<DelayQueue>,
    shutdown: Arc<AtomicBool>,
    state: AtomicU8,
    workers: Mutex<Vec<WorkerHandle>>,
    stats: Arc<Stats>,
}

impl Scheduler {
    /// Validate the configuration and allocate an idle scheduler.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            queues: Arc::new(PriorityQueueSet::new()),
            delayed: Arc::new(DelayQueue::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            state: AtomicU8::new(STATE_CREATED),
            workers: Mutex::new(Vec::new()),
            stats: Arc::new(Stats::new()),
        })
    }

    /// Spawn the worker pool. No-op when already running; an error once
    /// stopped.
    pub fn start(&self) -> Result<()> {
        match self.state.compare_exchange(
            STATE_CREATED,
            STATE_RUNNING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(STATE_RUNNING) => return Ok(()),
            Err(_) => return Err(Error::Stopped),
        }

        let count = self.config.worker_threads();
        for id in 0..count {
            if let Err(err) = self.spawn_worker(id) {
                self.state.store(STATE_STOPPED, Ordering::Release);
                self.halt_workers();
                return Err(err);
            }
        }

        tracing::info!(workers = count, "scheduler started");
        Ok(())
    }

    fn spawn_worker(&self, id: usize) -> Result<()> {
        let worker = Worker::new(
            id,
            self.queues.clone(),
            self.delayed.clone(),
            self.shutdown.clone(),
            self.stats.clone(),
            IdleBackoff::new(self.config.idle_min_delay, self.config.idle_max_delay),
        );

        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.config.thread_name_prefix, id));
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let handle = builder.spawn(move || worker.run())?;
        let unparker = handle.thread().clone();
        self.workers.lock().push(WorkerHandle {
            thread: Some(handle),
            unparker,
        });
        Ok(())
    }

    /// Queue a future at the given priority and return a handle to its
    /// eventual outcome. Returns immediately; the caller decides whether to
    /// wait on the handle. Accepted before [`start`](Scheduler::start) too —
    /// queued work sits until workers come up or [`run_one`](Scheduler::run_one)
    /// drains it.
    pub fn submit<F>(&self, priority: Priority, fut: F) -> Result<CompletionHandle>
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        self.check_accepting()?;

        let id = TaskId::next();
        let (tx, handle) = CompletionHandle::channel(id);
        let job = Job::new(id, priority, Box::pin(fut), tx);

        self.stats.task_queued();
        self.queues.enqueue(job);

        // A stop that raced in between the state check and the enqueue has
        // already drained the queues; discard the straggler too.
        if self.state.load(Ordering::Acquire) == STATE_STOPPED {
            self.cancel_all();
            return Err(Error::Stopped);
        }

        tracing::trace!(task = %id, %priority, "task submitted");
        self.wake_workers();

        Ok(handle)
    }

    /// Queue a synchronous closure at the given priority.
    pub fn submit_fn<F>(&self, priority: Priority, f: F) -> Result<CompletionHandle>
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        self.submit(priority, async move { f() })
    }

    /// Queue a future that becomes eligible to run only after `delay`.
    ///
    /// Promotion happens on worker scans (and [`run_one`](Scheduler::run_one)
    /// calls), so actual start may lag the due time by up to the idle-backoff
    /// cap.
    pub fn submit_after<F>(
        &self,
        priority: Priority,
        delay: Duration,
        fut: F,
    ) -> Result<CompletionHandle>
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        self.check_accepting()?;

        let id = TaskId::next();
        let (tx, handle) = CompletionHandle::channel(id);
        let job = Job::new(id, priority, Box::pin(fut), tx);

        self.stats.task_queued();
        self.delayed.push(Instant::now() + delay, job);

        if self.state.load(Ordering::Acquire) == STATE_STOPPED {
            self.cancel_all();
            return Err(Error::Stopped);
        }

        tracing::trace!(task = %id, %priority, delay_ms = delay.as_millis() as u64, "delayed task submitted");

        Ok(handle)
    }

    fn check_accepting(&self) -> Result<()> {
        if self.state.load(Ordering::Acquire) == STATE_STOPPED {
            return Err(Error::Stopped);
        }
        Ok(())
    }

    /// Discard every queued task, immediate and delayed. Tasks a worker has
    /// already claimed run to completion; cancellation stops pending work,
    /// it does not preempt running work. Each discarded task's handle
    /// resolves as [`crate::task::TaskError::Canceled`]. Idempotent; returns
    /// the number of tasks discarded.
    pub fn cancel_all(&self) -> usize {
        let mut drained = self.queues.clear();
        drained.extend(self.delayed.clear());

        let count = drained.len();
        if count > 0 {
            self.stats.record_canceled(count as u64);
            tracing::debug!(count, "pending tasks canceled");
        }

        // Dropping the jobs drops their completion senders, which resolves
        // the matching handles as canceled.
        drop(drained);
        count
    }

    /// Drain at most one ready task inline on the calling thread.
    ///
    /// This is the tick-synchronous variant: an external frame or timer
    /// source may call it instead of (or alongside) the worker pool. Safe to
    /// race with running workers; the queue set's atomic pop keeps every job
    /// exactly-once. Returns whether a task was run.
    pub fn run_one(&self) -> bool {
        if self.state.load(Ordering::Acquire) == STATE_STOPPED {
            return false;
        }

        for job in self.delayed.pop_due(Instant::now()) {
            self.queues.enqueue(job);
        }

        match self.queues.try_dequeue_highest() {
            Some(job) => {
                let outcome = job.run();
                self.stats.record_outcome(outcome);
                true
            }
            None => false,
        }
    }

    /// Signal workers to exit after their current scan, join them, and
    /// discard remaining queued work. No-op before [`start`](Scheduler::start);
    /// idempotent afterwards.
    pub fn stop(&self) {
        if self
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        self.halt_workers();
        tracing::info!("scheduler stopped");
    }

    fn halt_workers(&self) {
        self.shutdown.store(true, Ordering::Release);

        let workers: Vec<WorkerHandle> = std::mem::take(&mut *self.workers.lock());
        for worker in &workers {
            worker.unparker.unpark();
        }
        for mut worker in workers {
            if let Some(handle) = worker.thread.take() {
                let _ = handle.join();
            }
        }

        self.cancel_all();
    }

    fn wake_workers(&self) {
        for worker in self.workers.lock().iter() {
            worker.unparker.unpark();
        }
    }

    /// Whether the worker pool is up.
    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_RUNNING
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Advisory count of tasks queued and not yet run or canceled.
    pub fn pending_tasks(&self) -> u64 {
        self.stats.snapshot().pending
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state.load(Ordering::Relaxed))
            .field("queued", &self.queues.len())
            .field("delayed", &self.delayed.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_scheduler() -> Scheduler {
        Scheduler::new(Config::builder().num_workers(1).build().unwrap()).unwrap()
    }

    #[test]
    fn start_is_idempotent_and_stop_is_terminal() {
        let scheduler = idle_scheduler();
        assert!(!scheduler.is_running());

        scheduler.start().unwrap();
        assert!(scheduler.is_running());
        scheduler.start().unwrap();

        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());
        assert!(matches!(scheduler.start(), Err(Error::Stopped)));
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let scheduler = idle_scheduler();
        scheduler.stop();
        // Still in the created state, so starting is permitted.
        scheduler.start().unwrap();
        scheduler.stop();
    }

    #[test]
    fn submit_after_stop_is_rejected() {
        let scheduler = idle_scheduler();
        scheduler.start().unwrap();
        scheduler.stop();

        let result = scheduler.submit(Priority::Normal, async { Ok(()) });
        assert!(matches!(result, Err(Error::Stopped)));
    }

    #[test]
    fn run_one_drains_without_workers() {
        let scheduler = idle_scheduler();
        let handle = scheduler
            .submit_fn(Priority::Normal, || Ok(()))
            .unwrap();

        assert!(scheduler.run_one());
        assert!(!scheduler.run_one());
        assert!(handle.wait().is_ok());
        assert_eq!(scheduler.stats().executed, 1);
        assert_eq!(scheduler.pending_tasks(), 0);
    }

    #[test]
    fn run_one_prefers_the_most_urgent_lane() {
        let scheduler = idle_scheduler();
        let low = scheduler.submit(Priority::Lowest, async { Ok(()) }).unwrap();
        let critical = scheduler
            .submit(Priority::Critical, async { Ok(()) })
            .unwrap();

        assert!(scheduler.run_one());
        assert!(critical.try_result().unwrap().is_ok());
        assert!(low.try_result().is_none());
    }

    #[test]
    fn cancel_all_resolves_handles_as_canceled() {
        let scheduler = idle_scheduler();
        let handle = scheduler.submit(Priority::High, async { Ok(()) }).unwrap();

        assert_eq!(scheduler.cancel_all(), 1);
        assert_eq!(scheduler.cancel_all(), 0);
        assert!(matches!(
            handle.wait(),
            Err(crate::task::TaskError::Canceled)
        ));
        assert_eq!(scheduler.pending_tasks(), 0);
        assert_eq!(scheduler.stats().canceled, 1);
    }

    #[test]
    fn delayed_task_not_promoted_before_due() {
        let scheduler = idle_scheduler();
        let handle = scheduler
            .submit_after(Priority::Normal, Duration::from_secs(60), async { Ok(()) })
            .unwrap();

        assert!(!scheduler.run_one());
        assert!(handle.try_result().is_none());
        assert_eq!(scheduler.pending_tasks(), 1);
    }
}
