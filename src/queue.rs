//! Concurrency-safe queue structures shared by workers.
//!
//! `PriorityQueueSet` holds one FIFO lane per declared priority level;
//! `DelayQueue` parks delayed submissions until they come due.

use crate::task::{Job, Priority};
use parking_lot::Mutex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// One FIFO lane per priority level, allocated once and never replaced.
///
/// All mutation goes through the per-lane mutexes; a lock is never held
/// across lanes or across user code, so a pop is atomic and exactly-once
/// under any number of racing workers.
pub(crate) struct PriorityQueueSet {
    lanes: [Mutex<VecDeque<Job>>; Priority::LEVELS],
}

impl PriorityQueueSet {
    pub(crate) fn new() -> Self {
        Self {
            lanes: std::array::from_fn(|_| Mutex::new(VecDeque::new())),
        }
    }

    /// Append a job to the tail of its priority lane.
    pub(crate) fn enqueue(&self, job: Job) {
        self.lanes[job.priority.index()].lock().push_back(job);
    }

    /// Scan lanes most-urgent-first and pop the head of the first non-empty
    /// one. Returns `None` when every lane was empty at the instant it was
    /// inspected.
    pub(crate) fn try_dequeue_highest(&self) -> Option<Job> {
        for priority in Priority::ALL {
            if let Some(job) = self.lanes[priority.index()].lock().pop_front() {
                return Some(job);
            }
        }
        None
    }

    /// Drain every lane, most-urgent-first, returning the removed jobs so
    /// the caller can account for them. Jobs already claimed by a worker are
    /// unaffected.
    pub(crate) fn clear(&self) -> Vec<Job> {
        let mut drained = Vec::new();
        for lane in &self.lanes {
            drained.extend(lane.lock().drain(..));
        }
        drained
    }

    /// Advisory snapshot of the total queued count.
    pub(crate) fn len(&self) -> usize {
        self.lanes.iter().map(|lane| lane.lock().len()).sum()
    }
}

struct DelayedJob {
    due: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for DelayedJob {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for DelayedJob {}

impl PartialOrd for DelayedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reversed so the BinaryHeap surfaces the soonest-due entry; ties
        // fall back to submission sequence for FIFO behavior.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Holding pen for delayed submissions, ordered by due time.
pub(crate) struct DelayQueue {
    heap: Mutex<BinaryHeap<DelayedJob>>,
    seq: AtomicU64,
}

impl DelayQueue {
    pub(crate) fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn push(&self, due: Instant, job: Job) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.heap.lock().push(DelayedJob { due, seq, job });
    }

    /// Remove and return every job whose due time has passed.
    pub(crate) fn pop_due(&self, now: Instant) -> Vec<Job> {
        let mut heap = self.heap.lock();
        let mut due = Vec::new();
        while heap.peek().is_some_and(|entry| entry.due <= now) {
            due.push(heap.pop().expect("peeked entry present").job);
        }
        due
    }

    pub(crate) fn clear(&self) -> Vec<Job> {
        self.heap.lock().drain().map(|entry| entry.job).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.lock().len()
    }
}
