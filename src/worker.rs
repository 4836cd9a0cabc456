//! Worker thread loop.

use crate::backoff::IdleBackoff;
use crate::queue::{DelayQueue, PriorityQueueSet};
use crate::scheduler::Stats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

pub(crate) type WorkerId = usize;

/// One long-lived execution unit draining the shared queue set.
///
/// Protocol per iteration: bail out if shutdown is signaled, promote due
/// delayed jobs, then either run the most urgent queued job or park for the
/// current backoff delay. A failing or panicking job never terminates the
/// loop; `Job::run` contains the fallout and the loop moves on.
pub(crate) struct Worker {
    id: WorkerId,
    queues: Arc<PriorityQueueSet>,
    delayed: Arc<DelayQueue>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<Stats>,
    backoff: IdleBackoff,
}

impl Worker {
    pub(crate) fn new(
        id: WorkerId,
        queues: Arc<PriorityQueueSet>,
        delayed: Arc<DelayQueue>,
        shutdown: Arc<AtomicBool>,
        stats: Arc<Stats>,
        backoff: IdleBackoff,
    ) -> Self {
        Self {
            id,
            queues,
            delayed,
            shutdown,
            stats,
            backoff,
        }
    }

    pub(crate) fn run(mut self) {
        tracing::debug!(worker = self.id, "worker loop started");

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            for job in self.delayed.pop_due(Instant::now()) {
                self.queues.enqueue(job);
            }

            match self.queues.try_dequeue_highest() {
                Some(job) => {
                    self.backoff.reset();
                    let outcome = job.run();
                    self.stats.record_outcome(outcome);
                }
                None => {
                    // A real suspension point: submit unparks us early, and
                    // a pending unpark token makes this return immediately,
                    // so no wakeup is ever lost.
                    thread::park_timeout(self.backoff.next_delay());
                }
            }
        }

        tracing::debug!(worker = self.id, "worker loop exited");
    }
}
