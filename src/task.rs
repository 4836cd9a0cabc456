//! Task representation: priority levels, identifiers, outcomes, and the
//! internal queue entry.

use crate::error::Error;
use async_channel::Sender;
use futures::future::BoxFuture;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier assigned to each submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Urgency class for a submitted task.
///
/// A smaller discriminant is more urgent; the discriminant doubles as the
/// ordinal indexing the queue set. Dequeue scans walk [`Priority::ALL`] from
/// `Critical` down, so a sustained stream of `Critical` work starves `Lowest`
/// indefinitely. That strict dominance is the documented policy, not a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    /// Must run before anything else.
    Critical = 0,
    /// Ahead of routine work.
    High = 1,
    /// Default urgency.
    Normal = 2,
    /// Behind routine work.
    Low = 3,
    /// Only when nothing else is pending.
    Lowest = 4,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    /// Number of declared levels.
    pub const LEVELS: usize = 5;

    /// Every level, most urgent first. This is the dequeue scan order.
    pub const ALL: [Priority; Priority::LEVELS] = [
        Priority::Critical,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Lowest,
    ];

    /// Ordinal used to index the queue set.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Fallible constructor for ordinals arriving from outside the type
    /// system (config files, tooling commands).
    pub fn from_index(index: usize) -> Result<Self, Error> {
        Priority::ALL
            .get(index)
            .copied()
            .ok_or(Error::InvalidPriority(index))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Lowest => "lowest",
        };
        f.write_str(name)
    }
}

/// Outcome of one task, delivered through its completion handle.
pub type TaskResult = Result<(), TaskError>;

/// Failure modes of an individual task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task ran and returned an error.
    #[error("task failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The task panicked; the payload message is captured.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was discarded before any worker claimed it.
    #[error("task canceled before execution")]
    Canceled,
}

impl TaskError {
    /// Wrap an arbitrary error as a task failure.
    pub fn failed<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TaskError::Failed(err.into())
    }
}

/// How a claimed job ended, for stats accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    Succeeded,
    Failed,
    Panicked,
}

/// Internal queue entry. Owned by exactly one queue until dequeued; ownership
/// moves to the claiming worker and is never shared.
pub(crate) struct Job {
    pub(crate) id: TaskId,
    pub(crate) priority: Priority,
    fut: BoxFuture<'static, TaskResult>,
    done: Sender<TaskResult>,
    pub(crate) submitted_at: Instant,
}

impl Job {
    pub(crate) fn new(
        id: TaskId,
        priority: Priority,
        fut: BoxFuture<'static, TaskResult>,
        done: Sender<TaskResult>,
    ) -> Self {
        Self {
            id,
            priority,
            fut,
            done,
            submitted_at: Instant::now(),
        }
    }

    /// Run the job to completion on the current thread and resolve its
    /// completion handle. Panics are caught and reported as
    /// [`TaskError::Panicked`]; nothing escapes to the caller's loop.
    pub(crate) fn run(self) -> JobOutcome {
        let Job {
            id,
            priority,
            fut,
            done,
            submitted_at,
        } = self;

        let queued_ms = submitted_at.elapsed().as_millis() as u64;
        tracing::trace!(task = %id, %priority, queued_ms, "task claimed");

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            futures::executor::block_on(fut)
        }));

        let (outcome, resolution) = match result {
            Ok(Ok(())) => (JobOutcome::Succeeded, Ok(())),
            Ok(Err(err)) => {
                tracing::error!(task = %id, %priority, error = %err, "task failed");
                (JobOutcome::Failed, Err(err))
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::error!(task = %id, %priority, panic = %msg, "task panicked");
                (JobOutcome::Panicked, Err(TaskError::Panicked(msg)))
            }
        };

        // Resolving can only fail if the caller dropped its handle; the
        // outcome was already logged above, so that is fine.
        let _ = done.try_send(resolution);
        outcome
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("submitted_at", &self.submitted_at)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
