//! Completion handles returned to submitters.

use crate::task::{TaskError, TaskId, TaskResult};
use async_channel::{Receiver, Sender, TryRecvError};

/// Future-like handle to one submitted task's eventual outcome.
///
/// Created at submission, resolved exactly once by whichever worker runs the
/// task. If the task is discarded unrun (cancel-all, stop, or scheduler
/// drop), the handle resolves to [`TaskError::Canceled`] instead of pending
/// forever. The scheduler imposes no execution timeout; a caller that needs
/// one must poll [`try_result`](CompletionHandle::try_result) on its own
/// clock.
#[derive(Debug)]
pub struct CompletionHandle {
    id: TaskId,
    receiver: Receiver<TaskResult>,
}

impl CompletionHandle {
    pub(crate) fn channel(id: TaskId) -> (Sender<TaskResult>, Self) {
        let (tx, rx) = async_channel::bounded(1);
        (tx, Self { id, receiver: rx })
    }

    /// Identifier of the task this handle observes.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Await the task's outcome.
    pub async fn join(self) -> TaskResult {
        match self.receiver.recv().await {
            Ok(result) => result,
            // Sender dropped without resolving: the job was discarded.
            Err(_) => Err(TaskError::Canceled),
        }
    }

    /// Block the current thread until the task's outcome is available.
    pub fn wait(self) -> TaskResult {
        futures::executor::block_on(self.join())
    }

    /// Non-blocking check. `None` while the task is still pending.
    pub fn try_result(&self) -> Option<TaskResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(TaskError::Canceled)),
        }
    }
}
