//! Strict first-in, first-out task execution.

use super::{SyncError, TaskQueue};

/// A [`TaskQueue`] pinned to a single worker: tasks run one at a time, in
/// the order they were enqueued.
///
/// ```
/// use paddock::core::FifoQueue;
/// use std::sync::Arc;
/// use parking_lot::Mutex;
///
/// let queue = FifoQueue::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// for i in 0..5 {
///     let seen = Arc::clone(&seen);
///     queue.enqueue(move || seen.lock().push(i))?;
/// }
/// queue.close()?;
/// assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
/// # Ok::<(), paddock::core::SyncError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FifoQueue {
    queue: TaskQueue,
}

impl FifoQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: TaskQueue::new(),
        }
    }

    /// Submit a task; blocks until the worker takes it.
    ///
    /// # Errors
    ///
    /// See [`TaskQueue::enqueue`].
    pub fn enqueue<F>(&self, task: F) -> Result<(), SyncError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.enqueue(task)
    }

    /// Block until every submitted task has run.
    ///
    /// # Errors
    ///
    /// See [`TaskQueue::flush`].
    pub fn flush(&self) -> Result<(), SyncError> {
        self.queue.flush()
    }

    /// Flush, then reject further submissions.
    ///
    /// # Errors
    ///
    /// See [`TaskQueue::close`].
    pub fn close(&self) -> Result<(), SyncError> {
        self.queue.close()
    }
}
