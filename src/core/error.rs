//! Error types for coordination primitives.

use thiserror::Error;

/// Errors returned by the queue, scheduler and configuration layers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// `start` was called on a scheduler that is already running (or still draining).
    #[error("already_started")]
    AlreadyStarted,
    /// `stop` was called on a scheduler that is not running.
    #[error("not_started")]
    NotStarted,
    /// The caller's deadline elapsed (or its context was cancelled) before the wait finished.
    #[error("timeout")]
    Timeout,
    /// A task was submitted after the queue was closed.
    #[error("queue closed")]
    QueueClosed,
    /// The OS refused to spawn a supervisor or worker thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
