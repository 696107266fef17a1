//! Cooperative cancellation and deadline signal.
//!
//! A [`Context`] is the only way callers bound the blocking operations in this
//! crate. Cancellation is observed at well-defined points (the scheduler's tick
//! boundary, `stop`'s wait); nothing here interrupts a running task body.
//!
//! Contexts form a tree: cancelling a parent cancels every live child, while
//! cancelling a child leaves the parent untouched. Derived deadlines never
//! outlive the parent's.
//!
//! ```
//! use paddock::core::Context;
//! use std::time::Duration;
//!
//! let root = Context::background();
//! let child = root.with_timeout(Duration::from_secs(5));
//! assert!(!child.is_done());
//!
//! root.cancel();
//! assert!(child.is_cancelled());
//! ```

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crossbeam_channel::{at, bounded, never, select, Receiver, Sender};
use parking_lot::Mutex;

use super::SyncError;

#[derive(Debug)]
struct ContextInner {
    /// Dropped on cancel; receivers then observe disconnection.
    cancel_tx: Mutex<Option<Sender<()>>>,
    cancel_rx: Receiver<()>,
    deadline: Option<Instant>,
    children: Mutex<Vec<Weak<ContextInner>>>,
}

impl ContextInner {
    fn new(deadline: Option<Instant>) -> Self {
        let (cancel_tx, cancel_rx) = bounded(0);
        Self {
            cancel_tx: Mutex::new(Some(cancel_tx)),
            cancel_rx,
            deadline,
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        if self.cancel_tx.lock().take().is_none() {
            return;
        }
        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_tx.lock().is_none()
    }
}

/// Cloneable cancellation/deadline handle passed into blocking operations.
///
/// Clones share state: cancelling any clone cancels them all.
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// A fresh root context that is never cancelled on its own and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextInner::new(None)),
        }
    }

    /// Derive a child that can be cancelled independently of this context.
    #[must_use]
    pub fn with_cancel(&self) -> Self {
        self.derive(self.inner.deadline)
    }

    /// Derive a child whose deadline is `timeout` from now, or the parent's if earlier.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child with an absolute deadline, clamped to the parent's.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        self.derive(Some(deadline))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        let child = Arc::new(ContextInner::new(deadline));
        {
            let mut children = self.inner.children.lock();
            children.retain(|w| w.strong_count() > 0);
            children.push(Arc::downgrade(&child));
        }
        // Parent may have been cancelled between creation and registration.
        if self.inner.is_cancelled() {
            child.cancel();
        }
        Self { inner: child }
    }

    /// Cancel this context and all of its descendants. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// True once `cancel` has been called on this context or an ancestor.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// True if cancelled or the deadline has passed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.inner.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// The effective deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Channel that becomes ready (disconnected) when the context is cancelled.
    #[must_use]
    pub fn cancelled(&self) -> Receiver<()> {
        self.inner.cancel_rx.clone()
    }

    /// Channel that fires once at the deadline; never fires without one.
    #[must_use]
    pub fn expiry(&self) -> Receiver<Instant> {
        self.inner.deadline.map_or_else(never, at)
    }

    /// Block until `rx` yields a value or this context is done.
    ///
    /// Returns `Ok(None)` if `rx` disconnects without a value.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Timeout`] if the context is cancelled or its deadline
    /// passes first.
    pub fn wait_for<T>(&self, rx: &Receiver<T>) -> Result<Option<T>, SyncError> {
        let cancelled = self.cancelled();
        let expiry = self.expiry();
        select! {
            recv(rx) -> msg => Ok(msg.ok()),
            recv(cancelled) -> _ => Err(SyncError::Timeout),
            recv(expiry) -> _ => Err(SyncError::Timeout),
        }
    }
}
