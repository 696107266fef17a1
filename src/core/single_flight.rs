//! Skip-if-running execution gate.

use std::sync::atomic::{AtomicBool, Ordering};

/// Runs a closure only if no other closure is currently running through the
/// same guard. Concurrent callers are dropped, never queued or retried.
///
/// ```
/// use paddock::core::SingleFlight;
///
/// let gate = SingleFlight::new();
/// assert_eq!(gate.acquire(|| 1 + 1), Some(2));
/// ```
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

/// Resets the flag even if the body unwinds.
struct Release<'a>(&'a AtomicBool);

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SingleFlight {
    /// Create an idle guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Run `f` if the guard is idle; return `None` without running it otherwise.
    pub fn acquire<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        let _release = Release(&self.busy);
        Some(f())
    }

    /// True while a body is executing.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}
