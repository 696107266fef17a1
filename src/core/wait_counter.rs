//! Outstanding-work counter with a blocking wait.
//!
//! Like a wait group, but the current count is observable. Increments and
//! decrements are lock-free; waiters park on a condition variable and re-check
//! the count after every wake.

use std::process;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::error;

/// Atomic outstanding-count with `wait` until zero.
///
/// # Aborts
///
/// Any adjustment that drives the count below zero aborts the process: it
/// means more decrements than increments were issued. This is not a panic, so
/// it cannot be swallowed by a task queue worker's unwind boundary.
///
/// ```
/// use paddock::core::WaitableCounter;
///
/// let counter = WaitableCounter::new();
/// counter.add(2);
/// counter.done();
/// assert_eq!(counter.state(), 1);
/// counter.done();
/// counter.wait();
/// ```
#[derive(Debug, Default)]
pub struct WaitableCounter {
    count: AtomicI64,
    lock: Mutex<()>,
    zero: Condvar,
}

impl WaitableCounter {
    /// Create a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
            lock: Mutex::new(()),
            zero: Condvar::new(),
        }
    }

    /// Adjust the count by `delta` and return the new value.
    ///
    /// Aborts the process if the resulting count is negative.
    pub fn add(&self, delta: i64) -> i64 {
        let next = self.count.fetch_add(delta, Ordering::SeqCst) + delta;
        if next < 0 {
            error!(count = next, delta, "Outstanding count is lower than 0: mismatched add/done calls");
            process::abort();
        }
        if delta < 0 {
            self.wake();
        }
        next
    }

    /// Decrement by one and wake all waiters. Returns the new value.
    ///
    /// Aborts the process if the count was already zero.
    pub fn done(&self) -> i64 {
        self.add(-1)
    }

    /// Non-blocking snapshot of the count.
    #[must_use]
    pub fn state(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Block until the count is zero.
    pub fn wait(&self) {
        let mut guard = self.lock.lock();
        while self.state() > 0 {
            self.zero.wait(&mut guard);
        }
    }

    /// Block until the count is zero or `timeout` elapses. Returns true if zero was reached.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while self.state() > 0 {
            if self.zero.wait_until(&mut guard, deadline).timed_out() {
                return self.state() <= 0;
            }
        }
        true
    }

    fn wake(&self) {
        // Taking the lock orders this notify after any waiter's predicate check.
        let _guard = self.lock.lock();
        self.zero.notify_all();
    }
}
