//! Mutual exclusion over caller-chosen string keys.
//!
//! A [`NamedLockSet`] tracks which names are currently held. Non-blocking
//! operations (`try_lock_all`, `try_lock_partial`) never wait; `join` blocks
//! until every requested name has been acquired by the calling thread.
//!
//! `join` parks on a condition variable that every release broadcasts, and
//! only one `join` runs per set at a time so two joiners cannot interleave
//! partial acquisitions and starve each other. A join that stays unsatisfied
//! past the watchdog interval logs a warning naming (up to three of) the names
//! it is still missing, once per interval, and keeps waiting.

use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::warn;

/// Default interval between deadlock-watchdog warnings during `join`.
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(3);

/// Shortest accepted watchdog interval; shorter values are raised to this.
pub const MIN_WATCHDOG_INTERVAL: Duration = Duration::from_millis(10);

/// How many missing names a watchdog report lists.
const REPORTED_MISSING: usize = 3;

/// Diagnostic snapshot of a `join` that has not completed within the watchdog interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalledJoin {
    /// When the join began.
    pub started: Instant,
    /// Number of distinct names requested.
    pub requested: usize,
    /// Up to three of the names still missing.
    pub missing: Vec<String>,
    /// Total number of names still missing.
    pub missing_total: usize,
}

type StallHook = Box<dyn Fn(&StalledJoin) + Send + Sync>;

/// Set of named critical sections.
///
/// ```
/// use paddock::core::NamedLockSet;
///
/// let locks = NamedLockSet::new();
/// assert!(locks.try_lock_all(["a", "b"]));
/// assert!(!locks.try_lock_all(["b", "c"]));
/// assert!(locks.check(["c"]));
/// locks.release(["a", "b"]);
/// ```
pub struct NamedLockSet {
    held: Mutex<HashSet<String>>,
    released: Condvar,
    join_gate: Mutex<()>,
    watchdog_interval: Duration,
    stall_hook: Option<StallHook>,
}

impl fmt::Debug for NamedLockSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedLockSet")
            .field("held", &*self.held.lock())
            .field("watchdog_interval", &self.watchdog_interval)
            .field("stall_hook", &self.stall_hook.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for NamedLockSet {
    fn default() -> Self {
        Self::new()
    }
}

impl NamedLockSet {
    /// Create an empty set with the default watchdog interval.
    #[must_use]
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            join_gate: Mutex::new(()),
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            stall_hook: None,
        }
    }

    /// Override the interval between stalled-join warnings.
    ///
    /// Intervals below [`MIN_WATCHDOG_INTERVAL`] are raised to it. An interval
    /// too large to add to the current time disables the watchdog.
    #[must_use]
    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval.max(MIN_WATCHDOG_INTERVAL);
        self
    }

    /// Install a callback invoked alongside each stalled-join warning.
    #[must_use]
    pub fn with_stall_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StalledJoin) + Send + Sync + 'static,
    {
        self.stall_hook = Some(Box::new(hook));
        self
    }

    /// The configured watchdog interval.
    #[must_use]
    pub const fn watchdog_interval(&self) -> Duration {
        self.watchdog_interval
    }

    /// Lock every name if none is held; otherwise lock nothing and return false.
    pub fn try_lock_all<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        let mut held = self.held.lock();
        if names.iter().any(|name| held.contains(name.as_ref())) {
            return false;
        }
        for name in &names {
            held.insert(name.as_ref().to_owned());
        }
        true
    }

    /// Lock whichever of `names` are free and return them. Never blocks on held names.
    pub fn try_lock_partial<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut held = self.held.lock();
        lock_free_names(&mut held, names)
    }

    /// Clear the held marker for `name`. No-op if it was not held.
    pub fn release_one(&self, name: &str) {
        self.held.lock().remove(name);
        self.released.notify_all();
    }

    /// Clear the held markers for all `names`.
    pub fn release<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        {
            let mut held = self.held.lock();
            for name in names {
                held.remove(name.as_ref());
            }
        }
        self.released.notify_all();
    }

    /// True iff every name is currently free.
    pub fn check<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let held = self.held.lock();
        names.into_iter().all(|name| !held.contains(name.as_ref()))
    }

    /// True iff at least one name is held. This is `!check`, not "all held".
    pub fn locked<I, S>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        !self.check(names)
    }

    /// Number of names currently held.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    /// Block until every distinct name in `names` has been acquired by this call.
    ///
    /// Names are taken as they become free; already-acquired names stay held
    /// while waiting for the rest.
    pub fn join<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _gate = self.join_gate.lock();

        let mut seen = HashSet::new();
        let mut missing: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().to_owned())
            .filter(|name| seen.insert(name.clone()))
            .collect();
        let requested = missing.len();

        let started = Instant::now();
        let mut next_report = started.checked_add(self.watchdog_interval);
        let mut held = self.held.lock();
        loop {
            let acquired = lock_free_names(&mut held, &missing);
            if !acquired.is_empty() {
                missing.retain(|name| !acquired.contains(name));
            }
            if missing.is_empty() {
                return;
            }

            let Some(report_at) = next_report else {
                self.released.wait(&mut held);
                continue;
            };
            if self.released.wait_until(&mut held, report_at).timed_out() {
                // Retry before reporting: a release may have raced the timeout.
                let acquired = lock_free_names(&mut held, &missing);
                missing.retain(|name| !acquired.contains(name));
                if missing.is_empty() {
                    return;
                }
                MutexGuard::unlocked(&mut held, || {
                    self.report_stall(started, requested, &missing);
                });
                next_report = Instant::now().checked_add(self.watchdog_interval);
            }
        }
    }

    /// Join `names` and return a guard that releases them when dropped.
    #[must_use = "the names are released as soon as the guard is dropped"]
    pub fn guard<I, S>(&self, names: I) -> NamedLockGuard<'_>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_owned()).collect();
        self.join(&names);
        NamedLockGuard { set: self, names }
    }

    fn report_stall(&self, started: Instant, requested: usize, missing: &[String]) {
        let report = StalledJoin {
            started,
            requested,
            missing: missing.iter().take(REPORTED_MISSING).cloned().collect(),
            missing_total: missing.len(),
        };
        warn!(
            waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            requested = report.requested,
            missing = ?report.missing,
            missing_total = report.missing_total,
            "Possible deadlock: join still waiting on named locks"
        );
        if let Some(hook) = &self.stall_hook {
            hook(&report);
        }
    }
}

/// Mark every free name as held and return the ones taken.
fn lock_free_names<I, S>(held: &mut HashSet<String>, names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            if held.contains(name) {
                None
            } else {
                held.insert(name.to_owned());
                Some(name.to_owned())
            }
        })
        .collect()
}

/// Releases the names it holds on drop. Created by [`NamedLockSet::guard`].
#[derive(Debug)]
pub struct NamedLockGuard<'a> {
    set: &'a NamedLockSet,
    names: Vec<String>,
}

impl NamedLockGuard<'_> {
    /// Names held by this guard.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Drop for NamedLockGuard<'_> {
    fn drop(&mut self) {
        self.set.release(&self.names);
    }
}
