//! Integration tests for NamedLockSet
//!
//! Covers all-or-nothing and partial acquisition, blocking joins released
//! from other threads, join serialization, and the stalled-join watchdog.

use paddock::core::{NamedLockSet, StalledJoin, MIN_WATCHDOG_INTERVAL};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// NON-BLOCKING ACQUISITION
// ============================================================================

#[test]
fn test_try_lock_all_is_all_or_nothing() {
    let locks = NamedLockSet::new();
    locks.join(["a"]);

    assert!(!locks.try_lock_all(["a", "b"]));
    assert!(locks.check(["b"]));
    assert!(!locks.locked(["b"]));

    locks.release(["a", "b"]);
    assert!(!locks.locked(["a"]));

    assert!(locks.try_lock_all(["a", "b"]));
    assert!(!locks.check(["a"]));
    assert!(!locks.check(["b"]));
}

#[test]
fn test_check_and_locked_asymmetry() {
    let locks = NamedLockSet::new();
    locks.join(["held"]);

    // One held name is enough for `locked`, and enough to fail `check`.
    assert!(locks.locked(["held", "free"]));
    assert!(!locks.check(["held", "free"]));
    // Neither means "all held".
    assert!(!locks.locked(["free"]));
    assert!(locks.check(["free", "other"]));
}

#[test]
fn test_try_lock_partial_takes_what_it_can() {
    let locks = NamedLockSet::new();
    locks.join(["aa"]);

    let locked = locks.try_lock_partial(["aa", "bb"]);
    assert_eq!(locked, vec!["bb".to_string()]);
    assert!(!locks.check(["aa"]));
    assert!(!locks.check(["bb"]));
}

// ============================================================================
// BLOCKING JOIN
// ============================================================================

#[test]
fn test_join_blocks_until_released_elsewhere() {
    let locks = Arc::new(NamedLockSet::new());
    locks.join(["aa"]);
    let released = Arc::new(AtomicBool::new(false));

    let releaser = {
        let locks = Arc::clone(&locks);
        let released = Arc::clone(&released);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            released.store(true, Ordering::SeqCst);
            locks.release_one("aa");
        })
    };

    assert!(!locks.check(["aa"]));
    locks.join(["aa"]);
    assert!(released.load(Ordering::SeqCst));
    releaser.join().unwrap();
}

#[test]
fn test_join_with_duplicates_and_staggered_releases() {
    let locks = Arc::new(NamedLockSet::new());
    locks.join(["aa", "bb", "aa"]);
    let released = Arc::new(AtomicUsize::new(0));

    let releaser = {
        let locks = Arc::clone(&locks);
        let released = Arc::clone(&released);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            released.fetch_add(1, Ordering::SeqCst);
            locks.release_one("aa");
            thread::sleep(Duration::from_millis(20));
            released.fetch_add(1, Ordering::SeqCst);
            locks.release_one("bb");
        })
    };

    assert!(!locks.check(["aa"]));
    assert!(!locks.check(["bb"]));
    locks.join(["aa", "bb"]);
    assert_eq!(released.load(Ordering::SeqCst), 2);
    releaser.join().unwrap();
}

#[test]
fn test_joins_are_serialized() {
    let locks = Arc::new(NamedLockSet::new());
    locks.join(["a"]);
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = {
        let locks = Arc::clone(&locks);
        let order = Arc::clone(&order);
        thread::spawn(move || {
            locks.join(["a", "b"]);
            order.lock().push("first");
        })
    };
    // Let the first joiner take "b" and park waiting for "a".
    let deadline = Instant::now() + Duration::from_secs(2);
    while locks.check(["b"]) {
        assert!(Instant::now() < deadline, "first joiner never took b");
        thread::sleep(Duration::from_millis(1));
    }

    let second = {
        let locks = Arc::clone(&locks);
        let order = Arc::clone(&order);
        thread::spawn(move || {
            locks.join(["b"]);
            order.lock().push("second");
        })
    };

    thread::sleep(Duration::from_millis(30));
    assert!(order.lock().is_empty());

    locks.release_one("a");
    first.join().unwrap();
    assert_eq!(*order.lock(), vec!["first"]);

    locks.release(["a", "b"]);
    second.join().unwrap();
    assert_eq!(*order.lock(), vec!["first", "second"]);
}

#[test]
fn test_guard_gives_mutual_exclusion() {
    let locks = Arc::new(NamedLockSet::new());
    let counter = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..100 {
                    let _guard = locks.guard(["counter"]);
                    // Split read/write: any overlap would lose an update.
                    let seen = counter.load(Ordering::SeqCst);
                    thread::yield_now();
                    counter.store(seen + 1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 800);
    assert!(locks.check(["counter"]));
}

// ============================================================================
// WATCHDOG
// ============================================================================

#[test]
fn test_watchdog_repeats_until_satisfied() {
    let reports: Arc<Mutex<Vec<StalledJoin>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let locks = Arc::new(
        NamedLockSet::new()
            .with_watchdog_interval(Duration::from_millis(20))
            .with_stall_hook(move |report| sink.lock().push(report.clone())),
    );
    locks.join(["aa"]);

    let releaser = {
        let locks = Arc::clone(&locks);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(110));
            locks.release_one("aa");
        })
    };

    locks.join(["aa"]);
    releaser.join().unwrap();

    let reports = reports.lock();
    assert!(reports.len() >= 2, "expected repeated warnings, got {}", reports.len());
    for report in reports.iter() {
        assert_eq!(report.missing, vec!["aa".to_string()]);
        assert_eq!(report.missing_total, 1);
        assert_eq!(report.requested, 1);
    }
}

#[test]
fn test_no_watchdog_when_join_is_quick() {
    let fired = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&fired);
    let locks = NamedLockSet::new()
        .with_watchdog_interval(Duration::from_millis(200))
        .with_stall_hook(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
    locks.join(["x", "y", "z"]);
    locks.release(["x", "y", "z"]);
    locks.join(["x"]);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_watchdog_interval_is_raised_to_minimum() {
    let fired = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&fired);
    let locks = Arc::new(
        NamedLockSet::new()
            .with_watchdog_interval(Duration::ZERO)
            .with_stall_hook(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            }),
    );
    assert_eq!(locks.watchdog_interval(), MIN_WATCHDOG_INTERVAL);
    locks.join(["aa"]);

    let releaser = {
        let locks = Arc::clone(&locks);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            locks.release_one("aa");
        })
    };

    let started = Instant::now();
    locks.join(["aa"]);
    let intervals = started.elapsed().as_millis() / MIN_WATCHDOG_INTERVAL.as_millis();
    releaser.join().unwrap();
    // At most one report per interval; a zero interval would spin.
    let fired = fired.load(Ordering::SeqCst) as u128;
    assert!(fired <= intervals + 1, "{fired} reports in {intervals} intervals");
}

#[test]
fn test_huge_watchdog_interval_disables_reports() {
    let fired = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&fired);
    let locks = Arc::new(
        NamedLockSet::new()
            .with_watchdog_interval(Duration::MAX)
            .with_stall_hook(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            }),
    );
    locks.join(["aa"]);

    let releaser = {
        let locks = Arc::clone(&locks);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            locks.release_one("aa");
        })
    };

    locks.join(["aa"]);
    releaser.join().unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(!locks.check(["aa"]));
}
