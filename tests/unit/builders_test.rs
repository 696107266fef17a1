//! Tests for builder modules

use std::time::Duration;

use paddock::builders::{build_lock_set, build_scheduler, build_task_queue, Primitives};
use paddock::config::{LockSetConfig, PaddockConfig, TaskQueueConfig, TickerConfig};
use paddock::core::{SchedulerState, SyncError};

#[test]
fn test_build_task_queue() {
    let queue = build_task_queue("builder-queue", &TaskQueueConfig { num_workers: 3 }).unwrap();
    assert_eq!(queue.num_workers(), 3);
    assert_eq!(queue.state(), 0);
}

#[test]
fn test_build_scheduler() {
    let cfg = TickerConfig {
        period_ms: 25,
        num_workers: 2,
    };
    let scheduler = build_scheduler(&cfg, ["a", "b", "c"]).unwrap();
    assert_eq!(scheduler.period(), Duration::from_millis(25));
    assert_eq!(scheduler.num_workers(), 2);
    assert_eq!(scheduler.roster_len(), 3);
    assert_eq!(scheduler.state(), SchedulerState::NotStarted);
}

#[test]
fn test_build_scheduler_invalid() {
    let cfg = TickerConfig {
        period_ms: 0,
        num_workers: 2,
    };
    let err = build_scheduler(&cfg, Vec::<u8>::new()).unwrap_err();
    assert!(matches!(err, SyncError::InvalidConfig(_)));
}

#[test]
fn test_build_lock_set() {
    let locks = build_lock_set(&LockSetConfig {
        watchdog_interval_ms: 50,
    })
    .unwrap();
    assert_eq!(locks.watchdog_interval(), Duration::from_millis(50));
}

#[test]
fn test_primitives_from_config() {
    let primitives = Primitives::from_config(&PaddockConfig::default(), [1_u32, 2]).unwrap();
    assert_eq!(primitives.task_queue.num_workers(), 1);
    assert_eq!(primitives.scheduler.roster_len(), 2);
    assert_eq!(primitives.lock_set.held_count(), 0);
}
