//! Tests for error types

use paddock::core::SyncError;

#[test]
fn test_state_conflict_errors() {
    assert_eq!(format!("{}", SyncError::AlreadyStarted), "already_started");
    assert_eq!(format!("{}", SyncError::NotStarted), "not_started");
}

#[test]
fn test_timeout_error() {
    assert_eq!(format!("{}", SyncError::Timeout), "timeout");
}

#[test]
fn test_queue_closed_error() {
    assert_eq!(format!("{}", SyncError::QueueClosed), "queue closed");
}

#[test]
fn test_spawn_and_config_errors() {
    let err = SyncError::Spawn("resource temporarily unavailable".to_string());
    assert_eq!(
        format!("{err}"),
        "failed to spawn thread: resource temporarily unavailable"
    );

    let err = SyncError::InvalidConfig("period_ms must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: period_ms must be greater than 0"
    );
}
