//! Tests for configuration validation and loading

use std::collections::HashMap;
use std::time::Duration;

use paddock::config::{LockSetConfig, PaddockConfig, TaskQueueConfig, TickerConfig};

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_defaults() {
    let cfg = PaddockConfig::default();
    assert_eq!(cfg.task_queue.num_workers, 1);
    assert_eq!(cfg.ticker.period(), Duration::from_millis(100));
    assert_eq!(cfg.ticker.num_workers, 10);
    assert_eq!(cfg.lock_set.watchdog_interval(), Duration::from_secs(3));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_zero_queue_workers_means_cpu_count() {
    let cfg = TaskQueueConfig { num_workers: 0 };
    assert!(cfg.validate().is_ok());
    assert!(cfg.effective_workers() >= 1);
}

#[test]
fn test_ticker_config_invalid_period() {
    let invalid = TickerConfig {
        period_ms: 0,
        num_workers: 4,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_ticker_config_invalid_workers() {
    let invalid = TickerConfig {
        period_ms: 10,
        num_workers: 0,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_lock_set_config_invalid_interval() {
    let invalid = LockSetConfig {
        watchdog_interval_ms: 0,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_root_validation_names_section() {
    let mut cfg = PaddockConfig::default();
    cfg.ticker.period_ms = 0;
    let err = cfg.validate().unwrap_err();
    assert!(err.starts_with("ticker invalid"), "{err}");
}

#[test]
fn test_from_json_partial_uses_defaults() {
    let json = r#"{
        "ticker": { "period_ms": 250 },
        "lock_set": { "watchdog_interval_ms": 500 }
    }"#;

    let cfg = PaddockConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.ticker.period_ms, 250);
    assert_eq!(cfg.ticker.num_workers, 10);
    assert_eq!(cfg.lock_set.watchdog_interval_ms, 500);
    assert_eq!(cfg.task_queue, TaskQueueConfig::default());
}

#[test]
fn test_from_json_rejects_invalid() {
    assert!(PaddockConfig::from_json_str(r#"{ "ticker": { "num_workers": 0 } }"#).is_err());
    assert!(PaddockConfig::from_json_str("not json").is_err());
}

#[test]
fn test_from_lookup_overrides() {
    let cfg = PaddockConfig::from_lookup(lookup_from(&[
        ("PADDOCK_QUEUE_WORKERS", "4"),
        ("PADDOCK_TICKER_PERIOD_MS", " 20 "),
        ("PADDOCK_LOCK_WATCHDOG_MS", "1000"),
    ]))
    .unwrap();
    assert_eq!(cfg.task_queue.num_workers, 4);
    assert_eq!(cfg.ticker.period_ms, 20);
    assert_eq!(cfg.ticker.num_workers, 10);
    assert_eq!(cfg.lock_set.watchdog_interval_ms, 1000);
}

#[test]
fn test_from_lookup_rejects_garbage() {
    let err = PaddockConfig::from_lookup(lookup_from(&[("PADDOCK_TICKER_WORKERS", "many")]))
        .unwrap_err();
    assert!(err.to_string().contains("PADDOCK_TICKER_WORKERS"));
}

#[test]
fn test_from_lookup_validates() {
    let result = PaddockConfig::from_lookup(lookup_from(&[("PADDOCK_TICKER_PERIOD_MS", "0")]));
    assert!(result.is_err());
}
