//! Queue, scheduler and lock-set configuration structures.

use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Environment variable prefix read by [`PaddockConfig::from_env`].
pub const ENV_PREFIX: &str = "PADDOCK_";

/// Task queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskQueueConfig {
    /// Workers per cohort. `0` means one per available CPU.
    pub num_workers: usize,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self { num_workers: 1 }
    }
}

impl TaskQueueConfig {
    /// Cohort size after resolving `0` to the CPU count.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.num_workers == 0 {
            num_cpus::get()
        } else {
            self.num_workers
        }
    }

    /// Validate queue configuration values.
    pub fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Periodic scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// Tick interval in milliseconds.
    pub period_ms: u64,
    /// Job workers (the ticking loop gets one more).
    pub num_workers: usize,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            period_ms: 100,
            num_workers: 10,
        }
    }
}

impl TickerConfig {
    /// Tick interval as a `Duration`.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Validate scheduler configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.period_ms == 0 {
            return Err("period_ms must be greater than 0".into());
        }
        if self.num_workers == 0 {
            return Err("num_workers must be greater than 0".into());
        }
        Ok(())
    }
}

/// Named lock set configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSetConfig {
    /// Interval between stalled-join warnings, in milliseconds.
    pub watchdog_interval_ms: u64,
}

impl Default for LockSetConfig {
    fn default() -> Self {
        Self {
            watchdog_interval_ms: 3000,
        }
    }
}

impl LockSetConfig {
    /// Watchdog interval as a `Duration`.
    #[must_use]
    pub const fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    /// Validate lock set configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.watchdog_interval_ms == 0 {
            return Err("watchdog_interval_ms must be greater than 0".into());
        }
        Ok(())
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddockConfig {
    /// Task queue settings.
    pub task_queue: TaskQueueConfig,
    /// Periodic scheduler settings.
    pub ticker: TickerConfig,
    /// Named lock set settings.
    pub lock_set: LockSetConfig,
}

impl PaddockConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.task_queue
            .validate()
            .map_err(|e| format!("task_queue invalid: {e}"))?;
        self.ticker
            .validate()
            .map_err(|e| format!("ticker invalid: {e}"))?;
        self.lock_set
            .validate()
            .map_err(|e| format!("lock_set invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `PADDOCK_*` environment variables (after reading `.env` if present).
    ///
    /// Recognized: `PADDOCK_QUEUE_WORKERS`, `PADDOCK_TICKER_PERIOD_MS`,
    /// `PADDOCK_TICKER_WORKERS`, `PADDOCK_LOCK_WATCHDOG_MS`. Unset variables keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Fails if a variable does not parse or the result does not validate.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`PaddockConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Fails if a variable does not parse or the result does not validate.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = env_value(&lookup, "QUEUE_WORKERS")? {
            cfg.task_queue.num_workers = v;
        }
        if let Some(v) = env_value(&lookup, "TICKER_PERIOD_MS")? {
            cfg.ticker.period_ms = v;
        }
        if let Some(v) = env_value(&lookup, "TICKER_WORKERS")? {
            cfg.ticker.num_workers = v;
        }
        if let Some(v) = env_value(&lookup, "LOCK_WATCHDOG_MS")? {
            cfg.lock_set.watchdog_interval_ms = v;
        }
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

fn env_value<F, T>(lookup: &F, suffix: &str) -> AppResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let key = format!("{ENV_PREFIX}{suffix}");
    lookup(&key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: {raw:?}"))
        })
        .transpose()
}
