//! Build queues, schedulers and lock sets from configuration.

use crate::config::{LockSetConfig, PaddockConfig, TaskQueueConfig, TickerConfig};
use crate::core::{NamedLockSet, PeriodicDedupScheduler, SyncError, TaskQueue};

/// Build a task queue named `name` from configuration.
///
/// # Errors
///
/// Returns [`SyncError::InvalidConfig`] if the configuration does not validate.
pub fn build_task_queue(name: &str, cfg: &TaskQueueConfig) -> Result<TaskQueue, SyncError> {
    cfg.validate().map_err(SyncError::InvalidConfig)?;
    Ok(TaskQueue::named(name, cfg.effective_workers()))
}

/// Build a periodic scheduler over `roster` from configuration.
///
/// # Errors
///
/// Returns [`SyncError::InvalidConfig`] if the configuration does not validate.
pub fn build_scheduler<P, I>(
    cfg: &TickerConfig,
    roster: I,
) -> Result<PeriodicDedupScheduler<P>, SyncError>
where
    I: IntoIterator<Item = P>,
{
    cfg.validate().map_err(SyncError::InvalidConfig)?;
    let mut scheduler = PeriodicDedupScheduler::new()
        .with_period(cfg.period())
        .with_num_workers(cfg.num_workers);
    scheduler.set_tasks(roster);
    Ok(scheduler)
}

/// Build a named lock set from configuration.
///
/// # Errors
///
/// Returns [`SyncError::InvalidConfig`] if the configuration does not validate.
pub fn build_lock_set(cfg: &LockSetConfig) -> Result<NamedLockSet, SyncError> {
    cfg.validate().map_err(SyncError::InvalidConfig)?;
    Ok(NamedLockSet::new().with_watchdog_interval(cfg.watchdog_interval()))
}

/// One of each primitive, built from a root configuration.
#[derive(Debug)]
pub struct Primitives<P> {
    /// General-purpose task queue.
    pub task_queue: TaskQueue,
    /// Periodic scheduler (not started).
    pub scheduler: PeriodicDedupScheduler<P>,
    /// Named lock set.
    pub lock_set: NamedLockSet,
}

impl<P> Primitives<P> {
    /// Validate `cfg` and build every primitive.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] naming the failing section.
    pub fn from_config<I>(cfg: &PaddockConfig, roster: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = P>,
    {
        cfg.validate().map_err(SyncError::InvalidConfig)?;
        Ok(Self {
            task_queue: build_task_queue("paddock-queue", &cfg.task_queue)?,
            scheduler: build_scheduler(&cfg.ticker, roster)?,
            lock_set: build_lock_set(&cfg.lock_set)?,
        })
    }
}
