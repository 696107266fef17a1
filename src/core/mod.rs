//! Coordination primitives: counters, gates, named locks, queues and the periodic scheduler.

pub mod context;
pub mod error;
pub mod fifo_queue;
pub mod lock_set;
pub mod single_flight;
pub mod task_queue;
pub mod ticker;
pub mod wait_counter;

pub use context::Context;
pub use error::{AppResult, SyncError};
pub use fifo_queue::FifoQueue;
pub use lock_set::{
    NamedLockGuard, NamedLockSet, StalledJoin, DEFAULT_WATCHDOG_INTERVAL, MIN_WATCHDOG_INTERVAL,
};
pub use single_flight::SingleFlight;
pub use task_queue::{CohortState, Task, TaskQueue};
pub use ticker::{PeriodicDedupScheduler, SchedulerState};
pub use wait_counter::WaitableCounter;
