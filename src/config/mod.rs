//! Configuration models for queues, the periodic scheduler, and lock sets.

pub mod settings;

pub use settings::{LockSetConfig, PaddockConfig, TaskQueueConfig, TickerConfig};
