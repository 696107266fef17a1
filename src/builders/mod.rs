//! Builders to construct coordination primitives from configuration.

pub mod primitives;

pub use primitives::{build_lock_set, build_scheduler, build_task_queue, Primitives};
