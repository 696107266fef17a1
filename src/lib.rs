//! # Paddock
//!
//! Thread coordination primitives for backlog-driven work.
//!
//! Every primitive is an explicit, independently constructible object; there
//! are no process-wide default instances.
//!
//! ## Primitives
//!
//! - **`WaitableCounter`**: outstanding-work count with a blocking wait until zero
//! - **`SingleFlight`**: runs a closure only if no other is running; extra callers are skipped
//! - **`NamedLockSet`**: mutual exclusion over string keys, with a deadlock watchdog on `join`
//! - **`TaskQueue`** / **`FifoQueue`**: elastic worker cohorts that exist only while there is backlog
//! - **`PeriodicDedupScheduler`**: ticks a roster of jobs, skipping entries still running
//! - **`Context`**: cooperative cancellation and deadlines for the blocking operations above
//!
//! ## Task queue
//!
//! ```rust
//! use paddock::core::TaskQueue;
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//!
//! let queue = TaskQueue::new(); // one worker: strict FIFO
//! let order = Arc::new(Mutex::new(Vec::new()));
//! for i in 0..3 {
//!     let order = Arc::clone(&order);
//!     queue.enqueue(move || order.lock().push(i))?;
//! }
//! queue.close()?;
//! assert_eq!(*order.lock(), vec![0, 1, 2]);
//! # Ok::<(), paddock::core::SyncError>(())
//! ```
//!
//! ## Periodic scheduling
//!
//! ```rust,ignore
//! use paddock::core::{Context, PeriodicDedupScheduler};
//! use std::time::Duration;
//!
//! let mut scheduler = PeriodicDedupScheduler::new()
//!     .with_period(Duration::from_secs(1))
//!     .with_num_workers(4);
//! scheduler.set_tasks(["mail", "index", "cleanup"]);
//! scheduler.start(&Context::background(), |ctx, job| run_job(ctx, job))?;
//!
//! // Later: bounded shutdown; in-flight jobs keep draining on timeout.
//! scheduler.stop(&Context::background().with_timeout(Duration::from_secs(5)))?;
//! ```
//!
//! For complete examples, see:
//! - `tests/task_queue_test.rs` - queue ordering, elasticity and close semantics
//! - `tests/ticker_test.rs` - dedup-under-overlap and bounded stop

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Coordination primitives and their error type.
pub mod core;
/// Configuration models for queues, schedulers and lock sets.
pub mod config;
/// Builders to construct primitives from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
