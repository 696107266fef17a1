//! Elastic task queue with on-demand worker cohorts.
//!
//! Worker threads exist only while there is outstanding work. The first
//! `enqueue` after an idle period starts a supervisor thread, which spawns a
//! cohort of `num_workers` workers, waits for the outstanding count to reach
//! zero, stops the cohort, and exits unless more work arrived meanwhile.
//!
//! # Design
//!
//! - **Backpressure**: tasks travel over a zero-capacity channel, so `enqueue`
//!   returns only once a worker has taken the task.
//! - **One supervisor**: the supervisor body runs behind a [`SingleFlight`]
//!   gate. After leaving the gate it re-checks the outstanding count, so an
//!   `enqueue` that raced the exit is never stranded without workers.
//! - **Explicit cohort state**: `Idle -> Running -> Draining -> (Running | Idle)`,
//!   written only by the supervisor.
//! - **Ordering**: with one worker, tasks run in enqueue order. With more, each
//!   task runs exactly once with no ordering between tasks.
//!
//! A task must not enqueue into its own single-worker queue: the send waits for
//! a worker that is busy running the sender.
//!
//! ```
//! use paddock::core::TaskQueue;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let queue = TaskQueue::with_workers(4);
//! let hits = Arc::new(AtomicUsize::new(0));
//! for _ in 0..10 {
//!     let hits = Arc::clone(&hits);
//!     queue.enqueue(move || {
//!         hits.fetch_add(1, Ordering::SeqCst);
//!     })?;
//! }
//! queue.close()?;
//! assert_eq!(hits.load(Ordering::SeqCst), 10);
//! # Ok::<(), paddock::core::SyncError>(())
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use super::{SingleFlight, SyncError, WaitableCounter};

/// A unit of work: run once, by whichever worker receives it.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

const DEFAULT_QUEUE_NAME: &str = "paddock-queue";

/// Pause before retrying when no worker thread could be spawned.
const SPAWN_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Lifecycle of the current worker cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortState {
    /// No workers; the queue is idle.
    Idle,
    /// Workers are consuming tasks.
    Running,
    /// Outstanding work hit zero; workers are being stopped.
    Draining,
}

struct QueueInner {
    name: String,
    num_workers: AtomicUsize,
    pending: WaitableCounter,
    supervisor: SingleFlight,
    cohort: Mutex<CohortState>,
    /// `None` once the queue is closed.
    task_tx: Mutex<Option<Sender<Task>>>,
    task_rx: Receiver<Task>,
}

/// Handle to one running worker: dropping `stop` asks it to exit.
struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl QueueInner {
    fn ensure_running(self: &Arc<Self>) -> Result<(), SyncError> {
        if self.supervisor.is_busy() {
            // The active supervisor re-checks the count after it leaves the gate.
            return Ok(());
        }
        let inner = Arc::clone(self);
        thread::Builder::new()
            .name(format!("{}-supervisor", self.name))
            .spawn(move || inner.run_supervisor())
            .map(drop)
            .map_err(|e| SyncError::Spawn(e.to_string()))
    }

    fn run_supervisor(self: Arc<Self>) {
        loop {
            if self.supervisor.acquire(|| self.supervise()).is_none() {
                return;
            }
            if self.pending.state() == 0 {
                return;
            }
        }
    }

    fn supervise(self: &Arc<Self>) {
        while self.pending.state() > 0 {
            *self.cohort.lock() = CohortState::Running;
            let workers = self.spawn_cohort();
            if workers.is_empty() {
                thread::sleep(SPAWN_RETRY_DELAY);
                continue;
            }
            debug!(queue = %self.name, workers = workers.len(), "Worker cohort started");

            self.pending.wait();

            *self.cohort.lock() = CohortState::Draining;
            let (stops, handles): (Vec<_>, Vec<_>) =
                workers.into_iter().map(|w| (w.stop, w.handle)).unzip();
            drop(stops);
            for (worker_id, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    warn!(queue = %self.name, worker_id, "Worker exited abnormally");
                }
            }
            debug!(queue = %self.name, "Worker cohort stopped");
        }
        *self.cohort.lock() = CohortState::Idle;
    }

    fn spawn_cohort(self: &Arc<Self>) -> Vec<Worker> {
        let count = self.num_workers.load(Ordering::SeqCst);
        let mut workers = Vec::with_capacity(count);
        for worker_id in 0..count {
            let (stop_tx, stop_rx) = bounded::<()>(0);
            let inner = Arc::clone(self);
            let spawned = thread::Builder::new()
                .name(format!("{}-worker-{worker_id}", self.name))
                .spawn(move || inner.work(worker_id, &stop_rx));
            match spawned {
                Ok(handle) => workers.push(Worker {
                    stop: stop_tx,
                    handle,
                }),
                Err(e) => error!(
                    queue = %self.name,
                    worker_id,
                    error = %e,
                    "Failed to spawn worker thread"
                ),
            }
        }
        workers
    }

    fn work(&self, worker_id: usize, stop: &Receiver<()>) {
        loop {
            select! {
                recv(self.task_rx) -> msg => match msg {
                    Ok(task) => self.execute(worker_id, task),
                    // Every sender is gone: the queue was closed.
                    Err(_) => break,
                },
                recv(stop) -> _ => break,
            }
        }
    }

    fn execute(&self, worker_id: usize, task: Task) {
        if catch_unwind(AssertUnwindSafe(task)).is_err() {
            error!(queue = %self.name, worker_id, "Task panicked");
        }
        self.pending.done();
    }
}

/// Elastic worker pool consuming a rendezvous task channel.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.inner.name)
            .field("num_workers", &self.num_workers())
            .field("pending", &self.state())
            .field("cohort", &self.cohort_state())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    /// A single-worker queue: strict FIFO execution.
    #[must_use]
    pub fn new() -> Self {
        Self::with_workers(1)
    }

    /// A queue whose cohorts have `num_workers` workers (0 is treated as 1).
    #[must_use]
    pub fn with_workers(num_workers: usize) -> Self {
        Self::named(DEFAULT_QUEUE_NAME, num_workers)
    }

    /// Like [`TaskQueue::with_workers`], with `name` used for thread names and log fields.
    #[must_use]
    pub fn named(name: impl Into<String>, num_workers: usize) -> Self {
        let (task_tx, task_rx) = bounded::<Task>(0);
        Self {
            inner: Arc::new(QueueInner {
                name: name.into(),
                num_workers: AtomicUsize::new(num_workers.max(1)),
                pending: WaitableCounter::new(),
                supervisor: SingleFlight::new(),
                cohort: Mutex::new(CohortState::Idle),
                task_tx: Mutex::new(Some(task_tx)),
                task_rx,
            }),
        }
    }

    /// Set the cohort size for the next cohort. Zero is ignored. Returns the effective size.
    pub fn set_num_workers(&self, num_workers: usize) -> usize {
        if num_workers > 0 {
            self.inner.num_workers.store(num_workers, Ordering::SeqCst);
        }
        self.num_workers()
    }

    /// Current cohort size.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.inner.num_workers.load(Ordering::SeqCst)
    }

    /// Submit a task. Blocks until a worker accepts it.
    ///
    /// # Errors
    ///
    /// - [`SyncError::QueueClosed`] after [`TaskQueue::close`]
    /// - [`SyncError::Spawn`] if no supervisor thread could be started
    pub fn enqueue<F>(&self, task: F) -> Result<(), SyncError>
    where
        F: FnOnce() + Send + 'static,
    {
        let task_tx = self
            .inner
            .task_tx
            .lock()
            .clone()
            .ok_or(SyncError::QueueClosed)?;

        self.inner.pending.add(1);
        if let Err(e) = self.inner.ensure_running() {
            self.inner.pending.done();
            return Err(e);
        }
        if task_tx.send(Box::new(task)).is_err() {
            self.inner.pending.done();
            return Err(SyncError::QueueClosed);
        }
        Ok(())
    }

    /// Ensure a worker cohort is running if there is outstanding work.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Spawn`] if the supervisor thread could not be started.
    pub fn perform(&self) -> Result<(), SyncError> {
        if self.inner.pending.state() == 0 {
            return Ok(());
        }
        self.inner.ensure_running()
    }

    /// Block until all outstanding work, including work enqueued meanwhile, is done.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Spawn`] if the supervisor thread could not be started.
    pub fn flush(&self) -> Result<(), SyncError> {
        self.perform()?;
        self.inner.pending.wait();
        Ok(())
    }

    /// Flush, then reject all further submissions. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Spawn`] if the final flush could not start workers.
    pub fn close(&self) -> Result<(), SyncError> {
        self.flush()?;
        if self.inner.task_tx.lock().take().is_some() {
            debug!(queue = %self.inner.name, "Task queue closed");
        }
        Ok(())
    }

    /// True once [`TaskQueue::close`] has completed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.task_tx.lock().is_none()
    }

    /// Outstanding tasks: submitted (or being submitted) and not yet finished.
    #[must_use]
    pub fn state(&self) -> i64 {
        self.inner.pending.state()
    }

    /// Current worker cohort lifecycle state.
    #[must_use]
    pub fn cohort_state(&self) -> CohortState {
        *self.inner.cohort.lock()
    }
}
