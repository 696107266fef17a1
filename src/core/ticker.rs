//! Periodic multi-task scheduler that skips overlapping runs.
//!
//! Every tick, each roster entry is dispatched to an internal [`TaskQueue`]
//! unless the job for that entry's index from an earlier tick is still
//! running. Skipped periods are dropped, not queued: a slow entry simply runs
//! less often, and never concurrently with itself.
//!
//! Lifecycle: `NotStarted -> Started -> Stopping -> NotStarted`. Cancellation
//! is cooperative. The ticking loop notices it between ticks, and a job body
//! that has already started always runs to completion.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{Context, SyncError, TaskQueue, WaitableCounter};

/// Default interval between ticks.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

/// Default number of job workers (the ticking loop gets one extra).
pub const DEFAULT_NUM_WORKERS: usize = 10;

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Idle; `start` is allowed.
    NotStarted,
    /// Ticking and dispatching.
    Started,
    /// Cancelled; waiting for the ticking loop and in-flight jobs to finish.
    Stopping,
}

/// Roster indices whose previous job has not finished yet.
#[derive(Debug, Default)]
struct DedupBucket {
    in_flight: Mutex<HashSet<usize>>,
}

impl DedupBucket {
    /// Mark `index` in flight. False if it already was.
    fn try_mark(&self, index: usize) -> bool {
        self.in_flight.lock().insert(index)
    }

    fn clear(&self, index: usize) {
        self.in_flight.lock().remove(&index);
    }

    fn contains(&self, index: usize) -> bool {
        self.in_flight.lock().contains(&index)
    }

    fn len(&self) -> usize {
        self.in_flight.lock().len()
    }
}

/// Resources owned by one `start`..`stop` cycle.
#[derive(Debug)]
struct Run {
    cancel: Context,
    queue: TaskQueue,
}

#[derive(Debug)]
struct Control {
    state: SchedulerState,
    run: Option<Run>,
}

/// Decrements the outstanding count when dropped.
struct Outstanding(Arc<WaitableCounter>);

impl Drop for Outstanding {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Clears a roster index's in-flight marker (and its outstanding unit) when dropped,
/// including when the job panics or is never run.
struct InFlightSlot {
    index: usize,
    bucket: Arc<DedupBucket>,
    _outstanding: Outstanding,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.bucket.clear(self.index);
    }
}

struct TickLoop<P, F> {
    ctx: Context,
    queue: TaskQueue,
    period: Duration,
    roster: Arc<Vec<Arc<P>>>,
    job: Arc<F>,
    outstanding: Arc<WaitableCounter>,
    in_flight: Arc<DedupBucket>,
}

impl<P, F> TickLoop<P, F>
where
    P: Send + Sync + 'static,
    F: Fn(&Context, &P) + Send + Sync + 'static,
{
    fn run(self) {
        let _outstanding = Outstanding(Arc::clone(&self.outstanding));
        let ticks = tick(self.period);
        let cancelled = self.ctx.cancelled();
        let expiry = self.ctx.expiry();
        loop {
            select! {
                recv(cancelled) -> _ => break,
                recv(expiry) -> _ => break,
                recv(ticks) -> _ => self.dispatch(),
            }
        }
        info!("Ticker cancelled");
    }

    fn dispatch(&self) {
        for (index, param) in self.roster.iter().enumerate() {
            if self.ctx.is_done() {
                return;
            }
            if !self.in_flight.try_mark(index) {
                debug!(index, "Previous run still in flight, skipping tick");
                continue;
            }
            self.outstanding.add(1);
            let slot = InFlightSlot {
                index,
                bucket: Arc::clone(&self.in_flight),
                _outstanding: Outstanding(Arc::clone(&self.outstanding)),
            };
            let ctx = self.ctx.clone();
            let param = Arc::clone(param);
            let job = Arc::clone(&self.job);
            // On rejection the closure, and with it the slot, is dropped.
            if let Err(e) = self.queue.enqueue(move || {
                let _slot = slot;
                job(&ctx, param.as_ref());
            }) {
                warn!(index, error = %e, "Failed to dispatch scheduled job");
            }
        }
    }
}

/// Ticks a fixed roster of parameters, running `f(ctx, param)` for each entry
/// whose previous run has finished.
///
/// ```
/// use paddock::core::{Context, PeriodicDedupScheduler};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let runs = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&runs);
/// let mut scheduler = PeriodicDedupScheduler::new()
///     .with_period(Duration::from_millis(5))
///     .with_num_workers(2);
/// scheduler.set_tasks(["a", "b"]);
///
/// scheduler.start(&Context::background(), move |_ctx, _name| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// })?;
/// std::thread::sleep(Duration::from_millis(50));
/// scheduler.stop(&Context::background().with_timeout(Duration::from_secs(1)))?;
/// assert!(runs.load(Ordering::SeqCst) > 0);
/// # Ok::<(), paddock::core::SyncError>(())
/// ```
#[derive(Debug)]
pub struct PeriodicDedupScheduler<P> {
    period: Duration,
    num_workers: usize,
    roster: Vec<Arc<P>>,
    control: Arc<Mutex<Control>>,
    outstanding: Arc<WaitableCounter>,
    in_flight: Arc<DedupBucket>,
}

impl<P> Default for PeriodicDedupScheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PeriodicDedupScheduler<P> {
    /// A scheduler with the default period and worker count and an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            num_workers: DEFAULT_NUM_WORKERS,
            roster: Vec::new(),
            control: Arc::new(Mutex::new(Control {
                state: SchedulerState::NotStarted,
                run: None,
            })),
            outstanding: Arc::new(WaitableCounter::new()),
            in_flight: Arc::new(DedupBucket::default()),
        }
    }

    /// Set the tick interval. Takes effect on the next `start`.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the number of job workers (0 is treated as 1). Takes effect on the next `start`.
    #[must_use]
    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    /// Set the tick interval in place.
    pub fn set_period(&mut self, period: Duration) -> &mut Self {
        self.period = period;
        self
    }

    /// Set the number of job workers in place (0 is treated as 1).
    pub fn set_num_workers(&mut self, num_workers: usize) -> &mut Self {
        self.num_workers = num_workers.max(1);
        self
    }

    /// Append a roster entry; its index is the current roster length.
    pub fn add_task(&mut self, param: P) -> &mut Self {
        self.roster.push(Arc::new(param));
        self
    }

    /// Replace the roster.
    pub fn set_tasks<I>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = P>,
    {
        self.roster = params.into_iter().map(Arc::new).collect();
        self
    }

    /// Tick interval.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Number of job workers.
    #[must_use]
    pub const fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Number of roster entries.
    #[must_use]
    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        self.control.lock().state
    }

    /// True while started or still draining after `stop`.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state() != SchedulerState::NotStarted
    }

    /// True if the job for roster `index` is currently running or queued.
    #[must_use]
    pub fn is_in_flight(&self, index: usize) -> bool {
        self.in_flight.contains(index)
    }

    /// Number of roster entries with a job in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Outstanding units: the ticking loop (while running) plus in-flight jobs.
    #[must_use]
    pub fn outstanding(&self) -> i64 {
        self.outstanding.state()
    }

    /// Block until the ticking loop and every in-flight job have finished,
    /// with no deadline.
    pub fn stop_wait(&self) {
        self.outstanding.wait();
    }
}

impl<P> PeriodicDedupScheduler<P>
where
    P: Send + Sync + 'static,
{
    /// Start ticking, calling `f(ctx, param)` for each roster entry every period.
    ///
    /// `ctx` passed to `f` is a child of the given context, cancelled by `stop`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::AlreadyStarted`] if started or still stopping
    /// - [`SyncError::Spawn`] if the internal queue could not start
    pub fn start<F>(&self, ctx: &Context, f: F) -> Result<(), SyncError>
    where
        F: Fn(&Context, &P) + Send + Sync + 'static,
    {
        let mut control = self.control.lock();
        if control.state != SchedulerState::NotStarted {
            return Err(SyncError::AlreadyStarted);
        }

        let run_ctx = ctx.with_cancel();
        // The ticking loop holds one worker for the whole run.
        let queue = TaskQueue::named("paddock-ticker", self.num_workers.max(1).saturating_add(1));
        let ticker = TickLoop {
            ctx: run_ctx.clone(),
            queue: queue.clone(),
            period: self.period,
            roster: Arc::new(self.roster.clone()),
            job: Arc::new(f),
            outstanding: Arc::clone(&self.outstanding),
            in_flight: Arc::clone(&self.in_flight),
        };

        self.outstanding.add(1);
        if let Err(e) = queue.enqueue(move || ticker.run()) {
            self.outstanding.done();
            run_ctx.cancel();
            return Err(e);
        }

        control.state = SchedulerState::Started;
        control.run = Some(Run {
            cancel: run_ctx,
            queue,
        });
        info!(
            period_ms = u64::try_from(self.period.as_millis()).unwrap_or(u64::MAX),
            num_workers = self.num_workers,
            roster = self.roster.len(),
            "Ticker started"
        );
        Ok(())
    }
}

impl<P> PeriodicDedupScheduler<P> {
    /// Cancel ticking and wait for drain, bounded by `ctx`.
    ///
    /// On timeout the drain keeps going in the background; the scheduler
    /// returns to `NotStarted` once it completes.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotStarted`] if not started (or already stopping)
    /// - [`SyncError::Timeout`] if `ctx` is done before the drain finishes
    /// - [`SyncError::Spawn`] if the drain thread could not be started
    pub fn stop(&self, ctx: &Context) -> Result<(), SyncError> {
        {
            let mut control = self.control.lock();
            if control.state != SchedulerState::Started {
                return Err(SyncError::NotStarted);
            }
            let Some(run) = control.run.as_ref() else {
                return Err(SyncError::NotStarted);
            };
            run.cancel.cancel();
            control.state = SchedulerState::Stopping;
        }

        let (drained_tx, drained_rx) = bounded::<()>(1);
        let outstanding = Arc::clone(&self.outstanding);
        let control = Arc::clone(&self.control);
        let spawned = thread::Builder::new()
            .name("paddock-ticker-drain".into())
            .spawn(move || {
                outstanding.wait();
                let run = control.lock().run.take();
                if let Some(run) = run {
                    if let Err(e) = run.queue.close() {
                        warn!(error = %e, "Failed to close ticker queue");
                    }
                }
                control.lock().state = SchedulerState::NotStarted;
                info!("Ticker stopped");
                let _ = drained_tx.send(());
            });
        if let Err(e) = spawned {
            // Leave the run in place so a later stop can retry the drain.
            self.control.lock().state = SchedulerState::Started;
            return Err(SyncError::Spawn(e.to_string()));
        }

        match ctx.wait_for(&drained_rx) {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Ticker stop timed out; draining continues in background");
                Err(e)
            }
        }
    }
}

impl<P> Drop for PeriodicDedupScheduler<P> {
    fn drop(&mut self) {
        // Signal only; in-flight jobs finish on their own threads.
        if let Some(run) = self.control.lock().run.as_ref() {
            run.cancel.cancel();
        }
    }
}
