//! Worker thread lifecycle: launch with a setup handshake, cooperative
//! stop, join with body recovery.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendError, Sender};
use fieldcycle_errors::ValidationError;
use tracing::{debug, warn};

use crate::error::SchedulerError;
use crate::rt_setup::RTSetup;
use crate::scheduler::{AbsoluteScheduler, CycleContext};
use crate::statistics::{CycleStatistics, WindowStatistics};
use crate::NSEC_PER_SEC;

/// Work executed once per wakeup.
///
/// Implemented for any `FnMut(&CycleContext) + Send + 'static`.
pub trait CycleBody: Send + 'static {
    /// Run one cycle. Never interrupted by a stop request.
    fn run_cycle(&mut self, ctx: &CycleContext);

    /// Called after a cycle whose execution exceeded the period.
    fn on_overrun(&mut self, _ctx: &CycleContext, _exec_ns: u64) {}

    /// Called with the drained statistics window after the cycle `ctx`
    /// that closed it.
    fn on_window(&mut self, _ctx: &CycleContext, _window: &WindowStatistics) {}
}

/// Consecutive failed absolute sleeps tolerated before the worker gives up
pub const MAX_CONSECUTIVE_SLEEP_FAILURES: u32 = 16;

/// Default statistics windows per second
pub const DEFAULT_STATS_WINDOW_HZ: u64 = 10;

impl<F> CycleBody for F
where
    F: FnMut(&CycleContext) + Send + 'static,
{
    fn run_cycle(&mut self, ctx: &CycleContext) {
        self(ctx)
    }
}

/// Launch parameters for a [`CycleScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Cycle period (ns), must be > 0
    pub period_ns: u64,
    /// Scheduling attributes applied by the worker to itself
    pub setup: RTSetup,
    /// Stop on its own after this long
    pub run_duration: Option<Duration>,
    /// Worker thread name
    pub thread_name: String,
    /// Latency samples kept for percentiles
    pub stats_capacity: usize,
    /// Cycles per statistics window handed to [`CycleBody::on_window`];
    /// 0 never drains
    pub stats_window_cycles: u64,
}

impl SchedulerConfig {
    /// Config with the default RT setup and no run bound
    pub fn new(period_ns: u64) -> Self {
        Self {
            period_ns,
            setup: RTSetup::default(),
            run_duration: None,
            thread_name: "fieldcycle-rt".to_string(),
            stats_capacity: CycleStatistics::DEFAULT_SAMPLES,
            stats_window_cycles: default_window_cycles(period_ns),
        }
    }

    /// Set the RT setup
    pub fn with_setup(mut self, setup: RTSetup) -> Self {
        self.setup = setup;
        self
    }

    /// Stop after `duration`
    pub fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_duration = Some(duration);
        self
    }

    /// Set the worker thread name
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the latency sample capacity
    pub fn with_stats_capacity(mut self, capacity: usize) -> Self {
        self.stats_capacity = capacity;
        self
    }

    /// Drain a statistics window every `cycles` cycles, 0 to disable
    pub fn with_stats_window(mut self, cycles: u64) -> Self {
        self.stats_window_cycles = cycles;
        self
    }

    /// Validate period, policy and affinity.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.period_ns == 0 {
            return Err(ValidationError::out_of_range(
                "period_ns",
                self.period_ns,
                1,
                u64::MAX,
            ));
        }
        self.setup.validate()
    }
}

/// Why a worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `request_stop` was observed before a wait
    Stopped,
    /// The configured run duration elapsed
    DurationElapsed,
    /// The OS rejected the RT setup; no cycle ran
    SetupRejected,
    /// The absolute sleep failed [`MAX_CONSECUTIVE_SLEEP_FAILURES`] times in a row
    SleepFailed,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Stopped => write!(f, "stop requested"),
            ExitReason::DurationElapsed => write!(f, "run duration elapsed"),
            ExitReason::SetupRejected => write!(f, "rt setup rejected"),
            ExitReason::SleepFailed => write!(f, "absolute sleep kept failing"),
        }
    }
}

/// Everything a finished worker hands back.
#[derive(Debug)]
pub struct WorkerExit<B> {
    /// The cycle body, returned to the owner
    pub body: B,
    /// Timing statistics for the whole run
    pub statistics: CycleStatistics,
    /// Why the loop ended
    pub reason: ExitReason,
}

/// A failed launch. The body is returned unless the worker panicked.
pub struct LaunchError<B> {
    /// What went wrong
    pub error: SchedulerError,
    /// The body passed to `run`, if it survived
    pub body: Option<B>,
}

impl<B> fmt::Debug for LaunchError<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchError")
            .field("error", &self.error)
            .field("body_recovered", &self.body.is_some())
            .finish()
    }
}

impl<B> fmt::Display for LaunchError<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl<B> std::error::Error for LaunchError<B> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Shared cancellation flag. Cloneable, idempotent, non-blocking.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Fresh, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to exit before its next wait
    #[inline]
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a stop was requested
    #[inline]
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Validated launcher for cycle workers.
#[derive(Debug, Clone)]
pub struct CycleScheduler {
    config: SchedulerConfig,
}

impl CycleScheduler {
    /// Validate `config` and keep it for launches.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] for a zero period, an out-of-range
    /// priority, a bad deadline budget or duplicate CPUs.
    pub fn configure(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Launch one worker thread running `body` every period.
    ///
    /// The worker applies the RT setup to itself and reports back before the
    /// first wait; this call blocks on that report.
    ///
    /// # Errors
    ///
    /// Thread creation failure or RT setup rejection. The body is handed back
    /// in the error.
    pub fn run<B: CycleBody>(&self, body: B) -> Result<CycleWorker<B>, LaunchError<B>> {
        let stop = StopHandle::new();
        let cycles = Arc::new(AtomicU64::new(0));
        let (body_tx, body_rx) = channel::bounded::<B>(1);
        let (ready_tx, ready_rx) = channel::bounded::<Result<(), SchedulerError>>(1);

        let worker_stop = stop.clone();
        let worker_cycles = Arc::clone(&cycles);
        let config = self.config.clone();
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker_main(config, worker_stop, worker_cycles, body_rx, ready_tx));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                return Err(LaunchError {
                    error: SchedulerError::Spawn(e),
                    body: Some(body),
                });
            }
        };

        if let Err(SendError(body)) = body_tx.send(body) {
            let error = match handle.join() {
                Err(_) => SchedulerError::WorkerPanicked,
                Ok(_) => SchedulerError::WorkerLost,
            };
            return Err(LaunchError {
                error,
                body: Some(body),
            });
        }

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(CycleWorker {
                handle: Some(handle),
                stop,
                cycles,
            }),
            Ok(Err(error)) => {
                let body = match handle.join() {
                    Ok(Some(exit)) => Some(exit.body),
                    Ok(None) | Err(_) => None,
                };
                Err(LaunchError { error, body })
            }
            Err(_) => {
                let error = match handle.join() {
                    Err(_) => SchedulerError::WorkerPanicked,
                    Ok(_) => SchedulerError::WorkerLost,
                };
                Err(LaunchError { error, body: None })
            }
        }
    }
}

/// Handle to a running worker thread.
///
/// Dropping the handle requests a stop and joins.
pub struct CycleWorker<B: CycleBody> {
    handle: Option<JoinHandle<Option<WorkerExit<B>>>>,
    stop: StopHandle,
    cycles: Arc<AtomicU64>,
}

impl<B: CycleBody> CycleWorker<B> {
    /// Ask the worker to exit before its next wait. Idempotent.
    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// A cloneable stop flag for other threads
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// True once the worker thread has exited (stopped, elapsed or panicked)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cycles completed so far
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Block until the worker has exited and take back the body.
    ///
    /// Does not request a stop by itself.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::WorkerPanicked`] if the body panicked.
    pub fn join(mut self) -> Result<WorkerExit<B>, SchedulerError> {
        let handle = self.handle.take().ok_or(SchedulerError::WorkerLost)?;
        match handle.join() {
            Ok(Some(exit)) => Ok(exit),
            Ok(None) => Err(SchedulerError::WorkerLost),
            Err(_) => Err(SchedulerError::WorkerPanicked),
        }
    }
}

impl<B: CycleBody> fmt::Debug for CycleWorker<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleWorker")
            .field("finished", &self.is_finished())
            .field("stop_requested", &self.stop.is_stop_requested())
            .field("cycles", &self.cycles_completed())
            .finish()
    }
}

impl<B: CycleBody> Drop for CycleWorker<B> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            warn!("Cycle worker dropped while running - forcing stop");
            self.stop.request_stop();
            if handle.join().is_err() {
                warn!("Cycle worker panicked during forced stop");
            }
        }
    }
}

fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

fn default_window_cycles(period_ns: u64) -> u64 {
    (NSEC_PER_SEC / DEFAULT_STATS_WINDOW_HZ)
        .checked_div(period_ns)
        .unwrap_or(1)
        .max(1)
}

/// Run of failed sleeps since the last successful wakeup.
#[derive(Debug, Clone, Copy, Default)]
struct SleepFailures(u32);

impl SleepFailures {
    /// Count one failure; true once the run reaches the bound
    fn fail(&mut self) -> bool {
        self.0 = self.0.saturating_add(1);
        self.0 >= MAX_CONSECUTIVE_SLEEP_FAILURES
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Cycles recorded into the current statistics window.
#[derive(Debug, Clone, Copy)]
struct WindowFill {
    length: u64,
    filled: u64,
}

impl WindowFill {
    fn new(length: u64) -> Self {
        Self { length, filled: 0 }
    }

    /// Count one cycle; true when the window is full and restarts
    fn tick(&mut self) -> bool {
        if self.length == 0 {
            return false;
        }
        self.filled = self.filled.saturating_add(1);
        if self.filled >= self.length {
            self.filled = 0;
            true
        } else {
            false
        }
    }
}

fn worker_main<B: CycleBody>(
    config: SchedulerConfig,
    stop: StopHandle,
    cycles: Arc<AtomicU64>,
    body_rx: Receiver<B>,
    ready_tx: Sender<Result<(), SchedulerError>>,
) -> Option<WorkerExit<B>> {
    let mut body = body_rx.recv().ok()?;
    let mut scheduler = AbsoluteScheduler::new(config.period_ns, config.setup.clock);
    let mut statistics = CycleStatistics::with_capacity(config.period_ns, config.stats_capacity);

    if let Err(error) = scheduler.apply_rt_setup(&config.setup) {
        if ready_tx.send(Err(error)).is_err() {
            debug!("Launcher gone before setup report");
        }
        return Some(WorkerExit {
            body,
            statistics,
            reason: ExitReason::SetupRejected,
        });
    }
    if ready_tx.send(Ok(())).is_err() {
        debug!("Launcher gone before setup report");
    }

    scheduler.restart();
    let end_ns = config
        .run_duration
        .map(|d| scheduler.now_ns().saturating_add(duration_ns(d)));

    debug!(
        period_ns = config.period_ns,
        policy = %config.setup.policy,
        clock = %config.setup.clock,
        "Cycle worker started"
    );

    let mut sleep_failures = SleepFailures::default();
    let mut window = WindowFill::new(config.stats_window_cycles);

    let reason = loop {
        if stop.is_stop_requested() {
            break ExitReason::Stopped;
        }
        if end_ns.is_some_and(|end| scheduler.now_ns() >= end) {
            break ExitReason::DurationElapsed;
        }

        let ctx = match scheduler.wait_for_tick() {
            Ok(ctx) => {
                sleep_failures.reset();
                ctx
            }
            Err(e) => {
                warn!(error = %e, cycle = scheduler.tick_count(), "Absolute sleep failed, cycle skipped");
                if sleep_failures.fail() {
                    break ExitReason::SleepFailed;
                }
                continue;
            }
        };

        let exec_start = scheduler.now_ns();
        body.run_cycle(&ctx);
        let exec_ns = scheduler.now_ns().saturating_sub(exec_start);

        if statistics.record(ctx.actual_ns, ctx.latency_ns, exec_ns) {
            body.on_overrun(&ctx, exec_ns);
        }
        if window.tick() {
            let drained = statistics.take_window();
            body.on_window(&ctx, &drained);
        }
        cycles.fetch_add(1, Ordering::Relaxed);
    };

    debug!(cycles = statistics.cycles, reason = %reason, "Cycle worker exiting");
    Some(WorkerExit {
        body,
        statistics,
        reason,
    })
}
