//! Distributed-clock synchronization.
//!
//! The application clock is the OS clock minus a time base. In
//! master-follows-reference mode the time base is steered every cycle so that
//! the application clock tracks the reference device:
//!
//! ```text
//! raw_diff   = (prev_app_time mod 2^32) - reference_time      (wrapping)
//! delta      = raw_diff - prev_raw_diff
//! diff       = normalize(raw_diff, P)                          in [-P/2, P/2)
//! every N samples:
//!     adjustment += round(sum(delta) / N) + sign(sum(diff) / N)
//!     adjustment  = clamp(adjustment, -C, C)
//! time_base += adjustment + sign(diff)
//! ```
//!
//! Both operations are O(1) and allocation-free. Neither returns a `Result`:
//! anomalies come back as report values and the caller decides what to emit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use fieldcycle_scheduler::ClockSource;

use crate::config::{CycleConfig, SyncMode};
use crate::ports::MasterSession;

/// Source of hardware time in nanoseconds.
pub trait TimeSource: Send + 'static {
    /// Current hardware time (ns)
    fn now_ns(&self) -> u64;
}

impl TimeSource for ClockSource {
    #[inline]
    fn now_ns(&self) -> u64 {
        ClockSource::now_ns(*self)
    }
}

/// Hand-driven clock shared between a test and the cycle it drives.
#[derive(Debug, Clone, Default)]
pub struct ManualTime(Arc<AtomicU64>);

impl ManualTime {
    /// Clock reading `start_ns`
    pub fn new(start_ns: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start_ns)))
    }

    /// Jump to `ns`, forwards or backwards
    pub fn set(&self, ns: u64) {
        self.0.store(ns, Ordering::Release);
    }

    /// Move forward by `ns`
    pub fn advance(&self, ns: u64) {
        self.0.fetch_add(ns, Ordering::AcqRel);
    }
}

impl TimeSource for ManualTime {
    fn now_ns(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Filter parameters, fixed for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftParams {
    /// Cycle period P (ns), > 0
    pub period_ns: u64,
    /// Window size N, > 0
    pub window: u32,
    /// Bound C on the cumulative adjustment (ns)
    pub clamp_ns: i64,
    /// Which clock follows which
    pub mode: SyncMode,
}

impl From<&CycleConfig> for DriftParams {
    fn from(config: &CycleConfig) -> Self {
        Self {
            period_ns: config.period_ns,
            window: config.filter_window,
            clamp_ns: i64::from(config.drift_clamp_ns),
            mode: config.sync_mode,
        }
    }
}

/// Filter and application clock state. Zeroed at every start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockState {
    /// Application time handed to the master in the last `sync` (ns)
    pub app_time_ns: u64,
    /// Offset subtracted from hardware time (ns)
    pub time_base_ns: i64,
    /// Unnormalized diff against the reference clock (ns)
    pub raw_diff_ns: i32,
    /// Previous unnormalized diff (ns)
    pub prev_raw_diff_ns: i32,
    /// Sum of normalized diffs in the current window
    pub diff_total_ns: i64,
    /// Sum of diff deltas in the current window
    pub delta_total_ns: i64,
    /// Samples in the current window, `0..N`
    pub filter_index: u32,
    /// Cumulative adjustment, within `[-C, C]`
    pub adjustment_ns: i64,
    /// Armed on the first nonzero diff
    pub started: bool,
    /// Application time of the arming cycle (ns)
    pub start_app_time_ns: u64,
}

/// Hardware time behind the time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAnomaly {
    /// Raw hardware reading, returned unadjusted (ns)
    pub hardware_ns: u64,
    /// Time base that would have been subtracted (ns)
    pub time_base_ns: i64,
}

/// What `sync` observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Application time written to the master (ns)
    pub app_time_ns: u64,
    /// Set when the hardware clock read behind the time base
    pub anomaly: Option<ClockAnomaly>,
    /// Set when the reference clock could not be read
    pub reference_unavailable: bool,
}

/// What `update_drift` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftUpdate {
    /// Reference-follows-master mode: nothing to do
    Inactive,
    /// No valid reference diff this cycle
    Skipped,
    /// Waiting for the first nonzero diff
    Unarmed,
    /// Armed on this cycle
    Armed {
        /// First normalized diff (ns)
        first_diff_ns: i64,
        /// Application time of this cycle (ns)
        app_time_ns: u64,
    },
    /// Sample accumulated and spot correction applied
    Tracking,
    /// Window completed and the cumulative adjustment recomputed
    Adjusted {
        /// New cumulative adjustment (ns)
        adjustment_ns: i64,
        /// The unclamped value was outside `[-C, C]`
        saturated: bool,
    },
}

/// Reduce `diff` into `[-P/2, P/2)` by Euclidean modular reduction.
///
/// ```
/// use fieldcycle_engine::clock_sync::normalize_diff;
///
/// assert_eq!(normalize_diff(1_200_000, 1_000_000), 200_000);
/// assert_eq!(normalize_diff(-600_000, 1_000_000), 400_000);
/// assert_eq!(normalize_diff(500_000, 1_000_000), -500_000);
/// ```
#[inline]
pub fn normalize_diff(diff: i64, period_ns: u64) -> i64 {
    let period = i128::from(period_ns.max(1));
    let half = period / 2;
    let normalized = (i128::from(diff) + half).rem_euclid(period) - half;
    i64::try_from(normalized).unwrap_or(0)
}

/// Divide rounding half away from zero.
#[inline]
pub fn round_div(x: i64, n: i64) -> i64 {
    let n = n.max(1);
    if x >= 0 {
        x.saturating_add(n / 2) / n
    } else {
        x.saturating_sub(n / 2) / n
    }
}

/// Difference between the low 32 bits of `app_time_ns` and the 32-bit
/// reference register, as a signed value.
#[inline]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    reason = "the reference register is 32 bits wide"
)]
fn wrapping_diff(app_time_ns: u64, reference_ns: u32) -> i32 {
    (app_time_ns as u32).wrapping_sub(reference_ns) as i32
}

/// Per-run clock synchronizer, owned by the cycle worker.
#[derive(Debug)]
pub struct ClockSynchronizer<T = ClockSource> {
    params: DriftParams,
    state: ClockState,
    time: T,
    diff_valid: bool,
}

impl<T: TimeSource> ClockSynchronizer<T> {
    /// Synchronizer with zeroed state
    pub fn new(params: DriftParams, time: T) -> Self {
        Self {
            params,
            state: ClockState::default(),
            time,
            diff_valid: false,
        }
    }

    /// Zero the state
    pub fn reset(&mut self) {
        self.state = ClockState::default();
        self.diff_valid = false;
    }

    /// Current state
    pub fn state(&self) -> &ClockState {
        &self.state
    }

    /// Filter parameters
    pub fn params(&self) -> &DriftParams {
        &self.params
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut ClockState {
        &mut self.state
    }

    /// Hardware time minus the time base.
    ///
    /// # Errors
    ///
    /// [`ClockAnomaly`] when the time base is ahead of the hardware clock.
    /// The anomaly carries the unadjusted hardware time to use instead.
    #[inline]
    pub fn application_time(&self) -> Result<u64, ClockAnomaly> {
        let hardware_ns = self.time.now_ns();
        let base = self.state.time_base_ns;
        if base >= 0 {
            let base = base.unsigned_abs();
            if base > hardware_ns {
                return Err(ClockAnomaly {
                    hardware_ns,
                    time_base_ns: self.state.time_base_ns,
                });
            }
            Ok(hardware_ns - base)
        } else {
            Ok(hardware_ns.saturating_add(base.unsigned_abs()))
        }
    }

    /// Distributed-clock step run just before the frame is sent.
    pub fn sync<M: MasterSession + ?Sized>(&mut self, master: &mut M) -> SyncReport {
        let prev_app_time = self.state.app_time_ns;
        let (app_time_ns, anomaly) = match self.application_time() {
            Ok(ns) => (ns, None),
            Err(anomaly) => (anomaly.hardware_ns, Some(anomaly)),
        };
        self.state.app_time_ns = app_time_ns;
        master.set_application_time(app_time_ns);

        let mut reference_unavailable = false;
        match self.params.mode {
            SyncMode::MasterFollowsReference => match master.reference_clock_time() {
                Ok(reference_ns) => {
                    self.state.raw_diff_ns = wrapping_diff(prev_app_time, reference_ns);
                    self.diff_valid = true;
                }
                Err(_) => {
                    self.diff_valid = false;
                    reference_unavailable = true;
                }
            },
            SyncMode::ReferenceFollowsMaster => master.sync_reference_clock(),
        }
        master.sync_slave_clocks();

        SyncReport {
            app_time_ns,
            anomaly,
            reference_unavailable,
        }
    }

    /// Drift filter step run after the frame is sent.
    pub fn update_drift(&mut self) -> DriftUpdate {
        if self.params.mode != SyncMode::MasterFollowsReference {
            return DriftUpdate::Inactive;
        }
        if !self.diff_valid {
            return DriftUpdate::Skipped;
        }
        self.diff_valid = false;

        let s = &mut self.state;
        let raw = i64::from(s.raw_diff_ns);
        let delta = raw - i64::from(s.prev_raw_diff_ns);
        s.prev_raw_diff_ns = s.raw_diff_ns;
        let diff = normalize_diff(raw, self.params.period_ns);

        if !s.started {
            if diff == 0 {
                return DriftUpdate::Unarmed;
            }
            s.started = true;
            s.start_app_time_ns = s.app_time_ns;
            return DriftUpdate::Armed {
                first_diff_ns: diff,
                app_time_ns: s.app_time_ns,
            };
        }

        s.diff_total_ns = s.diff_total_ns.saturating_add(diff);
        s.delta_total_ns = s.delta_total_ns.saturating_add(delta);
        s.filter_index = s.filter_index.saturating_add(1);

        let mut update = DriftUpdate::Tracking;
        if s.filter_index >= self.params.window {
            let n = i64::from(self.params.window.max(1));
            let unclamped = s
                .adjustment_ns
                .saturating_add(round_div(s.delta_total_ns, n))
                .saturating_add((s.diff_total_ns / n).signum());
            let clamp = self.params.clamp_ns.abs();
            s.adjustment_ns = unclamped.clamp(-clamp, clamp);

            s.diff_total_ns = 0;
            s.delta_total_ns = 0;
            s.filter_index = 0;

            update = DriftUpdate::Adjusted {
                adjustment_ns: s.adjustment_ns,
                saturated: s.adjustment_ns != unclamped,
            };
        }

        s.time_base_ns = s
            .time_base_ns
            .saturating_add(s.adjustment_ns.saturating_add(diff.signum()));
        update
    }
}
