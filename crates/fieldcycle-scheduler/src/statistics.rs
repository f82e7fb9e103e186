//! Cycle timing statistics.
//!
//! Three quantities are tracked per cycle:
//! - **period**: time between consecutive actual wakeups
//! - **exec**: time spent in the cycle body
//! - **latency**: actual wakeup minus intended wakeup
//!
//! Each has a lifetime range and a window range that the owner drains
//! periodically with [`CycleStatistics::take_window`].

use std::vec::Vec;

/// Min/max of a nanosecond quantity. Empty until the first sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingRange {
    /// Smallest sample (ns), `u64::MAX` when empty
    pub min_ns: u64,
    /// Largest sample (ns)
    pub max_ns: u64,
    /// Number of samples
    pub samples: u64,
}

impl Default for TimingRange {
    fn default() -> Self {
        Self {
            min_ns: u64::MAX,
            max_ns: 0,
            samples: 0,
        }
    }
}

impl TimingRange {
    /// Record one sample
    #[inline]
    pub fn record(&mut self, ns: u64) {
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);
        self.samples = self.samples.saturating_add(1);
    }

    /// True if no sample was recorded
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// `(min, max)`, or `None` when empty
    pub fn bounds(&self) -> Option<(u64, u64)> {
        (!self.is_empty()).then_some((self.min_ns, self.max_ns))
    }

    /// Spread between largest and smallest sample
    pub fn spread_ns(&self) -> u64 {
        self.bounds().map_or(0, |(min, max)| max.saturating_sub(min))
    }
}

/// Ranges for one reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStatistics {
    /// Wakeup-to-wakeup period
    pub period: TimingRange,
    /// Body execution time
    pub exec: TimingRange,
    /// Wakeup latency
    pub latency: TimingRange,
    /// Overruns in this window
    pub overruns: u64,
}

/// Timing statistics for a cycle worker.
///
/// `record` is O(1) and allocation-free after construction; latency samples
/// for percentiles live in a preallocated ring buffer.
#[derive(Debug, Clone)]
pub struct CycleStatistics {
    /// Configured period (ns)
    pub period_ns: u64,

    /// Cycles recorded
    pub cycles: u64,

    /// Cycles whose execution exceeded the period
    pub overruns: u64,

    /// Lifetime ranges
    pub total: WindowStatistics,

    window: WindowStatistics,

    last_wakeup_ns: Option<u64>,

    latency_samples: Vec<u64>,
    max_samples: usize,
    next_sample_index: usize,
    percentile_scratch: Vec<u64>,
}

impl CycleStatistics {
    /// Default latency ring buffer size
    pub const DEFAULT_SAMPLES: usize = 10_000;

    /// Statistics for `period_ns` with the default sample capacity
    pub fn new(period_ns: u64) -> Self {
        Self::with_capacity(period_ns, Self::DEFAULT_SAMPLES)
    }

    /// Statistics keeping at most `max_samples` latency samples
    pub fn with_capacity(period_ns: u64, max_samples: usize) -> Self {
        Self {
            period_ns,
            cycles: 0,
            overruns: 0,
            total: WindowStatistics::default(),
            window: WindowStatistics::default(),
            last_wakeup_ns: None,
            latency_samples: Vec::with_capacity(max_samples),
            max_samples,
            next_sample_index: 0,
            percentile_scratch: Vec::with_capacity(max_samples),
        }
    }

    /// Record one cycle. Returns `true` if it overran the period.
    pub fn record(&mut self, actual_wakeup_ns: u64, latency_ns: u64, exec_ns: u64) -> bool {
        self.cycles = self.cycles.saturating_add(1);

        if let Some(prev) = self.last_wakeup_ns {
            let period = actual_wakeup_ns.saturating_sub(prev);
            self.window.period.record(period);
            self.total.period.record(period);
        }
        self.last_wakeup_ns = Some(actual_wakeup_ns);

        self.window.exec.record(exec_ns);
        self.total.exec.record(exec_ns);
        self.window.latency.record(latency_ns);
        self.total.latency.record(latency_ns);

        self.push_latency(latency_ns);

        let overrun = exec_ns > self.period_ns;
        if overrun {
            self.overruns = self.overruns.saturating_add(1);
            self.window.overruns = self.window.overruns.saturating_add(1);
            self.total.overruns = self.total.overruns.saturating_add(1);
        }
        overrun
    }

    fn push_latency(&mut self, latency_ns: u64) {
        if self.max_samples == 0 {
            return;
        }
        if self.latency_samples.len() < self.max_samples {
            self.latency_samples.push(latency_ns);
        } else if let Some(slot) = self.latency_samples.get_mut(self.next_sample_index) {
            *slot = latency_ns;
            self.next_sample_index = (self.next_sample_index + 1) % self.max_samples;
        }
    }

    /// Current window
    pub fn window(&self) -> &WindowStatistics {
        &self.window
    }

    /// Return the current window and start a new one
    pub fn take_window(&mut self) -> WindowStatistics {
        core::mem::take(&mut self.window)
    }

    /// Latency percentile over the retained samples (0.0 to 1.0)
    pub fn latency_percentile_ns(&mut self, percentile: f64) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }
        let percentile = percentile.clamp(0.0, 1.0);

        self.percentile_scratch.clear();
        self.percentile_scratch
            .extend_from_slice(&self.latency_samples);

        let len = self.percentile_scratch.len();
        let index = ((len as f64 * percentile) as usize).min(len.saturating_sub(1));
        let (_, value, _) = self.percentile_scratch.select_nth_unstable(index);
        *value
    }

    /// p99 wakeup latency
    pub fn p99_latency_ns(&mut self) -> u64 {
        self.latency_percentile_ns(0.99)
    }

    /// Fraction of cycles that overran
    pub fn overrun_rate(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.overruns as f64 / self.cycles as f64
        }
    }

    /// Number of retained latency samples
    pub fn sample_count(&self) -> usize {
        self.latency_samples.len()
    }
}

impl core::fmt::Display for CycleStatistics {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (pmin, pmax) = self.total.period.bounds().unwrap_or((0, 0));
        let (emin, emax) = self.total.exec.bounds().unwrap_or((0, 0));
        let (lmin, lmax) = self.total.latency.bounds().unwrap_or((0, 0));
        write!(
            f,
            "cycles={} overruns={} period=[{}, {}]ns exec=[{}, {}]ns latency=[{}, {}]ns",
            self.cycles, self.overruns, pmin, pmax, emin, emax, lmin, lmax
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_cycle_has_no_period_sample() {
        let mut stats = CycleStatistics::new(1_000);
        stats.record(10_000, 5, 100);
        assert!(stats.window().period.is_empty());
        assert_eq!(stats.window().exec.bounds(), Some((100, 100)));
    }

    #[test]
    fn test_period_exec_latency_ranges() {
        let mut stats = CycleStatistics::new(1_000);
        stats.record(10_000, 5, 100);
        stats.record(11_020, 25, 300);
        stats.record(11_990, 0, 200);

        let w = stats.window();
        assert_eq!(w.period.bounds(), Some((970, 1_020)));
        assert_eq!(w.exec.bounds(), Some((100, 300)));
        assert_eq!(w.latency.bounds(), Some((0, 25)));
        assert_eq!(stats.cycles, 3);
    }

    #[test]
    fn test_overrun_counted_not_fatal() {
        let mut stats = CycleStatistics::new(1_000);
        assert!(!stats.record(0, 0, 999));
        assert!(stats.record(1_000, 0, 1_500));
        assert_eq!(stats.overruns, 1);
        assert!((stats.overrun_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_take_window_resets_window_only() {
        let mut stats = CycleStatistics::new(1_000);
        stats.record(0, 1, 10);
        stats.record(1_000, 2, 20);

        let w = stats.take_window();
        assert_eq!(w.exec.samples, 2);
        assert!(stats.window().exec.is_empty());
        assert_eq!(stats.total.exec.samples, 2);

        stats.record(2_000, 3, 30);
        assert_eq!(stats.window().period.bounds(), Some((1_000, 1_000)));
    }

    #[test]
    fn test_latency_ring_buffer() {
        let mut stats = CycleStatistics::with_capacity(1_000, 3);
        for i in 1..=5u64 {
            stats.record(i * 1_000, i, 0);
        }
        assert_eq!(stats.sample_count(), 3);

        let mut sorted = stats.latency_samples.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![3, 4, 5]);
    }

    #[test]
    fn test_p99_latency() {
        let mut stats = CycleStatistics::new(1_000_000);
        for i in 0..100u64 {
            stats.record(i * 1_000_000, i * 1_000, 0);
        }
        let p99 = stats.p99_latency_ns();
        assert!((97_000..=99_000).contains(&p99), "p99 was {}", p99);
    }
}
