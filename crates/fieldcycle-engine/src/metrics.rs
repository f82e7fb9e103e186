//! Atomic counters shared between the cycle worker and observers.
//!
//! # RT Safety
//!
//! Every `inc_*` method is a single relaxed `fetch_add`: no allocation, no
//! blocking, no syscall. Snapshots are taken from non-RT threads.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// Cycles executed
    pub cycles: u64,
    /// Cycles whose domain was degraded
    pub degraded_cycles: u64,
    /// Master health changes observed
    pub master_health_changes: u64,
    /// Hardware clock reads behind the time base
    pub clock_anomalies: u64,
    /// Cycles without a readable reference clock
    pub reference_unavailable: u64,
    /// Filter windows whose adjustment was clamped
    pub drift_saturations: u64,
    /// Cycles whose execution exceeded the period
    pub overruns: u64,
}

impl CounterSnapshot {
    /// Fraction of cycles with a degraded domain
    pub fn degraded_rate(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.degraded_cycles as f64 / self.cycles as f64
        }
    }
}

impl fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} degraded={} health_changes={} clock_anomalies={} ref_unavailable={} saturations={} overruns={}",
            self.cycles,
            self.degraded_cycles,
            self.master_health_changes,
            self.clock_anomalies,
            self.reference_unavailable,
            self.drift_saturations,
            self.overruns
        )
    }
}

/// Engine counters, incremented from the cycle body.
#[derive(Debug, Default)]
pub struct EngineCounters {
    cycles: AtomicU64,
    degraded_cycles: AtomicU64,
    master_health_changes: AtomicU64,
    clock_anomalies: AtomicU64,
    reference_unavailable: AtomicU64,
    drift_saturations: AtomicU64,
    overruns: AtomicU64,
}

impl EngineCounters {
    /// All counters at zero
    pub const fn new() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            degraded_cycles: AtomicU64::new(0),
            master_health_changes: AtomicU64::new(0),
            clock_anomalies: AtomicU64::new(0),
            reference_unavailable: AtomicU64::new(0),
            drift_saturations: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
        }
    }

    /// One cycle executed
    #[inline]
    pub fn inc_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Domain degraded this cycle
    #[inline]
    pub fn inc_degraded(&self) {
        self.degraded_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Master health changed
    #[inline]
    pub fn inc_master_health_change(&self) {
        self.master_health_changes.fetch_add(1, Ordering::Relaxed);
    }

    /// Hardware clock behind the time base
    #[inline]
    pub fn inc_clock_anomaly(&self) {
        self.clock_anomalies.fetch_add(1, Ordering::Relaxed);
    }

    /// Reference clock read failed
    #[inline]
    pub fn inc_reference_unavailable(&self) {
        self.reference_unavailable.fetch_add(1, Ordering::Relaxed);
    }

    /// Drift adjustment clamped
    #[inline]
    pub fn inc_drift_saturation(&self) {
        self.drift_saturations.fetch_add(1, Ordering::Relaxed);
    }

    /// Cycle overran its period
    #[inline]
    pub fn inc_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            degraded_cycles: self.degraded_cycles.load(Ordering::Relaxed),
            master_health_changes: self.master_health_changes.load(Ordering::Relaxed),
            clock_anomalies: self.clock_anomalies.load(Ordering::Relaxed),
            reference_unavailable: self.reference_unavailable.load(Ordering::Relaxed),
            drift_saturations: self.drift_saturations.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }

    /// Read and zero all counters.
    ///
    /// **NOT RT-safe**: several atomic swaps. Call from non-RT code only.
    #[must_use]
    pub fn snapshot_and_reset(&self) -> CounterSnapshot {
        CounterSnapshot {
            cycles: self.cycles.swap(0, Ordering::Relaxed),
            degraded_cycles: self.degraded_cycles.swap(0, Ordering::Relaxed),
            master_health_changes: self.master_health_changes.swap(0, Ordering::Relaxed),
            clock_anomalies: self.clock_anomalies.swap(0, Ordering::Relaxed),
            reference_unavailable: self.reference_unavailable.swap(0, Ordering::Relaxed),
            drift_saturations: self.drift_saturations.swap(0, Ordering::Relaxed),
            overruns: self.overruns.swap(0, Ordering::Relaxed),
        }
    }

    /// Zero all counters.
    pub fn reset(&self) {
        let _ = self.snapshot_and_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increments_and_snapshot() {
        let counters = EngineCounters::new();
        counters.inc_cycle();
        counters.inc_cycle();
        counters.inc_degraded();
        counters.inc_overrun();

        let snap = counters.snapshot();
        assert_eq!(snap.cycles, 2);
        assert_eq!(snap.degraded_cycles, 1);
        assert_eq!(snap.overruns, 1);
        assert!((snap.degraded_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_and_reset() {
        let counters = EngineCounters::new();
        counters.inc_clock_anomaly();
        counters.inc_drift_saturation();

        let first = counters.snapshot_and_reset();
        assert_eq!(first.clock_anomalies, 1);
        assert_eq!(first.drift_saturations, 1);
        assert_eq!(counters.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn test_concurrent_increments() {
        let counters = std::sync::Arc::new(EngineCounters::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = std::sync::Arc::clone(&counters);
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        c.inc_cycle();
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }
        assert_eq!(counters.snapshot().cycles, 4_000);
    }
}
