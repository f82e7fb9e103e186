//! Sink metrics

/// Counters collected by a sink. All counters are monotonically increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracingMetrics {
    /// Total number of cycle events emitted
    pub cycle_events_emitted: u64,

    /// Total number of app events emitted
    pub app_events_emitted: u64,

    /// Health transitions (domain and master)
    pub health_events: u64,

    /// Clock anomalies (backward jumps, saturation, missing reference)
    pub clock_anomalies: u64,

    /// Deadline overruns
    pub deadline_overruns: u64,

    /// Dropped snapshots reported
    pub snapshots_dropped: u64,
}

impl TracingMetrics {
    /// Create new metrics with zero values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no fault-class events were seen
    pub fn is_healthy(&self) -> bool {
        self.clock_anomalies == 0 && self.deadline_overruns == 0
    }

    /// Merge metrics from another instance
    pub fn merge(&mut self, other: &TracingMetrics) {
        self.cycle_events_emitted = self
            .cycle_events_emitted
            .saturating_add(other.cycle_events_emitted);
        self.app_events_emitted = self
            .app_events_emitted
            .saturating_add(other.app_events_emitted);
        self.health_events = self.health_events.saturating_add(other.health_events);
        self.clock_anomalies = self.clock_anomalies.saturating_add(other.clock_anomalies);
        self.deadline_overruns = self
            .deadline_overruns
            .saturating_add(other.deadline_overruns);
        self.snapshots_dropped = self
            .snapshots_dropped
            .saturating_add(other.snapshots_dropped);
    }
}

impl core::fmt::Display for TracingMetrics {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "TracingMetrics(cycle={}, app={}, health={}, clock={}, overruns={}, dropped={})",
            self.cycle_events_emitted,
            self.app_events_emitted,
            self.health_events,
            self.clock_anomalies,
            self.deadline_overruns,
            self.snapshots_dropped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_default_is_healthy() {
        let m = TracingMetrics::default();
        assert_eq!(m.cycle_events_emitted, 0);
        assert!(m.is_healthy());
    }

    #[test]
    fn test_metrics_merge_saturates() {
        let mut m1 = TracingMetrics {
            cycle_events_emitted: u64::MAX,
            deadline_overruns: 5,
            ..Default::default()
        };
        let m2 = TracingMetrics {
            cycle_events_emitted: 10,
            deadline_overruns: 3,
            ..Default::default()
        };

        m1.merge(&m2);

        assert_eq!(m1.cycle_events_emitted, u64::MAX);
        assert_eq!(m1.deadline_overruns, 8);
        assert!(!m1.is_healthy());
    }
}
