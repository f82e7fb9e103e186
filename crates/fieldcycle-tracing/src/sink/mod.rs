//! Observability sink trait and the sinks shipped with the crate

mod log;
mod recording;

use core::sync::atomic::{AtomicU64, Ordering};

pub use self::log::LogSink;
pub use self::recording::RecordingSink;

use crate::{AppTraceEvent, CycleEventCategory, CycleTraceEvent, TracingError, TracingMetrics};

/// Destination for health events and anomaly reports.
///
/// # RT-Safety Requirements
///
/// [`emit_cycle_event`](ObservabilitySink::emit_cycle_event) is called from
/// the cycle worker. Implementations must not block on locks held by
/// non-real-time code and must complete in bounded time.
///
/// [`emit_app_event`](ObservabilitySink::emit_app_event) is called from the
/// controller and may allocate or block.
pub trait ObservabilitySink: Send + Sync {
    /// Prepare the sink. Called once before the first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be initialized.
    fn initialize(&self) -> Result<(), TracingError> {
        Ok(())
    }

    /// Emit an event from the cycle worker
    fn emit_cycle_event(&self, event: CycleTraceEvent);

    /// Emit a controller lifecycle event
    fn emit_app_event(&self, event: AppTraceEvent);

    /// Get current sink metrics
    fn metrics(&self) -> TracingMetrics;

    /// Check if the sink is enabled
    fn is_enabled(&self) -> bool {
        true
    }

    /// Flush and release resources
    fn shutdown(&self) {}
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ObservabilitySink for NullSink {
    fn emit_cycle_event(&self, _event: CycleTraceEvent) {}

    fn emit_app_event(&self, _event: AppTraceEvent) {}

    fn metrics(&self) -> TracingMetrics {
        TracingMetrics::default()
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Lock-free counters behind [`TracingMetrics`].
#[derive(Debug, Default)]
pub(crate) struct SinkCounters {
    cycle_events: AtomicU64,
    app_events: AtomicU64,
    health: AtomicU64,
    clock: AtomicU64,
    overruns: AtomicU64,
    dropped: AtomicU64,
}

impl SinkCounters {
    #[inline]
    pub(crate) fn record_cycle(&self, event: &CycleTraceEvent) {
        self.cycle_events.fetch_add(1, Ordering::Relaxed);
        let counter = match event.category() {
            CycleEventCategory::Health => &self.health,
            CycleEventCategory::Clock => {
                if matches!(event, CycleTraceEvent::DcArmed { .. }) {
                    return;
                }
                &self.clock
            }
            CycleEventCategory::Timing => {
                if matches!(event, CycleTraceEvent::TimingWindow { .. }) {
                    return;
                }
                &self.overruns
            }
            CycleEventCategory::Buffer => &self.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_app(&self) {
        self.app_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> TracingMetrics {
        TracingMetrics {
            cycle_events_emitted: self.cycle_events.load(Ordering::Relaxed),
            app_events_emitted: self.app_events.load(Ordering::Relaxed),
            health_events: self.health.load(Ordering::Relaxed),
            clock_anomalies: self.clock.load(Ordering::Relaxed),
            deadline_overruns: self.overruns.load(Ordering::Relaxed),
            snapshots_dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_classify_events() {
        let counters = SinkCounters::default();
        counters.record_cycle(&CycleTraceEvent::DomainDegraded {
            cycle: 1,
            working_counter: 0,
            expected: 2,
        });
        counters.record_cycle(&CycleTraceEvent::DcArmed {
            cycle: 2,
            app_time_ns: 5,
            first_diff_ns: 100,
        });
        counters.record_cycle(&CycleTraceEvent::DriftSaturated {
            cycle: 3,
            adjustment_ns: 1000,
            clamp_ns: 1000,
        });
        counters.record_app();

        let m = counters.snapshot();
        assert_eq!(m.cycle_events_emitted, 3);
        assert_eq!(m.health_events, 1);
        assert_eq!(m.clock_anomalies, 1);
        assert_eq!(m.app_events_emitted, 1);
    }

    #[test]
    fn test_timing_window_is_not_an_overrun() {
        let counters = SinkCounters::default();
        counters.record_cycle(&CycleTraceEvent::TimingWindow {
            cycle: 99,
            cycles: 100,
            period_max_ns: 1_050_000,
            exec_max_ns: 40_000,
            latency_max_ns: 50_000,
            overruns: 0,
        });
        counters.record_cycle(&CycleTraceEvent::DeadlineOverrun {
            cycle: 100,
            exec_ns: 1_200_000,
            period_ns: 1_000_000,
        });

        let m = counters.snapshot();
        assert_eq!(m.cycle_events_emitted, 2);
        assert_eq!(m.deadline_overruns, 1);
    }

    #[test]
    fn test_null_sink_is_disabled() {
        let sink = NullSink;
        assert!(!sink.is_enabled());
        sink.emit_cycle_event(CycleTraceEvent::SnapshotDropped { cycle: 1 });
        assert_eq!(sink.metrics(), TracingMetrics::default());
    }
}
