//! Structured-logging sink

use super::{ObservabilitySink, SinkCounters};
use crate::{AppTraceEvent, CycleTraceEvent, TracingError, TracingMetrics};

/// Writes every event as a structured `tracing` record.
///
/// Health transitions log at `warn`/`info`, clock anomalies at `warn`,
/// buffer drops at `debug`. Events are formatted by the installed
/// subscriber, not here.
#[derive(Debug, Default)]
pub struct LogSink {
    counters: SinkCounters,
}

impl LogSink {
    /// Create a new log sink
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObservabilitySink for LogSink {
    fn initialize(&self) -> Result<(), TracingError> {
        tracing::debug!("Using structured-log observability sink");
        Ok(())
    }

    fn emit_cycle_event(&self, event: CycleTraceEvent) {
        self.counters.record_cycle(&event);
        match event {
            CycleTraceEvent::DomainDegraded {
                cycle,
                working_counter,
                expected,
            } => {
                tracing::warn!(cycle, working_counter, expected, "Domain degraded");
            }
            CycleTraceEvent::DomainRecovered {
                cycle,
                working_counter,
            } => {
                tracing::info!(cycle, working_counter, "Domain recovered");
            }
            CycleTraceEvent::MasterHealthChanged {
                cycle,
                slaves_responding,
                al_states,
                link_up,
            } => {
                tracing::info!(
                    cycle,
                    slaves_responding,
                    al_states,
                    link_up,
                    "Master state changed"
                );
            }
            CycleTraceEvent::ClockBackwardJump {
                cycle,
                hardware_ns,
                time_base_ns,
            } => {
                tracing::warn!(
                    cycle,
                    hardware_ns,
                    time_base_ns,
                    "Clock moved behind time base, using unadjusted time"
                );
            }
            CycleTraceEvent::DcArmed {
                cycle,
                app_time_ns,
                first_diff_ns,
            } => {
                tracing::info!(cycle, app_time_ns, first_diff_ns, "Drift filter armed");
            }
            CycleTraceEvent::DriftSaturated {
                cycle,
                adjustment_ns,
                clamp_ns,
            } => {
                tracing::warn!(cycle, adjustment_ns, clamp_ns, "Drift adjustment clamped");
            }
            CycleTraceEvent::ReferenceClockUnavailable { cycle } => {
                tracing::warn!(cycle, "Reference clock read failed, drift update skipped");
            }
            CycleTraceEvent::DeadlineOverrun {
                cycle,
                exec_ns,
                period_ns,
            } => {
                tracing::warn!(cycle, exec_ns, period_ns, "Cycle overran its period");
            }
            CycleTraceEvent::SnapshotDropped { cycle } => {
                tracing::debug!(cycle, "Snapshot dropped on contention");
            }
            CycleTraceEvent::TimingWindow {
                cycle,
                cycles,
                period_max_ns,
                exec_max_ns,
                latency_max_ns,
                overruns,
            } => {
                tracing::debug!(
                    cycle,
                    cycles,
                    period_max_ns,
                    exec_max_ns,
                    latency_max_ns,
                    overruns,
                    "Cycle timing window"
                );
            }
        }
    }

    fn emit_app_event(&self, event: AppTraceEvent) {
        self.counters.record_app();
        match &event {
            AppTraceEvent::Started {
                period_ns,
                policy,
                devices,
            } => {
                tracing::info!(
                    period_ns = *period_ns,
                    policy = %policy,
                    devices = *devices,
                    "Cyclic task started"
                );
            }
            AppTraceEvent::Stopped { cycles, reason } => {
                tracing::info!(cycles = *cycles, reason = %reason, "Cyclic task stopped");
            }
            AppTraceEvent::ActivationFailed { reason } => {
                tracing::error!(reason = %reason, "Master activation failed");
            }
            AppTraceEvent::SetupRejected { reason } => {
                tracing::error!(reason = %reason, "Real-time setup rejected");
            }
            AppTraceEvent::WorkerPanicked => {
                tracing::error!("Cycle worker panicked");
            }
        }
    }

    fn metrics(&self) -> TracingMetrics {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sink_counts_events() {
        let sink = LogSink::new();
        sink.emit_cycle_event(CycleTraceEvent::DeadlineOverrun {
            cycle: 7,
            exec_ns: 2_000,
            period_ns: 1_000,
        });
        sink.emit_app_event(AppTraceEvent::WorkerPanicked);

        let m = sink.metrics();
        assert_eq!(m.cycle_events_emitted, 1);
        assert_eq!(m.deadline_overruns, 1);
        assert_eq!(m.app_events_emitted, 1);
    }
}
