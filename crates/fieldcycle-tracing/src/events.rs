//! Trace event definitions for the cycle worker and the controller

use core::fmt;

/// Events emitted from inside the cycle body.
///
/// Every variant is `Copy` and holds only scalars, so constructing and
/// passing one never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTraceEvent {
    /// Domain working counter dropped below the expected value
    DomainDegraded {
        /// Cycle index
        cycle: u64,
        /// Observed working counter
        working_counter: u16,
        /// Expected working counter
        expected: u16,
    },

    /// Domain working counter is back to the expected value
    DomainRecovered {
        /// Cycle index
        cycle: u64,
        /// Observed working counter
        working_counter: u16,
    },

    /// Master link or device state changed since the last poll
    MasterHealthChanged {
        /// Cycle index
        cycle: u64,
        /// Number of devices responding
        slaves_responding: u16,
        /// Bitwise OR of the application-layer states of all devices
        al_states: u8,
        /// Whether the master link is up
        link_up: bool,
    },

    /// Hardware clock read behind the applied time base
    ClockBackwardJump {
        /// Cycle index
        cycle: u64,
        /// Raw hardware clock read (ns)
        hardware_ns: u64,
        /// Time base offset that would have been subtracted (ns)
        time_base_ns: i64,
    },

    /// Drift filter armed on the first nonzero reference diff
    DcArmed {
        /// Cycle index
        cycle: u64,
        /// Application time at which the filter armed (ns)
        app_time_ns: u64,
        /// First normalized diff (ns)
        first_diff_ns: i64,
    },

    /// Cumulative drift adjustment hit the clamp bound
    DriftSaturated {
        /// Cycle index
        cycle: u64,
        /// Adjustment after clamping (ns)
        adjustment_ns: i64,
        /// Configured clamp bound (ns)
        clamp_ns: i64,
    },

    /// Reference device clock could not be read this cycle
    ReferenceClockUnavailable {
        /// Cycle index
        cycle: u64,
    },

    /// Cycle execution took longer than the period
    DeadlineOverrun {
        /// Cycle index
        cycle: u64,
        /// Execution time of the cycle (ns)
        exec_ns: u64,
        /// Configured period (ns)
        period_ns: u64,
    },

    /// Snapshot publication lost the race for the shared slot
    SnapshotDropped {
        /// Cycle index
        cycle: u64,
    },

    /// Worst-case timing of one statistics window
    TimingWindow {
        /// Last cycle of the window
        cycle: u64,
        /// Cycles in the window
        cycles: u64,
        /// Largest wakeup-to-wakeup period (ns)
        period_max_ns: u64,
        /// Largest body execution time (ns)
        exec_max_ns: u64,
        /// Largest wakeup latency (ns)
        latency_max_ns: u64,
        /// Overruns in the window
        overruns: u64,
    },
}

impl CycleTraceEvent {
    /// Returns the event type as a string for logging
    #[inline]
    pub const fn event_type(&self) -> &'static str {
        match self {
            CycleTraceEvent::DomainDegraded { .. } => "domain_degraded",
            CycleTraceEvent::DomainRecovered { .. } => "domain_recovered",
            CycleTraceEvent::MasterHealthChanged { .. } => "master_health_changed",
            CycleTraceEvent::ClockBackwardJump { .. } => "clock_backward_jump",
            CycleTraceEvent::DcArmed { .. } => "dc_armed",
            CycleTraceEvent::DriftSaturated { .. } => "drift_saturated",
            CycleTraceEvent::ReferenceClockUnavailable { .. } => "reference_clock_unavailable",
            CycleTraceEvent::DeadlineOverrun { .. } => "deadline_overrun",
            CycleTraceEvent::SnapshotDropped { .. } => "snapshot_dropped",
            CycleTraceEvent::TimingWindow { .. } => "timing_window",
        }
    }

    /// Returns the event category for filtering
    #[inline]
    pub const fn category(&self) -> CycleEventCategory {
        match self {
            CycleTraceEvent::DomainDegraded { .. }
            | CycleTraceEvent::DomainRecovered { .. }
            | CycleTraceEvent::MasterHealthChanged { .. } => CycleEventCategory::Health,
            CycleTraceEvent::ClockBackwardJump { .. }
            | CycleTraceEvent::DcArmed { .. }
            | CycleTraceEvent::DriftSaturated { .. }
            | CycleTraceEvent::ReferenceClockUnavailable { .. } => CycleEventCategory::Clock,
            CycleTraceEvent::DeadlineOverrun { .. } | CycleTraceEvent::TimingWindow { .. } => {
                CycleEventCategory::Timing
            }
            CycleTraceEvent::SnapshotDropped { .. } => CycleEventCategory::Buffer,
        }
    }

    /// Returns the cycle index associated with this event
    #[inline]
    pub const fn cycle(&self) -> u64 {
        match self {
            CycleTraceEvent::DomainDegraded { cycle, .. }
            | CycleTraceEvent::DomainRecovered { cycle, .. }
            | CycleTraceEvent::MasterHealthChanged { cycle, .. }
            | CycleTraceEvent::ClockBackwardJump { cycle, .. }
            | CycleTraceEvent::DcArmed { cycle, .. }
            | CycleTraceEvent::DriftSaturated { cycle, .. }
            | CycleTraceEvent::ReferenceClockUnavailable { cycle }
            | CycleTraceEvent::DeadlineOverrun { cycle, .. }
            | CycleTraceEvent::TimingWindow { cycle, .. }
            | CycleTraceEvent::SnapshotDropped { cycle } => *cycle,
        }
    }

    /// Returns true for anomalies that were corrected or clamped in place
    #[inline]
    pub const fn is_anomaly(&self) -> bool {
        matches!(
            self,
            CycleTraceEvent::ClockBackwardJump { .. }
                | CycleTraceEvent::DriftSaturated { .. }
                | CycleTraceEvent::DeadlineOverrun { .. }
        )
    }
}

/// Category for cycle trace events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEventCategory {
    /// Domain and master health transitions
    Health,
    /// Distributed-clock synchronization
    Clock,
    /// Scheduling and deadline events
    Timing,
    /// Process-data buffer events
    Buffer,
}

/// Controller lifecycle events. Not RT-safe: variants own strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppTraceEvent {
    /// A run started
    Started {
        /// Cycle period (ns)
        period_ns: u64,
        /// Scheduling policy description
        policy: String,
        /// Number of configured devices
        devices: usize,
    },

    /// A run stopped and the worker was joined
    Stopped {
        /// Cycles executed by the worker
        cycles: u64,
        /// Why the worker loop ended
        reason: String,
    },

    /// The master session refused to activate
    ActivationFailed {
        /// Reason reported by the master session
        reason: String,
    },

    /// The OS rejected the scheduling attributes
    SetupRejected {
        /// Reason reported by the scheduler
        reason: String,
    },

    /// The worker thread panicked
    WorkerPanicked,
}

impl AppTraceEvent {
    /// Returns the event category for filtering
    pub fn category(&self) -> AppEventCategory {
        match self {
            AppTraceEvent::Started { .. } | AppTraceEvent::Stopped { .. } => {
                AppEventCategory::Lifecycle
            }
            AppTraceEvent::ActivationFailed { .. }
            | AppTraceEvent::SetupRejected { .. }
            | AppTraceEvent::WorkerPanicked => AppEventCategory::Fault,
        }
    }
}

/// Category for application trace events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEventCategory {
    /// Start/stop transitions
    Lifecycle,
    /// Start aborted or worker lost
    Fault,
}

impl fmt::Display for CycleTraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleTraceEvent::DomainDegraded {
                cycle,
                working_counter,
                expected,
            } => write!(
                f,
                "DomainDegraded(cycle={}, wkc={}/{})",
                cycle, working_counter, expected
            ),
            CycleTraceEvent::DomainRecovered {
                cycle,
                working_counter,
            } => write!(f, "DomainRecovered(cycle={}, wkc={})", cycle, working_counter),
            CycleTraceEvent::MasterHealthChanged {
                cycle,
                slaves_responding,
                al_states,
                link_up,
            } => write!(
                f,
                "MasterHealthChanged(cycle={}, slaves={}, al=0x{:02X}, link={})",
                cycle,
                slaves_responding,
                al_states,
                if *link_up { "up" } else { "down" }
            ),
            CycleTraceEvent::ClockBackwardJump {
                cycle,
                hardware_ns,
                time_base_ns,
            } => write!(
                f,
                "ClockBackwardJump(cycle={}, hw={}ns, base={}ns)",
                cycle, hardware_ns, time_base_ns
            ),
            CycleTraceEvent::DcArmed {
                cycle,
                app_time_ns,
                first_diff_ns,
            } => write!(
                f,
                "DcArmed(cycle={}, app={}ns, diff={}ns)",
                cycle, app_time_ns, first_diff_ns
            ),
            CycleTraceEvent::DriftSaturated {
                cycle,
                adjustment_ns,
                clamp_ns,
            } => write!(
                f,
                "DriftSaturated(cycle={}, adj={}ns, clamp={}ns)",
                cycle, adjustment_ns, clamp_ns
            ),
            CycleTraceEvent::ReferenceClockUnavailable { cycle } => {
                write!(f, "ReferenceClockUnavailable(cycle={})", cycle)
            }
            CycleTraceEvent::DeadlineOverrun {
                cycle,
                exec_ns,
                period_ns,
            } => write!(
                f,
                "DeadlineOverrun(cycle={}, exec={}ns, period={}ns)",
                cycle, exec_ns, period_ns
            ),
            CycleTraceEvent::SnapshotDropped { cycle } => {
                write!(f, "SnapshotDropped(cycle={})", cycle)
            }
            CycleTraceEvent::TimingWindow {
                cycle,
                cycles,
                period_max_ns,
                exec_max_ns,
                latency_max_ns,
                overruns,
            } => write!(
                f,
                "TimingWindow(cycle={}, cycles={}, period_max={}ns, exec_max={}ns, latency_max={}ns, overruns={})",
                cycle, cycles, period_max_ns, exec_max_ns, latency_max_ns, overruns
            ),
        }
    }
}

impl fmt::Display for AppTraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppTraceEvent::Started {
                period_ns,
                policy,
                devices,
            } => write!(
                f,
                "Started(period={}ns, policy={}, devices={})",
                period_ns, policy, devices
            ),
            AppTraceEvent::Stopped { cycles, reason } => {
                write!(f, "Stopped(cycles={}, reason={})", cycles, reason)
            }
            AppTraceEvent::ActivationFailed { reason } => {
                write!(f, "ActivationFailed(reason={})", reason)
            }
            AppTraceEvent::SetupRejected { reason } => {
                write!(f, "SetupRejected(reason={})", reason)
            }
            AppTraceEvent::WorkerPanicked => write!(f, "WorkerPanicked"),
        }
    }
}
