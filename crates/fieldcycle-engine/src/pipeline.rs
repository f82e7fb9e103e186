//! The per-cycle I/O sequence against a master session.
//!
//! One [`MasterIoPipeline::execute`] call per cycle, in a fixed order:
//!
//! 1. `receive`
//! 2. `process_domain`
//! 3. domain health, and master health every `master_health_interval` cycles
//! 4. snapshot every device's input and output range and publish it
//! 5. write the held output command of every device into the domain
//! 6. `queue_domain`
//! 7. distributed-clock `sync`
//! 8. `send`
//! 9. drift filter update
//!
//! # RT Safety
//!
//! After construction nothing here allocates except snapshot delivery to
//! subscribers. Shared state is only touched through `try_lock`; health and
//! clock anomalies leave the cycle as `Copy` trace events.

use std::sync::Arc;

use fieldcycle_scheduler::{ClockSource, CycleBody, CycleContext, WindowStatistics};
use fieldcycle_tracing::{CycleTraceEvent, TracingManager};

use crate::clock_sync::{ClockSynchronizer, DriftParams, DriftUpdate, SyncReport, TimeSource};
use crate::config::CycleConfig;
use crate::metrics::EngineCounters;
use crate::ports::{MasterHealth, MasterSession};
use crate::process_data::{ProcessDataBuffer, ProcessDataSnapshot};
use crate::topology::Topology;

/// Handles shared between the controller and the pipeline it launches.
#[derive(Debug, Clone)]
pub struct PipelineShared {
    /// Validated device table
    pub topology: Arc<Topology>,
    /// Process-data exchange
    pub buffer: Arc<ProcessDataBuffer>,
    /// Event sink
    pub tracing: TracingManager,
    /// Run counters
    pub counters: Arc<EngineCounters>,
}

impl PipelineShared {
    /// Fresh buffer and counters for `topology`
    pub fn new(topology: Topology, tracing: TracingManager) -> Self {
        let buffer = Arc::new(ProcessDataBuffer::new(&topology));
        Self {
            topology: Arc::new(topology),
            buffer,
            tracing,
            counters: Arc::new(EngineCounters::new()),
        }
    }
}

/// Cycle body driving one master session.
#[derive(Debug)]
pub struct MasterIoPipeline<M, T = ClockSource> {
    master: M,
    clock: ClockSynchronizer<T>,
    shared: PipelineShared,
    health_interval: u32,
    health_countdown: u32,
    domain_degraded: bool,
    reference_lost: bool,
    last_master_health: Option<MasterHealth>,
    held_outputs: Vec<Vec<u8>>,
    held_generation: u64,
    snapshot: ProcessDataSnapshot,
}

impl<M: MasterSession> MasterIoPipeline<M> {
    /// Pipeline reading application time from the configured OS clock
    pub fn new(master: M, shared: PipelineShared, config: &CycleConfig) -> Self {
        Self::with_time_source(master, shared, config, config.clock)
    }
}

impl<M: MasterSession, T: TimeSource> MasterIoPipeline<M, T> {
    /// Pipeline reading application time from `time`.
    ///
    /// Clock state starts zeroed and the held outputs start from the
    /// buffer's current output image.
    pub fn with_time_source(master: M, shared: PipelineShared, config: &CycleConfig, time: T) -> Self {
        let image = shared.buffer.output_image();
        let snapshot = ProcessDataSnapshot::for_topology(&shared.topology);
        Self {
            master,
            clock: ClockSynchronizer::new(DriftParams::from(config), time),
            health_interval: config.health_interval_cycles(),
            health_countdown: 0,
            domain_degraded: false,
            reference_lost: false,
            last_master_health: None,
            held_outputs: image.devices,
            held_generation: image.generation,
            snapshot,
            shared,
        }
    }

    /// Run one cycle.
    pub fn execute(&mut self, cycle: u64) {
        self.master.receive();
        self.master.process_domain();
        self.check_health(cycle);
        self.publish_snapshot(cycle);
        self.apply_outputs();
        self.master.queue_domain();
        let report = self.clock.sync(&mut self.master);
        self.report_sync(cycle, &report);
        self.master.send();
        let update = self.clock.update_drift();
        self.report_drift(cycle, update);
        self.shared.counters.inc_cycle();
    }

    fn check_health(&mut self, cycle: u64) {
        let tracing = &self.shared.tracing;
        let domain = self.master.domain_health();
        if domain.is_degraded() {
            self.shared.counters.inc_degraded();
            if !self.domain_degraded {
                self.domain_degraded = true;
                tracing.emit_cycle_event(CycleTraceEvent::DomainDegraded {
                    cycle,
                    working_counter: domain.working_counter,
                    expected: domain.expected_working_counter,
                });
            }
        } else if self.domain_degraded {
            self.domain_degraded = false;
            tracing.emit_cycle_event(CycleTraceEvent::DomainRecovered {
                cycle,
                working_counter: domain.working_counter,
            });
        }

        if self.health_countdown == 0 {
            self.health_countdown = self.health_interval;
            let health = self.master.master_health();
            if self.last_master_health != Some(health) {
                self.last_master_health = Some(health);
                self.shared.counters.inc_master_health_change();
                tracing.emit_cycle_event(CycleTraceEvent::MasterHealthChanged {
                    cycle,
                    slaves_responding: health.slaves_responding,
                    al_states: health.al_states,
                    link_up: health.link_up,
                });
            }
        }
        self.health_countdown = self.health_countdown.saturating_sub(1);
    }

    fn publish_snapshot(&mut self, cycle: u64) {
        let topology = &self.shared.topology;
        let domain = self.master.domain_data();
        self.snapshot.cycle = cycle;
        self.snapshot.app_time_ns = self
            .clock
            .application_time()
            .unwrap_or_else(|anomaly| anomaly.hardware_ns);

        for (device, entry) in self.snapshot.inputs.iter_mut().enumerate() {
            if let Some(src) = topology.input(device, domain) {
                if entry.bytes.len() == src.len() {
                    entry.bytes.copy_from_slice(src);
                }
            }
        }
        for (device, entry) in self.snapshot.outputs.iter_mut().enumerate() {
            if let Some(src) = topology.output(device, domain) {
                if entry.bytes.len() == src.len() {
                    entry.bytes.copy_from_slice(src);
                }
            }
        }

        if !self.shared.buffer.try_publish(&self.snapshot) {
            self.shared
                .tracing
                .emit_cycle_event(CycleTraceEvent::SnapshotDropped { cycle });
        }
    }

    fn apply_outputs(&mut self) {
        // On contention the previous cycle's outputs are written again.
        self.shared
            .buffer
            .try_load_outputs(&mut self.held_outputs, &mut self.held_generation);

        let topology = &self.shared.topology;
        let domain = self.master.domain_data_mut();
        for (device, held) in self.held_outputs.iter().enumerate() {
            if let Some(dst) = topology.output_mut(device, domain) {
                if dst.len() == held.len() {
                    dst.copy_from_slice(held);
                }
            }
        }
    }

    fn report_sync(&mut self, cycle: u64, report: &SyncReport) {
        if let Some(anomaly) = report.anomaly {
            self.shared.counters.inc_clock_anomaly();
            self.shared
                .tracing
                .emit_cycle_event(CycleTraceEvent::ClockBackwardJump {
                    cycle,
                    hardware_ns: anomaly.hardware_ns,
                    time_base_ns: anomaly.time_base_ns,
                });
        }

        if report.reference_unavailable {
            self.shared.counters.inc_reference_unavailable();
            if !self.reference_lost {
                self.reference_lost = true;
                self.shared
                    .tracing
                    .emit_cycle_event(CycleTraceEvent::ReferenceClockUnavailable { cycle });
            }
        } else {
            self.reference_lost = false;
        }
    }

    fn report_drift(&mut self, cycle: u64, update: DriftUpdate) {
        match update {
            DriftUpdate::Armed {
                first_diff_ns,
                app_time_ns,
            } => self.shared.tracing.emit_cycle_event(CycleTraceEvent::DcArmed {
                cycle,
                app_time_ns,
                first_diff_ns,
            }),
            DriftUpdate::Adjusted {
                adjustment_ns,
                saturated: true,
            } => {
                self.shared.counters.inc_drift_saturation();
                self.shared
                    .tracing
                    .emit_cycle_event(CycleTraceEvent::DriftSaturated {
                        cycle,
                        adjustment_ns,
                        clamp_ns: self.clock.params().clamp_ns,
                    });
            }
            _ => {}
        }
    }

    /// Master session
    pub fn master(&self) -> &M {
        &self.master
    }

    /// Clock synchronizer
    pub fn clock(&self) -> &ClockSynchronizer<T> {
        &self.clock
    }

    /// Shared handles
    pub fn shared(&self) -> &PipelineShared {
        &self.shared
    }

    /// Give the master session back
    pub fn into_master(self) -> M {
        self.master
    }
}

impl<M: MasterSession, T: TimeSource> CycleBody for MasterIoPipeline<M, T> {
    fn run_cycle(&mut self, ctx: &CycleContext) {
        self.execute(ctx.cycle);
    }

    fn on_overrun(&mut self, ctx: &CycleContext, exec_ns: u64) {
        self.shared.counters.inc_overrun();
        self.shared
            .tracing
            .emit_cycle_event(CycleTraceEvent::DeadlineOverrun {
                cycle: ctx.cycle,
                exec_ns,
                period_ns: ctx.period_ns,
            });
    }

    fn on_window(&mut self, ctx: &CycleContext, window: &WindowStatistics) {
        self.shared
            .tracing
            .emit_cycle_event(CycleTraceEvent::TimingWindow {
                cycle: ctx.cycle,
                cycles: window.exec.samples,
                period_max_ns: window.period.max_ns,
                exec_max_ns: window.exec.max_ns,
                latency_max_ns: window.latency.max_ns,
                overruns: window.overruns,
            });
    }
}
