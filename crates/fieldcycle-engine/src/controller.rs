//! Start/stop state machine around one cycle worker.
//!
//! ```text
//! Idle --start--> Running --stop--> Stopping --join--> Idle
//! ```
//!
//! The controller owns the master session while idle. `start` moves it into
//! the worker's pipeline and `stop` takes it back from `join`, so a
//! controller can be started again after every stop.

use std::sync::Arc;

use fieldcycle_errors::LifecycleError;
use fieldcycle_scheduler::{CycleScheduler, CycleStatistics, CycleWorker, ExitReason, LaunchError};
use fieldcycle_tracing::{AppTraceEvent, TracingManager};

use crate::config::CycleConfig;
use crate::error::EngineResult;
use crate::metrics::{CounterSnapshot, EngineCounters};
use crate::pipeline::{MasterIoPipeline, PipelineShared};
use crate::ports::MasterSession;
use crate::process_data::ProcessDataBuffer;
use crate::topology::Topology;

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// No worker
    #[default]
    Idle,
    /// A worker was launched and has not been joined
    Running,
    /// A stop was requested and the join is in progress
    Stopping,
}

/// What a finished run handed back.
#[derive(Debug)]
pub struct RunSummary {
    /// Timing statistics of the run
    pub statistics: CycleStatistics,
    /// Why the worker loop ended
    pub reason: ExitReason,
    /// Engine counters at the end of the run
    pub counters: CounterSnapshot,
}

/// Single-instance lifecycle owner for the cycle worker.
pub struct CommunicatorController<M: MasterSession> {
    master: Option<M>,
    worker: Option<CycleWorker<MasterIoPipeline<M>>>,
    state: WorkerState,
    shared: PipelineShared,
}

impl<M: MasterSession> CommunicatorController<M> {
    /// Controller for `master` over a validated `topology`
    pub fn new(master: M, topology: Topology, tracing: TracingManager) -> Self {
        Self {
            master: Some(master),
            worker: None,
            state: WorkerState::Idle,
            shared: PipelineShared::new(topology, tracing),
        }
    }

    /// Validate `config`, activate the master and launch the worker.
    ///
    /// A worker that already ended on its own is reaped first. On any error
    /// the controller stays idle and keeps the master session, except when
    /// a previous worker panicked and took the session with it.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::AlreadyRunning`] while a worker is running
    /// - a validation error for a config that does not fit the topology
    /// - [`LifecycleError::MasterUnavailable`] after a worker panic
    /// - [`LifecycleError::ReferenceClockRejected`] or
    ///   [`LifecycleError::ActivationFailed`] from the master session
    /// - [`LifecycleError::DomainTooSmall`] if the activated domain cannot
    ///   hold the topology
    /// - a scheduler error if the OS rejects the RT setup
    pub fn start(&mut self, config: &CycleConfig) -> EngineResult<()> {
        self.reap_finished();
        if self.state != WorkerState::Idle {
            return Err(LifecycleError::AlreadyRunning.into());
        }

        config.validate_with(&self.shared.topology)?;
        let scheduler = CycleScheduler::configure(config.scheduler_config())?;
        let mut master = self.master.take().ok_or(LifecycleError::MasterUnavailable)?;

        if let Err(e) = master.select_reference_clock(config.reference_device) {
            tracing::warn!(device = config.reference_device, error = %e, "Reference clock rejected");
            self.master = Some(master);
            return Err(LifecycleError::ReferenceClockRejected {
                device: config.reference_device,
            }
            .into());
        }

        if let Err(e) = master.activate() {
            let reason = e.to_string();
            tracing::error!(error = %reason, "Master activation failed");
            self.shared
                .tracing
                .emit_app_event(AppTraceEvent::ActivationFailed {
                    reason: reason.clone(),
                });
            self.master = Some(master);
            return Err(LifecycleError::activation_failed(reason).into());
        }

        let required = self.shared.topology.required_domain_size();
        let actual = master.domain_data().len();
        if actual < required {
            master.deactivate();
            self.master = Some(master);
            return Err(LifecycleError::DomainTooSmall { required, actual }.into());
        }

        self.shared.counters.reset();
        let pipeline = MasterIoPipeline::new(master, self.shared.clone(), config);
        match scheduler.run(pipeline) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.state = WorkerState::Running;
            }
            Err(LaunchError { error, body }) => {
                if let Some(pipeline) = body {
                    let mut master = pipeline.into_master();
                    master.deactivate();
                    self.master = Some(master);
                }
                tracing::error!(error = %error, "Cycle worker launch failed");
                self.shared
                    .tracing
                    .emit_app_event(AppTraceEvent::SetupRejected {
                        reason: error.to_string(),
                    });
                return Err(error.into());
            }
        }

        tracing::info!(
            period_ns = config.period_ns,
            policy = %config.policy,
            devices = self.shared.topology.len(),
            "Communicator started"
        );
        self.shared.tracing.emit_app_event(AppTraceEvent::Started {
            period_ns: config.period_ns,
            policy: config.policy.to_string(),
            devices: self.shared.topology.len(),
        });
        Ok(())
    }

    /// Stop and join the worker, then zero the output image.
    ///
    /// Returns `Ok(None)` when idle.
    ///
    /// # Errors
    ///
    /// [`LifecycleError::WorkerPanicked`] if the worker panicked. The
    /// controller is idle afterwards and the outputs are zeroed, but the
    /// master session is gone.
    pub fn stop(&mut self) -> EngineResult<Option<RunSummary>> {
        let Some(worker) = self.worker.take() else {
            self.state = WorkerState::Idle;
            return Ok(None);
        };

        self.state = WorkerState::Stopping;
        worker.request_stop();
        let joined = worker.join();
        self.shared.buffer.zero_outputs();
        self.state = WorkerState::Idle;

        match joined {
            Ok(exit) => {
                let mut master = exit.body.into_master();
                master.deactivate();
                self.master = Some(master);

                let counters = self.shared.counters.snapshot();
                tracing::info!(
                    cycles = exit.statistics.cycles,
                    overruns = exit.statistics.overruns,
                    reason = %exit.reason,
                    "Communicator stopped"
                );
                self.shared.tracing.emit_app_event(AppTraceEvent::Stopped {
                    cycles: exit.statistics.cycles,
                    reason: exit.reason.to_string(),
                });
                Ok(Some(RunSummary {
                    statistics: exit.statistics,
                    reason: exit.reason,
                    counters,
                }))
            }
            Err(e) => {
                tracing::error!(error = %e, "Cycle worker did not exit cleanly");
                self.shared
                    .tracing
                    .emit_app_event(AppTraceEvent::WorkerPanicked);
                Err(LifecycleError::WorkerPanicked.into())
            }
        }
    }

    /// True while a worker is executing cycles
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Lifecycle state. A worker that ended on its own stays `Running`
    /// until reaped by `stop` or `start`.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Cycles completed by the current worker
    pub fn cycles_completed(&self) -> u64 {
        self.worker.as_ref().map_or(0, CycleWorker::cycles_completed)
    }

    /// Process-data exchange
    pub fn buffer(&self) -> &Arc<ProcessDataBuffer> {
        &self.shared.buffer
    }

    /// Engine counters
    pub fn counters(&self) -> &Arc<EngineCounters> {
        &self.shared.counters
    }

    /// Validated device table
    pub fn topology(&self) -> &Topology {
        &self.shared.topology
    }

    /// Event sink
    pub fn tracing(&self) -> &TracingManager {
        &self.shared.tracing
    }

    /// Master session, while idle
    pub fn master(&self) -> Option<&M> {
        self.master.as_ref()
    }

    /// Mutable master session, while idle
    pub fn master_mut(&mut self) -> Option<&mut M> {
        self.master.as_mut()
    }

    fn reap_finished(&mut self) {
        if self.worker.as_ref().is_some_and(CycleWorker::is_finished) {
            tracing::debug!("Reaping finished cycle worker");
            if let Err(e) = self.stop() {
                tracing::warn!(error = %e, "Finished worker could not be reaped cleanly");
            }
        }
    }
}

impl<M: MasterSession> core::fmt::Debug for CommunicatorController<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommunicatorController")
            .field("state", &self.state)
            .field("has_master", &self.master.is_some())
            .field("worker", &self.worker)
            .field("devices", &self.shared.topology.len())
            .finish()
    }
}

impl<M: MasterSession> Drop for CommunicatorController<M> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                tracing::warn!(error = %e, "Communicator dropped with a failed worker");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::SimulatedMaster;
    use crate::topology::{DeviceConfig, PdoRange};
    use fieldcycle_tracing::RecordingSink;
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn topology() -> Result<Topology, fieldcycle_errors::ValidationError> {
        Topology::new(vec![DeviceConfig {
            name: "io".to_string(),
            alias: 0,
            position: 0,
            vendor_id: 1,
            product_code: 1,
            assign_activate: 0x0300,
            sync0_shift_ns: 0,
            input: PdoRange::new(0, 2),
            output: PdoRange::new(2, 2),
        }])
    }

    #[test]
    fn test_stop_when_idle_is_noop() -> TestResult {
        let topology = topology()?;
        let mut controller = CommunicatorController::new(
            SimulatedMaster::new(&topology),
            topology,
            TracingManager::with_sink(RecordingSink::new()),
        );
        assert!(controller.stop()?.is_none());
        assert_eq!(controller.state(), WorkerState::Idle);
        assert!(!controller.is_running());
        Ok(())
    }

    #[test]
    fn test_short_domain_rejected_and_master_kept() -> TestResult {
        let topology = topology()?;
        let master = SimulatedMaster::with_domain_size(&topology, 2);
        let handle = master.handle();
        let mut controller =
            CommunicatorController::new(master, topology, TracingManager::with_sink(RecordingSink::new()));

        let err = controller
            .start(&CycleConfig::unprivileged(1_000_000))
            .err()
            .ok_or("start should fail")?;
        assert!(matches!(
            err,
            crate::EngineError::Lifecycle(LifecycleError::DomainTooSmall {
                required: 4,
                actual: 2
            })
        ));
        assert!(controller.master().is_some());
        assert_eq!(handle.deactivations(), 1);
        Ok(())
    }

    #[test]
    fn test_invalid_reference_device_rejected() -> TestResult {
        let topology = topology()?;
        let mut controller = CommunicatorController::new(
            SimulatedMaster::new(&topology),
            topology,
            TracingManager::with_sink(RecordingSink::new()),
        );
        let mut config = CycleConfig::unprivileged(1_000_000);
        config.reference_device = 3;

        let err = controller.start(&config).err().ok_or("start should fail")?;
        assert!(matches!(err, crate::EngineError::Validation(_)));
        assert_eq!(controller.state(), WorkerState::Idle);
        Ok(())
    }

    #[test]
    fn test_self_terminated_worker_is_reaped_on_start() -> TestResult {
        let topology = topology()?;
        let mut controller = CommunicatorController::new(
            SimulatedMaster::new(&topology),
            topology,
            TracingManager::with_sink(RecordingSink::new()),
        );
        let config = CycleConfig::unprivileged(1_000_000).with_run_duration(Duration::from_millis(20));

        controller.start(&config)?;
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while controller.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!controller.is_running());
        assert_eq!(controller.state(), WorkerState::Running);

        controller.start(&config)?;
        let summary = controller.stop()?.ok_or("expected a run summary")?;
        assert!(summary.statistics.cycles > 0);
        assert_eq!(controller.state(), WorkerState::Idle);
        Ok(())
    }
}
