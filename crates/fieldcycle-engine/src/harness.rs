//! Simulated master session.
//!
//! Stands in for a real fieldbus master in demos and integration tests. The
//! domain loops every device's output bytes back into its input range, and
//! the reference device runs its own clock: the master's hardware clock with
//! a fixed offset and a drift in parts per billion. Like a real register
//! read, `reference_clock_time` returns the value latched by the previous
//! `send`. Faults are injected through a [`SimulationHandle`] that stays
//! valid while the master is owned by a running worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use fieldcycle_scheduler::ClockSource;

use crate::clock_sync::TimeSource;
use crate::ports::{DomainHealth, MasterError, MasterHealth, MasterSession, WorkingCounterState};
use crate::topology::Topology;

/// Application-layer state bits
const AL_STATE_INIT: u8 = 0x01;
const AL_STATE_OP: u8 = 0x08;

/// Working counter contribution of one device with inputs and outputs
const WKC_PER_DEVICE: u16 = 3;

#[derive(Debug)]
struct SimulationState {
    link_up: AtomicBool,
    degraded: AtomicBool,
    fail_activation: AtomicBool,
    reference_available: AtomicBool,
    frames_sent: AtomicU64,
    activations: AtomicU64,
    deactivations: AtomicU64,
}

/// Fault injection and observation for a [`SimulatedMaster`].
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    state: Arc<SimulationState>,
}

impl SimulationHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(SimulationState {
                link_up: AtomicBool::new(true),
                degraded: AtomicBool::new(false),
                fail_activation: AtomicBool::new(false),
                reference_available: AtomicBool::new(true),
                frames_sent: AtomicU64::new(0),
                activations: AtomicU64::new(0),
                deactivations: AtomicU64::new(0),
            }),
        }
    }

    /// Bring the Ethernet link up or down
    pub fn set_link_up(&self, up: bool) {
        self.state.link_up.store(up, Ordering::Release);
    }

    /// Drop one datagram per exchange
    pub fn set_degraded(&self, degraded: bool) {
        self.state.degraded.store(degraded, Ordering::Release);
    }

    /// Make the next `activate` calls fail
    pub fn set_fail_activation(&self, fail: bool) {
        self.state.fail_activation.store(fail, Ordering::Release);
    }

    /// Make reference clock reads succeed or fail
    pub fn set_reference_available(&self, available: bool) {
        self.state.reference_available.store(available, Ordering::Release);
    }

    /// Frames sent so far
    pub fn frames_sent(&self) -> u64 {
        self.state.frames_sent.load(Ordering::Acquire)
    }

    /// Successful activations so far
    pub fn activations(&self) -> u64 {
        self.state.activations.load(Ordering::Acquire)
    }

    /// Deactivations so far
    pub fn deactivations(&self) -> u64 {
        self.state.deactivations.load(Ordering::Acquire)
    }

    fn link_up(&self) -> bool {
        self.state.link_up.load(Ordering::Acquire)
    }
}

/// In-memory master with an input loopback domain.
#[derive(Debug)]
pub struct SimulatedMaster<T = ClockSource> {
    topology: Topology,
    time: T,
    domain: Vec<u8>,
    handle: SimulationHandle,
    active: bool,
    reference_device: Option<usize>,
    app_time_ns: u64,
    reference_offset_ns: i64,
    drift_ppb: i64,
    reference_slaved: bool,
    latched_reference: Option<u32>,
    queued: bool,
    health: DomainHealth,
}

impl SimulatedMaster {
    /// Master whose domain is exactly as large as `topology` needs
    pub fn new(topology: &Topology) -> Self {
        Self::with_domain_size(topology, topology.required_domain_size())
    }

    /// Master with a domain of `size` bytes
    pub fn with_domain_size(topology: &Topology, size: usize) -> Self {
        Self {
            topology: topology.clone(),
            time: ClockSource::Monotonic,
            domain: vec![0; size],
            handle: SimulationHandle::new(),
            active: false,
            reference_device: None,
            app_time_ns: 0,
            reference_offset_ns: 0,
            drift_ppb: 0,
            reference_slaved: false,
            latched_reference: None,
            queued: false,
            health: DomainHealth::default(),
        }
    }
}

impl<T: TimeSource> SimulatedMaster<T> {
    /// Drive the reference clock from `time` instead of the OS clock.
    ///
    /// Pass the same source the pipeline reads so both sides share one
    /// hardware clock.
    pub fn with_time_source<U: TimeSource>(self, time: U) -> SimulatedMaster<U> {
        SimulatedMaster {
            topology: self.topology,
            time,
            domain: self.domain,
            handle: self.handle,
            active: self.active,
            reference_device: self.reference_device,
            app_time_ns: self.app_time_ns,
            reference_offset_ns: self.reference_offset_ns,
            drift_ppb: self.drift_ppb,
            reference_slaved: self.reference_slaved,
            latched_reference: self.latched_reference,
            queued: self.queued,
            health: self.health,
        }
    }

    /// Reference clock leads the hardware clock by `offset_ns`
    pub fn with_reference_offset(mut self, offset_ns: i64) -> Self {
        self.reference_offset_ns = offset_ns;
        self
    }

    /// Reference clock runs `ppb` parts per billion fast
    pub fn with_drift_ppb(mut self, ppb: i64) -> Self {
        self.drift_ppb = ppb;
        self
    }

    /// Fault injection handle
    pub fn handle(&self) -> SimulationHandle {
        self.handle.clone()
    }

    /// Whether the master is active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Last application time written by the engine (ns)
    pub fn application_time_ns(&self) -> u64 {
        self.app_time_ns
    }

    fn expected_working_counter(&self) -> u16 {
        u16::try_from(self.topology.len())
            .unwrap_or(u16::MAX)
            .saturating_mul(WKC_PER_DEVICE)
    }

    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "the reference register holds the low 32 bits"
    )]
    fn reference_now(&self) -> u32 {
        if self.reference_slaved {
            return self.app_time_ns as u32;
        }
        let hardware = i128::from(self.time.now_ns());
        let drift = hardware * i128::from(self.drift_ppb) / 1_000_000_000;
        (hardware + drift + i128::from(self.reference_offset_ns)) as u32
    }

    fn loopback(&mut self) {
        for device in 0..self.topology.len() {
            let (Some(input), Some(output)) = (
                self.topology.device(device).and_then(|d| d.input.as_range()),
                self.topology.device(device).and_then(|d| d.output.as_range()),
            ) else {
                continue;
            };
            let len = input.len().min(output.len());
            if output.end <= self.domain.len() && input.end <= self.domain.len() {
                self.domain
                    .copy_within(output.start..output.start + len, input.start);
            }
        }
    }
}

impl<T: TimeSource> MasterSession for SimulatedMaster<T> {
    fn select_reference_clock(&mut self, device: usize) -> Result<(), MasterError> {
        if device >= self.topology.len() {
            return Err(MasterError::NoReferenceClock);
        }
        self.reference_device = Some(device);
        Ok(())
    }

    fn activate(&mut self) -> Result<(), MasterError> {
        if self.handle.state.fail_activation.load(Ordering::Acquire) {
            return Err(MasterError::rejected("activate", -5));
        }
        self.active = true;
        self.handle.state.activations.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(domain_size = self.domain.len(), "Simulated master activated");
        Ok(())
    }

    fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            self.handle.state.deactivations.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn receive(&mut self) {}

    fn send(&mut self) {
        if self.queued {
            self.queued = false;
            self.latched_reference = Some(self.reference_now());
            self.handle.state.frames_sent.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn process_domain(&mut self) {
        let expected = self.expected_working_counter();
        if !self.active || !self.handle.link_up() {
            self.health = DomainHealth {
                working_counter: 0,
                expected_working_counter: expected,
                state: WorkingCounterState::Zero,
            };
            return;
        }

        self.loopback();
        self.health = if self.handle.state.degraded.load(Ordering::Acquire) {
            DomainHealth {
                working_counter: expected.saturating_sub(1),
                expected_working_counter: expected,
                state: WorkingCounterState::Incomplete,
            }
        } else {
            DomainHealth::complete(expected)
        };
    }

    fn queue_domain(&mut self) {
        self.queued = true;
    }

    fn domain_health(&self) -> DomainHealth {
        self.health
    }

    fn master_health(&self) -> MasterHealth {
        if !self.handle.link_up() {
            return MasterHealth::default();
        }
        MasterHealth {
            slaves_responding: u16::try_from(self.topology.len()).unwrap_or(u16::MAX),
            al_states: if self.active { AL_STATE_OP } else { AL_STATE_INIT },
            link_up: true,
        }
    }

    fn set_application_time(&mut self, app_time_ns: u64) {
        self.app_time_ns = app_time_ns;
    }

    fn reference_clock_time(&mut self) -> Result<u32, MasterError> {
        if self.reference_device.is_none() {
            return Err(MasterError::NoReferenceClock);
        }
        if !self.handle.link_up() {
            return Err(MasterError::LinkDown);
        }
        if !self.handle.state.reference_available.load(Ordering::Acquire) {
            return Err(MasterError::NoReferenceClock);
        }
        Ok(self
            .latched_reference
            .unwrap_or_else(|| self.reference_now()))
    }

    fn sync_reference_clock(&mut self) {
        self.reference_slaved = true;
    }

    fn sync_slave_clocks(&mut self) {}

    fn domain_data(&self) -> &[u8] {
        &self.domain
    }

    fn domain_data_mut(&mut self) -> &mut [u8] {
        &mut self.domain
    }
}
