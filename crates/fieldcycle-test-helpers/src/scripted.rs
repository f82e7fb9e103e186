//! Scripted master session double.
//!
//! [`ScriptedMaster`] records every call into a journal and answers queries
//! from a script. Both live behind a [`ScriptHandle`] that the test keeps
//! while the master itself moves into a pipeline or a running worker.

use std::collections::VecDeque;
use std::sync::Arc;

use fieldcycle_engine::{DomainHealth, MasterError, MasterHealth, MasterSession};
use parking_lot::Mutex;

/// One recorded master session call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterCall {
    SelectReferenceClock(usize),
    Activate,
    Deactivate,
    Receive,
    Send,
    ProcessDomain,
    QueueDomain,
    DomainHealth,
    MasterHealth,
    SetApplicationTime(u64),
    ReferenceClockTime,
    SyncReferenceClock,
    SyncSlaveClocks,
}

#[derive(Debug)]
struct Script {
    calls: Vec<MasterCall>,
    reference_times: VecDeque<Result<u32, MasterError>>,
    fallback_reference: Option<u32>,
    domain_health: DomainHealth,
    master_health: MasterHealth,
    activation_error: Option<MasterError>,
    reference_selection_error: Option<MasterError>,
}

/// Test-side view of a [`ScriptedMaster`].
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    script: Arc<Mutex<Script>>,
}

impl ScriptHandle {
    /// Every call so far, in order
    pub fn calls(&self) -> Vec<MasterCall> {
        self.script.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.script.lock().calls.clear();
    }

    /// Number of recorded calls matching `pred`
    pub fn count(&self, pred: impl Fn(&MasterCall) -> bool) -> usize {
        self.script.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Index of the first recorded call equal to `call`
    pub fn first_index(&self, call: MasterCall) -> Option<usize> {
        self.script.lock().calls.iter().position(|c| *c == call)
    }

    /// Application times written so far
    pub fn application_times(&self) -> Vec<u64> {
        self.script
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MasterCall::SetApplicationTime(ns) => Some(*ns),
                _ => None,
            })
            .collect()
    }

    /// Queue a reference clock reading
    pub fn push_reference_time(&self, ns: u32) {
        self.script.lock().reference_times.push_back(Ok(ns));
    }

    /// Queue a failed reference clock read
    pub fn push_reference_error(&self, error: MasterError) {
        self.script.lock().reference_times.push_back(Err(error));
    }

    /// Reading returned once the queue is empty; `None` fails the read
    pub fn set_fallback_reference(&self, ns: Option<u32>) {
        self.script.lock().fallback_reference = ns;
    }

    /// Domain health returned from now on
    pub fn set_domain_health(&self, health: DomainHealth) {
        self.script.lock().domain_health = health;
    }

    /// Master health returned from now on
    pub fn set_master_health(&self, health: MasterHealth) {
        self.script.lock().master_health = health;
    }

    /// Make `activate` fail with `error`
    pub fn fail_activation(&self, error: MasterError) {
        self.script.lock().activation_error = Some(error);
    }

    /// Make `select_reference_clock` fail with `error`
    pub fn reject_reference_clock(&self, error: MasterError) {
        self.script.lock().reference_selection_error = Some(error);
    }
}

/// Master session double with a call journal.
#[derive(Debug)]
pub struct ScriptedMaster {
    handle: ScriptHandle,
    domain: Vec<u8>,
}

impl ScriptedMaster {
    /// Master with a zeroed domain of `domain_size` bytes, a healthy
    /// domain and a fallback reference reading of 0.
    pub fn new(domain_size: usize) -> Self {
        let script = Script {
            calls: Vec::new(),
            reference_times: VecDeque::new(),
            fallback_reference: Some(0),
            domain_health: DomainHealth::complete(1),
            master_health: MasterHealth {
                slaves_responding: 1,
                al_states: 0x08,
                link_up: true,
            },
            activation_error: None,
            reference_selection_error: None,
        };
        Self {
            handle: ScriptHandle {
                script: Arc::new(Mutex::new(script)),
            },
            domain: vec![0; domain_size],
        }
    }

    /// Script and journal handle
    pub fn handle(&self) -> ScriptHandle {
        self.handle.clone()
    }

    fn record(&self, call: MasterCall) {
        self.handle.script.lock().calls.push(call);
    }
}

impl MasterSession for ScriptedMaster {
    fn select_reference_clock(&mut self, device: usize) -> Result<(), MasterError> {
        let mut script = self.handle.script.lock();
        script.calls.push(MasterCall::SelectReferenceClock(device));
        match script.reference_selection_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn activate(&mut self) -> Result<(), MasterError> {
        let mut script = self.handle.script.lock();
        script.calls.push(MasterCall::Activate);
        match script.activation_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn deactivate(&mut self) {
        self.record(MasterCall::Deactivate);
    }

    fn receive(&mut self) {
        self.record(MasterCall::Receive);
    }

    fn send(&mut self) {
        self.record(MasterCall::Send);
    }

    fn process_domain(&mut self) {
        self.record(MasterCall::ProcessDomain);
    }

    fn queue_domain(&mut self) {
        self.record(MasterCall::QueueDomain);
    }

    fn domain_health(&self) -> DomainHealth {
        let mut script = self.handle.script.lock();
        script.calls.push(MasterCall::DomainHealth);
        script.domain_health
    }

    fn master_health(&self) -> MasterHealth {
        let mut script = self.handle.script.lock();
        script.calls.push(MasterCall::MasterHealth);
        script.master_health
    }

    fn set_application_time(&mut self, app_time_ns: u64) {
        self.record(MasterCall::SetApplicationTime(app_time_ns));
    }

    fn reference_clock_time(&mut self) -> Result<u32, MasterError> {
        let mut script = self.handle.script.lock();
        script.calls.push(MasterCall::ReferenceClockTime);
        match script.reference_times.pop_front() {
            Some(reading) => reading,
            None => script.fallback_reference.ok_or(MasterError::NoReferenceClock),
        }
    }

    fn sync_reference_clock(&mut self) {
        self.record(MasterCall::SyncReferenceClock);
    }

    fn sync_slave_clocks(&mut self) {
        self.record(MasterCall::SyncSlaveClocks);
    }

    fn domain_data(&self) -> &[u8] {
        &self.domain
    }

    fn domain_data_mut(&mut self) -> &mut [u8] {
        &mut self.domain
    }
}
