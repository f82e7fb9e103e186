//! Port traits for the fieldbus master boundary
//!
//! The engine never encodes frames or walks the device state machine itself.
//! Everything it needs from the bus goes through [`MasterSession`], so the
//! real master binding, the simulated master and test doubles are
//! interchangeable.

use core::fmt;

/// Errors reported by a master session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MasterError {
    /// The master refused an operation
    #[error("{operation} rejected by master (code {code})")]
    Rejected {
        /// Operation name
        operation: &'static str,
        /// Driver return code
        code: i32,
    },

    /// No device is acting as the reference clock
    #[error("No reference clock available")]
    NoReferenceClock,

    /// The master link is down
    #[error("Master link down")]
    LinkDown,
}

impl MasterError {
    /// Shorthand for a rejected operation
    pub fn rejected(operation: &'static str, code: i32) -> Self {
        MasterError::Rejected { operation, code }
    }
}

/// Working counter interpretation for one domain exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkingCounterState {
    /// No datagram was exchanged
    #[default]
    Zero,
    /// Some, but not all, datagrams were exchanged
    Incomplete,
    /// All datagrams were exchanged
    Complete,
}

/// Domain state after `process_domain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DomainHealth {
    /// Observed working counter
    pub working_counter: u16,
    /// Working counter expected for a complete exchange
    pub expected_working_counter: u16,
    /// Summary state
    pub state: WorkingCounterState,
}

impl DomainHealth {
    /// Healthy domain with the given expected working counter
    pub fn complete(expected: u16) -> Self {
        Self {
            working_counter: expected,
            expected_working_counter: expected,
            state: WorkingCounterState::Complete,
        }
    }

    /// True unless every datagram was exchanged
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.state != WorkingCounterState::Complete
            || self.working_counter < self.expected_working_counter
    }
}

/// Master link and device summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MasterHealth {
    /// Devices answering on the bus
    pub slaves_responding: u16,
    /// Bitwise OR of device application-layer states
    pub al_states: u8,
    /// Whether the Ethernet link is up
    pub link_up: bool,
}

impl fmt::Display for MasterHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} slave(s), AL states 0x{:02X}, link {}",
            self.slaves_responding,
            self.al_states,
            if self.link_up { "up" } else { "down" }
        )
    }
}

/// Fieldbus master session.
///
/// Methods called from the cycle body (`receive` through `domain_data_mut`)
/// must be bounded and must not block indefinitely. `activate`,
/// `deactivate` and `select_reference_clock` are only called from the
/// controller thread while no worker is running.
pub trait MasterSession: Send + 'static {
    /// Select the device whose clock is the distributed-clock reference.
    fn select_reference_clock(&mut self, device: usize) -> Result<(), MasterError>;

    /// Activate the master and map the domain.
    fn activate(&mut self) -> Result<(), MasterError>;

    /// Release the bus. Called after the worker has been joined.
    fn deactivate(&mut self);

    /// Fetch received frames.
    fn receive(&mut self);

    /// Send queued frames.
    fn send(&mut self);

    /// Evaluate received datagrams into domain memory.
    fn process_domain(&mut self);

    /// Queue the domain datagrams for the next send.
    fn queue_domain(&mut self);

    /// Domain health after the last `process_domain`.
    fn domain_health(&self) -> DomainHealth;

    /// Master link and device summary.
    fn master_health(&self) -> MasterHealth;

    /// Tell the master the current application time (ns).
    fn set_application_time(&mut self, app_time_ns: u64);

    /// Lower 32 bits of the reference device clock.
    fn reference_clock_time(&mut self) -> Result<u32, MasterError>;

    /// Queue a datagram writing application time to the reference clock.
    fn sync_reference_clock(&mut self);

    /// Queue a datagram distributing the reference time to all devices.
    fn sync_slave_clocks(&mut self);

    /// Domain process image.
    fn domain_data(&self) -> &[u8];

    /// Mutable domain process image.
    fn domain_data_mut(&mut self) -> &mut [u8];
}

impl<M: MasterSession + ?Sized> MasterSession for Box<M> {
    fn select_reference_clock(&mut self, device: usize) -> Result<(), MasterError> {
        (**self).select_reference_clock(device)
    }

    fn activate(&mut self) -> Result<(), MasterError> {
        (**self).activate()
    }

    fn deactivate(&mut self) {
        (**self).deactivate()
    }

    fn receive(&mut self) {
        (**self).receive()
    }

    fn send(&mut self) {
        (**self).send()
    }

    fn process_domain(&mut self) {
        (**self).process_domain()
    }

    fn queue_domain(&mut self) {
        (**self).queue_domain()
    }

    fn domain_health(&self) -> DomainHealth {
        (**self).domain_health()
    }

    fn master_health(&self) -> MasterHealth {
        (**self).master_health()
    }

    fn set_application_time(&mut self, app_time_ns: u64) {
        (**self).set_application_time(app_time_ns)
    }

    fn reference_clock_time(&mut self) -> Result<u32, MasterError> {
        (**self).reference_clock_time()
    }

    fn sync_reference_clock(&mut self) {
        (**self).sync_reference_clock()
    }

    fn sync_slave_clocks(&mut self) {
        (**self).sync_slave_clocks()
    }

    fn domain_data(&self) -> &[u8] {
        (**self).domain_data()
    }

    fn domain_data_mut(&mut self) -> &mut [u8] {
        (**self).domain_data_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_health_degraded() {
        assert!(!DomainHealth::complete(3).is_degraded());

        let partial = DomainHealth {
            working_counter: 2,
            expected_working_counter: 3,
            state: WorkingCounterState::Incomplete,
        };
        assert!(partial.is_degraded());
        assert!(DomainHealth::default().is_degraded());
    }

    #[test]
    fn test_master_health_display() {
        let health = MasterHealth {
            slaves_responding: 2,
            al_states: 0x08,
            link_up: true,
        };
        assert_eq!(health.to_string(), "2 slave(s), AL states 0x08, link up");
    }

    #[test]
    fn test_rejected_message() {
        let err = MasterError::rejected("activate", -5);
        assert_eq!(err.to_string(), "activate rejected by master (code -5)");
    }
}
