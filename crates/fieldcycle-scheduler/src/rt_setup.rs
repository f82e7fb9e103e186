//! Real-time setup configuration.

use fieldcycle_errors::ValidationError;

use crate::clock::ClockSource;
use crate::policy::SchedulingPolicy;

/// Upper bound for CPU ids in an affinity set (glibc `CPU_SETSIZE`)
pub const MAX_CPU_ID: usize = 1023;

/// Real-time parameters applied by the worker thread to itself before its
/// first wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTSetup {
    /// Scheduling class and its parameters
    pub policy: SchedulingPolicy,

    /// CPUs the worker may run on. Empty means no affinity change.
    pub cpu_affinity: Vec<usize>,

    /// Lock current and future pages (`mlockall`)
    pub lock_memory: bool,

    /// Clock for absolute wakeups
    pub clock: ClockSource,
}

impl Default for RTSetup {
    fn default() -> Self {
        Self {
            policy: SchedulingPolicy::default(),
            cpu_affinity: Vec::new(),
            lock_memory: true,
            clock: ClockSource::Monotonic,
        }
    }
}

impl RTSetup {
    /// Create a new RTSetup with default values (`SCHED_FIFO` 80, memory locked).
    pub fn new() -> Self {
        Self::default()
    }

    /// No scheduling change, no affinity, no memory locking.
    pub fn inherit() -> Self {
        Self {
            policy: SchedulingPolicy::Inherit,
            cpu_affinity: Vec::new(),
            lock_memory: false,
            clock: ClockSource::Monotonic,
        }
    }

    /// Set the scheduling policy.
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set memory locking.
    pub fn with_lock_memory(mut self, enabled: bool) -> Self {
        self.lock_memory = enabled;
        self
    }

    /// Set the CPU affinity set.
    pub fn with_cpu_affinity(mut self, cpus: impl IntoIterator<Item = usize>) -> Self {
        self.cpu_affinity = cpus.into_iter().collect();
        self
    }

    /// Set the wakeup clock.
    pub fn with_clock(mut self, clock: ClockSource) -> Self {
        self.clock = clock;
        self
    }

    /// Check if anything beyond the inherited defaults is requested.
    pub fn has_rt_features(&self) -> bool {
        self.policy.is_real_time() || self.lock_memory || !self.cpu_affinity.is_empty()
    }

    /// Validate the policy parameters and the affinity set.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.policy.validate()?;

        let mut seen = Vec::with_capacity(self.cpu_affinity.len());
        for &cpu in &self.cpu_affinity {
            if cpu > MAX_CPU_ID {
                return Err(ValidationError::out_of_range(
                    "cpu_affinity",
                    cpu,
                    0,
                    MAX_CPU_ID,
                ));
            }
            if seen.contains(&cpu) {
                return Err(ValidationError::not_unique("cpu_affinity", cpu));
            }
            seen.push(cpu);
        }
        Ok(())
    }
}
