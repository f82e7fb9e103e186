//! Thread scheduling policies.

use core::fmt;

use fieldcycle_errors::ValidationError;

/// Lowest `SCHED_FIFO` priority
pub const MIN_FIFO_PRIORITY: u8 = 1;

/// Highest `SCHED_FIFO` priority
pub const MAX_FIFO_PRIORITY: u8 = 99;

/// Scheduling class requested for the cycle worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum SchedulingPolicy {
    /// `SCHED_FIFO` at a fixed priority
    FixedPriority {
        /// Priority in `1..=99`
        priority: u8,
    },
    /// `SCHED_DEADLINE` with a runtime/deadline/period budget
    DeadlineBased {
        /// CPU time granted per period (ns)
        runtime_ns: u64,
        /// Relative deadline (ns)
        deadline_ns: u64,
        /// Budget replenishment period (ns)
        period_ns: u64,
    },
    /// Keep whatever the spawning thread has. For unprivileged runs.
    Inherit,
}

impl SchedulingPolicy {
    /// Check the policy parameters.
    ///
    /// # Errors
    ///
    /// Priority outside `1..=99`, or a deadline budget that violates
    /// `0 < runtime <= deadline <= period`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            SchedulingPolicy::FixedPriority { priority } => {
                if !(MIN_FIFO_PRIORITY..=MAX_FIFO_PRIORITY).contains(&priority) {
                    return Err(ValidationError::out_of_range(
                        "policy.priority",
                        priority,
                        MIN_FIFO_PRIORITY,
                        MAX_FIFO_PRIORITY,
                    ));
                }
                Ok(())
            }
            SchedulingPolicy::DeadlineBased {
                runtime_ns,
                deadline_ns,
                period_ns,
            } => {
                if runtime_ns == 0 {
                    return Err(ValidationError::out_of_range(
                        "policy.runtime_ns",
                        runtime_ns,
                        1,
                        deadline_ns,
                    ));
                }
                if runtime_ns > deadline_ns || deadline_ns > period_ns {
                    return Err(ValidationError::constraint(format!(
                        "deadline budget must satisfy 0 < runtime <= deadline <= period, got {runtime_ns}/{deadline_ns}/{period_ns}"
                    )));
                }
                Ok(())
            }
            SchedulingPolicy::Inherit => Ok(()),
        }
    }

    /// True for policies that need OS privileges
    pub fn is_real_time(&self) -> bool {
        !matches!(self, SchedulingPolicy::Inherit)
    }
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        SchedulingPolicy::FixedPriority { priority: 80 }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingPolicy::FixedPriority { priority } => write!(f, "fifo({})", priority),
            SchedulingPolicy::DeadlineBased {
                runtime_ns,
                deadline_ns,
                period_ns,
            } => write!(f, "deadline({}/{}/{})", runtime_ns, deadline_ns, period_ns),
            SchedulingPolicy::Inherit => write!(f, "inherit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_bounds() {
        assert!(SchedulingPolicy::FixedPriority { priority: 1 }.validate().is_ok());
        assert!(SchedulingPolicy::FixedPriority { priority: 99 }.validate().is_ok());
        assert!(SchedulingPolicy::FixedPriority { priority: 0 }.validate().is_err());
        assert!(SchedulingPolicy::FixedPriority { priority: 100 }.validate().is_err());
    }

    #[test]
    fn test_deadline_budget_ordering() {
        let ok = SchedulingPolicy::DeadlineBased {
            runtime_ns: 30_000,
            deadline_ns: 100_000,
            period_ns: 1_000_000,
        };
        assert!(ok.validate().is_ok());

        let zero_runtime = SchedulingPolicy::DeadlineBased {
            runtime_ns: 0,
            deadline_ns: 100_000,
            period_ns: 1_000_000,
        };
        assert!(zero_runtime.validate().is_err());

        let runtime_over_deadline = SchedulingPolicy::DeadlineBased {
            runtime_ns: 200_000,
            deadline_ns: 100_000,
            period_ns: 1_000_000,
        };
        assert!(runtime_over_deadline.validate().is_err());

        let deadline_over_period = SchedulingPolicy::DeadlineBased {
            runtime_ns: 30_000,
            deadline_ns: 2_000_000,
            period_ns: 1_000_000,
        };
        assert!(deadline_over_period.validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(SchedulingPolicy::default().to_string(), "fifo(80)");
        assert_eq!(SchedulingPolicy::Inherit.to_string(), "inherit");
        assert!(!SchedulingPolicy::Inherit.is_real_time());
    }
}
