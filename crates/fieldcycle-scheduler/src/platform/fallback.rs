//! Fallback for targets without the Linux scheduling interfaces.
//!
//! Any real-time request is refused; sleeps use `std::thread::sleep` for the
//! remaining duration.

use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use fieldcycle_errors::RTResult;

use crate::clock::ClockSource;
use crate::error::{SchedulerError, SetupStage};
use crate::policy::SchedulingPolicy;
use crate::rt_setup::RTSetup;

static MONOTONIC_BASE: OnceLock<Instant> = OnceLock::new();

fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

pub(crate) fn now_ns(clock: ClockSource) -> u64 {
    match clock {
        ClockSource::Monotonic => duration_ns(MONOTONIC_BASE.get_or_init(Instant::now).elapsed()),
        ClockSource::Realtime => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(duration_ns)
            .unwrap_or(0),
    }
}

#[derive(Debug, Default)]
pub(crate) struct PlatformRt;

impl PlatformRt {
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) fn apply_rt_setup(&mut self, setup: &RTSetup) -> Result<(), SchedulerError> {
        if setup.lock_memory {
            return Err(SchedulerError::Unsupported {
                stage: SetupStage::MemoryLock,
            });
        }
        if !setup.cpu_affinity.is_empty() {
            return Err(SchedulerError::Unsupported {
                stage: SetupStage::Affinity,
            });
        }
        match setup.policy {
            SchedulingPolicy::FixedPriority { .. } => Err(SchedulerError::Unsupported {
                stage: SetupStage::FixedPriority,
            }),
            SchedulingPolicy::DeadlineBased { .. } => Err(SchedulerError::Unsupported {
                stage: SetupStage::Deadline,
            }),
            SchedulingPolicy::Inherit => Ok(()),
        }
    }

    pub(crate) fn sleep_until(&mut self, clock: ClockSource, target_ns: u64) -> RTResult {
        let now = now_ns(clock);
        if target_ns > now {
            std::thread::sleep(Duration::from_nanos(target_ns - now));
        }
        Ok(())
    }
}
