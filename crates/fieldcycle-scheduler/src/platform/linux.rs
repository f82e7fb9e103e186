//! Linux implementation: `sched_setscheduler`, `sched_setattr`,
//! `sched_setaffinity`, `mlockall` and `clock_nanosleep(TIMER_ABSTIME)`.

#![allow(unsafe_code, reason = "libc scheduling and clock calls")]

use std::io;
use std::mem::size_of;

use fieldcycle_errors::{RTError, RTResult};
use libc::{
    CLOCK_MONOTONIC, CLOCK_REALTIME, EINTR, MCL_CURRENT, MCL_FUTURE, SCHED_FIFO, TIMER_ABSTIME,
    clockid_t, cpu_set_t, sched_param, timespec,
};

use crate::NSEC_PER_SEC;
use crate::clock::ClockSource;
use crate::error::{SchedulerError, SetupStage};
use crate::policy::SchedulingPolicy;
use crate::rt_setup::RTSetup;

/// `SCHED_DEADLINE` from `<linux/sched.h>`
const SCHED_DEADLINE: u32 = 6;

/// Kernel `struct sched_attr` (first version, 48 bytes).
#[repr(C)]
#[derive(Debug, Default)]
struct SchedAttr {
    size: u32,
    sched_policy: u32,
    sched_flags: u64,
    sched_nice: i32,
    sched_priority: u32,
    sched_runtime: u64,
    sched_deadline: u64,
    sched_period: u64,
}

fn clock_id(clock: ClockSource) -> clockid_t {
    match clock {
        ClockSource::Monotonic => CLOCK_MONOTONIC,
        ClockSource::Realtime => CLOCK_REALTIME,
    }
}

fn to_ns(ts: &timespec) -> u64 {
    let secs = u64::try_from(ts.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(ts.tv_nsec).unwrap_or(0);
    secs.saturating_mul(NSEC_PER_SEC).saturating_add(nanos)
}

fn to_timespec(ns: u64) -> timespec {
    timespec {
        tv_sec: libc::time_t::try_from(ns / NSEC_PER_SEC).unwrap_or(libc::time_t::MAX),
        tv_nsec: libc::c_long::try_from(ns % NSEC_PER_SEC).unwrap_or(0),
    }
}

/// Read `clock` in nanoseconds. Returns 0 if the clock cannot be read.
pub(crate) fn now_ns(clock: ClockSource) -> u64 {
    let mut ts = timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(clock_id(clock), &mut ts) };
    if rc != 0 {
        return 0;
    }
    to_ns(&ts)
}

/// Linux real-time platform.
#[derive(Debug, Default)]
pub(crate) struct PlatformRt;

impl PlatformRt {
    pub(crate) fn new() -> Self {
        Self
    }

    /// Apply `setup` to the calling thread. Order: memory lock, affinity, policy.
    pub(crate) fn apply_rt_setup(&mut self, setup: &RTSetup) -> Result<(), SchedulerError> {
        if setup.lock_memory {
            // SAFETY: mlockall only takes flags.
            let rc = unsafe { libc::mlockall(MCL_CURRENT | MCL_FUTURE) };
            if rc != 0 {
                return Err(SchedulerError::setup(
                    SetupStage::MemoryLock,
                    io::Error::last_os_error(),
                ));
            }
        }

        if !setup.cpu_affinity.is_empty() {
            Self::set_affinity(&setup.cpu_affinity)?;
        }

        match setup.policy {
            SchedulingPolicy::FixedPriority { priority } => {
                let param = sched_param {
                    sched_priority: i32::from(priority),
                };
                // SAFETY: `param` outlives the call; pid 0 is the calling thread.
                let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
                if rc != 0 {
                    return Err(SchedulerError::setup(
                        SetupStage::FixedPriority,
                        io::Error::last_os_error(),
                    ));
                }
            }
            SchedulingPolicy::DeadlineBased {
                runtime_ns,
                deadline_ns,
                period_ns,
            } => {
                let attr = SchedAttr {
                    size: u32::try_from(size_of::<SchedAttr>()).unwrap_or(48),
                    sched_policy: SCHED_DEADLINE,
                    sched_runtime: runtime_ns,
                    sched_deadline: deadline_ns,
                    sched_period: period_ns,
                    ..SchedAttr::default()
                };
                // SAFETY: `attr` matches the kernel sched_attr layout and outlives the call.
                let rc = unsafe {
                    libc::syscall(
                        libc::SYS_sched_setattr,
                        0 as libc::pid_t,
                        &attr as *const SchedAttr,
                        0 as libc::c_uint,
                    )
                };
                if rc != 0 {
                    return Err(SchedulerError::setup(
                        SetupStage::Deadline,
                        io::Error::last_os_error(),
                    ));
                }
            }
            SchedulingPolicy::Inherit => {}
        }

        Ok(())
    }

    fn set_affinity(cpus: &[usize]) -> Result<(), SchedulerError> {
        // SAFETY: cpu_set_t is a plain bitmask; all zeroes is the empty set.
        let mut set: cpu_set_t = unsafe { std::mem::zeroed() };
        for &cpu in cpus {
            // SAFETY: `cpu` was validated below CPU_SETSIZE and `set` is initialised.
            unsafe { libc::CPU_SET(cpu, &mut set) };
        }
        // SAFETY: `set` is initialised and its exact size is passed; pid 0 is the calling thread.
        let rc = unsafe { libc::sched_setaffinity(0, size_of::<cpu_set_t>(), &set) };
        if rc != 0 {
            return Err(SchedulerError::setup(
                SetupStage::Affinity,
                io::Error::last_os_error(),
            ));
        }
        Ok(())
    }

    /// Block until `target_ns` on `clock`. Retries on `EINTR`.
    pub(crate) fn sleep_until(&mut self, clock: ClockSource, target_ns: u64) -> RTResult {
        let ts = to_timespec(target_ns);
        loop {
            // SAFETY: `ts` outlives the call; the remainder pointer is unused with TIMER_ABSTIME.
            let rc = unsafe {
                libc::clock_nanosleep(clock_id(clock), TIMER_ABSTIME, &ts, std::ptr::null_mut())
            };
            match rc {
                0 => return Ok(()),
                EINTR => continue,
                _ => return Err(RTError::TimingViolation),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timespec_conversion() {
        let ts = to_timespec(3 * NSEC_PER_SEC + 250);
        assert_eq!(ts.tv_sec, 3);
        assert_eq!(ts.tv_nsec, 250);
        assert_eq!(to_ns(&ts), 3 * NSEC_PER_SEC + 250);
    }

    #[test]
    fn test_sched_attr_size() {
        assert_eq!(size_of::<SchedAttr>(), 48);
    }

    #[test]
    fn test_sleep_until_past_returns_immediately() {
        let mut rt = PlatformRt::new();
        let past = now_ns(ClockSource::Monotonic).saturating_sub(1_000_000);
        assert_eq!(rt.sleep_until(ClockSource::Monotonic, past), Ok(()));
    }

    #[test]
    fn test_inherit_setup_always_applies() {
        let mut rt = PlatformRt::new();
        assert!(rt.apply_rt_setup(&RTSetup::inherit()).is_ok());
    }
}
