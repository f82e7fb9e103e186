//! Absolute-time wakeups on a configured OS clock.

use fieldcycle_errors::RTResult;

use crate::clock::ClockSource;
use crate::error::SchedulerError;
use crate::platform::PlatformRt;
use crate::rt_setup::RTSetup;
use crate::wakeup::WakeupSchedule;

/// What the cycle body learns about the wakeup it runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleContext {
    /// Zero-based cycle index
    pub cycle: u64,
    /// Intended absolute wakeup (ns on the scheduler clock)
    pub wakeup_ns: u64,
    /// Observed wakeup (ns on the scheduler clock)
    pub actual_ns: u64,
    /// `actual_ns - wakeup_ns`, zero if early
    pub latency_ns: u64,
    /// Configured period (ns)
    pub period_ns: u64,
}

/// Sleeps until each absolute wakeup of a [`WakeupSchedule`].
///
/// There is no drift correction or adaptive period: wakeup `k+1` is always
/// wakeup `k` plus one period. An overrun makes the following wakeups
/// return immediately until the schedule is ahead of the clock again.
///
/// # RT-Safety
///
/// `wait_for_tick` is O(1), allocation-free and performs a single absolute
/// sleep syscall (repeated only on `EINTR`).
#[derive(Debug)]
pub struct AbsoluteScheduler {
    schedule: WakeupSchedule,
    clock: ClockSource,
    rt_setup_applied: bool,
    platform: PlatformRt,
}

impl AbsoluteScheduler {
    /// Scheduler whose first wakeup is one period from now.
    pub fn new(period_ns: u64, clock: ClockSource) -> Self {
        Self::starting_at(clock.now_ns(), period_ns, clock)
    }

    /// Scheduler whose first wakeup is one period after `origin_ns`.
    pub fn starting_at(origin_ns: u64, period_ns: u64, clock: ClockSource) -> Self {
        Self {
            schedule: WakeupSchedule::new(origin_ns, period_ns),
            clock,
            rt_setup_applied: false,
            platform: PlatformRt::new(),
        }
    }

    /// Apply `setup` to the calling thread.
    ///
    /// Call once from the thread that will call `wait_for_tick`.
    ///
    /// # Errors
    ///
    /// Returns the stage the OS rejected. Nothing is rolled back.
    pub fn apply_rt_setup(&mut self, setup: &RTSetup) -> Result<(), SchedulerError> {
        if self.rt_setup_applied {
            return Ok(());
        }
        self.platform.apply_rt_setup(setup)?;
        self.rt_setup_applied = true;
        Ok(())
    }

    /// Re-anchor the schedule so the first wakeup is one period from now.
    pub fn restart(&mut self) {
        self.schedule = WakeupSchedule::new(self.clock.now_ns(), self.schedule.period_ns());
    }

    /// Block until the next absolute wakeup.
    ///
    /// # Errors
    ///
    /// `RTError::TimingViolation` if the sleep syscall failed. The schedule
    /// has still advanced, so the next call targets the following wakeup.
    pub fn wait_for_tick(&mut self) -> RTResult<CycleContext> {
        let (cycle, wakeup_ns) = self.schedule.advance();
        self.platform.sleep_until(self.clock, wakeup_ns)?;
        let actual_ns = self.clock.now_ns();
        Ok(CycleContext {
            cycle,
            wakeup_ns,
            actual_ns,
            latency_ns: actual_ns.saturating_sub(wakeup_ns),
            period_ns: self.schedule.period_ns(),
        })
    }

    /// Current reading of the scheduler clock
    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.clock.now_ns()
    }

    /// Absolute time of the next wakeup
    #[inline]
    pub fn next_wakeup_ns(&self) -> u64 {
        self.schedule.next_wakeup_ns()
    }

    /// Wakeups consumed so far
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.schedule.cycles()
    }

    /// Period in nanoseconds
    #[inline]
    pub fn period_ns(&self) -> u64 {
        self.schedule.period_ns()
    }

    /// Clock used for wakeups
    #[inline]
    pub fn clock(&self) -> ClockSource {
        self.clock
    }

    /// Check if RT setup has been applied
    #[inline]
    pub fn is_rt_setup_applied(&self) -> bool {
        self.rt_setup_applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_creation() {
        let scheduler = AbsoluteScheduler::new(crate::PERIOD_1KHZ_NS, ClockSource::Monotonic);
        assert_eq!(scheduler.period_ns(), 1_000_000);
        assert_eq!(scheduler.tick_count(), 0);
        assert!(!scheduler.is_rt_setup_applied());
    }

    #[test]
    fn test_zero_period_handled() {
        let scheduler = AbsoluteScheduler::new(0, ClockSource::Monotonic);
        assert_eq!(scheduler.period_ns(), 1);
    }

    #[test]
    fn test_wakeups_in_the_past_return_immediately() -> RTResult {
        let mut scheduler = AbsoluteScheduler::starting_at(0, 1_000, ClockSource::Monotonic);
        let first = scheduler.wait_for_tick()?;
        let second = scheduler.wait_for_tick()?;

        assert_eq!(first.cycle, 0);
        assert_eq!(first.wakeup_ns, 1_000);
        assert_eq!(second.wakeup_ns - first.wakeup_ns, 1_000);
        assert!(second.latency_ns > 0);
        Ok(())
    }

    #[test]
    fn test_inherit_setup_applies_once() {
        let mut scheduler = AbsoluteScheduler::new(1_000_000, ClockSource::Monotonic);
        assert!(scheduler.apply_rt_setup(&RTSetup::inherit()).is_ok());
        assert!(scheduler.is_rt_setup_applied());
        assert!(scheduler.apply_rt_setup(&RTSetup::inherit()).is_ok());
    }
}
