//! Absolute wakeup arithmetic.

/// Sequence of absolute wakeup instants spaced exactly one period apart.
///
/// Each wakeup is derived from the previous one, never from the time the
/// previous cycle finished, so execution jitter does not accumulate.
///
/// ```
/// use fieldcycle_scheduler::WakeupSchedule;
///
/// let mut schedule = WakeupSchedule::new(10_000, 1_000);
/// assert_eq!(schedule.advance(), (0, 11_000));
/// assert_eq!(schedule.advance(), (1, 12_000));
/// assert_eq!(schedule.next_wakeup_ns(), 13_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeupSchedule {
    period_ns: u64,
    next_ns: u64,
    index: u64,
}

impl WakeupSchedule {
    /// Schedule whose first wakeup is one period after `origin_ns`.
    ///
    /// A zero period is raised to 1 ns.
    pub fn new(origin_ns: u64, period_ns: u64) -> Self {
        let period_ns = period_ns.max(1);
        Self {
            period_ns,
            next_ns: origin_ns.saturating_add(period_ns),
            index: 0,
        }
    }

    /// Consume the next wakeup. Returns its cycle index and absolute time.
    #[inline]
    pub fn advance(&mut self) -> (u64, u64) {
        let wakeup = self.next_ns;
        let index = self.index;
        self.next_ns = self.next_ns.saturating_add(self.period_ns);
        self.index = self.index.saturating_add(1);
        (index, wakeup)
    }

    /// Absolute time of the wakeup `advance` will return next
    #[inline]
    pub fn next_wakeup_ns(&self) -> u64 {
        self.next_ns
    }

    /// Number of wakeups consumed
    #[inline]
    pub fn cycles(&self) -> u64 {
        self.index
    }

    /// Period in nanoseconds
    #[inline]
    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_period_raised() {
        let schedule = WakeupSchedule::new(0, 0);
        assert_eq!(schedule.period_ns(), 1);
    }

    #[test]
    fn test_spacing_is_exact() {
        let mut schedule = WakeupSchedule::new(5, 250_000);
        let mut prev = schedule.advance().1;
        for _ in 0..1_000 {
            let (_, next) = schedule.advance();
            assert_eq!(next - prev, 250_000);
            prev = next;
        }
        assert_eq!(schedule.cycles(), 1_001);
    }

    #[test]
    fn test_saturates_near_u64_max() {
        let mut schedule = WakeupSchedule::new(u64::MAX - 1, 10);
        assert_eq!(schedule.advance().1, u64::MAX);
        assert_eq!(schedule.advance().1, u64::MAX);
    }
}
