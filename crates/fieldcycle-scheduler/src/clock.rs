//! OS clock selection.

/// Clock used for absolute wakeups and application time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ClockSource {
    /// `CLOCK_MONOTONIC`: never jumps, epoch is boot
    #[default]
    Monotonic,
    /// `CLOCK_REALTIME`: wall clock, may be stepped
    Realtime,
}

impl ClockSource {
    /// Current reading of this clock in nanoseconds.
    #[inline]
    pub fn now_ns(self) -> u64 {
        crate::platform::now_ns(self)
    }
}

impl core::fmt::Display for ClockSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ClockSource::Monotonic => write!(f, "monotonic"),
            ClockSource::Realtime => write!(f, "realtime"),
        }
    }
}
