//! Platform-specific real-time setup, clock reads and absolute sleeps.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub(crate) use linux::{PlatformRt, now_ns};

#[cfg(not(target_os = "linux"))]
mod fallback;

#[cfg(not(target_os = "linux"))]
pub(crate) use fallback::{PlatformRt, now_ns};
