//! Real-time path error codes.
//!
//! Produced by the scheduler where allocation is not allowed:
//! `Copy`, `#[repr(u8)]`, fixed numeric codes.

use core::fmt;

/// Real-time error codes.
///
/// # Examples
///
/// ```
/// use fieldcycle_errors::RTError;
///
/// let err = RTError::TimingViolation;
/// assert_eq!(err.code(), 2);
/// assert_eq!(RTError::from_code(2), Some(err));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RTError {
    /// The worker thread was lost or panicked
    PipelineFault = 1,
    /// The absolute sleep syscall failed
    TimingViolation = 2,
    /// The OS rejected the requested scheduling attributes
    RTSetupFailed = 3,
    /// Invalid configuration parameter in RT path
    InvalidConfig = 4,
    /// Resource unavailable in RT path
    ResourceUnavailable = 5,
}

impl RTError {
    /// Get the numeric error code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Create an error from a code.
    ///
    /// ```
    /// use fieldcycle_errors::RTError;
    ///
    /// assert_eq!(RTError::from_code(3), Some(RTError::RTSetupFailed));
    /// assert_eq!(RTError::from_code(0), None);
    /// ```
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(RTError::PipelineFault),
            2 => Some(RTError::TimingViolation),
            3 => Some(RTError::RTSetupFailed),
            4 => Some(RTError::InvalidConfig),
            5 => Some(RTError::ResourceUnavailable),
            _ => None,
        }
    }
}

impl fmt::Display for RTError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RTError::PipelineFault => write!(f, "Cycle worker lost"),
            RTError::TimingViolation => write!(f, "Real-time timing violation"),
            RTError::RTSetupFailed => write!(f, "Failed to apply real-time setup"),
            RTError::InvalidConfig => write!(f, "Invalid configuration parameter"),
            RTError::ResourceUnavailable => write!(f, "RT resource unavailable"),
        }
    }
}

impl std::error::Error for RTError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_from_code() {
        for code in 1..=5u8 {
            let err = RTError::from_code(code);
            assert_eq!(err.map(RTError::code), Some(code));
        }
        assert_eq!(RTError::from_code(6), None);
    }

    #[test]
    fn test_display_is_non_empty() {
        for code in 1..=5u8 {
            if let Some(err) = RTError::from_code(code) {
                assert!(!err.to_string().is_empty());
            }
        }
    }
}
