//! Top-level error type and its classification.

use core::fmt;

use crate::{LifecycleError, RTError, ValidationError};

/// Top-level error type wrapping every fieldcycle sub-error.
#[derive(Debug, thiserror::Error)]
pub enum FieldcycleError {
    /// Real-time path errors
    #[error("RT error: {0}")]
    RT(#[from] RTError),

    /// Controller and worker lifecycle errors
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Configuration validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// Configuration source errors (parse failures, missing files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl FieldcycleError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FieldcycleError::RT(_) => ErrorCategory::RT,
            FieldcycleError::Lifecycle(_) => ErrorCategory::Lifecycle,
            FieldcycleError::Validation(_) => ErrorCategory::Validation,
            FieldcycleError::Io(_) => ErrorCategory::IO,
            FieldcycleError::Config(_) => ErrorCategory::Config,
            FieldcycleError::Other(_) => ErrorCategory::Other,
        }
    }

    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        FieldcycleError::Config(msg.into())
    }

    /// Create a generic error with a message.
    pub fn other(msg: impl Into<String>) -> Self {
        FieldcycleError::Other(msg.into())
    }
}

impl From<std::io::Error> for FieldcycleError {
    fn from(e: std::io::Error) -> Self {
        FieldcycleError::Io(e)
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Real-time path errors
    RT = 0,
    /// Lifecycle errors
    Lifecycle = 1,
    /// Configuration source errors
    Config = 3,
    /// I/O errors
    IO = 4,
    /// Validation errors
    Validation = 5,
    /// Other errors
    Other = 255,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::RT => write!(f, "RT"),
            ErrorCategory::Lifecycle => write!(f, "Lifecycle"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::IO => write!(f, "IO"),
            ErrorCategory::Validation => write!(f, "Validation"),
            ErrorCategory::Other => write!(f, "Other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        let err: FieldcycleError = RTError::TimingViolation.into();
        assert_eq!(err.category(), ErrorCategory::RT);

        let err: FieldcycleError = LifecycleError::AlreadyRunning.into();
        assert_eq!(err.category(), ErrorCategory::Lifecycle);

        let err = FieldcycleError::config("bad yaml");
        assert_eq!(err.category(), ErrorCategory::Config);
    }
}
