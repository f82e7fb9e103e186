//! Error types for the scheduler crate.

use core::fmt;

use fieldcycle_errors::{RTError, ValidationError};

/// Which part of the real-time setup the OS rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    /// `SCHED_FIFO` priority
    FixedPriority,
    /// `SCHED_DEADLINE` budget
    Deadline,
    /// CPU affinity
    Affinity,
    /// `mlockall`
    MemoryLock,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupStage::FixedPriority => write!(f, "fixed-priority policy"),
            SetupStage::Deadline => write!(f, "deadline policy"),
            SetupStage::Affinity => write!(f, "cpu affinity"),
            SetupStage::MemoryLock => write!(f, "memory lock"),
        }
    }
}

/// Scheduler configuration and lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Configuration failed validation
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    /// The OS rejected part of the real-time setup
    #[error("Failed to apply {stage}: {source}")]
    Setup {
        /// Rejected stage
        stage: SetupStage,
        /// OS error
        #[source]
        source: std::io::Error,
    },

    /// The platform has no way to honor the request
    #[error("{stage} is not supported on this platform")]
    Unsupported {
        /// Requested stage
        stage: SetupStage,
    },

    /// The worker thread could not be created
    #[error("Failed to spawn cycle worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker thread panicked
    #[error("Cycle worker panicked")]
    WorkerPanicked,

    /// The worker exited without handing back its body
    #[error("Cycle worker exited without returning its body")]
    WorkerLost,
}

impl SchedulerError {
    /// RT error code for reporting on the real-time path
    pub fn rt_code(&self) -> RTError {
        match self {
            SchedulerError::InvalidConfig(_) => RTError::InvalidConfig,
            SchedulerError::Setup { .. } | SchedulerError::Unsupported { .. } => {
                RTError::RTSetupFailed
            }
            SchedulerError::Spawn(_) => RTError::ResourceUnavailable,
            SchedulerError::WorkerPanicked | SchedulerError::WorkerLost => RTError::PipelineFault,
        }
    }

    /// True when the OS or platform refused the scheduling attributes
    pub fn is_setup_rejection(&self) -> bool {
        matches!(
            self,
            SchedulerError::Setup { .. } | SchedulerError::Unsupported { .. }
        )
    }

    pub(crate) fn setup(stage: SetupStage, source: std::io::Error) -> Self {
        SchedulerError::Setup { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_display() {
        let err = SchedulerError::setup(
            SetupStage::FixedPriority,
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().starts_with("Failed to apply fixed-priority policy"));
        assert_eq!(err.rt_code(), RTError::RTSetupFailed);
        assert!(err.is_setup_rejection());
    }

    #[test]
    fn test_invalid_config_code() {
        let err: SchedulerError = ValidationError::required("period_ns").into();
        assert_eq!(err.rt_code(), RTError::InvalidConfig);
        assert!(!err.is_setup_rejection());
    }
}
