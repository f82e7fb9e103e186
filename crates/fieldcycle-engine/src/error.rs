//! Engine error type.

use std::path::PathBuf;

use fieldcycle_errors::{FieldcycleError, LifecycleError, ValidationError};
use fieldcycle_scheduler::SchedulerError;

/// Errors returned by configuration loading and the controller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Start/stop lifecycle errors
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Scheduler configuration, RT setup or worker errors
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Configuration rejected by validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration file could not be read
    #[error("Failed to read configuration {path}: {source}")]
    ConfigRead {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

impl EngineError {
    /// True for `start()` on a running controller
    pub fn is_already_running(&self) -> bool {
        matches!(self, EngineError::Lifecycle(LifecycleError::AlreadyRunning))
    }
}

impl From<EngineError> for FieldcycleError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Lifecycle(e) => FieldcycleError::Lifecycle(e),
            EngineError::Validation(e) => FieldcycleError::Validation(e),
            EngineError::Scheduler(SchedulerError::InvalidConfig(e)) => {
                FieldcycleError::Validation(e)
            }
            EngineError::Scheduler(e) => FieldcycleError::RT(e.rt_code()),
            EngineError::ConfigRead { source, .. } => FieldcycleError::from(source),
            EngineError::ConfigParse(e) => FieldcycleError::config(e.to_string()),
        }
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
