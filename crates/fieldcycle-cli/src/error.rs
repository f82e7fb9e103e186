//! Error types for the fieldcycle CLI

use fieldcycle_engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] fieldcycle_errors::ValidationError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Run needs a duration: set cycle.run_duration_ms or pass --duration-ms")]
    UnboundedRun,

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidConfiguration(_)
            | CliError::YamlError(_)
            | CliError::Engine(
                EngineError::ConfigRead { .. }
                | EngineError::ConfigParse(_)
                | EngineError::Validation(_),
            ) => 4,
            CliError::UnboundedRun => 2,
            CliError::Engine(_) => 1,
        }
    }
}
