//! Observability error types

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    /// Sink initialization failed
    #[error("Observability sink initialization failed: {0}")]
    InitializationFailed(String),

    /// Sink used before initialization
    #[error("Observability sink not initialized")]
    NotInitialized,

    /// Unknown sink name in configuration
    #[error("Unknown observability sink '{0}'")]
    UnknownSink(String),
}

impl TracingError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TracingError::NotInitialized)
    }

    /// Create an initialization error with context
    pub fn init_failed(context: impl core::fmt::Display) -> Self {
        TracingError::InitializationFailed(context.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_recoverable() {
        assert!(TracingError::NotInitialized.is_recoverable());
        assert!(!TracingError::UnknownSink("etw".into()).is_recoverable());
    }

    #[test]
    fn test_init_failed_keeps_context() {
        let e = TracingError::init_failed("subscriber already set");
        assert!(e.to_string().contains("subscriber already set"));
    }
}
