//! Controller and worker lifecycle errors.

/// Errors returned synchronously by `start()`/`stop()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// A worker is already running
    #[error("Communicator is already running")]
    AlreadyRunning,

    /// The master session refused to activate
    #[error("Master activation failed: {0}")]
    ActivationFailed(String),

    /// The master session refused the reference clock selection
    #[error("Reference clock selection rejected for device {device}")]
    ReferenceClockRejected {
        /// Topology index of the requested reference device
        device: usize,
    },

    /// The master session was lost with a panicked worker
    #[error("Master session unavailable")]
    MasterUnavailable,

    /// The worker thread panicked
    #[error("Cycle worker panicked")]
    WorkerPanicked,

    /// The configured topology does not fit into the master's domain
    #[error("Domain too small: topology requires {required} bytes, domain has {actual}")]
    DomainTooSmall {
        /// Bytes addressed by the topology
        required: usize,
        /// Bytes exposed by the master session
        actual: usize,
    },
}

impl LifecycleError {
    /// Create an activation failure with a reason.
    pub fn activation_failed(reason: impl Into<String>) -> Self {
        LifecycleError::ActivationFailed(reason.into())
    }
}
