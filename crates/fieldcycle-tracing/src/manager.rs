//! Front end through which the engine reports events

use std::sync::Arc;

use crate::{
    AppTraceEvent, CycleTraceEvent, LogSink, NullSink, ObservabilitySink, TracingError,
    TracingMetrics,
};

/// Routes events to the configured [`ObservabilitySink`].
///
/// Cloning is cheap and every clone feeds the same sink, so the controller
/// and the cycle worker each hold one.
///
/// ```
/// use fieldcycle_tracing::TracingManager;
///
/// let manager = TracingManager::from_name("log")?;
/// assert!(manager.is_enabled());
/// # Ok::<(), fieldcycle_tracing::TracingError>(())
/// ```
#[derive(Clone)]
pub struct TracingManager {
    sink: Arc<dyn ObservabilitySink>,
    enabled: bool,
}

impl TracingManager {
    /// Create a manager writing to the structured-log sink
    pub fn new() -> Self {
        Self::with_sink(LogSink::new())
    }

    /// Create a manager around a custom sink
    pub fn with_sink<S: ObservabilitySink + 'static>(sink: S) -> Self {
        Self {
            sink: Arc::new(sink),
            enabled: true,
        }
    }

    /// Create a manager around an already shared sink
    pub fn with_shared(sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            sink,
            enabled: true,
        }
    }

    /// Select a built-in sink by its configuration name (`log` or `null`)
    ///
    /// # Errors
    ///
    /// Returns [`TracingError::UnknownSink`] for any other name.
    pub fn from_name(name: &str) -> Result<Self, TracingError> {
        match name {
            "log" => Ok(Self::new()),
            "null" => Ok(Self::with_sink(NullSink)),
            other => Err(TracingError::UnknownSink(other.to_string())),
        }
    }

    /// Initialize the sink
    ///
    /// # Errors
    ///
    /// Propagates the sink's initialization error.
    pub fn initialize(&self) -> Result<(), TracingError> {
        self.sink.initialize()
    }

    /// Enable or disable this handle. Disabled handles drop events silently.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check if events reach the sink
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.sink.is_enabled()
    }

    /// Emit an event from the cycle worker
    #[inline]
    pub fn emit_cycle_event(&self, event: CycleTraceEvent) {
        if self.enabled {
            self.sink.emit_cycle_event(event);
        }
    }

    /// Emit a controller lifecycle event
    pub fn emit_app_event(&self, event: AppTraceEvent) {
        if self.enabled {
            self.sink.emit_app_event(event);
        }
    }

    /// Get current sink metrics
    pub fn metrics(&self) -> TracingMetrics {
        self.sink.metrics()
    }

    /// Shut down the sink
    pub fn shutdown(&self) {
        self.sink.shutdown();
    }
}

impl Default for TracingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for TracingManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TracingManager")
            .field("enabled", &self.enabled)
            .field("sink_type", &core::any::type_name_of_val(&*self.sink))
            .finish()
    }
}
