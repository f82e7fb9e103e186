//! Commonly used observability types

pub use crate::{
    AppTraceEvent, CycleTraceEvent, LogSink, NullSink, ObservabilitySink, RecordingSink,
    TracingError, TracingManager, TracingMetrics,
    events::{AppEventCategory, CycleEventCategory},
};
