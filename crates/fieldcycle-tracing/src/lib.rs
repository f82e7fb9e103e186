//! RT-safe observability for the fieldcycle engine.
//!
//! The cycle worker reports health transitions and anomalies as
//! [`CycleTraceEvent`]s. They are `Copy`, carry only scalars and are handed to
//! an [`ObservabilitySink`] chosen at configuration time. Formatting and I/O
//! happen inside the sink, never in the cycle body.
//!
//! Sinks shipped here:
//! - [`LogSink`]: structured `tracing` records (the default)
//! - [`RecordingSink`]: keeps every event in memory, for tests
//! - [`NullSink`]: discards everything
//!
//! # Example
//!
//! ```
//! use fieldcycle_tracing::{CycleTraceEvent, RecordingSink, TracingManager};
//!
//! let sink = RecordingSink::new();
//! let manager = TracingManager::with_sink(sink.clone());
//!
//! manager.emit_cycle_event(CycleTraceEvent::DomainDegraded {
//!     cycle: 12,
//!     working_counter: 2,
//!     expected: 3,
//! });
//!
//! assert_eq!(sink.cycle_events().len(), 1);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod events;
pub mod manager;
pub mod metrics;
pub mod prelude;
pub mod sink;

pub use error::TracingError;
pub use events::{AppEventCategory, AppTraceEvent, CycleEventCategory, CycleTraceEvent};
pub use manager::TracingManager;
pub use metrics::TracingMetrics;
pub use sink::{LogSink, NullSink, ObservabilitySink, RecordingSink};
