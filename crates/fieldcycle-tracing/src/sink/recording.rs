//! In-memory sink for tests and diagnostics

use std::sync::Arc;

use parking_lot::Mutex;

use super::{ObservabilitySink, SinkCounters};
use crate::{AppTraceEvent, CycleTraceEvent, TracingMetrics};

#[derive(Debug, Default)]
struct Recorded {
    cycle: Mutex<Vec<CycleTraceEvent>>,
    app: Mutex<Vec<AppTraceEvent>>,
    counters: SinkCounters,
}

/// Keeps every emitted event in memory.
///
/// Clones share the same storage, so a test can hand one clone to the
/// engine and inspect another.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    inner: Arc<Recorded>,
}

impl RecordingSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all cycle events recorded so far
    pub fn cycle_events(&self) -> Vec<CycleTraceEvent> {
        self.inner.cycle.lock().clone()
    }

    /// Copy of all app events recorded so far
    pub fn app_events(&self) -> Vec<AppTraceEvent> {
        self.inner.app.lock().clone()
    }

    /// Number of recorded cycle events matching `pred`
    pub fn count_cycle(&self, pred: impl Fn(&CycleTraceEvent) -> bool) -> usize {
        self.inner.cycle.lock().iter().filter(|e| pred(e)).count()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        self.inner.cycle.lock().clear();
        self.inner.app.lock().clear();
    }
}

impl ObservabilitySink for RecordingSink {
    fn emit_cycle_event(&self, event: CycleTraceEvent) {
        self.inner.counters.record_cycle(&event);
        self.inner.cycle.lock().push(event);
    }

    fn emit_app_event(&self, event: AppTraceEvent) {
        self.inner.counters.record_app();
        self.inner.app.lock().push(event);
    }

    fn metrics(&self) -> TracingMetrics {
        self.inner.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let sink = RecordingSink::new();
        let handle = sink.clone();

        sink.emit_cycle_event(CycleTraceEvent::SnapshotDropped { cycle: 3 });
        sink.emit_app_event(AppTraceEvent::WorkerPanicked);

        assert_eq!(handle.cycle_events().len(), 1);
        assert_eq!(handle.app_events(), vec![AppTraceEvent::WorkerPanicked]);
        assert_eq!(
            handle.count_cycle(|e| matches!(e, CycleTraceEvent::SnapshotDropped { .. })),
            1
        );

        handle.clear();
        assert!(sink.cycle_events().is_empty());
        assert_eq!(sink.metrics().cycle_events_emitted, 1);
    }
}
