//! Cost of emitting cycle events through the manager

use criterion::{Criterion, criterion_group, criterion_main};
use fieldcycle_tracing::{CycleTraceEvent, LogSink, NullSink, TracingManager};

fn bench_emit(c: &mut Criterion) {
    let null = TracingManager::with_sink(NullSink);
    c.bench_function("emit_null_sink", |b| {
        b.iter(|| {
            null.emit_cycle_event(CycleTraceEvent::SnapshotDropped {
                cycle: std::hint::black_box(1),
            })
        })
    });

    // No subscriber installed: measures counter updates plus the disabled callsite check.
    let log = TracingManager::with_sink(LogSink::new());
    c.bench_function("emit_log_sink_no_subscriber", |b| {
        b.iter(|| {
            log.emit_cycle_event(CycleTraceEvent::DomainDegraded {
                cycle: std::hint::black_box(1),
                working_counter: 1,
                expected: 2,
            })
        })
    });
}

criterion_group!(benches, bench_emit);
criterion_main!(benches);
