//! Benchmarks for the per-cycle hot path.

use criterion::{Criterion, criterion_group, criterion_main};
use fieldcycle_engine::clock_sync::normalize_diff;
use fieldcycle_engine::{
    CycleConfig, DeviceConfig, ManualTime, MasterIoPipeline, MasterSession, PdoRange,
    PendingOutputCommand, PipelineShared, SimulatedMaster, Topology,
};
use fieldcycle_tracing::{NullSink, TracingManager};
use std::hint::black_box;

fn topology(devices: u16) -> Option<Topology> {
    let entries = (0..devices)
        .map(|i| {
            let base = usize::from(i) * 16;
            DeviceConfig {
                name: format!("dev{i}"),
                alias: 0,
                position: i,
                vendor_id: 0x0000_034e,
                product_code: 1,
                assign_activate: 0x0300,
                sync0_shift_ns: 0,
                input: PdoRange::new(base, 8),
                output: PdoRange::new(base + 8, 8),
            }
        })
        .collect();
    Topology::new(entries).ok()
}

fn bench_pipeline_execute(c: &mut Criterion) {
    for devices in [1u16, 8, 32] {
        let Some(topology) = topology(devices) else {
            return;
        };
        let time = ManualTime::new(1_000_000_000);
        let mut master = SimulatedMaster::new(&topology)
            .with_reference_offset(777)
            .with_time_source(time.clone());
        if master.select_reference_clock(0).is_err() || master.activate().is_err() {
            return;
        }
        let shared = PipelineShared::new(topology, TracingManager::with_sink(NullSink));
        if shared
            .buffer
            .command_outputs(PendingOutputCommand::new(0, [0xFF; 8]))
            .is_err()
        {
            return;
        }
        let config = CycleConfig::unprivileged(1_000_000);
        let mut pipeline = MasterIoPipeline::with_time_source(master, shared, &config, time.clone());
        let mut cycle = 0u64;

        c.bench_function(&format!("pipeline_execute_{devices}_devices"), |b| {
            b.iter(|| {
                pipeline.execute(black_box(cycle));
                cycle += 1;
                time.advance(1_000_000);
            });
        });
    }
}

fn bench_normalize_diff(c: &mut Criterion) {
    let mut d = -2_000_000_000i64;
    c.bench_function("normalize_diff", |b| {
        b.iter(|| {
            d = d.wrapping_add(7_919);
            black_box(normalize_diff(black_box(d), 1_000_000));
        });
    });
}

criterion_group!(benches, bench_pipeline_execute, bench_normalize_diff);
criterion_main!(benches);
