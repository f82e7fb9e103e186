//! The cycle body must not allocate once it is running.

use fieldcycle_engine::{
    CycleConfig, ManualTime, MasterIoPipeline, MasterSession, PendingOutputCommand, PipelineShared,
    SimulatedMaster,
};
use fieldcycle_test_helpers::assert_rt_safe;
use fieldcycle_test_helpers::prelude::*;
use fieldcycle_tracing::{NullSink, TracingManager};

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

#[test]
fn test_pipeline_cycle_is_allocation_free() -> TestResult {
    let topology = sample_topology()?;
    let time = ManualTime::new(2_000_000_000);
    let mut master = SimulatedMaster::new(&topology)
        .with_reference_offset(1_234)
        .with_time_source(time.clone());
    master.select_reference_clock(0)?;
    master.activate()?;
    let shared = PipelineShared::new(topology, TracingManager::with_sink(NullSink));
    let buffer = std::sync::Arc::clone(&shared.buffer);
    let mut config: CycleConfig = unprivileged_config();
    config.master_health_interval = Some(3);
    let mut pipeline = MasterIoPipeline::with_time_source(master, shared, &config, time.clone());

    // First publication allocates the latest slot.
    pipeline.execute(0);
    buffer.command_outputs(PendingOutputCommand::new(0, [1, 2, 3, 4]))?;

    let guard = track();
    for cycle in 1..200 {
        pipeline.execute(cycle);
        time.advance(1_000_000);
    }
    assert_rt_safe!(guard, "MasterIoPipeline::execute");
    drop(guard);

    let snapshot = must_some(buffer.latest_snapshot(), "snapshot");
    assert_eq!(snapshot.output(0), Some(&[1u8, 2, 3, 4][..]));
    Ok(())
}
