//! Subcommand implementations.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use fieldcycle_engine::prelude::SchedulingPolicy;
use fieldcycle_engine::{
    CommunicatorController, CycleConfig, FieldcycleConfig, SimulatedMaster, Topology,
};

use crate::error::CliError;

/// Interval between progress lines while a run is active
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

fn load(path: &Path) -> Result<(FieldcycleConfig, Topology)> {
    let config = FieldcycleConfig::load(path).map_err(CliError::from)?;
    let topology = config
        .validate()
        .map_err(CliError::from)
        .with_context(|| format!("validating {}", path.display()))?;
    Ok((config, topology))
}

/// Parse and validate a configuration file.
pub fn validate(path: &Path) -> Result<()> {
    let (config, topology) = load(path)?;
    println!(
        "{}: ok ({} devices, domain {} bytes, period {} ns, policy {})",
        path.display(),
        topology.len(),
        config.effective_domain_size(&topology),
        config.cycle.period_ns,
        config.cycle.policy
    );
    Ok(())
}

/// Print the default cycle section as YAML.
pub fn defaults() -> Result<()> {
    let yaml = serde_yaml::to_string(&CycleConfig::default()).map_err(CliError::from)?;
    print!("{yaml}");
    Ok(())
}

/// Options for [`run`]
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub duration_ms: Option<u64>,
    pub unprivileged: bool,
    pub reference_offset_ns: i64,
    pub drift_ppb: i64,
}

/// Run a configuration against the simulated master for a bounded time.
pub fn run(path: &Path, options: &RunOptions) -> Result<()> {
    let (config, topology) = load(path)?;

    let mut cycle = config.cycle.clone();
    if let Some(ms) = options.duration_ms {
        cycle.run_duration_ms = Some(ms);
    }
    if options.unprivileged {
        cycle = CycleConfig {
            policy: SchedulingPolicy::Inherit,
            cpu_affinity: Vec::new(),
            lock_memory: false,
            ..cycle
        };
    }
    let Some(duration) = cycle.run_duration() else {
        return Err(CliError::UnboundedRun.into());
    };

    let master = SimulatedMaster::with_domain_size(&topology, config.effective_domain_size(&topology))
        .with_reference_offset(options.reference_offset_ns)
        .with_drift_ppb(options.drift_ppb)
        .with_time_source(cycle.clock);
    let handle = master.handle();
    let tracing = config.tracing_manager().map_err(CliError::from)?;
    let mut controller = CommunicatorController::new(master, topology, tracing);

    tracing::info!(
        period_ns = cycle.period_ns,
        duration_ms = duration.as_millis(),
        "Starting simulated run"
    );
    controller.start(&cycle).map_err(CliError::from)?;

    let started = Instant::now();
    let mut next_report = started + PROGRESS_INTERVAL;
    while controller.is_running() {
        thread::sleep(Duration::from_millis(10));
        if Instant::now() >= next_report {
            next_report += PROGRESS_INTERVAL;
            println!(
                "[{:>5.1}s] {} frames={}",
                started.elapsed().as_secs_f64(),
                controller.counters().snapshot(),
                handle.frames_sent()
            );
        }
    }

    let Some(summary) = controller.stop().map_err(CliError::from)? else {
        return Ok(());
    };
    println!("Run ended: {}", summary.reason);
    println!("{}", summary.statistics);
    println!("{}", summary.counters);
    if summary.counters.cycles > 0 {
        println!("degraded rate: {:.4}", summary.counters.degraded_rate());
    }
    Ok(())
}
