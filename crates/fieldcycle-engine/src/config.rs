//! Cycle configuration and YAML loading.
//!
//! A configuration document has a `cycle` section, a `devices` list and an
//! optional `observability` section:
//!
//! ```yaml
//! cycle:
//!   period_ns: 1000000
//!   policy: { kind: fixed_priority, priority: 80 }
//!   cpu_affinity: [3]
//!   filter_window: 1024
//!   drift_clamp_ns: 1000
//! devices:
//!   - name: xmc4800
//!     position: 0
//!     vendor_id: 0x0000034e
//!     product_code: 0x00000000
//!     input: { offset: 0, len: 8 }
//!     output: { offset: 8, len: 8 }
//! ```

use std::path::Path;
use std::time::Duration;

use fieldcycle_errors::ValidationError;
use fieldcycle_scheduler::{ClockSource, NSEC_PER_SEC, RTSetup, SchedulerConfig, SchedulingPolicy};
use fieldcycle_tracing::TracingManager;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::topology::{DeviceConfig, Topology};

/// Longest accepted cycle period (1 s)
pub const MAX_PERIOD_NS: u64 = NSEC_PER_SEC;

/// Rate of master health polls when no interval is configured
pub const DEFAULT_HEALTH_POLL_HZ: u64 = 10;

/// Which side of the distributed clock follows the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// The local application clock is steered towards the reference device
    #[default]
    MasterFollowsReference,
    /// The reference device clock is written from the application clock
    ReferenceFollowsMaster,
}

/// Parameters of one run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    /// Cycle period (ns)
    pub period_ns: u64,
    /// Scheduling class of the worker
    pub policy: SchedulingPolicy,
    /// CPUs the worker may run on
    pub cpu_affinity: Vec<usize>,
    /// OS clock for wakeups and application time
    pub clock: ClockSource,
    /// Lock all pages before the first cycle
    pub lock_memory: bool,
    /// Distributed clock direction
    pub sync_mode: SyncMode,
    /// Topology index of the reference clock device
    pub reference_device: usize,
    /// Drift filter window N
    pub filter_window: u32,
    /// Bound on the cumulative drift adjustment (ns)
    pub drift_clamp_ns: u32,
    /// Stop on its own after this many milliseconds
    pub run_duration_ms: Option<u64>,
    /// Cycles between master health polls
    pub master_health_interval: Option<u32>,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            period_ns: 1_000_000,
            policy: SchedulingPolicy::default(),
            cpu_affinity: Vec::new(),
            clock: ClockSource::Monotonic,
            lock_memory: true,
            sync_mode: SyncMode::MasterFollowsReference,
            reference_device: 0,
            filter_window: 1024,
            drift_clamp_ns: 1000,
            run_duration_ms: None,
            master_health_interval: None,
        }
    }
}

impl CycleConfig {
    /// Configuration that needs no privileges: inherited policy, no
    /// memory lock, no affinity.
    pub fn unprivileged(period_ns: u64) -> Self {
        Self {
            period_ns,
            policy: SchedulingPolicy::Inherit,
            lock_memory: false,
            ..Self::default()
        }
    }

    /// Set the run bound
    pub fn with_run_duration(mut self, duration: Duration) -> Self {
        self.run_duration_ms = Some(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Check the cycle parameters on their own.
    ///
    /// # Errors
    ///
    /// The first violated constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        fieldcycle_errors::validate_range!("period_ns", self.period_ns, 1, MAX_PERIOD_NS);
        fieldcycle_errors::validate!(
            self.filter_window > 0,
            ValidationError::out_of_range("filter_window", self.filter_window, 1, u32::MAX)
        );
        if let Some(interval) = self.master_health_interval {
            fieldcycle_errors::validate!(
                interval > 0,
                ValidationError::out_of_range("master_health_interval", interval, 1, u32::MAX)
            );
        }
        if let Some(ms) = self.run_duration_ms {
            fieldcycle_errors::validate!(
                ms > 0,
                ValidationError::out_of_range("run_duration_ms", ms, 1, u64::MAX)
            );
        }
        self.rt_setup().validate()
    }

    /// Check the cycle parameters against `topology`.
    ///
    /// # Errors
    ///
    /// Any [`validate`](Self::validate) error, or a reference device index
    /// outside the topology.
    pub fn validate_with(&self, topology: &Topology) -> Result<(), ValidationError> {
        self.validate()?;
        if self.reference_device >= topology.len() {
            return Err(ValidationError::out_of_range(
                "reference_device",
                self.reference_device,
                0,
                topology.len().saturating_sub(1),
            ));
        }
        Ok(())
    }

    /// RT setup for the worker thread
    pub fn rt_setup(&self) -> RTSetup {
        RTSetup::new()
            .with_policy(self.policy)
            .with_cpu_affinity(self.cpu_affinity.iter().copied())
            .with_lock_memory(self.lock_memory)
            .with_clock(self.clock)
    }

    /// Configured run bound
    pub fn run_duration(&self) -> Option<Duration> {
        self.run_duration_ms.map(Duration::from_millis)
    }

    /// Cycles between master health polls, at least 1.
    ///
    /// Defaults to a 10 Hz poll rate.
    pub fn health_interval_cycles(&self) -> u32 {
        self.master_health_interval.unwrap_or_else(|| {
            let per_poll = NSEC_PER_SEC / DEFAULT_HEALTH_POLL_HZ / self.period_ns.max(1);
            u32::try_from(per_poll.max(1)).unwrap_or(u32::MAX)
        })
    }

    /// Launch parameters for the cycle scheduler
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let config = SchedulerConfig::new(self.period_ns)
            .with_setup(self.rt_setup())
            .with_thread_name("fieldcycle-rt")
            .with_stats_window(u64::from(self.health_interval_cycles()));
        match self.run_duration() {
            Some(duration) => config.with_run_duration(duration),
            None => config,
        }
    }
}

fn default_sink() -> String {
    "log".to_string()
}

/// Observability settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Sink name: `log` or `null`
    #[serde(default = "default_sink")]
    pub sink: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
        }
    }
}

/// A complete configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldcycleConfig {
    /// Cycle parameters
    #[serde(default)]
    pub cycle: CycleConfig,
    /// Devices in topology order
    pub devices: Vec<DeviceConfig>,
    /// Observability settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Domain size of a simulated master, if known ahead of activation
    #[serde(default)]
    pub domain_size: Option<usize>,
}

impl FieldcycleConfig {
    /// Parse a YAML document.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigParse`] on malformed YAML or unknown fields.
    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigRead`] or [`EngineError::ConfigParse`].
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&yaml)?;
        tracing::debug!(path = %path.display(), devices = config.devices.len(), "Loaded configuration");
        Ok(config)
    }

    /// Validate the whole document and build the topology.
    ///
    /// # Errors
    ///
    /// The first violated constraint in the cycle section, the device list,
    /// the declared domain size or the sink name.
    pub fn validate(&self) -> Result<Topology, ValidationError> {
        let topology = Topology::new(self.devices.clone())?;
        self.cycle.validate_with(&topology)?;
        if let Some(size) = self.domain_size {
            topology.check_domain(size)?;
        }
        self.tracing_manager()?;
        Ok(topology)
    }

    /// Domain size to simulate: declared, or the smallest that fits.
    pub fn effective_domain_size(&self, topology: &Topology) -> usize {
        self.domain_size
            .unwrap_or_else(|| topology.required_domain_size())
    }

    /// Tracing manager for the configured sink.
    ///
    /// # Errors
    ///
    /// Unknown sink name.
    pub fn tracing_manager(&self) -> Result<TracingManager, ValidationError> {
        TracingManager::from_name(&self.observability.sink).map_err(|err| match err {
            fieldcycle_tracing::TracingError::UnknownSink(name) => {
                ValidationError::invalid_enum("observability.sink", name, "log, null")
            }
            other => ValidationError::constraint(other.to_string()),
        })
    }
}
