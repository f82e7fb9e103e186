//! Fieldcycle Engine - cyclic fieldbus master core
//!
//! This crate runs the real-time side of a fieldbus master client. One
//! worker thread executes a fixed I/O sequence against a [`MasterSession`]
//! every period, keeps the local application clock aligned with the
//! distributed-clock reference device, and exchanges process data with
//! non-real-time consumers through a [`ProcessDataBuffer`].
//!
//! # Example
//!
//! ```no_run
//! use fieldcycle_engine::harness::SimulatedMaster;
//! use fieldcycle_engine::{CommunicatorController, FieldcycleConfig};
//!
//! let config = FieldcycleConfig::load("configs/simulated.yaml")?;
//! let topology = config.validate()?;
//! let master = SimulatedMaster::new(&topology);
//! let mut controller = CommunicatorController::new(master, topology, config.tracing_manager()?);
//!
//! controller.start(&config.cycle)?;
//! std::thread::sleep(std::time::Duration::from_millis(100));
//! if let Some(summary) = controller.stop()? {
//!     println!("{}", summary.statistics);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod clock_sync;
pub mod config;
pub mod controller;
pub mod error;
#[cfg(any(test, feature = "harness"))]
pub mod harness;
pub mod metrics;
pub mod pipeline;
pub mod ports;
pub mod prelude;
pub mod process_data;
pub mod topology;

pub use clock_sync::{
    ClockAnomaly, ClockState, ClockSynchronizer, DriftParams, DriftUpdate, ManualTime, SyncReport,
    TimeSource,
};
pub use config::{CycleConfig, FieldcycleConfig, ObservabilityConfig, SyncMode};
pub use controller::{CommunicatorController, RunSummary, WorkerState};
pub use error::{EngineError, EngineResult};
#[cfg(any(test, feature = "harness"))]
pub use harness::{SimulatedMaster, SimulationHandle};
pub use metrics::{CounterSnapshot, EngineCounters};
pub use pipeline::{MasterIoPipeline, PipelineShared};
pub use ports::{DomainHealth, MasterError, MasterHealth, MasterSession, WorkingCounterState};
pub use process_data::{
    BufferStats, DeviceData, OutputImage, PendingOutputCommand, ProcessDataBuffer,
    ProcessDataSnapshot,
};
pub use topology::{DeviceConfig, PdoRange, Topology};
