//! Commonly used engine types.

pub use crate::config::{CycleConfig, FieldcycleConfig, SyncMode};
pub use crate::controller::{CommunicatorController, RunSummary, WorkerState};
pub use crate::error::{EngineError, EngineResult};
pub use crate::ports::{DomainHealth, MasterError, MasterHealth, MasterSession};
pub use crate::process_data::{PendingOutputCommand, ProcessDataBuffer, ProcessDataSnapshot};
pub use crate::topology::{DeviceConfig, PdoRange, Topology};
pub use fieldcycle_scheduler::prelude::*;
