//! Commonly used scheduler types.

pub use crate::clock::ClockSource;
pub use crate::error::{SchedulerError, SetupStage};
pub use crate::policy::SchedulingPolicy;
pub use crate::rt_setup::RTSetup;
pub use crate::scheduler::{AbsoluteScheduler, CycleContext};
pub use crate::statistics::CycleStatistics;
pub use crate::worker::{
    CycleBody, CycleScheduler, CycleWorker, ExitReason, SchedulerConfig, StopHandle, WorkerExit,
};
pub use crate::{NSEC_PER_SEC, PERIOD_1KHZ_NS};
pub use fieldcycle_errors::{RTError, RTResult};
