//! Absolute-time cyclic scheduling for real-time fieldbus workers.
//!
//! This crate runs one cycle body on a dedicated thread at a fixed period:
//!
//! - **WakeupSchedule**: pure wakeup arithmetic, `next = previous + period`
//! - **AbsoluteScheduler**: sleeps until each absolute wakeup and reports latency
//! - **RTSetup**: scheduling policy, CPU affinity and memory locking for the worker
//! - **CycleScheduler / CycleWorker**: launch, cooperative stop and join
//! - **CycleStatistics**: windowed min/max of period, execution time and latency
//!
//! # Cancellation
//!
//! The stop flag is checked only immediately before each wait. A cycle body
//! that has started always runs to completion.
//!
//! # Example
//!
//! ```no_run
//! use fieldcycle_scheduler::{CycleContext, CycleScheduler, RTSetup, SchedulerConfig};
//!
//! let config = SchedulerConfig::new(1_000_000).with_setup(RTSetup::inherit());
//! let scheduler = CycleScheduler::configure(config)?;
//!
//! let mut count = 0u64;
//! let worker = scheduler
//!     .run(move |_ctx: &CycleContext| count += 1)
//!     .map_err(|launch| launch.error)?;
//!
//! std::thread::sleep(std::time::Duration::from_millis(20));
//! worker.request_stop();
//! let exit = worker.join()?;
//! println!("{} cycles", exit.statistics.cycles);
//! # Ok::<(), fieldcycle_scheduler::SchedulerError>(())
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod clock;
pub mod error;
pub mod policy;
pub mod rt_setup;
pub mod scheduler;
pub mod statistics;
pub mod wakeup;
pub mod worker;

mod platform;

pub mod prelude;

pub use clock::ClockSource;
pub use error::{SchedulerError, SetupStage};
pub use fieldcycle_errors::{RTError, RTResult};
pub use policy::SchedulingPolicy;
pub use rt_setup::RTSetup;
pub use scheduler::{AbsoluteScheduler, CycleContext};
pub use statistics::{CycleStatistics, TimingRange, WindowStatistics};
pub use wakeup::WakeupSchedule;
pub use worker::{
    CycleBody, CycleScheduler, CycleWorker, DEFAULT_STATS_WINDOW_HZ, ExitReason, LaunchError,
    MAX_CONSECUTIVE_SLEEP_FAILURES, SchedulerConfig, StopHandle, WorkerExit,
};

/// 1 kHz period in nanoseconds
pub const PERIOD_1KHZ_NS: u64 = 1_000_000;

/// Nanoseconds per second
pub const NSEC_PER_SEC: u64 = 1_000_000_000;
