//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use fieldcycle_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_err, must_some, must_with};

#[cfg(feature = "tracking")]
pub use crate::tracking::{AllocationGuard, TrackingAllocator, track};

#[cfg(feature = "scripted")]
pub use crate::scripted::{MasterCall, ScriptHandle, ScriptedMaster};

#[cfg(feature = "fixtures")]
pub use crate::fixtures::{
    SAMPLE_YAML, io_device, sample_config, sample_topology, unprivileged_config,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
