//! Error taxonomy for the fieldcycle fieldbus engine.
//!
//! Errors fall into three groups, matching how the engine reacts to them:
//!
//! - **Fatal/Configuration**: the run cannot safely start. Scheduling
//!   attributes rejected by the OS, master activation failure, thread
//!   creation failure, invalid configuration. See [`LifecycleError`] and
//!   [`ValidationError`].
//! - **Recoverable/Transient**: degraded domain, master link changes,
//!   overruns. Reported as trace events by the engine; the cycle continues.
//! - **Anomalous/Clamped**: backward clock jumps, drift-adjustment
//!   saturation. Corrected in place and reported as trace events.
//!
//! [`RTError`] is `Copy` and `#[repr(u8)]` so the scheduler can produce it
//! on the real-time path without allocating.
//!
//! # Example
//!
//! ```
//! use fieldcycle_errors::prelude::*;
//!
//! fn check_period(period_ns: u64) -> Result<u64> {
//!     if period_ns == 0 {
//!         return Err(ValidationError::out_of_range("period_ns", period_ns, 1, u64::MAX).into());
//!     }
//!     Ok(period_ns)
//! }
//!
//! assert!(check_period(0).is_err());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod lifecycle;
pub mod prelude;
pub mod rt;
pub mod validation;

pub use common::{ErrorCategory, FieldcycleError};
pub use lifecycle::LifecycleError;
pub use rt::RTError;
pub use validation::ValidationError;

/// A specialized `Result` type for fieldcycle operations.
pub type Result<T> = std::result::Result<T, FieldcycleError>;

/// A specialized `Result` type for real-time operations.
pub type RTResult<T = ()> = std::result::Result<T, RTError>;
