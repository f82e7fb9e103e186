//! Shared test utilities for fieldcycle.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`scripted`] - [`ScriptedMaster`](scripted::ScriptedMaster), a master session
//!   double that journals every call
//! - [`tracking`] - Allocation tracking for RT safety tests
//! - [`fixtures`] - Sample topologies and configurations
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! fieldcycle-test-helpers = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! use fieldcycle_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![expect(clippy::panic, reason = "test helpers panic on purpose")]

pub mod must;
pub mod prelude;

#[cfg(feature = "tracking")]
pub mod tracking;

#[cfg(feature = "scripted")]
pub mod scripted;

#[cfg(feature = "fixtures")]
pub mod fixtures;

pub use must::*;

#[cfg(feature = "tracking")]
pub use tracking::track;
