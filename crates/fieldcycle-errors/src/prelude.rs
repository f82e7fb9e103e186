//! Commonly used error types and macros.
//!
//! ```
//! use fieldcycle_errors::prelude::*;
//!
//! fn window(n: u32) -> Result<u32> {
//!     fieldcycle_errors::validate!(n > 0, ValidationError::out_of_range("filter_window", n, 1, u32::MAX));
//!     Ok(n)
//! }
//!
//! assert!(window(0).is_err());
//! assert!(window(4).is_ok());
//! ```

pub use crate::{
    RTResult, Result,
    common::{ErrorCategory, FieldcycleError},
    lifecycle::LifecycleError,
    rt::RTError,
    validation::ValidationError,
};

/// Return early with `$error` unless `$condition` holds.
#[macro_export]
macro_rules! validate {
    ($condition:expr, $error:expr) => {
        if !$condition {
            return Err($error.into());
        }
    };
}

/// Return early with an out-of-range error unless `$min <= $value <= $max`.
#[macro_export]
macro_rules! validate_range {
    ($field:expr, $value:expr, $min:expr, $max:expr) => {
        if $value < $min || $value > $max {
            return Err($crate::ValidationError::out_of_range($field, $value, $min, $max).into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_range_macro() {
        fn check(priority: u32) -> Result<()> {
            validate_range!("priority", priority, 1, 99);
            Ok(())
        }
        assert!(check(80).is_ok());
        assert!(check(0).is_err());
        assert!(check(100).is_err());
    }
}
