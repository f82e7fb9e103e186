//! Configuration validation errors.
//!
//! Returned when a cycle configuration or device topology is rejected before
//! a run starts.

use core::fmt;


/// Validation error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Value out of range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Value is required but missing
    #[error("Required field '{0}' is missing")]
    Required(String),

    /// Invalid format
    #[error("Invalid format for field '{field}': {reason}")]
    InvalidFormat {
        /// Field name
        field: String,
        /// Reason for the format error
        reason: String,
    },

    /// Invalid enum value
    #[error("Invalid value '{value}' for field '{field}', expected one of: {expected}")]
    InvalidEnumValue {
        /// Field name
        field: String,
        /// The invalid value
        value: String,
        /// Expected values
        expected: String,
    },

    /// A device byte range does not fit into the process-data domain
    #[error(
        "Device {device} {direction} range [{offset}, {offset}+{len}) exceeds domain size {domain_size}"
    )]
    RangeOutOfDomain {
        /// Topology index of the device
        device: usize,
        /// "input" or "output"
        direction: &'static str,
        /// Byte offset into the domain
        offset: usize,
        /// Range length in bytes
        len: usize,
        /// Domain size in bytes
        domain_size: usize,
    },

    /// Value not unique
    #[error("Value for field '{field}' must be unique but '{value}' already exists")]
    NotUnique {
        /// Field name
        field: String,
        /// The duplicate value
        value: String,
    },

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Custom validation error
    #[error("Validation error: {0}")]
    Custom(String),
}

impl ValidationError {
    /// Create an out of range error for a numeric value.
    pub fn out_of_range<T: fmt::Debug>(field: impl Into<String>, value: T, min: T, max: T) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            value: format!("{:?}", value),
            min: format!("{:?}", min),
            max: format!("{:?}", max),
        }
    }

    /// Create a required field error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required(field.into())
    }

    /// Create an invalid format error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid enum value error.
    pub fn invalid_enum(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        ValidationError::InvalidEnumValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a not-unique error.
    pub fn not_unique(field: impl Into<String>, value: impl fmt::Display) -> Self {
        ValidationError::NotUnique {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Create a constraint violation error.
    pub fn constraint(msg: impl Into<String>) -> Self {
        ValidationError::ConstraintViolation(msg.into())
    }

    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        ValidationError::Custom(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = ValidationError::out_of_range("priority", 120u32, 1, 99);
        let msg = err.to_string();
        assert!(msg.contains("priority"));
        assert!(msg.contains("120"));
        assert!(msg.contains("99"));
    }

    #[test]
    fn test_required_message() {
        let err = ValidationError::required("cycle.period_ns");
        assert_eq!(err.to_string(), "Required field 'cycle.period_ns' is missing");
    }

    #[test]
    fn test_range_out_of_domain_message() {
        let err = ValidationError::RangeOutOfDomain {
            device: 2,
            direction: "output",
            offset: 30,
            len: 4,
            domain_size: 32,
        };
        let msg = err.to_string();
        assert!(msg.contains("Device 2 output"));
        assert!(msg.contains("32"));
    }

    #[test]
    fn test_not_unique_message() {
        let err = ValidationError::not_unique("cpu_affinity", 3);
        assert!(err.to_string().contains("'3'"));
    }

    #[test]
    fn test_validation_error_is_std_error() {
        let err = ValidationError::required("test");
        let _: &dyn std::error::Error = &err;
    }
}
