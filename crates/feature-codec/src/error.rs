//! Validation Error Types

use thiserror::Error;

/// Errors raised while validating an input record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value not part of the field's enumeration
    #[error("{field} value {value:?} is not one of {allowed:?}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    /// Value could not be read as a number of the expected kind
    #[error("{field} value {value} is not a valid number")]
    InvalidNumber { field: &'static str, value: String },
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field) => field,
            ValidationError::OutOfRange { field, .. } => field,
            ValidationError::InvalidEnum { field, .. } => field,
            ValidationError::InvalidNumber { field, .. } => field,
        }
    }
}
