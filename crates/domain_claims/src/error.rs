//! Claims domain errors

use core_kernel::{MoneyError, PortError};
use thiserror::Error;

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid priority level {0}: expected 1 to 5")]
    InvalidPriority(u8),

    #[error("Claim must contain at least one item")]
    NoItems,

    #[error("Invalid claim item '{name}': {reason}")]
    InvalidItem { name: String, reason: String },

    #[error("Invalid date preference: {0}")]
    InvalidDatePreference(String),

    #[error("Invalid insurer policy: {field} {reason}")]
    InvalidInsurerPolicy { field: &'static str, reason: String },

    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Stores reject invalid data as a validation failure, naming the field when known
impl From<ClaimError> for PortError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::InvalidInsurerPolicy { field, reason } => {
                PortError::validation_field(reason, field)
            }
            other => PortError::validation(other.to_string()),
        }
    }
}
