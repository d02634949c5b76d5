//! Core error types used across the system

use thiserror::Error;
use crate::money::MoneyError;

/// Core error type for the kernel
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub(crate) fn invalid_identifier(
        kind: &'static str,
        value: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
