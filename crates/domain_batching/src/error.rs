//! Batching domain errors

use thiserror::Error;

use core_kernel::{MoneyError, PortError};
use domain_claims::ClaimError;

/// Errors surfaced by the batching services
///
/// Recoverable batching outcomes (capacity, undersized groups, failed batch
/// writes) are reported as notes and never appear here.
#[derive(Debug, Error)]
pub enum BatchingError {
    #[error("Store error: {0}")]
    Store(#[from] PortError),

    #[error("Invalid claim: {0}")]
    Claim(#[from] ClaimError),

    #[error("Insurer not found: {0}")]
    InsurerNotFound(String),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl BatchingError {
    /// Returns true when the error names something that does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            BatchingError::InsurerNotFound(_) => true,
            BatchingError::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}
