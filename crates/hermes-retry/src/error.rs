//! Retry error types.

use hermes_core::ClientError;
use thiserror::Error;

/// Failures raised by the retry machinery itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// The partition's bucket cannot cover the requested cost.
    #[error("retry quota exhausted for partition {partition}: need {required}, have {available}")]
    NoCapacity {
        /// The partition id.
        partition: String,
        /// Capacity left in the bucket.
        available: u32,
        /// The cost that could not be paid.
        required: u32,
    },

    /// The retry configuration is unusable.
    #[error("invalid retry configuration: {0}")]
    InvalidConfig(String),
}

impl From<RetryError> for ClientError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::NoCapacity { partition, .. } => Self::RetryQuotaExceeded { partition },
            RetryError::InvalidConfig(message) => Self::Configuration(message),
        }
    }
}
