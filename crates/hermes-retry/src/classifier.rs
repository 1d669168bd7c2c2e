//! Error classification.
//!
//! Decides which [`ErrorType`] a failed attempt belongs to, in this order:
//!
//! 1. Local failures are always `ClientError`; transport failures are
//!    always `Transient`.
//! 2. A modeled error's explicit flags (`is_throttling`, `retryable`) win.
//! 3. Otherwise the wire error code and HTTP status decide.

use hermes_core::{ErrorFault, ErrorMetadata, ErrorType, ModeledError, SdkError};
use http::StatusCode;

/// Error codes that mean "slow down".
pub const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "PriorRequestNotComplete",
    "EC2ThrottledException",
];

/// Error codes for conditions expected to clear on their own.
pub const TRANSIENT_CODES: &[&str] = &[
    "RequestTimeout",
    "RequestTimeoutException",
    "InternalError",
    "IDPCommunicationError",
];

/// HTTP statuses treated as transient.
pub const TRANSIENT_STATUS_CODES: &[u16] = &[500, 502, 503, 504];

/// Classifies failed attempts for the retry engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorClassifier {
    retry_server_errors: bool,
}

impl ErrorClassifier {
    /// Creates a classifier. `retry_server_errors` makes `ServerError`
    /// retryable too.
    #[must_use]
    pub const fn new(retry_server_errors: bool) -> Self {
        Self { retry_server_errors }
    }

    /// Returns the retry category of `error`.
    pub fn error_type<E: ModeledError>(&self, error: &SdkError<E>) -> ErrorType {
        match error {
            SdkError::Client(_) => ErrorType::ClientError,
            SdkError::Network(_) => ErrorType::Transient,
            SdkError::Service(service) => {
                let err = service.err();
                if err.is_throttling() {
                    return ErrorType::Throttling;
                }
                match err.retryable() {
                    Some(true) => ErrorType::Transient,
                    Some(false) => match err.fault() {
                        ErrorFault::Server => ErrorType::ServerError,
                        ErrorFault::Client | ErrorFault::Unknown => ErrorType::ClientError,
                    },
                    None => classify_response(Some(err.code()), service.metadata()),
                }
            }
            SdkError::UnknownService(unknown) => {
                let metadata = unknown.metadata();
                classify_response(metadata.code(), metadata)
            }
        }
    }

    /// Returns whether `error` may be retried at all.
    ///
    /// Explicit `retryable = false` on a modeled error is final.
    pub fn is_error_retryable<E: ModeledError>(&self, error: &SdkError<E>) -> bool {
        if let SdkError::Service(service) = error {
            if service.err().retryable() == Some(false) && !service.err().is_throttling() {
                return false;
            }
        }
        self.is_retryable_type(self.error_type(error))
    }

    /// Returns whether errors of `error_type` are retried.
    #[must_use]
    pub const fn is_retryable_type(&self, error_type: ErrorType) -> bool {
        match error_type {
            ErrorType::Transient | ErrorType::Throttling => true,
            ErrorType::ServerError => self.retry_server_errors,
            ErrorType::ClientError => false,
        }
    }
}

fn classify_response(code: Option<&str>, metadata: &ErrorMetadata) -> ErrorType {
    let code = code.map(|code| code.split(':').next().unwrap_or(code).trim());
    if code.is_some_and(|code| THROTTLING_CODES.contains(&code)) {
        return ErrorType::Throttling;
    }
    let status = metadata.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ErrorType::Throttling;
    }
    if code.is_some_and(|code| TRANSIENT_CODES.contains(&code))
        || TRANSIENT_STATUS_CODES.contains(&status.as_u16())
    {
        return ErrorType::Transient;
    }
    if status.is_server_error() {
        return ErrorType::ServerError;
    }
    ErrorType::ClientError
}
