//! Error types for Hermes.
//!
//! Every failure an operation can produce is an [`SdkError<E>`], where `E` is the
//! operation's modeled error type:
//!
//! | Variant | Meaning | Retried by default |
//! |---|---|---|
//! | [`SdkError::Client`] | Local failure: serialization, configuration, auth setup | never |
//! | [`SdkError::Service`] | The service returned a modeled error | per the error's own flags |
//! | [`SdkError::Network`] | The transport failed | yes (transient) |
//! | [`SdkError::UnknownService`] | Error payload matched no registered type | only for throttling / transient status |
//!
//! Classification into an [`ErrorType`] lives in the retry crate; this module
//! only carries the facts it needs.

use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Retry classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A condition expected to clear on its own (timeouts, 5xx gateways, I/O).
    Transient,
    /// The service asked the caller to slow down.
    Throttling,
    /// The service failed in a way retrying is not expected to fix.
    ServerError,
    /// The request itself is wrong.
    ClientError,
}

impl ErrorType {
    /// Returns the label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Throttling => "throttling",
            Self::ServerError => "server_error",
            Self::ClientError => "client_error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side a modeled error blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFault {
    /// The caller sent something the service rejects.
    Client,
    /// The service failed.
    Server,
    /// The model does not say.
    #[default]
    Unknown,
}

/// Behaviour shared by the modeled error types of generated operations.
///
/// Generated glue implements this for each operation error enum. The
/// defaults describe an error with no retry hints.
pub trait ModeledError: std::error::Error + Send + Sync + 'static {
    /// The wire error code (e.g. `ThrottlingException`).
    fn code(&self) -> &str;

    /// The service's explicit retryable flag, if the model declares one.
    fn retryable(&self) -> Option<bool> {
        None
    }

    /// `true` if the model marks this error as throttling.
    fn is_throttling(&self) -> bool {
        false
    }

    /// The fault the model assigns to this error.
    fn fault(&self) -> ErrorFault {
        ErrorFault::Unknown
    }
}

/// Header carrying a retry delay hint in milliseconds.
pub const AMZ_RETRY_AFTER_HEADER: &str = "x-amz-retry-after";

/// Header carrying the service request id.
pub const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

/// Facts captured from an error response.
#[derive(Debug, Clone, Default)]
pub struct ErrorMetadata {
    status: StatusCode,
    headers: HeaderMap,
    code: Option<String>,
    message: Option<String>,
}

impl ErrorMetadata {
    /// Creates metadata for a response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Sets the response headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the wire error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns the HTTP status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the wire error code.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the service request id, if the response carried one.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns the server's retry delay hint.
    ///
    /// `x-amz-retry-after` (milliseconds) wins over `retry-after` (seconds).
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        let header = |name: &str| {
            self.headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
        };
        header(AMZ_RETRY_AFTER_HEADER)
            .map(Duration::from_millis)
            .or_else(|| header(http::header::RETRY_AFTER.as_str()).map(Duration::from_secs))
    }
}

/// Failures while resolving auth or signing.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The preference list filtered out every candidate scheme.
    #[error("no auth scheme matched the preference list {preference:?} (candidates: {candidates:?})")]
    NoMatchingScheme {
        /// Candidate scheme ids for the operation.
        candidates: Vec<String>,
        /// The configured preference list.
        preference: Vec<String>,
    },

    /// No candidate scheme has both an implementation and an identity resolver.
    #[error("no identity resolver configured for any auth scheme among {candidates:?}")]
    NoIdentityResolver {
        /// Candidate scheme ids that were considered.
        candidates: Vec<String>,
    },

    /// The identity resolver failed.
    #[error("failed to resolve identity for auth scheme {scheme_id}")]
    IdentityResolution {
        /// The scheme whose resolver failed.
        scheme_id: String,
        /// The resolver's error.
        #[source]
        source: anyhow::Error,
    },

    /// A signer received an identity it cannot use.
    #[error("signer expected a {expected} identity but received {actual}")]
    IdentityTypeMismatch {
        /// The identity type the signer understands.
        expected: &'static str,
        /// The identity type it was given.
        actual: &'static str,
    },

    /// A required signing property was absent.
    #[error("missing signing property: {0}")]
    MissingSigningProperty(&'static str),

    /// Signing failed.
    #[error("failed to sign request: {message}")]
    Signing {
        /// What went wrong.
        message: String,
        /// The collaborator's error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl AuthError {
    /// Creates a signing error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
            source: None,
        }
    }
}

/// Local failures. These are never retried.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The operation input could not be serialized.
    #[error("failed to serialize request: {message}")]
    Serialization {
        /// What went wrong.
        message: String,
        /// The codec's error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The response could not be deserialized.
    #[error("failed to deserialize response: {message}")]
    Deserialization {
        /// What went wrong.
        message: String,
        /// The codec's error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The request builder produced an invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Client configuration is invalid or incomplete.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Auth resolution or signing failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The partition's retry quota could not cover the first attempt.
    #[error("retry quota exhausted for partition {partition}")]
    RetryQuotaExceeded {
        /// The partition id.
        partition: String,
    },

    /// A middleware rejected the request.
    #[error("middleware {middleware} failed: {message}")]
    Middleware {
        /// The middleware id.
        middleware: String,
        /// What went wrong.
        message: String,
    },
}

impl ClientError {
    /// Creates a serialization error with a source.
    pub fn serialization(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a deserialization error with a source.
    pub fn deserialization(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Deserialization {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a middleware error.
    #[must_use]
    pub fn middleware(middleware: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Middleware {
            middleware: middleware.into(),
            message: message.into(),
        }
    }
}

/// Kinds of transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// The connection could not be established.
    Connect,
    /// The request timed out.
    Timeout,
    /// I/O failed mid-flight.
    Io,
    /// Anything else the transport reports.
    Other,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Io => "io",
            Self::Other => "other",
        })
    }
}

/// A transport failure.
#[derive(Error, Debug)]
#[error("network error ({kind}): {message}")]
pub struct NetworkError {
    kind: NetworkErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

impl NetworkError {
    /// Creates a network error.
    #[must_use]
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(NetworkErrorKind::Timeout, message)
    }

    /// Attaches the transport's own error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> NetworkErrorKind {
        self.kind
    }

    /// Returns `true` for timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == NetworkErrorKind::Timeout
    }
}

/// An error response whose code matched no registered error type.
#[derive(Error, Debug)]
#[error(
    "unhandled service error (status {}, code {})",
    .metadata.status(),
    .metadata.code().unwrap_or("<none>")
)]
pub struct UnknownServiceError {
    metadata: ErrorMetadata,
}

impl UnknownServiceError {
    /// Wraps response metadata.
    #[must_use]
    pub fn new(metadata: ErrorMetadata) -> Self {
        Self { metadata }
    }

    /// Returns the response metadata.
    #[must_use]
    pub fn metadata(&self) -> &ErrorMetadata {
        &self.metadata
    }
}

/// A modeled error returned by the service.
#[derive(Debug)]
pub struct ServiceError<E> {
    err: E,
    metadata: ErrorMetadata,
}

impl<E> ServiceError<E> {
    /// Creates a service error.
    pub fn new(err: E, metadata: ErrorMetadata) -> Self {
        Self { err, metadata }
    }

    /// Returns the modeled error.
    pub fn err(&self) -> &E {
        &self.err
    }

    /// Consumes the wrapper, returning the modeled error.
    pub fn into_err(self) -> E {
        self.err
    }

    /// Returns the response metadata.
    pub fn metadata(&self) -> &ErrorMetadata {
        &self.metadata
    }
}

impl<E: fmt::Display> fmt::Display for ServiceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service error (status {}): {}", self.metadata.status(), self.err)
    }
}

impl<E> std::error::Error for ServiceError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

/// The error returned by every operation invocation.
#[derive(Debug)]
pub enum SdkError<E> {
    /// Local failure.
    Client(ClientError),
    /// Modeled service error.
    Service(ServiceError<E>),
    /// Transport failure.
    Network(NetworkError),
    /// Unmodeled service error.
    UnknownService(UnknownServiceError),
}

impl<E> SdkError<E> {
    /// Creates a service error.
    pub fn service(err: E, metadata: ErrorMetadata) -> Self {
        Self::Service(ServiceError::new(err, metadata))
    }

    /// Returns the modeled service error, if this is one.
    pub fn as_service_error(&self) -> Option<&E> {
        match self {
            Self::Service(service) => Some(service.err()),
            _ => None,
        }
    }

    /// Consumes the error, returning the modeled service error, if this is one.
    pub fn into_service_error(self) -> Option<E> {
        match self {
            Self::Service(service) => Some(service.into_err()),
            _ => None,
        }
    }

    /// Returns the response metadata for service and unknown-service errors.
    pub fn metadata(&self) -> Option<&ErrorMetadata> {
        match self {
            Self::Service(service) => Some(service.metadata()),
            Self::UnknownService(unknown) => Some(unknown.metadata()),
            Self::Client(_) | Self::Network(_) => None,
        }
    }

    /// Returns `true` for local failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Client(_))
    }

    /// Returns a short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::Service(_) => "service",
            Self::Network(_) => "network",
            Self::UnknownService(_) => "unknown_service",
        }
    }
}

impl<E: fmt::Display> fmt::Display for SdkError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client(err) => fmt::Display::fmt(err, f),
            Self::Service(err) => fmt::Display::fmt(err, f),
            Self::Network(err) => fmt::Display::fmt(err, f),
            Self::UnknownService(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<E> std::error::Error for SdkError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Client(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::Network(err) => Some(err),
            Self::UnknownService(err) => Some(err),
        }
    }
}

impl<E> From<ClientError> for SdkError<E> {
    fn from(err: ClientError) -> Self {
        Self::Client(err)
    }
}

impl<E> From<AuthError> for SdkError<E> {
    fn from(err: AuthError) -> Self {
        Self::Client(ClientError::Auth(err))
    }
}

impl<E> From<NetworkError> for SdkError<E> {
    fn from(err: NetworkError) -> Self {
        Self::Network(err)
    }
}

impl<E> From<UnknownServiceError> for SdkError<E> {
    fn from(err: UnknownServiceError) -> Self {
        Self::UnknownService(err)
    }
}
