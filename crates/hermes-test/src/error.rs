//! Test error types.

use thiserror::Error;

/// Errors raised while inspecting recorded traffic.
#[derive(Debug, Error)]
pub enum TestError {
    /// The body was not valid JSON for the requested type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An expected header was absent or not valid UTF-8.
    #[error("missing header: {0}")]
    MissingHeader(String),

    /// The transport never saw a request.
    #[error("no request was recorded")]
    NoRequest,
}
