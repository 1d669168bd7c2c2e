//! The transport contract.

use crate::error::NetworkError;
use crate::http::{HttpRequest, HttpResponse};
use crate::BoxFuture;

/// Sends built requests and returns raw responses.
///
/// Connection pooling, TLS and DNS are the implementation's concern. Any
/// failure to obtain a response is a [`NetworkError`]; error *responses* are
/// returned as `Ok` and classified later.
pub trait Transport: Send + Sync + 'static {
    /// Sends one request.
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, NetworkError>>;

    /// Releases pooled resources. Further `execute` calls may fail.
    fn close(&self) {}
}
