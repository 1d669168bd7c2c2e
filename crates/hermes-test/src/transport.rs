//! A scripted in-memory transport.

use crate::error::TestError;
use bytes::Bytes;
use hermes_core::{collect_body, BoxFuture, HttpRequest, HttpResponse, NetworkError, NetworkErrorKind, Transport};
use http::{HeaderMap, Method, StatusCode, Uri};
use http_body_util::Full;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// An HTTP response.
    Response {
        /// Status code.
        status: StatusCode,
        /// Header pairs, applied in order.
        headers: Vec<(String, String)>,
        /// Body bytes.
        body: Bytes,
    },
    /// A transport failure.
    Failure {
        /// Failure kind.
        kind: NetworkErrorKind,
        /// Failure message.
        message: String,
    },
    /// Never completes.
    Hang,
}

impl StubReply {
    /// An empty response with `status`. Codes outside `100..=999` become 500.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::Response {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// A JSON response.
    #[must_use]
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    /// A JSON error response carrying `__type` and `message`.
    #[must_use]
    pub fn error(status: u16, code: &str, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "__type": code, "message": message }))
    }

    /// A transport failure.
    #[must_use]
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Adds a response header. No effect on failures.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Response { headers, .. } = &mut self {
            headers.push((name.into(), value.into()));
        }
        self
    }

    /// Replaces the response body. No effect on failures.
    #[must_use]
    pub fn with_body(mut self, bytes: impl Into<Bytes>) -> Self {
        if let Self::Response { body, .. } = &mut self {
            *body = bytes.into();
        }
        self
    }
}

/// A request as the transport received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Full request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// When the transport received it.
    pub at: Instant,
}

impl RecordedRequest {
    /// Returns a header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a header value or fails naming the header.
    pub fn require_header(&self, name: &str) -> Result<&str, TestError> {
        self.header(name).ok_or_else(|| TestError::MissingHeader(name.to_string()))
    }

    /// Returns the body as UTF-8 text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[derive(Debug, Default)]
struct Inner {
    script: Mutex<VecDeque<StubReply>>,
    fallback: Mutex<Option<StubReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    closed: AtomicBool,
}

/// A transport that replays scripted replies in order.
///
/// Clones share the script and the recording, so a test can keep one handle
/// while the client owns another. Once the script is exhausted the fallback
/// reply (if any) is repeated; without one the transport fails the request.
#[derive(Debug, Clone, Default)]
pub struct StubTransport {
    inner: Arc<Inner>,
}

impl StubTransport {
    /// Creates a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that never completes a request.
    #[must_use]
    pub fn hanging() -> Self {
        Self::new().repeat(StubReply::Hang)
    }

    /// Appends a reply to the script.
    #[must_use]
    pub fn reply(self, reply: StubReply) -> Self {
        self.push(reply);
        self
    }

    /// Sets the reply used once the script runs out.
    #[must_use]
    pub fn repeat(self, reply: StubReply) -> Self {
        *self.inner.fallback.lock() = Some(reply);
        self
    }

    /// Appends a reply through a shared handle.
    pub fn push(&self, reply: StubReply) {
        self.inner.script.lock().push_back(reply);
    }

    /// How many requests reached the transport.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.inner.requests.lock().len()
    }

    /// Every recorded request, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Result<RecordedRequest, TestError> {
        self.inner.requests.lock().last().cloned().ok_or(TestError::NoRequest)
    }

    /// Gaps between consecutive requests.
    #[must_use]
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        self.inner
            .requests
            .lock()
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }

    /// Whether [`Transport::close`] was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Option<StubReply> {
        let scripted = self.inner.script.lock().pop_front();
        scripted.or_else(|| self.inner.fallback.lock().clone())
    }
}

fn into_response(status: StatusCode, headers: Vec<(String, String)>, body: Bytes) -> Result<HttpResponse, NetworkError> {
    let mut builder = http::Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Full::new(body))
        .map_err(|e| NetworkError::new(NetworkErrorKind::Other, "invalid scripted response").with_source(e))
}

impl Transport for StubTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, NetworkError>> {
        Box::pin(async move {
            let at = Instant::now();
            let (parts, body) = request.into_parts();
            let body = collect_body(body).await;
            self.inner.requests.lock().push(RecordedRequest {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
                at,
            });

            match self.next_reply() {
                Some(StubReply::Response { status, headers, body }) => into_response(status, headers, body),
                Some(StubReply::Failure { kind, message }) => Err(NetworkError::new(kind, message)),
                Some(StubReply::Hang) => std::future::pending().await,
                None => Err(NetworkError::new(NetworkErrorKind::Other, "stub transport has no scripted reply")),
            }
        })
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}
