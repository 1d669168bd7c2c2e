//! HTTP request and response representations.
//!
//! The pre-sign stages work on a mutable [`RequestBuilder`]. The Sign stage
//! turns it into an [`HttpRequest`] that is handed to the transport. Bodies are
//! always fully buffered.

use crate::error::ClientError;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::uri::{Authority, Scheme};
use http::{HeaderMap, Method, Uri};
use http_body_util::{BodyExt, Full};
use std::fmt;
use std::str::FromStr;

/// A fully built outgoing request.
pub type HttpRequest = http::Request<Full<Bytes>>;

/// A received response.
pub type HttpResponse = http::Response<Full<Bytes>>;

/// Status and headers of a received response.
pub type ResponseParts = http::response::Parts;

/// Reads a buffered body into contiguous bytes.
pub async fn collect_body(body: Full<Bytes>) -> Bytes {
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_else(|never| match never {})
}

/// Where requests are sent: scheme, host and an optional base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
}

impl Endpoint {
    /// Parses an absolute URL such as `https://widgets.example.com/v1`.
    pub fn parse(url: &str) -> Result<Self, ClientError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| ClientError::Configuration(format!("invalid endpoint {url:?}: {e}")))?;

        let parts = uri.into_parts();
        let scheme = parts
            .scheme
            .ok_or_else(|| ClientError::Configuration(format!("endpoint {url:?} has no scheme")))?;
        let authority = parts
            .authority
            .ok_or_else(|| ClientError::Configuration(format!("endpoint {url:?} has no host")))?;

        let path_and_query = parts.path_and_query;
        if path_and_query.as_ref().and_then(|pq| pq.query()).is_some() {
            return Err(ClientError::Configuration(format!(
                "endpoint {url:?} must not carry a query string"
            )));
        }
        let base_path = path_and_query
            .map(|pq| pq.path().trim_end_matches('/').to_string())
            .unwrap_or_default();

        Ok(Self {
            scheme,
            authority,
            base_path,
        })
    }

    /// Returns the URL scheme.
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Returns `host[:port]`.
    #[must_use]
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Returns the host name.
    #[must_use]
    pub fn host(&self) -> &str {
        self.authority.host()
    }

    /// Returns the base path without a trailing slash (may be empty).
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

impl FromStr for Endpoint {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.base_path)
    }
}

/// Mutable outgoing request, owned by one attempt until it is signed.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    scheme: Option<Scheme>,
    authority: Option<Authority>,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// Creates a `GET /` request with no headers and an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            scheme: None,
            authority: None,
            path: "/".to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Sets the method.
    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    /// Returns the path (always starting with `/`).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sets the path. A leading `/` is added if missing.
    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Returns the unencoded query parameters in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Appends a query parameter.
    pub fn push_query(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any existing values.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, ClientError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::InvalidRequest(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid value for header {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Returns the target host, once an endpoint has been applied.
    #[must_use]
    pub fn authority(&self) -> Option<&Authority> {
        self.authority.as_ref()
    }

    /// Points the request at `endpoint`, prefixing the path with its base path.
    pub fn apply_endpoint(&mut self, endpoint: &Endpoint) -> &mut Self {
        self.scheme = Some(endpoint.scheme().clone());
        self.authority = Some(endpoint.authority().clone());
        if !endpoint.base_path().is_empty() {
            self.path = format!("{}{}", endpoint.base_path(), self.path);
        }
        self
    }

    /// Returns the percent-encoded query string, without the leading `?`.
    #[must_use]
    pub fn encoded_query(&self) -> String {
        self.query
            .iter()
            .map(|(name, value)| {
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Builds the request.
    pub fn build(self) -> Result<HttpRequest, ClientError> {
        let mut target = self.path.clone();
        if !self.query.is_empty() {
            target.push('?');
            target.push_str(&self.encoded_query());
        }

        let uri = match (&self.scheme, &self.authority) {
            (Some(scheme), Some(authority)) => format!("{scheme}://{authority}{target}"),
            _ => target,
        };
        let uri: Uri = uri
            .parse()
            .map_err(|e| ClientError::InvalidRequest(format!("invalid request uri: {e}")))?;

        let mut request = http::Request::builder()
            .method(self.method)
            .uri(uri)
            .body(Full::new(self.body))
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}
