//! Clock skew middleware (Deserialize step).
//!
//! Compares the server's `Date` header with the local clock and records the
//! offset per host in a shared [`ClockSkewStore`]. The sign phase of later
//! attempts (and later invocations against the same host) shifts its signing
//! time by that offset.

use crate::middleware::{Middleware, Next};
use chrono::{DateTime, Utc};
use hermes_core::{BoxFuture, Context, HttpResponse, SdkError};
use hermes_telemetry::ClockSkewStore;
use http::header::DATE;
use std::sync::Arc;

/// Records server clock skew from response `Date` headers.
#[derive(Debug, Clone)]
pub struct ClockSkewMiddleware {
    store: Arc<ClockSkewStore>,
}

impl ClockSkewMiddleware {
    /// Creates the middleware, writing to `store`.
    #[must_use]
    pub fn new(store: Arc<ClockSkewStore>) -> Self {
        Self { store }
    }
}

/// Parses an HTTP `Date` header value (`Sun, 06 Nov 1994 08:49:37 GMT`).
#[must_use]
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

impl<O, E> Middleware<HttpResponse, O, E> for ClockSkewMiddleware
where
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        "clock_skew"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        response: HttpResponse,
        next: Next<'a, HttpResponse, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let server_time = response
                .headers()
                .get(DATE)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_http_date);

            if let (Some(server_time), Some(endpoint)) = (server_time, ctx.endpoint()) {
                let skew = server_time - Utc::now();
                self.store.record(endpoint.host(), skew);
            }
            next.run(ctx, response).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::BoxedMiddleware;
    use bytes::Bytes;
    use hermes_core::Endpoint;
    use http_body_util::Full;

    fn done<'c>(_ctx: &'c mut Context, _response: HttpResponse) -> BoxFuture<'c, Result<(), SdkError<()>>> {
        Box::pin(async { Ok(()) })
    }

    fn response_dated(date: &str) -> HttpResponse {
        http::Response::builder()
            .header(DATE, date)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(parsed.to_rfc3339(), "1994-11-06T08:49:37+00:00");
        assert!(parse_http_date("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_records_skew_for_endpoint_host() {
        let store = Arc::new(ClockSkewStore::new());
        let chain: Vec<BoxedMiddleware<HttpResponse, (), ()>> =
            vec![Arc::new(ClockSkewMiddleware::new(Arc::clone(&store)))];
        let mut ctx = Context::builder()
            .endpoint(Endpoint::parse("https://widgets.example.com").unwrap())
            .build();

        let server_ahead = (Utc::now() + chrono::Duration::minutes(10)).to_rfc2822();
        Next::new(&chain, done)
            .run(&mut ctx, response_dated(&server_ahead))
            .await
            .unwrap();

        let skew = store.get("widgets.example.com").unwrap();
        assert!(skew > chrono::Duration::minutes(9));
        assert!(skew <= chrono::Duration::minutes(10));
    }

    #[tokio::test]
    async fn test_ignores_unparseable_date() {
        let store = Arc::new(ClockSkewStore::new());
        let chain: Vec<BoxedMiddleware<HttpResponse, (), ()>> =
            vec![Arc::new(ClockSkewMiddleware::new(Arc::clone(&store)))];
        let mut ctx = Context::builder()
            .endpoint(Endpoint::parse("https://widgets.example.com").unwrap())
            .build();

        Next::new(&chain, done).run(&mut ctx, response_dated("soon")).await.unwrap();
        assert!(store.get("widgets.example.com").is_none());
    }
}
