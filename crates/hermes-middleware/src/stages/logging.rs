//! Wire logging middleware (Transmit and Deserialize steps).
//!
//! Register it on both steps: on Transmit it logs the outgoing request and the
//! attempt outcome, on Deserialize it logs the response status.
//!
//! Fields follow `hermes_telemetry::logging::fields`. Header values are never
//! logged since they may carry credentials.

use crate::middleware::{Middleware, Next};
use hermes_core::{BoxFuture, Context, HttpRequest, HttpResponse, SdkError};
use std::time::Instant;

/// Emits `debug` events for each send and receive.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl<O, E> Middleware<HttpRequest, O, E> for LoggingMiddleware
where
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        "logging"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        request: HttpRequest,
        next: Next<'a, HttpRequest, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let attempt = ctx.attempt().map_or(1, |info| info.attempt);
            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                attempt,
                method = %request.method(),
                uri = %request.uri(),
                content_length = request
                    .headers()
                    .get(http::header::CONTENT_LENGTH)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("0"),
                "sending request"
            );

            let start = Instant::now();
            let result = next.run(ctx, request).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(_) => tracing::debug!(attempt, duration_ms, "attempt succeeded"),
                Err(err) => tracing::debug!(attempt, duration_ms, error_kind = err.kind(), "attempt failed"),
            }
            result
        })
    }
}

impl<O, E> Middleware<HttpResponse, O, E> for LoggingMiddleware
where
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        "logging"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        response: HttpResponse,
        next: Next<'a, HttpResponse, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            tracing::debug!(
                invocation_id = %ctx.invocation_id(),
                status = response.status().as_u16(),
                request_id = response
                    .headers()
                    .get(hermes_core::REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or(""),
                "received response"
            );
            next.run(ctx, response).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::BoxedMiddleware;
    use bytes::Bytes;
    use http_body_util::Full;
    use std::sync::Arc;

    fn status<'c>(_ctx: &'c mut Context, response: HttpResponse) -> BoxFuture<'c, Result<u16, SdkError<()>>> {
        Box::pin(async move { Ok(response.status().as_u16()) })
    }

    fn method<'c>(_ctx: &'c mut Context, request: HttpRequest) -> BoxFuture<'c, Result<String, SdkError<()>>> {
        Box::pin(async move { Ok(request.method().to_string()) })
    }

    #[tokio::test]
    async fn test_passes_response_through() {
        let chain: Vec<BoxedMiddleware<HttpResponse, u16, ()>> = vec![Arc::new(LoggingMiddleware)];
        let mut ctx = Context::new();
        let response = http::Response::builder()
            .status(204)
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(Next::new(&chain, status).run(&mut ctx, response).await.unwrap(), 204);
    }

    #[tokio::test]
    async fn test_passes_request_through() {
        let chain: Vec<BoxedMiddleware<HttpRequest, String, ()>> = vec![Arc::new(LoggingMiddleware)];
        let mut ctx = Context::new();
        let request = http::Request::builder()
            .method("PUT")
            .uri("https://example.com/")
            .body(Full::new(Bytes::from_static(b"x")))
            .unwrap();
        assert_eq!(Next::new(&chain, method).run(&mut ctx, request).await.unwrap(), "PUT");
    }
}
