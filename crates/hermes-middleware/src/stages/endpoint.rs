//! Endpoint middleware (Build step).
//!
//! Points the request at the endpoint stored in the context: scheme, host and
//! base path. The serializer only writes the operation-relative path.

use crate::middleware::{Middleware, Next};
use hermes_core::{BoxFuture, ClientError, Context, RequestBuilder, SdkError};

/// Applies the context endpoint to the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointMiddleware;

impl EndpointMiddleware {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<O, E> Middleware<RequestBuilder, O, E> for EndpointMiddleware
where
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        "endpoint"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        mut request: RequestBuilder,
        next: Next<'a, RequestBuilder, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let endpoint = ctx
                .endpoint()
                .ok_or_else(|| ClientError::Configuration("no endpoint configured".to_string()))?;
            request.apply_endpoint(endpoint);
            next.run(ctx, request).await
        })
    }
}
