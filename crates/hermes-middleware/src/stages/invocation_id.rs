//! Invocation id middleware (Build step).
//!
//! Every attempt of one invocation carries the same `amz-sdk-invocation-id`,
//! so the service can tell retries apart from new calls.

use crate::middleware::{Middleware, Next};
use hermes_core::{BoxFuture, Context, RequestBuilder, SdkError};

/// The header carrying the invocation id.
pub const INVOCATION_ID_HEADER: &str = "amz-sdk-invocation-id";

/// Sets the invocation id header from the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvocationIdMiddleware;

impl<O, E> Middleware<RequestBuilder, O, E> for InvocationIdMiddleware
where
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        "invocation_id"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        mut request: RequestBuilder,
        next: Next<'a, RequestBuilder, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            request.set_header(INVOCATION_ID_HEADER, &ctx.invocation_id().to_string())?;
            next.run(ctx, request).await
        })
    }
}
