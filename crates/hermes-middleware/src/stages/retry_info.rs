//! Retry info middleware (Finalize step).
//!
//! Tells the service which attempt this is: `amz-sdk-request: attempt=2; max=3`.

use crate::middleware::{Middleware, Next};
use hermes_core::{BoxFuture, Context, RequestBuilder, SdkError};

/// The header carrying attempt information.
pub const REQUEST_INFO_HEADER: &str = "amz-sdk-request";

/// Sets the `amz-sdk-request` header when the context knows the attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryInfoMiddleware;

impl<O, E> Middleware<RequestBuilder, O, E> for RetryInfoMiddleware
where
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        "retry_info"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        mut request: RequestBuilder,
        next: Next<'a, RequestBuilder, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            if let Some(info) = ctx.attempt() {
                let value = format!("attempt={}; max={}", info.attempt, info.max_attempts);
                request.set_header(REQUEST_INFO_HEADER, &value)?;
            }
            next.run(ctx, request).await
        })
    }
}
