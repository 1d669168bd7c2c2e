//! Content-Length middleware (Build step).

use crate::middleware::{Middleware, Next};
use hermes_core::{BoxFuture, Context, RequestBuilder, SdkError};
use http::header::{HeaderValue, CONTENT_LENGTH};

/// Sets `content-length` for non-empty bodies unless the serializer already did.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentLengthMiddleware;

impl<O, E> Middleware<RequestBuilder, O, E> for ContentLengthMiddleware
where
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        "content_length"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        mut request: RequestBuilder,
        next: Next<'a, RequestBuilder, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let len = request.body().len();
            if len > 0 && !request.headers().contains_key(CONTENT_LENGTH) {
                request.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
            }
            next.run(ctx, request).await
        })
    }
}
