//! Idempotency token middleware (Initialize step).
//!
//! Operations whose input carries an idempotency token get one generated when
//! the caller left it empty. The token is written into the input, so every
//! retry of the invocation serializes the same token.

use crate::middleware::{Middleware, Next};
use hermes_core::{BoxFuture, Context, IdempotencyTokenGenerator, SdkError, UuidTokenGenerator};

/// Fills an empty idempotency token on the operation input.
///
/// `accessor` points at the token field of the input.
pub struct IdempotencyTokenMiddleware<I> {
    accessor: fn(&mut I) -> &mut Option<String>,
}

impl<I> IdempotencyTokenMiddleware<I> {
    /// Creates the middleware for inputs whose token is reached via `accessor`.
    pub const fn new(accessor: fn(&mut I) -> &mut Option<String>) -> Self {
        Self { accessor }
    }
}

impl<I> std::fmt::Debug for IdempotencyTokenMiddleware<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyTokenMiddleware").finish_non_exhaustive()
    }
}

impl<I, O, E> Middleware<I, O, E> for IdempotencyTokenMiddleware<I>
where
    I: Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    fn id(&self) -> &str {
        "idempotency_token"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        mut input: I,
        next: Next<'a, I, O, E>,
    ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let token = (self.accessor)(&mut input);
            if token.as_deref().map_or(true, str::is_empty) {
                let generated = match ctx.idempotency_token_generator() {
                    Some(generator) => generator.generate(),
                    None => UuidTokenGenerator.generate(),
                };
                tracing::debug!("generated idempotency token");
                *token = Some(generated);
            }
            next.run(ctx, input).await
        })
    }
}
