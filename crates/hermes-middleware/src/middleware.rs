//! Core middleware trait and chaining.
//!
//! A [`Middleware`] is bound to one step and sees that step's input type. It
//! receives the invocation [`Context`], the step input and a [`Next`] handle for
//! the rest of the chain.
//!
//! # Example
//!
//! ```
//! use hermes_core::{BoxFuture, Context, RequestBuilder, SdkError};
//! use hermes_middleware::{Middleware, Next};
//!
//! struct UserAgent;
//!
//! impl<O: Send + 'static, E: Send + 'static> Middleware<RequestBuilder, O, E> for UserAgent {
//!     fn id(&self) -> &str {
//!         "user_agent"
//!     }
//!
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: &'a mut Context,
//!         mut request: RequestBuilder,
//!         next: Next<'a, RequestBuilder, O, E>,
//!     ) -> BoxFuture<'a, Result<O, SdkError<E>>> {
//!         Box::pin(async move {
//!             request.set_header("user-agent", "hermes/0.1")?;
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use hermes_core::{BoxFuture, Context, SdkError};
use std::sync::Arc;

/// A unit of work bound to one pipeline step.
///
/// # Invariants
///
/// - Middleware MUST call `next.run()` exactly once, or not at all to
///   short-circuit with its own result.
/// - Middleware MUST NOT swallow errors from downstream; it may inspect them
///   and must return them.
pub trait Middleware<In, Out, E>: Send + Sync + 'static {
    /// Identifies this middleware within its step.
    ///
    /// Used for diagnostics and for positional inserts and removal.
    fn id(&self) -> &str;

    /// Handles the step input, usually by delegating to `next`.
    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        input: In,
        next: Next<'a, In, Out, E>,
    ) -> BoxFuture<'a, Result<Out, SdkError<E>>>;
}

/// A shared, type-erased middleware.
pub type BoxedMiddleware<In, Out, E> = Arc<dyn Middleware<In, Out, E>>;

/// The continuation invoked once every middleware of a step has run.
pub type Terminal<'a, In, Out, E> = Box<
    dyn for<'c> FnOnce(&'c mut Context, In) -> BoxFuture<'c, Result<Out, SdkError<E>>> + Send + 'a,
>;

/// The remainder of a middleware chain.
///
/// Consumed by [`Next::run`], so it can be invoked at most once.
pub struct Next<'a, In, Out, E> {
    chain: &'a [BoxedMiddleware<In, Out, E>],
    terminal: Terminal<'a, In, Out, E>,
}

impl<'a, In, Out, E> Next<'a, In, Out, E>
where
    In: Send + 'static,
    Out: Send + 'static,
    E: Send + 'static,
{
    /// Creates a chain over `chain` ending in `terminal`.
    pub fn new<F>(chain: &'a [BoxedMiddleware<In, Out, E>], terminal: F) -> Self
    where
        F: for<'c> FnOnce(&'c mut Context, In) -> BoxFuture<'c, Result<Out, SdkError<E>>>
            + Send
            + 'a,
    {
        Self {
            chain,
            terminal: Box::new(terminal),
        }
    }

    /// Invokes the next middleware, or the terminal if none remain.
    pub fn run<'b>(self, ctx: &'b mut Context, input: In) -> BoxFuture<'b, Result<Out, SdkError<E>>>
    where
        'a: 'b,
    {
        match self.chain.split_first() {
            Some((head, rest)) => {
                let next = Next {
                    chain: rest,
                    terminal: self.terminal,
                };
                head.handle(ctx, input, next)
            }
            None => (self.terminal)(ctx, input),
        }
    }

    /// Returns how many middleware remain before the terminal.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}

/// Middleware built from a synchronous closure that runs before `next`.
///
/// The closure may mutate the context and the input, or fail the attempt.
///
/// ```
/// use hermes_core::{Context, RequestBuilder, SdkError};
/// use hermes_middleware::FnMiddleware;
///
/// let tag = FnMiddleware::new("tag", |_ctx: &mut Context, request: &mut RequestBuilder| {
///     request.set_header("x-tag", "blue")?;
///     Ok::<_, SdkError<()>>(())
/// });
/// ```
pub struct FnMiddleware<F> {
    id: String,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a closure-based middleware.
    pub fn new<In, E>(id: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut Context, &mut In) -> Result<(), SdkError<E>>,
    {
        Self { id: id.into(), func }
    }
}

impl<In, Out, E, F> Middleware<In, Out, E> for FnMiddleware<F>
where
    In: Send + 'static,
    Out: Send + 'static,
    E: Send + 'static,
    F: Fn(&mut Context, &mut In) -> Result<(), SdkError<E>> + Send + Sync + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        mut input: In,
        next: Next<'a, In, Out, E>,
    ) -> BoxFuture<'a, Result<Out, SdkError<E>>> {
        Box::pin(async move {
            (self.func)(ctx, &mut input)?;
            next.run(ctx, input).await
        })
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware").field("id", &self.id).finish()
    }
}
