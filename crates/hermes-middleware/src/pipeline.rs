//! Steps and the per-operation middleware stack.
//!
//! ## Steps
//!
//! Every attempt runs seven steps in a fixed order. Each step has its own input
//! type, so a middleware can only be registered where its input makes sense:
//!
//! | Step | Input | Typical middleware |
//! |------|-------|--------------------|
//! | 1 Initialize | operation input `I` | idempotency tokens, input validation |
//! | 2 Serialize | [`SerializeInput<I>`] | protocol serializer |
//! | 3 Build | [`RequestBuilder`] | endpoint, content-length, invocation id |
//! | 4 Finalize | [`RequestBuilder`] | retry info header |
//! | 5 Sign | [`RequestBuilder`] | checks on the request about to be signed |
//! | 6 Transmit | [`HttpRequest`] | wire logging |
//! | 7 Deserialize | [`HttpResponse`] | clock skew |
//!
//! Every step produces the operation output `O` or an [`SdkError<E>`].
//!
//! Within a step, middleware runs in registration order as an onion: the
//! first middleware sees the input first and the output last.

use crate::error::PipelineError;
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use hermes_core::{BoxFuture, Context, HttpRequest, HttpResponse, RequestBuilder, SdkError};
use std::fmt;
use std::sync::Arc;

/// Pipeline step marker, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum StepId {
    /// Step 1: operate on the typed input.
    Initialize = 1,
    /// Step 2: encode the input into the request.
    Serialize = 2,
    /// Step 3: shape the request.
    Build = 3,
    /// Step 4: last edits before signing.
    Finalize = 4,
    /// Step 5: resolve auth and sign.
    Sign = 5,
    /// Step 6: send the request.
    Transmit = 6,
    /// Step 7: decode the response.
    Deserialize = 7,
}

impl StepId {
    /// Returns the step name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Serialize => "serialize",
            Self::Build => "build",
            Self::Finalize => "finalize",
            Self::Sign => "sign",
            Self::Transmit => "transmit",
            Self::Deserialize => "deserialize",
        }
    }

    /// Returns all steps in order.
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Initialize,
            Self::Serialize,
            Self::Build,
            Self::Finalize,
            Self::Sign,
            Self::Transmit,
            Self::Deserialize,
        ]
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input of the serialize step: the operation input plus a fresh request.
#[derive(Debug, Clone)]
pub struct SerializeInput<I> {
    /// The operation input.
    pub input: I,
    /// The request being built for this attempt.
    pub request: RequestBuilder,
}

impl<I> SerializeInput<I> {
    /// Pairs `input` with an empty request.
    pub fn new(input: I) -> Self {
        Self {
            input,
            request: RequestBuilder::new(),
        }
    }
}

/// An ordered list of middleware for one step.
pub struct Step<In, Out, E> {
    id: StepId,
    middleware: Vec<BoxedMiddleware<In, Out, E>>,
}

impl<In, Out, E> Step<In, Out, E>
where
    In: Send + 'static,
    Out: Send + 'static,
    E: Send + 'static,
{
    /// Creates an empty step.
    #[must_use]
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            middleware: Vec::new(),
        }
    }

    /// Returns which step this is.
    #[must_use]
    pub const fn id(&self) -> StepId {
        self.id
    }

    /// Returns the middleware ids in execution order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.id()).collect()
    }

    /// Returns the number of registered middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Returns `true` if no middleware is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Returns `true` if a middleware with `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.middleware.iter().position(|m| m.id() == id)
    }

    fn check_unique(&self, middleware: &BoxedMiddleware<In, Out, E>) -> Result<(), PipelineError> {
        if self.contains(middleware.id()) {
            return Err(PipelineError::DuplicateMiddleware {
                step: self.id,
                id: middleware.id().to_string(),
            });
        }
        Ok(())
    }

    fn insert_at(&mut self, index: usize, middleware: BoxedMiddleware<In, Out, E>) -> Result<&mut Self, PipelineError> {
        self.check_unique(&middleware)?;
        self.middleware.insert(index, middleware);
        Ok(self)
    }

    fn anchor(&self, id: &str) -> Result<usize, PipelineError> {
        self.position(id).ok_or_else(|| PipelineError::MiddlewareNotFound {
            step: self.id,
            id: id.to_string(),
        })
    }

    /// Appends a middleware; it runs after (inside) everything already registered.
    pub fn push<M>(&mut self, middleware: M) -> Result<&mut Self, PipelineError>
    where
        M: Middleware<In, Out, E>,
    {
        self.push_shared(Arc::new(middleware))
    }

    /// Appends an already-shared middleware.
    pub fn push_shared(&mut self, middleware: BoxedMiddleware<In, Out, E>) -> Result<&mut Self, PipelineError> {
        let end = self.middleware.len();
        self.insert_at(end, middleware)
    }

    /// Prepends a middleware; it runs before (outside) everything already registered.
    pub fn prepend<M>(&mut self, middleware: M) -> Result<&mut Self, PipelineError>
    where
        M: Middleware<In, Out, E>,
    {
        self.insert_at(0, Arc::new(middleware))
    }

    /// Inserts a middleware immediately before the one with id `anchor`.
    pub fn insert_before<M>(&mut self, anchor: &str, middleware: M) -> Result<&mut Self, PipelineError>
    where
        M: Middleware<In, Out, E>,
    {
        let index = self.anchor(anchor)?;
        self.insert_at(index, Arc::new(middleware))
    }

    /// Inserts a middleware immediately after the one with id `anchor`.
    pub fn insert_after<M>(&mut self, anchor: &str, middleware: M) -> Result<&mut Self, PipelineError>
    where
        M: Middleware<In, Out, E>,
    {
        let index = self.anchor(anchor)?;
        self.insert_at(index + 1, Arc::new(middleware))
    }

    /// Removes and returns the middleware with `id`.
    pub fn remove(&mut self, id: &str) -> Option<BoxedMiddleware<In, Out, E>> {
        self.position(id).map(|index| self.middleware.remove(index))
    }

    /// Runs every middleware in order, finishing with `terminal`.
    pub fn execute<'a, F>(
        &'a self,
        ctx: &'a mut Context,
        input: In,
        terminal: F,
    ) -> BoxFuture<'a, Result<Out, SdkError<E>>>
    where
        F: for<'c> FnOnce(&'c mut Context, In) -> BoxFuture<'c, Result<Out, SdkError<E>>>
            + Send
            + 'a,
    {
        tracing::trace!(step = self.id.name(), middleware = self.middleware.len(), "running step");
        Next::new(&self.middleware, terminal).run(ctx, input)
    }
}

impl<In, Out, E> fmt::Debug for Step<In, Out, E>
where
    In: 'static,
    Out: 'static,
    E: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("middleware", &self.middleware.iter().map(|m| m.id()).collect::<Vec<_>>())
            .finish()
    }
}

/// The seven steps of one operation, typed by its input `I`, output `O` and
/// modeled error `E`.
pub struct OperationStack<I, O, E> {
    /// Step 1.
    pub initialize: Step<I, O, E>,
    /// Step 2.
    pub serialize: Step<SerializeInput<I>, O, E>,
    /// Step 3.
    pub build: Step<RequestBuilder, O, E>,
    /// Step 4.
    pub finalize: Step<RequestBuilder, O, E>,
    /// Step 5.
    pub sign: Step<RequestBuilder, O, E>,
    /// Step 6.
    pub transmit: Step<HttpRequest, O, E>,
    /// Step 7.
    pub deserialize: Step<HttpResponse, O, E>,
}

impl<I, O, E> OperationStack<I, O, E>
where
    I: Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    /// Creates a stack with seven empty steps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialize: Step::new(StepId::Initialize),
            serialize: Step::new(StepId::Serialize),
            build: Step::new(StepId::Build),
            finalize: Step::new(StepId::Finalize),
            sign: Step::new(StepId::Sign),
            transmit: Step::new(StepId::Transmit),
            deserialize: Step::new(StepId::Deserialize),
        }
    }

    /// Returns the middleware ids of every step, in execution order.
    #[must_use]
    pub fn describe(&self) -> Vec<(StepId, Vec<&str>)> {
        vec![
            (StepId::Initialize, self.initialize.ids()),
            (StepId::Serialize, self.serialize.ids()),
            (StepId::Build, self.build.ids()),
            (StepId::Finalize, self.finalize.ids()),
            (StepId::Sign, self.sign.ids()),
            (StepId::Transmit, self.transmit.ids()),
            (StepId::Deserialize, self.deserialize.ids()),
        ]
    }

    /// Returns the total number of registered middleware.
    #[must_use]
    pub fn len(&self) -> usize {
        self.describe().iter().map(|(_, ids)| ids.len()).sum()
    }

    /// Returns `true` if no step has middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I, O, E> Default for OperationStack<I, O, E>
where
    I: Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O, E> fmt::Debug for OperationStack<I, O, E>
where
    I: 'static,
    O: 'static,
    E: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationStack")
            .field("initialize", &self.initialize)
            .field("serialize", &self.serialize)
            .field("build", &self.build)
            .field("finalize", &self.finalize)
            .field("sign", &self.sign)
            .field("transmit", &self.transmit)
            .field("deserialize", &self.deserialize)
            .finish()
    }
}
