//! The attempt orchestrator.
//!
//! An [`Orchestrator`] binds one [`Operation`] to one [`ClientConfig`]. It
//! owns the operation's [`OperationStack`] (built-in middleware first, then
//! the operation's own edits) and runs each attempt as a chain of steps: the
//! terminal handler of every step enters the next one, so a middleware wraps
//! everything that happens after it in the attempt.
//!
//! The whole attempt runs under the client's retry engine. The input is
//! cloned and re-serialized into a fresh request for every attempt, and auth
//! is resolved again each time so expiring identities are refreshed between
//! retries.

use crate::config::ClientConfig;
use crate::operation::Operation;
use hermes_auth::properties::SERVICE_SIGNING_NAME;
use hermes_auth::{resolve_auth, ResolvedAuth};
use hermes_core::{
    collect_body, BoxFuture, ClientError, Context, HttpRequest, HttpResponse, IdempotencyTokenGenerator,
    ModeledError, RequestBuilder, SdkError, TelemetryScope,
};
use hermes_middleware::stages::{
    ClockSkewMiddleware, ContentLengthMiddleware, EndpointMiddleware, IdempotencyTokenMiddleware,
    InvocationIdMiddleware, LoggingMiddleware, RetryInfoMiddleware,
};
use hermes_middleware::state::{self, AttemptState, ATTEMPT_STATE};
use hermes_middleware::{OperationStack, SerializeInput};
use hermes_telemetry::metrics::{record_attempt, record_operation};
use hermes_telemetry::Outcome;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::Instrument;

/// Hands out the same token for every attempt of one invocation, so a retried
/// request carries the token of the first attempt.
struct InvocationToken {
    generator: Arc<dyn IdempotencyTokenGenerator>,
    token: OnceLock<String>,
}

impl IdempotencyTokenGenerator for InvocationToken {
    fn generate(&self) -> String {
        self.token.get_or_init(|| self.generator.generate()).clone()
    }
}

/// Runs one operation against one client configuration.
pub struct Orchestrator<I, O, E> {
    pipeline: Arc<Pipeline<I, O, E>>,
}

struct Pipeline<I, O, E> {
    config: Arc<ClientConfig>,
    operation: Operation<I, O, E>,
    stack: OperationStack<I, O, E>,
}

impl<I, O, E> Orchestrator<I, O, E>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
    E: ModeledError,
{
    /// Builds the operation's stack.
    ///
    /// # Errors
    ///
    /// Fails if one of the operation's stack edits is rejected (duplicate id,
    /// unknown anchor).
    pub fn new(config: Arc<ClientConfig>, operation: Operation<I, O, E>) -> Result<Self, ClientError> {
        let mut stack = OperationStack::new();

        if let Some(accessor) = operation.idempotency_token() {
            stack.initialize.push(IdempotencyTokenMiddleware::new(accessor))?;
        }
        stack.build.push(EndpointMiddleware)?;
        stack.build.push(ContentLengthMiddleware)?;
        stack.build.push(InvocationIdMiddleware)?;
        stack.finalize.push(RetryInfoMiddleware)?;
        stack.transmit.push(LoggingMiddleware)?;
        stack.deserialize.push(LoggingMiddleware)?;
        stack
            .deserialize
            .push(ClockSkewMiddleware::new(Arc::clone(config.clock_skew())))?;

        for customize in operation.customizers() {
            customize(&mut stack)?;
        }

        Ok(Self {
            pipeline: Arc::new(Pipeline {
                config,
                operation,
                stack,
            }),
        })
    }

    /// The assembled middleware stack.
    #[must_use]
    pub fn stack(&self) -> &OperationStack<I, O, E> {
        &self.pipeline.stack
    }

    /// Creates the context for a new invocation.
    ///
    /// Carries the endpoint, region, auth preference, telemetry scope, the
    /// service signing name and an idempotency token source shared by all
    /// attempts.
    #[must_use]
    pub fn new_context(&self) -> Context {
        let config = &self.pipeline.config;
        let descriptor = self.pipeline.operation.descriptor();

        let token = InvocationToken {
            generator: Arc::clone(config.idempotency_token_generator()),
            token: OnceLock::new(),
        };
        let mut builder = Context::builder()
            .endpoint(config.endpoint().clone())
            .telemetry_scope(TelemetryScope::new(descriptor.service().id().name(), descriptor.name()))
            .idempotency_token_generator(Arc::new(token))
            .attribute(&SERVICE_SIGNING_NAME, descriptor.service().signing_name());
        if let Some(region) = config.region() {
            builder = builder.region(region);
        }
        if let Some(preference) = config.auth_scheme_preference() {
            builder = builder.auth_scheme_preference(preference);
        }
        builder.build()
    }

    /// Invokes the operation with a fresh context.
    pub async fn invoke(&self, input: I) -> Result<O, SdkError<E>> {
        let mut ctx = self.new_context();
        self.invoke_with_context(&mut ctx, input).await
    }

    /// Invokes the operation with a caller-prepared context (see
    /// [`new_context`](Self::new_context)).
    ///
    /// Returns the output of the first successful attempt, or the error of the
    /// last attempt.
    ///
    /// A context belongs to one invocation: it carries that invocation's id
    /// and idempotency token. Passing a context whose invocation already
    /// concluded fails with [`ClientError::InvalidRequest`] before any attempt
    /// is made.
    pub async fn invoke_with_context(&self, ctx: &mut Context, input: I) -> Result<O, SdkError<E>> {
        let state = state::current(ctx);
        if state.is_terminal() {
            return Err(SdkError::Client(ClientError::InvalidRequest(format!(
                "context of invocation {} already concluded ({state}); create a new one with new_context()",
                ctx.invocation_id()
            ))));
        }
        let descriptor = self.pipeline.operation.descriptor();
        let service = descriptor.service().id().name().to_string();
        let operation = descriptor.name().to_string();
        let span = tracing::info_span!(
            "operation",
            service = %service,
            operation = %operation,
            invocation_id = %ctx.invocation_id(),
        );

        let started = Instant::now();
        let partition = self.pipeline.config.endpoint().host().to_string();
        let pipeline = Arc::clone(&self.pipeline);
        let result = self
            .pipeline
            .config
            .retry_engine()
            .execute(ctx, &partition, move |ctx| Arc::clone(&pipeline).attempt(ctx, input.clone()))
            .instrument(span)
            .await;

        let outcome = if result.is_ok() {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        record_operation(&service, &operation, outcome, started.elapsed());
        result
    }
}

impl<I, O, E> Pipeline<I, O, E>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
    E: ModeledError,
{
    fn attempt<'c>(self: Arc<Self>, ctx: &'c mut Context, input: I) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            if state::current(ctx) == AttemptState::Failed {
                enter(ctx, AttemptState::NotStarted)?;
            }
            if let Some(scope) = ctx.telemetry_scope() {
                record_attempt(&scope.service, &scope.operation);
            }

            let result = self.initialize(ctx, input).await;
            settle(ctx, result.is_ok());
            result
        })
    }

    fn initialize<'c>(self: Arc<Self>, ctx: &'c mut Context, input: I) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            enter(ctx, AttemptState::Initialize)?;
            let next = Arc::clone(&self);
            self.stack
                .initialize
                .execute(ctx, input, move |ctx, input| next.serialize(ctx, SerializeInput::new(input)))
                .await
        })
    }

    fn serialize<'c>(
        self: Arc<Self>,
        ctx: &'c mut Context,
        input: SerializeInput<I>,
    ) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            enter(ctx, AttemptState::Serialize)?;
            let next = Arc::clone(&self);
            self.stack
                .serialize
                .execute(ctx, input, move |ctx, input| next.encode(ctx, input))
                .await
        })
    }

    // Terminal of the serialize step.
    fn encode<'c>(self: Arc<Self>, ctx: &'c mut Context, input: SerializeInput<I>) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let SerializeInput { input, mut request } = input;
            (self.operation.serializer())(&input, &mut request)?;
            self.build(ctx, request).await
        })
    }

    fn build<'c>(self: Arc<Self>, ctx: &'c mut Context, request: RequestBuilder) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            enter(ctx, AttemptState::Build)?;
            let next = Arc::clone(&self);
            self.stack
                .build
                .execute(ctx, request, move |ctx, request| next.finalize(ctx, request))
                .await
        })
    }

    fn finalize<'c>(self: Arc<Self>, ctx: &'c mut Context, request: RequestBuilder) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            enter(ctx, AttemptState::Finalize)?;
            let next = Arc::clone(&self);
            self.stack
                .finalize
                .execute(ctx, request, move |ctx, request| next.sign(ctx, request))
                .await
        })
    }

    fn sign<'c>(self: Arc<Self>, ctx: &'c mut Context, request: RequestBuilder) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            enter(ctx, AttemptState::Sign)?;
            if let Some(skew) = self.config.clock_skew().get(self.config.endpoint().host()) {
                ctx.set_clock_skew(skew);
            }
            let next = Arc::clone(&self);
            self.stack
                .sign
                .execute(ctx, request, move |ctx, request| next.authorize(ctx, request))
                .await
        })
    }

    // Terminal of the sign step: pick a scheme, resolve its identity, sign and
    // build the request.
    fn authorize<'c>(
        self: Arc<Self>,
        ctx: &'c mut Context,
        mut request: RequestBuilder,
    ) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let resolved = resolve_auth(
                ctx,
                self.operation.descriptor().auth_schemes(),
                self.config.auth_schemes(),
                self.config.identity_resolvers(),
            )
            .await
            .map_err(ClientError::from)?;
            resolved.sign(&mut request).map_err(ClientError::from)?;

            let ResolvedAuth {
                scheme,
                identity,
                signing_properties,
            } = resolved;
            tracing::debug!(auth_scheme = scheme.scheme_id(), "signed request");
            ctx.set_selected_auth_scheme(scheme.scheme_id());
            ctx.set_identity(identity);
            ctx.set_signing_properties(signing_properties);

            let request = request.build()?;
            self.transmit(ctx, request).await
        })
    }

    fn transmit<'c>(self: Arc<Self>, ctx: &'c mut Context, request: HttpRequest) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            enter(ctx, AttemptState::Transmitting)?;
            let next = Arc::clone(&self);
            self.stack
                .transmit
                .execute(ctx, request, move |ctx, request| next.send(ctx, request))
                .await
        })
    }

    // Terminal of the transmit step.
    fn send<'c>(self: Arc<Self>, ctx: &'c mut Context, request: HttpRequest) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let response = self
                .config
                .transport()
                .execute(request)
                .await
                .map_err(SdkError::Network)?;
            self.deserialize(ctx, response).await
        })
    }

    fn deserialize<'c>(
        self: Arc<Self>,
        ctx: &'c mut Context,
        response: HttpResponse,
    ) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            enter(ctx, AttemptState::Deserializing)?;
            let next = Arc::clone(&self);
            self.stack
                .deserialize
                .execute(ctx, response, move |ctx, response| next.decode(ctx, response))
                .await
        })
    }

    // Terminal of the deserialize step.
    fn decode<'c>(self: Arc<Self>, _ctx: &'c mut Context, response: HttpResponse) -> BoxFuture<'c, Result<O, SdkError<E>>> {
        Box::pin(async move {
            let (parts, body) = response.into_parts();
            let body = collect_body(body).await;

            if let Some(wire) = (self.operation.error_classifier())(&parts, &body) {
                tracing::debug!(status = parts.status.as_u16(), code = %wire.code, "error response");
                return Err(self.operation.descriptor().errors().deserialize(&wire, &parts, &body));
            }
            (self.operation.deserializer())(&parts, body).map_err(SdkError::Client)
        })
    }
}

fn enter<E>(ctx: &mut Context, to: AttemptState) -> Result<(), SdkError<E>> {
    state::transition(ctx, to).map_err(|err| SdkError::Client(err.into()))?;
    tracing::debug!(state = to.name(), "attempt state");
    Ok(())
}

// Moves the attempt to its terminal state. A middleware that answers without
// calling `next` leaves the attempt mid-pipeline, so the terminal state is
// stored directly in that case.
fn settle(ctx: &mut Context, succeeded: bool) {
    let outcome = if succeeded {
        AttemptState::Succeeded
    } else {
        AttemptState::Failed
    };
    let current = state::current(ctx);
    if current.is_terminal() {
        return;
    }
    if state::transition(ctx, outcome).is_err() {
        tracing::debug!(from = current.name(), to = outcome.name(), "attempt short-circuited");
        ctx.set(&ATTEMPT_STATE, outcome);
    }
}

impl<I, O, E> fmt::Debug for Orchestrator<I, O, E>
where
    I: 'static,
    O: 'static,
    E: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("operation", &self.pipeline.operation)
            .field("stack", &self.pipeline.stack)
            .finish_non_exhaustive()
    }
}

impl<I, O, E> Clone for Orchestrator<I, O, E> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}
