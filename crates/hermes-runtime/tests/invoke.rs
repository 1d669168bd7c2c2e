//! End-to-end invocations against a scripted transport.

use hermes_auth::{IdentityResolver, HTTP_BEARER_SCHEME_ID, NO_AUTH_SCHEME_ID};
use hermes_core::{
    Attributes, AuthError, BoxFuture, ClientError, Context, HttpRequest, IdempotencyTokenGenerator, Identity,
    NetworkErrorKind, RequestBuilder, SdkError,
};
use hermes_middleware::state::{self, AttemptState};
use hermes_middleware::{Middleware, Next};
use hermes_retry::{JitterMode, RetryConfig, StandardRetryStrategy};
use hermes_runtime::{Client, ClientConfig};
use hermes_test::fixtures::{self, CreateWidgetInput, GetWidgetInput, Widget, WidgetError};
use hermes_test::{EventLog, RecordingMiddleware, StubReply, StubTransport};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const HOST: &str = "widgets.example.com";

fn widget_reply() -> StubReply {
    StubReply::json(200, serde_json::json!({"id": "w-1", "name": "gear", "color": "blue"}))
}

fn throttled() -> StubReply {
    StubReply::error(429, "ThrottlingException", "slow down")
}

fn gear() -> Widget {
    Widget {
        id: "w-1".to_string(),
        name: "gear".to_string(),
        color: Some("blue".to_string()),
    }
}

#[derive(Debug, Default)]
struct CountingTokens {
    issued: AtomicU32,
}

impl IdempotencyTokenGenerator for CountingTokens {
    fn generate(&self) -> String {
        format!("token-{}", self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

struct CannedWidget;

impl Middleware<RequestBuilder, Widget, WidgetError> for CannedWidget {
    fn id(&self) -> &str {
        "canned"
    }

    fn handle<'a>(
        &'a self,
        _ctx: &'a mut Context,
        _request: RequestBuilder,
        _next: Next<'a, RequestBuilder, Widget, WidgetError>,
    ) -> BoxFuture<'a, Result<Widget, SdkError<WidgetError>>> {
        Box::pin(async { Ok(gear()) })
    }
}

/// Counts requests inside the transmit step at the same time.
#[derive(Debug, Default)]
struct InFlight {
    now: AtomicUsize,
    peak: AtomicUsize,
}

/// Holds every request for 10ms before sending it.
struct SlowTransmit(Arc<InFlight>);

impl Middleware<HttpRequest, Widget, WidgetError> for SlowTransmit {
    fn id(&self) -> &str {
        "slow_transmit"
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context,
        request: HttpRequest,
        next: Next<'a, HttpRequest, Widget, WidgetError>,
    ) -> BoxFuture<'a, Result<Widget, SdkError<WidgetError>>> {
        Box::pin(async move {
            let now = self.0.now.fetch_add(1, Ordering::SeqCst) + 1;
            self.0.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            let result = next.run(ctx, request).await;
            self.0.now.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

/// Never produces an identity.
#[derive(Debug)]
struct StuckResolver;

impl IdentityResolver for StuckResolver {
    fn resolve_identity<'a>(&'a self, _properties: &'a Attributes) -> BoxFuture<'a, anyhow::Result<Identity>> {
        Box::pin(std::future::pending::<anyhow::Result<Identity>>())
    }
}

fn strategy(initial_capacity: u32) -> Arc<StandardRetryStrategy> {
    Arc::new(
        StandardRetryStrategy::new(RetryConfig {
            initial_capacity,
            jitter: JitterMode::None,
            ..RetryConfig::default()
        })
        .unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_throttled_twice_then_success() {
    let transport = StubTransport::new()
        .reply(throttled())
        .reply(throttled())
        .reply(widget_reply());
    let client = fixtures::client(transport.clone()).unwrap();

    let widget = client
        .invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1"))
        .await
        .unwrap();

    assert_eq!(widget, gear());
    assert_eq!(transport.invocations(), 3);
    assert_eq!(transport.gaps(), vec![Duration::from_millis(25), Duration::from_millis(50)]);

    let requests = transport.requests();
    let attempts: Vec<_> = requests.iter().map(|r| r.header("amz-sdk-request").unwrap()).collect();
    assert_eq!(attempts, vec!["attempt=1; max=3", "attempt=2; max=3", "attempt=3; max=3"]);

    let invocation = requests[0].header("amz-sdk-invocation-id").unwrap();
    assert!(requests.iter().all(|r| r.header("amz-sdk-invocation-id") == Some(invocation)));
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted_returns_last_error() {
    let transport = StubTransport::new().repeat(throttled());
    let client = fixtures::client(transport.clone()).unwrap();

    let err = client
        .invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1"))
        .await
        .unwrap_err();

    assert_eq!(transport.invocations(), 3);
    assert_eq!(
        err.into_service_error(),
        Some(WidgetError::Throttling {
            message: "slow down".to_string()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_network_failure_is_retried() {
    let transport = StubTransport::new()
        .reply(StubReply::network(NetworkErrorKind::Connect, "connection refused"))
        .reply(widget_reply());
    let client = fixtures::client(transport.clone()).unwrap();

    let widget = client
        .invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1"))
        .await
        .unwrap();
    assert_eq!(widget.id, "w-1");
    assert_eq!(transport.invocations(), 2);
}

#[tokio::test]
async fn test_missing_identity_resolver_never_reaches_transport() {
    let transport = StubTransport::new().repeat(widget_reply());
    let client = Client::new(fixtures::base_builder(transport.clone()).build().unwrap());

    let err = client
        .invoke(
            &fixtures::get_widget_with_auth(&[HTTP_BEARER_SCHEME_ID]),
            GetWidgetInput::new("w-1"),
        )
        .await
        .unwrap_err();

    match err {
        SdkError::Client(ClientError::Auth(AuthError::NoIdentityResolver { candidates })) => {
            assert_eq!(candidates, vec![HTTP_BEARER_SCHEME_ID]);
        }
        other => panic!("unexpected: {other}"),
    }
    assert_eq!(transport.invocations(), 0);
}

#[tokio::test]
async fn test_modeled_error_is_typed() {
    let transport = StubTransport::new().repeat(StubReply::error(
        404,
        "example.widgets#WidgetNotFound",
        "no widget w-9",
    ));
    let client = fixtures::client(transport.clone()).unwrap();

    let err = client
        .invoke(&fixtures::get_widget(), GetWidgetInput::new("w-9"))
        .await
        .unwrap_err();

    assert_eq!(transport.invocations(), 1);
    let metadata = err.metadata().unwrap();
    assert_eq!(metadata.status().as_u16(), 404);
    assert_eq!(metadata.message(), Some("no widget w-9"));
    assert_eq!(
        err.into_service_error(),
        Some(WidgetError::NotFound {
            message: "no widget w-9".to_string()
        })
    );
}

#[tokio::test]
async fn test_unregistered_code_is_unknown_service_error() {
    let transport = StubTransport::new().repeat(
        StubReply::status(400)
            .with_header("x-amzn-errortype", "MysteryFault:http://internal.example/")
            .with_header("x-amzn-requestid", "req-42"),
    );
    let client = fixtures::client(transport.clone()).unwrap();

    let err = client
        .invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1"))
        .await
        .unwrap_err();

    match &err {
        SdkError::UnknownService(unknown) => {
            assert_eq!(unknown.metadata().code(), Some("MysteryFault"));
            assert_eq!(unknown.metadata().request_id(), Some("req-42"));
        }
        other => panic!("unexpected: {other}"),
    }
    assert_eq!(transport.invocations(), 1);
}

#[tokio::test]
async fn test_undecodable_output_is_client_error() {
    let transport = StubTransport::new().reply(StubReply::json(200, serde_json::json!({"unexpected": true})));
    let client = fixtures::client(transport.clone()).unwrap();

    let err = client
        .invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, SdkError::Client(ClientError::Deserialization { .. })));
    assert_eq!(transport.invocations(), 1);
}

#[tokio::test]
async fn test_user_middleware_wraps_later_steps() {
    let log = EventLog::new();
    let recorders = log.clone();
    let operation = fixtures::get_widget().with_middleware(move |stack| {
        stack.build.push(RecordingMiddleware::new("A", &recorders).tagging("x-seen"))?;
        stack.build.push(RecordingMiddleware::new("B", &recorders).tagging("x-seen"))?;
        stack.transmit.push(RecordingMiddleware::new("T", &recorders))?;
        Ok(())
    });

    let transport = StubTransport::new().reply(widget_reply());
    let client = fixtures::client(transport.clone()).unwrap();
    let orchestrator = client.orchestrator(operation).unwrap();
    assert_eq!(
        orchestrator.stack().build.ids(),
        vec!["endpoint", "content_length", "invocation_id", "A", "B"]
    );

    let rendered = format!("{orchestrator:?}");
    assert!(rendered.starts_with("Orchestrator"));
    assert!(rendered.contains("\"A\", \"B\""));

    orchestrator.invoke(GetWidgetInput::new("w-1")).await.unwrap();

    assert_eq!(
        log.events(),
        vec!["A-before[]", "B-before[A]", "T-before", "T-after", "B-after", "A-after"]
    );
    assert_eq!(transport.last_request().unwrap().header("x-seen"), Some("AB"));
}

#[tokio::test]
async fn test_rejected_stack_edit_fails_orchestrator() {
    let log = EventLog::new();
    let operation = fixtures::get_widget().with_middleware(move |stack| {
        stack
            .build
            .insert_after("no_such_middleware", RecordingMiddleware::new("A", &log))?;
        Ok(())
    });

    let client = fixtures::client(StubTransport::new()).unwrap();
    assert!(client.orchestrator(operation).is_err());
}

#[tokio::test]
async fn test_short_circuit_skips_transport() {
    let operation = fixtures::get_widget().with_middleware(|stack| {
        stack.finalize.push(CannedWidget)?;
        Ok(())
    });
    let transport = StubTransport::new();
    let client = fixtures::client(transport.clone()).unwrap();
    let orchestrator = client.orchestrator(operation).unwrap();

    let mut ctx = orchestrator.new_context();
    let widget = orchestrator
        .invoke_with_context(&mut ctx, GetWidgetInput::new("w-1"))
        .await
        .unwrap();

    assert_eq!(widget, gear());
    assert_eq!(transport.invocations(), 0);
    assert_eq!(state::current(&ctx), AttemptState::Succeeded);
}

#[tokio::test]
async fn test_bearer_auth_and_final_state() {
    let transport = StubTransport::new().reply(widget_reply());
    let client = fixtures::client(transport.clone()).unwrap();
    let orchestrator = client.orchestrator(fixtures::get_widget()).unwrap();

    let mut ctx = orchestrator.new_context();
    orchestrator
        .invoke_with_context(&mut ctx, GetWidgetInput::new("w 1"))
        .await
        .unwrap();

    assert_eq!(state::current(&ctx), AttemptState::Succeeded);
    assert_eq!(ctx.selected_auth_scheme(), Some(HTTP_BEARER_SCHEME_ID));
    assert_eq!(ctx.region(), Some(fixtures::REGION));

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, http::Method::GET);
    assert_eq!(request.uri.host(), Some(HOST));
    assert_eq!(request.uri.path(), "/widgets/w%201");
    assert_eq!(request.header("authorization"), Some("Bearer widget-token"));
}

#[tokio::test]
async fn test_scheme_preference_selects_anonymous() {
    let transport = StubTransport::new().reply(widget_reply());
    let config = fixtures::client_builder(transport.clone())
        .auth_scheme_preference("noAuth")
        .build()
        .unwrap();
    let client = Client::new(config);
    let orchestrator = client.orchestrator(fixtures::get_widget()).unwrap();

    let mut ctx = orchestrator.new_context();
    orchestrator
        .invoke_with_context(&mut ctx, GetWidgetInput::new("w-1"))
        .await
        .unwrap();

    assert_eq!(ctx.selected_auth_scheme(), Some(NO_AUTH_SCHEME_ID));
    assert!(transport.last_request().unwrap().header("authorization").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_idempotency_token_survives_retries() {
    let transport = StubTransport::new().reply(throttled()).reply(widget_reply());
    let tokens = Arc::new(CountingTokens::default());
    let config = fixtures::client_builder(transport.clone())
        .idempotency_token_generator(tokens.clone())
        .build()
        .unwrap();
    let client = Client::new(config);

    client
        .invoke(&fixtures::create_widget(), CreateWidgetInput::new("gear"))
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        let body: serde_json::Value = request.json().unwrap();
        assert_eq!(body["clientToken"], "token-1");
    }
    assert_eq!(tokens.issued.load(Ordering::SeqCst), 1);

    // A second invocation gets its own token.
    transport.push(widget_reply());
    client
        .invoke(&fixtures::create_widget(), CreateWidgetInput::new("gear"))
        .await
        .unwrap();
    let body: serde_json::Value = transport.last_request().unwrap().json().unwrap();
    assert_eq!(body["clientToken"], "token-2");
}

#[tokio::test]
async fn test_caller_token_is_kept() {
    let transport = StubTransport::new().reply(widget_reply());
    let tokens = Arc::new(CountingTokens::default());
    let config = fixtures::client_builder(transport.clone())
        .idempotency_token_generator(tokens.clone())
        .build()
        .unwrap();
    let client = Client::new(config);

    let mut input = CreateWidgetInput::new("gear");
    input.client_token = Some("caller-token".to_string());
    client.invoke(&fixtures::create_widget(), input).await.unwrap();

    let body: serde_json::Value = transport.last_request().unwrap().json().unwrap();
    assert_eq!(body["clientToken"], "caller-token");
    assert_eq!(tokens.issued.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sigv4_signs_create_widget() {
    let transport = StubTransport::new().reply(widget_reply());
    let client = fixtures::client(transport.clone()).unwrap();

    client
        .invoke(&fixtures::create_widget(), CreateWidgetInput::new("gear"))
        .await
        .unwrap();

    let request = transport.last_request().unwrap();
    let authorization = request.header("authorization").unwrap();
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDWIDGETS/"));
    assert!(authorization.contains("/us-west-2/widgets/aws4_request"));
    assert!(authorization.ends_with("Signature=sig-AKIDWIDGETS-us-west-2-widgets"));
    assert_eq!(
        request.header("x-amz-content-sha256"),
        Some(format!("hash-{}", request.body.len()).as_str())
    );
    assert!(request.header("x-amz-date").is_some());
    assert_eq!(request.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_concluded_context_is_rejected() {
    let transport = StubTransport::new()
        .reply(StubReply::error(404, "example.widgets#WidgetNotFound", "no widget w-9"))
        .repeat(widget_reply());
    let client = fixtures::client(transport.clone()).unwrap();
    let orchestrator = client.orchestrator(fixtures::get_widget()).unwrap();

    let mut failed = orchestrator.new_context();
    orchestrator
        .invoke_with_context(&mut failed, GetWidgetInput::new("w-9"))
        .await
        .unwrap_err();
    let mut succeeded = orchestrator.new_context();
    orchestrator
        .invoke_with_context(&mut succeeded, GetWidgetInput::new("w-1"))
        .await
        .unwrap();
    assert_eq!(transport.invocations(), 2);

    for ctx in [&mut failed, &mut succeeded] {
        let concluded = state::current(ctx);
        match orchestrator
            .invoke_with_context(ctx, GetWidgetInput::new("w-1"))
            .await
            .unwrap_err()
        {
            SdkError::Client(ClientError::InvalidRequest(message)) => {
                assert!(message.contains("new_context"));
            }
            other => panic!("unexpected: {other}"),
        }
        assert_eq!(state::current(ctx), concluded);
    }
    assert_eq!(transport.invocations(), 2);

    let mut fresh = orchestrator.new_context();
    let widget = orchestrator
        .invoke_with_context(&mut fresh, GetWidgetInput::new("w-1"))
        .await
        .unwrap();
    assert_eq!(widget, gear());
    assert_eq!(transport.invocations(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_beyond_retry_capacity() {
    let in_flight = Arc::new(InFlight::default());
    let gauge = Arc::clone(&in_flight);
    let operation = fixtures::get_widget().with_middleware(move |stack| {
        stack.transmit.push(SlowTransmit(Arc::clone(&gauge)))?;
        Ok(())
    });

    let strategy = strategy(3);
    let transport = StubTransport::new().repeat(widget_reply());
    let config = fixtures::client_builder(transport.clone())
        .retry_strategy(strategy.clone())
        .build()
        .unwrap();
    let client = Client::new(config);
    let orchestrator = client.orchestrator(operation).unwrap();

    let call = || orchestrator.invoke(GetWidgetInput::new("w-1"));
    let (a, b, c, d, e, f) = tokio::join!(call(), call(), call(), call(), call(), call());

    for result in [a, b, c, d, e, f] {
        assert_eq!(result.unwrap(), gear());
    }
    assert_eq!(in_flight.peak.load(Ordering::SeqCst), 6);
    assert_eq!(transport.invocations(), 6);
    let bucket = strategy.partitions().get(HOST).unwrap();
    assert_eq!(bucket.outstanding(), 0);
    assert_eq!(bucket.available(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff() {
    let strategy = strategy(500);
    let transport = StubTransport::new().reply(throttled()).repeat(widget_reply());
    let config = fixtures::client_builder(transport.clone())
        .retry_strategy(strategy.clone())
        .build()
        .unwrap();
    let client = Client::new(config);

    // The first retry waits 25ms.
    let outcome = tokio::time::timeout(
        Duration::from_millis(10),
        client.invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1")),
    )
    .await;

    assert!(outcome.is_err());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(transport.invocations(), 1);
    let bucket = strategy.partitions().get(HOST).unwrap();
    assert_eq!(bucket.outstanding(), 0);
    assert_eq!(bucket.available(), 490);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_identity_resolution() {
    let strategy = strategy(500);
    let transport = StubTransport::new().repeat(widget_reply());
    let config = fixtures::base_builder(transport.clone())
        .identity_resolver(HTTP_BEARER_SCHEME_ID, Arc::new(StuckResolver))
        .retry_strategy(strategy.clone())
        .build()
        .unwrap();
    let client = Client::new(config);

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        client.invoke(
            &fixtures::get_widget_with_auth(&[HTTP_BEARER_SCHEME_ID]),
            GetWidgetInput::new("w-1"),
        ),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(transport.invocations(), 0);
    let bucket = strategy.partitions().get(HOST).unwrap();
    assert_eq!(bucket.outstanding(), 0);
    assert_eq!(bucket.available(), 500);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_releases_retry_token() {
    let strategy = strategy(500);
    let transport = StubTransport::hanging();
    let config = fixtures::base_builder(transport.clone())
        .retry_strategy(strategy.clone())
        .build()
        .unwrap();
    let client = Client::new(config);

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        client.invoke(&fixtures::get_widget(), GetWidgetInput::new("w-1")),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(transport.invocations(), 1);
    let bucket = strategy.partitions().get(HOST).unwrap();
    assert_eq!(bucket.outstanding(), 0);
}

#[tokio::test]
async fn test_close_closes_transport() {
    let transport = StubTransport::new();
    let config = ClientConfig::builder()
        .transport(transport.clone())
        .endpoint_url(fixtures::ENDPOINT)
        .build()
        .unwrap();
    let client = Client::new(config);

    client.clone().close();
    assert!(transport.is_closed());
}
