//! End-to-end pipeline integration tests.
//!
//! Chains the Build and Finalize steps the way the runtime does (the terminal of
//! one step runs the next step) and checks what the built-in middleware leaves
//! on the final request.

use bytes::Bytes;
use hermes_core::{BoxFuture, ClientError, Context, Endpoint, RequestBuilder, SdkError};
use hermes_middleware::{
    stages::{
        invocation_id::INVOCATION_ID_HEADER, retry_info::REQUEST_INFO_HEADER,
        ContentLengthMiddleware, EndpointMiddleware, InvocationIdMiddleware, RetryInfoMiddleware,
    },
    FnMiddleware, Step, StepId,
};
use http::HeaderMap;
use std::sync::Arc;

type Output = (String, HeaderMap);

fn build_step() -> Step<RequestBuilder, Output, ()> {
    let mut step = Step::new(StepId::Build);
    step.push(EndpointMiddleware).unwrap();
    step.push(ContentLengthMiddleware).unwrap();
    step.push(InvocationIdMiddleware).unwrap();
    step
}

fn finalize_step() -> Step<RequestBuilder, Output, ()> {
    let mut step = Step::new(StepId::Finalize);
    step.push(RetryInfoMiddleware).unwrap();
    step
}

fn built<'c>(_ctx: &'c mut Context, request: RequestBuilder) -> BoxFuture<'c, Result<Output, SdkError<()>>> {
    Box::pin(async move {
        let request = request.build()?;
        Ok((request.uri().to_string(), request.headers().clone()))
    })
}

async fn run(
    build: Step<RequestBuilder, Output, ()>,
    finalize: Step<RequestBuilder, Output, ()>,
    ctx: &mut Context,
    request: RequestBuilder,
) -> Result<Output, SdkError<()>> {
    let finalize = Arc::new(finalize);
    build
        .execute(ctx, request, move |ctx, request| {
            Box::pin(async move { finalize.execute(ctx, request, built).await })
        })
        .await
}

fn context() -> Context {
    let mut ctx = Context::builder()
        .endpoint(Endpoint::parse("https://widgets.example.com/v1").unwrap())
        .build();
    ctx.set_attempt(1, 3);
    ctx
}

#[tokio::test]
async fn test_builtin_stages_shape_request() {
    let mut ctx = context();
    let mut request = RequestBuilder::new();
    request.set_path("/widgets").set_body(Bytes::from_static(b"{\"name\":\"w\"}"));

    let (uri, headers) = run(build_step(), finalize_step(), &mut ctx, request).await.unwrap();

    assert_eq!(uri, "https://widgets.example.com/v1/widgets");
    assert_eq!(headers["content-length"], "12");
    assert_eq!(headers[INVOCATION_ID_HEADER], ctx.invocation_id().to_string().as_str());
    assert_eq!(headers[REQUEST_INFO_HEADER], "attempt=1; max=3");
}

#[tokio::test]
async fn test_custom_middleware_sees_builtin_effects() {
    let mut build = build_step();
    build
        .insert_after(
            "endpoint",
            FnMiddleware::new("require_https", |_ctx: &mut Context, request: &mut RequestBuilder| {
                let secure = request.authority().is_some();
                if secure {
                    request.set_header("x-checked", "yes")?;
                    Ok(())
                } else {
                    Err(SdkError::<()>::Client(ClientError::middleware("require_https", "no host")))
                }
            }),
        )
        .unwrap();
    assert_eq!(build.ids(), vec!["endpoint", "require_https", "content_length", "invocation_id"]);

    let mut ctx = context();
    let (_, headers) = run(build, finalize_step(), &mut ctx, RequestBuilder::new()).await.unwrap();
    assert_eq!(headers["x-checked"], "yes");
}

#[tokio::test]
async fn test_error_aborts_remaining_steps() {
    let mut build = build_step();
    build.remove("endpoint");
    build
        .prepend(FnMiddleware::new("fail", |_ctx: &mut Context, _request: &mut RequestBuilder| {
            Err(SdkError::<()>::Client(ClientError::middleware("fail", "boom")))
        }))
        .unwrap();

    let mut ctx = context();
    let err = run(build, finalize_step(), &mut ctx, RequestBuilder::new()).await.unwrap_err();
    match err {
        SdkError::Client(ClientError::Middleware { middleware, .. }) => assert_eq!(middleware, "fail"),
        other => panic!("unexpected error kind: {}", other.kind()),
    }
}
