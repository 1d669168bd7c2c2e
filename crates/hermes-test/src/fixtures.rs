//! A small JSON service used to drive the runtime end to end.
//!
//! `WidgetService` has two operations:
//!
//! - `GetWidget`: `GET /widgets/{id}`, bearer or anonymous auth.
//! - `CreateWidget`: `POST /widgets` with a JSON body and an idempotency
//!   token, signed with SigV4.
//!
//! Errors are JSON objects with `__type` (or `code`) and `message`, or carry
//! the code in the `x-amzn-errortype` header.

use crate::signing::FixedSignatureCalculator;
use bytes::Bytes;
use hermes_auth::{
    SigV4AuthScheme, StaticIdentityResolver, HTTP_BEARER_SCHEME_ID, NO_AUTH_SCHEME_ID, SIGV4_SCHEME_ID,
};
use hermes_core::{
    BearerToken, ClientError, Credentials, ErrorFault, ModeledError, OperationDescriptor, RequestBuilder,
    ResponseParts, ServiceSchema, ShapeId, TypeRegistry, WireError,
};
use hermes_retry::{JitterMode, RetryConfig};
use hermes_runtime::{Client, ClientConfig, ClientConfigBuilder, Operation, ERROR_TYPE_HEADER};
use http::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Shape namespace of the fixture service.
pub const NAMESPACE: &str = "example.widgets";
/// Endpoint the fixture client targets.
pub const ENDPOINT: &str = "https://widgets.example.com";
/// Region the fixture client signs for.
pub const REGION: &str = "us-west-2";
/// Token the fixture bearer resolver hands out.
pub const BEARER_TOKEN: &str = "widget-token";
/// Access key of the fixture credentials.
pub const ACCESS_KEY_ID: &str = "AKIDWIDGETS";

fn shape(name: &str) -> ShapeId {
    ShapeId::new(NAMESPACE, name)
}

/// The fixture service schema.
#[must_use]
pub fn service() -> Arc<ServiceSchema> {
    Arc::new(ServiceSchema::new(shape("WidgetService"), "2024-06-01").with_signing_name("widgets"))
}

/// A widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    /// Widget id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Input of `GetWidget`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetWidgetInput {
    /// The widget to fetch.
    pub widget_id: String,
}

impl GetWidgetInput {
    /// Fetches `widget_id`.
    pub fn new(widget_id: impl Into<String>) -> Self {
        Self {
            widget_id: widget_id.into(),
        }
    }
}

/// Input of `CreateWidget`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWidgetInput {
    /// Display name.
    pub name: String,
    /// Optional color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Idempotency token; filled in by the runtime when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

impl CreateWidgetInput {
    /// Creates a widget called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            client_token: None,
        }
    }
}

/// Modeled errors of the widget operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    /// The widget does not exist.
    #[error("widget not found: {message}")]
    NotFound {
        /// Service message.
        message: String,
    },
    /// The caller is sending too fast.
    #[error("throttled: {message}")]
    Throttling {
        /// Service message.
        message: String,
    },
    /// The input was rejected.
    #[error("invalid widget: {message}")]
    InvalidInput {
        /// Service message.
        message: String,
    },
}

impl ModeledError for WidgetError {
    fn code(&self) -> &str {
        match self {
            Self::NotFound { .. } => "WidgetNotFound",
            Self::Throttling { .. } => "ThrottlingException",
            Self::InvalidInput { .. } => "InvalidWidgetInput",
        }
    }

    fn retryable(&self) -> Option<bool> {
        match self {
            Self::Throttling { .. } => Some(true),
            Self::NotFound { .. } | Self::InvalidInput { .. } => Some(false),
        }
    }

    fn is_throttling(&self) -> bool {
        matches!(self, Self::Throttling { .. })
    }

    fn fault(&self) -> ErrorFault {
        ErrorFault::Client
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", alias = "code")]
    code: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

fn error_body(body: &Bytes) -> ErrorBody {
    serde_json::from_slice(body).unwrap_or_default()
}

fn message(body: &Bytes) -> String {
    error_body(body).message.unwrap_or_default()
}

/// Reads the error code from the `x-amzn-errortype` header, then from the
/// body's `__type` or `code` member, falling back to the numeric status.
#[must_use]
pub fn json_error_classifier(parts: &ResponseParts, body: &Bytes) -> Option<WireError> {
    if parts.status.is_success() {
        return None;
    }
    let parsed = error_body(body);
    let code = parts
        .headers
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
        .or(parsed.code)
        .unwrap_or_else(|| parts.status.as_str().to_string());

    let wire = WireError::new(code);
    Some(match parsed.message {
        Some(message) => wire.with_message(message),
        None => wire,
    })
}

/// The modeled error registry shared by both operations.
#[must_use]
pub fn errors() -> TypeRegistry<WidgetError> {
    TypeRegistry::new()
        .with(shape("WidgetNotFound"), |_, body| {
            Ok(WidgetError::NotFound { message: message(body) })
        })
        .with(shape("ThrottlingException"), |_, body| {
            Ok(WidgetError::Throttling { message: message(body) })
        })
        .with(shape("InvalidWidgetInput"), |_, body| {
            Ok(WidgetError::InvalidInput { message: message(body) })
        })
}

fn decode_widget(_parts: &ResponseParts, body: Bytes) -> Result<Widget, ClientError> {
    serde_json::from_slice(&body).map_err(|e| ClientError::deserialization("invalid Widget document", e))
}

fn encode_get_widget(input: &GetWidgetInput, request: &mut RequestBuilder) -> Result<(), ClientError> {
    if input.widget_id.is_empty() {
        return Err(ClientError::Serialization {
            message: "widget_id must not be empty".to_string(),
            source: None,
        });
    }
    request
        .set_method(Method::GET)
        .set_path(format!("/widgets/{}", urlencoding::encode(&input.widget_id)));
    Ok(())
}

fn encode_create_widget(input: &CreateWidgetInput, request: &mut RequestBuilder) -> Result<(), ClientError> {
    let body = serde_json::to_vec(input).map_err(|e| ClientError::serialization("invalid CreateWidget input", e))?;
    request.set_method(Method::POST).set_path("/widgets").set_body(body);
    request.set_header("content-type", "application/json")?;
    Ok(())
}

/// `GetWidget` with explicit auth candidates.
#[must_use]
pub fn get_widget_with_auth(auth_schemes: &[&str]) -> Operation<GetWidgetInput, Widget, WidgetError> {
    let descriptor = OperationDescriptor::new(
        service(),
        shape("GetWidget"),
        shape("GetWidgetInput"),
        shape("Widget"),
    )
    .with_errors(errors())
    .with_auth_schemes(auth_schemes.iter().copied());

    Operation::new(Arc::new(descriptor), encode_get_widget, decode_widget).with_error_classifier(json_error_classifier)
}

/// `GetWidget`, authenticated with a bearer token or anonymously.
#[must_use]
pub fn get_widget() -> Operation<GetWidgetInput, Widget, WidgetError> {
    get_widget_with_auth(&[HTTP_BEARER_SCHEME_ID, NO_AUTH_SCHEME_ID])
}

fn client_token(input: &mut CreateWidgetInput) -> &mut Option<String> {
    &mut input.client_token
}

/// `CreateWidget`, signed with SigV4.
#[must_use]
pub fn create_widget() -> Operation<CreateWidgetInput, Widget, WidgetError> {
    let descriptor = OperationDescriptor::new(
        service(),
        shape("CreateWidget"),
        shape("CreateWidgetInput"),
        shape("Widget"),
    )
    .with_errors(errors())
    .with_auth_schemes([SIGV4_SCHEME_ID]);

    Operation::new(Arc::new(descriptor), encode_create_widget, decode_widget)
        .with_error_classifier(json_error_classifier)
        .with_idempotency_token(client_token)
}

/// A builder with endpoint, region and unjittered backoff, but only the
/// default (anonymous) identity.
pub fn base_builder(transport: impl hermes_core::Transport) -> ClientConfigBuilder {
    ClientConfig::builder()
        .transport(transport)
        .endpoint_url(ENDPOINT)
        .region(REGION)
        .retry_config(RetryConfig {
            jitter: JitterMode::None,
            ..RetryConfig::default()
        })
}

/// [`base_builder`] plus a bearer token and SigV4 credentials signed by
/// [`FixedSignatureCalculator`].
pub fn client_builder(transport: impl hermes_core::Transport) -> ClientConfigBuilder {
    base_builder(transport)
        .auth_scheme(Arc::new(SigV4AuthScheme::new(Arc::new(FixedSignatureCalculator))))
        .identity_resolver(
            HTTP_BEARER_SCHEME_ID,
            Arc::new(StaticIdentityResolver::new(BearerToken::new(BEARER_TOKEN, None))),
        )
        .identity_resolver(
            SIGV4_SCHEME_ID,
            Arc::new(StaticIdentityResolver::new(Credentials::new(
                ACCESS_KEY_ID,
                "widget-secret",
                None,
                None,
            ))),
        )
}

/// A fully configured fixture client.
///
/// # Errors
///
/// Fails only if the fixture configuration is invalid.
pub fn client(transport: impl hermes_core::Transport) -> Result<Client, ClientError> {
    Ok(Client::new(client_builder(transport).build()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Response, StatusCode};

    fn parts(status: StatusCode) -> ResponseParts {
        Response::builder().status(status).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_classifier_reads_body_code() {
        let body = Bytes::from_static(br#"{"__type":"example.widgets#WidgetNotFound","message":"no such widget"}"#);
        let wire = json_error_classifier(&parts(StatusCode::NOT_FOUND), &body).unwrap();
        assert_eq!(wire.code, "example.widgets#WidgetNotFound");
        assert_eq!(wire.message.as_deref(), Some("no such widget"));

        assert!(json_error_classifier(&parts(StatusCode::OK), &body).is_none());
    }

    #[test]
    fn test_classifier_falls_back_to_status() {
        let wire = json_error_classifier(&parts(StatusCode::BAD_GATEWAY), &Bytes::from_static(b"<html>")).unwrap();
        assert_eq!(wire.code, "502");
        assert!(wire.message.is_none());
    }

    #[test]
    fn test_registry_decodes_modeled_errors() {
        let body = Bytes::from_static(br#"{"code":"ThrottlingException","Message":"slow down"}"#);
        let wire = json_error_classifier(&parts(StatusCode::TOO_MANY_REQUESTS), &body).unwrap();
        let err = errors().deserialize(&wire, &parts(StatusCode::TOO_MANY_REQUESTS), &body);

        let modeled = err.as_service_error().unwrap();
        assert!(modeled.is_throttling());
        assert_eq!(modeled.retryable(), Some(true));
        assert_eq!(*modeled, WidgetError::Throttling { message: "slow down".to_string() });
    }

    #[test]
    fn test_encoders() {
        let mut request = RequestBuilder::new();
        tokio_test::assert_ok!(encode_get_widget(&GetWidgetInput::new("w 1"), &mut request));
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/widgets/w%201");

        let mut request = RequestBuilder::new();
        tokio_test::assert_err!(encode_get_widget(&GetWidgetInput::new(""), &mut request));

        let mut request = RequestBuilder::new();
        let mut input = CreateWidgetInput::new("gear");
        input.client_token = Some("tok".to_string());
        encode_create_widget(&input, &mut request).unwrap();
        assert_eq!(request.method(), Method::POST);
        let body: serde_json::Value = serde_json::from_slice(request.body()).unwrap();
        assert_eq!(body, serde_json::json!({"name": "gear", "clientToken": "tok"}));
    }
}
