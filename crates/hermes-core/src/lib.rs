//! # Hermes Core
//!
//! Shared vocabulary for the Hermes client runtime.
//!
//! - [`Context`] / [`Attributes`] - per-invocation typed property bag
//! - [`SdkError`] - the error every operation returns, with [`ClientError`],
//!   [`ServiceError`], [`NetworkError`] and [`UnknownServiceError`]
//! - [`Identity`] - resolved credentials handed to signers
//! - [`RequestBuilder`] / [`HttpRequest`] / [`HttpResponse`] - message types
//! - [`OperationDescriptor`] / [`TypeRegistry`] - per-operation static data
//! - [`Transport`] - the "send a request, get a response" contract

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod attributes;
pub mod context;
mod error;
pub mod http;
mod identity;
mod operation;
mod registry;
mod transport;

use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use attributes::{AttributeKey, Attributes};
pub use context::{
    normalize_auth_scheme_preference, AttemptInfo, ChecksumAlgorithm, Context, ContextBuilder,
    IdempotencyTokenGenerator, InvocationId, TelemetryScope, UuidTokenGenerator,
};
pub use error::{
    AuthError, ClientError, ErrorFault, ErrorMetadata, ErrorType, ModeledError, NetworkError,
    NetworkErrorKind, SdkError, ServiceError, UnknownServiceError, AMZ_RETRY_AFTER_HEADER,
    REQUEST_ID_HEADER,
};
pub use self::http::{collect_body, Endpoint, HttpRequest, HttpResponse, RequestBuilder, ResponseParts};
pub use identity::{Anonymous, BearerToken, Credentials, Identity};
pub use operation::{OperationDescriptor, ServiceSchema};
pub use registry::{ErrorDeserializer, InvalidShapeId, ShapeId, TypeRegistry, WireError};
pub use transport::Transport;
