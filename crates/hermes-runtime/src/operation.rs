//! Operations as generated glue hands them to the runtime.

use bytes::Bytes;
use hermes_core::{ClientError, OperationDescriptor, RequestBuilder, ResponseParts, WireError};
use hermes_middleware::{OperationStack, PipelineError};
use std::fmt;
use std::sync::Arc;

/// Header some protocols use to carry the error code.
pub const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// Encodes the operation input into a fresh request.
pub type Serializer<I> = Arc<dyn Fn(&I, &mut RequestBuilder) -> Result<(), ClientError> + Send + Sync>;

/// Decodes a successful response into the operation output.
pub type Deserializer<O> = Arc<dyn Fn(&ResponseParts, Bytes) -> Result<O, ClientError> + Send + Sync>;

/// Reports the error code of an error response, or `None` for a success.
pub type ErrorClassifierFn = Arc<dyn Fn(&ResponseParts, &Bytes) -> Option<WireError> + Send + Sync>;

/// Edits the operation's middleware stack after the built-ins are registered.
pub type StackCustomizer<I, O, E> =
    Arc<dyn Fn(&mut OperationStack<I, O, E>) -> Result<(), PipelineError> + Send + Sync>;

/// Classifies any non-2xx response as an error.
///
/// The code comes from the `x-amzn-errortype` header when present (anything
/// after `:` is dropped later by the registry), otherwise it is the numeric
/// status.
#[must_use]
pub fn default_error_classifier(parts: &ResponseParts, _body: &Bytes) -> Option<WireError> {
    if parts.status.is_success() {
        return None;
    }
    let code = parts
        .headers
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| parts.status.as_str().to_string(), ToString::to_string);
    Some(WireError::new(code))
}

/// One operation: its descriptor and the codec closures around it.
///
/// Cloning is cheap; everything is shared.
pub struct Operation<I, O, E> {
    descriptor: Arc<OperationDescriptor<E>>,
    serializer: Serializer<I>,
    deserializer: Deserializer<O>,
    error_classifier: ErrorClassifierFn,
    idempotency_token: Option<fn(&mut I) -> &mut Option<String>>,
    customizers: Vec<StackCustomizer<I, O, E>>,
}

impl<I, O, E> Operation<I, O, E> {
    /// Creates an operation with the default error classifier.
    pub fn new<S, D>(descriptor: Arc<OperationDescriptor<E>>, serializer: S, deserializer: D) -> Self
    where
        S: Fn(&I, &mut RequestBuilder) -> Result<(), ClientError> + Send + Sync + 'static,
        D: Fn(&ResponseParts, Bytes) -> Result<O, ClientError> + Send + Sync + 'static,
    {
        Self {
            descriptor,
            serializer: Arc::new(serializer),
            deserializer: Arc::new(deserializer),
            error_classifier: Arc::new(default_error_classifier),
            idempotency_token: None,
            customizers: Vec::new(),
        }
    }

    /// Replaces the error classifier.
    #[must_use]
    pub fn with_error_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&ResponseParts, &Bytes) -> Option<WireError> + Send + Sync + 'static,
    {
        self.error_classifier = Arc::new(classifier);
        self
    }

    /// Declares the input member that carries an idempotency token.
    #[must_use]
    pub fn with_idempotency_token(mut self, accessor: fn(&mut I) -> &mut Option<String>) -> Self {
        self.idempotency_token = Some(accessor);
        self
    }

    /// Adds a stack edit, applied in registration order.
    #[must_use]
    pub fn with_middleware<F>(mut self, customize: F) -> Self
    where
        F: Fn(&mut OperationStack<I, O, E>) -> Result<(), PipelineError> + Send + Sync + 'static,
    {
        self.customizers.push(Arc::new(customize));
        self
    }

    /// The operation descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &OperationDescriptor<E> {
        &self.descriptor
    }

    /// The input serializer.
    #[must_use]
    pub fn serializer(&self) -> &Serializer<I> {
        &self.serializer
    }

    /// The output deserializer.
    #[must_use]
    pub fn deserializer(&self) -> &Deserializer<O> {
        &self.deserializer
    }

    /// The error classifier.
    #[must_use]
    pub fn error_classifier(&self) -> &ErrorClassifierFn {
        &self.error_classifier
    }

    /// The idempotency token accessor, if the operation has one.
    #[must_use]
    pub fn idempotency_token(&self) -> Option<fn(&mut I) -> &mut Option<String>> {
        self.idempotency_token
    }

    /// Stack edits in registration order.
    #[must_use]
    pub fn customizers(&self) -> &[StackCustomizer<I, O, E>] {
        &self.customizers
    }
}

impl<I, O, E> Clone for Operation<I, O, E> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            serializer: Arc::clone(&self.serializer),
            deserializer: Arc::clone(&self.deserializer),
            error_classifier: Arc::clone(&self.error_classifier),
            idempotency_token: self.idempotency_token,
            customizers: self.customizers.clone(),
        }
    }
}

impl<I, O, E> fmt::Debug for Operation<I, O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("descriptor", &self.descriptor)
            .field("idempotency_token", &self.idempotency_token.is_some())
            .field("customizers", &self.customizers.len())
            .finish_non_exhaustive()
    }
}
