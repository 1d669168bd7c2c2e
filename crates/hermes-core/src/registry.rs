//! Shape ids and the error type registry.

use crate::error::{ClientError, ErrorMetadata, SdkError, UnknownServiceError};
use crate::http::ResponseParts;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// An absolute shape id, `namespace#Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId {
    namespace: String,
    name: String,
}

impl ShapeId {
    /// Creates a shape id from its parts.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the unqualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.namespace, self.name)
    }
}

/// Error returned when a string is not an absolute shape id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid shape id {0:?}: expected namespace#Name")]
pub struct InvalidShapeId(pub String);

impl FromStr for ShapeId {
    type Err = InvalidShapeId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('#') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(InvalidShapeId(s.to_string())),
        }
    }
}

/// The error code and message an error classifier found in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireError {
    /// Wire error id, qualified (`ns#Name`) or not.
    pub code: String,
    /// Human-readable message, if the payload had one.
    pub message: Option<String>,
}

impl WireError {
    /// Creates a wire error without a message.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: None,
        }
    }

    /// Attaches a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns the code with any `:suffix` removed (e.g.
    /// `ValidationException:http://internal/` becomes `ValidationException`).
    #[must_use]
    pub fn sanitized_code(&self) -> &str {
        let code = self.code.trim();
        code.split_once(':').map_or(code, |(head, _)| head)
    }
}

/// Deserializes one modeled error type from an error response.
pub type ErrorDeserializer<E> =
    Arc<dyn Fn(&ResponseParts, &Bytes) -> Result<E, ClientError> + Send + Sync>;

/// Maps wire error ids to modeled error deserializers.
///
/// Lookup tries the qualified id first, then the unqualified name. When two
/// namespaces register the same name, the unqualified lookup keeps the first.
pub struct TypeRegistry<E> {
    by_id: HashMap<ShapeId, ErrorDeserializer<E>>,
    by_name: HashMap<String, ShapeId>,
}

impl<E> Default for TypeRegistry<E> {
    fn default() -> Self {
        Self {
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<E> Clone for TypeRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            by_id: self.by_id.clone(),
            by_name: self.by_name.clone(),
        }
    }
}

impl<E> TypeRegistry<E> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a deserializer for `shape_id`.
    pub fn register<F>(&mut self, shape_id: ShapeId, deserializer: F) -> &mut Self
    where
        F: Fn(&ResponseParts, &Bytes) -> Result<E, ClientError> + Send + Sync + 'static,
    {
        self.by_name
            .entry(shape_id.name().to_string())
            .or_insert_with(|| shape_id.clone());
        self.by_id.insert(shape_id, Arc::new(deserializer));
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, shape_id: ShapeId, deserializer: F) -> Self
    where
        F: Fn(&ResponseParts, &Bytes) -> Result<E, ClientError> + Send + Sync + 'static,
    {
        self.register(shape_id, deserializer);
        self
    }

    /// Returns the number of registered error types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Finds the registered shape for a wire error code.
    #[must_use]
    pub fn resolve(&self, code: &str) -> Option<(&ShapeId, &ErrorDeserializer<E>)> {
        if let Ok(qualified) = code.parse::<ShapeId>() {
            if let Some(found) = self.by_id.get_key_value(&qualified) {
                return Some(found);
            }
            return self.resolve_name(qualified.name());
        }
        self.resolve_name(code)
    }

    fn resolve_name(&self, name: &str) -> Option<(&ShapeId, &ErrorDeserializer<E>)> {
        self.by_name
            .get(name)
            .and_then(|id| self.by_id.get_key_value(id))
    }

    /// Turns an error response into the operation's error.
    ///
    /// A registered code yields [`SdkError::Service`]; anything else yields
    /// [`SdkError::UnknownService`]. A registered deserializer that fails
    /// yields [`SdkError::Client`].
    pub fn deserialize(&self, wire: &WireError, parts: &ResponseParts, body: &Bytes) -> SdkError<E> {
        let code = wire.sanitized_code();
        let mut metadata = ErrorMetadata::new(parts.status)
            .with_headers(parts.headers.clone())
            .with_code(code);
        if let Some(message) = &wire.message {
            metadata = metadata.with_message(message.clone());
        }

        match self.resolve(code) {
            Some((shape_id, deserializer)) => {
                tracing::debug!(error_shape = %shape_id, "matched modeled error");
                match deserializer(parts, body) {
                    Ok(err) => SdkError::service(err, metadata),
                    Err(client) => SdkError::Client(client),
                }
            }
            None => {
                tracing::debug!(error_code = code, "no modeled error registered for code");
                SdkError::UnknownService(UnknownServiceError::new(metadata))
            }
        }
    }
}

impl<E> fmt::Debug for TypeRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.by_id.keys().map(ToString::to_string).collect();
        ids.sort();
        f.debug_struct("TypeRegistry").field("errors", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[derive(Debug, PartialEq)]
    enum WidgetError {
        NotFound,
        Legacy,
    }

    fn parts(status: StatusCode) -> ResponseParts {
        http::Response::builder()
            .status(status)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn registry() -> TypeRegistry<WidgetError> {
        TypeRegistry::new()
            .with(ShapeId::new("example.widgets", "WidgetNotFound"), |_, _| {
                Ok(WidgetError::NotFound)
            })
            .with(ShapeId::new("example.legacy", "WidgetNotFound"), |_, _| {
                Ok(WidgetError::Legacy)
            })
    }

    #[test]
    fn test_shape_id_parse() {
        let id: ShapeId = "example.widgets#Widget".parse().unwrap();
        assert_eq!(id.namespace(), "example.widgets");
        assert_eq!(id.name(), "Widget");
        assert_eq!(id.to_string(), "example.widgets#Widget");
        assert!("Widget".parse::<ShapeId>().is_err());
        assert!("#Widget".parse::<ShapeId>().is_err());
    }

    #[test]
    fn test_qualified_lookup_wins() {
        let registry = registry();
        let (id, _) = registry.resolve("example.legacy#WidgetNotFound").unwrap();
        assert_eq!(id.namespace(), "example.legacy");
    }

    #[test]
    fn test_unqualified_lookup_keeps_first_registration() {
        let registry = registry();
        let (id, _) = registry.resolve("WidgetNotFound").unwrap();
        assert_eq!(id.namespace(), "example.widgets");
    }

    #[test]
    fn test_qualified_miss_falls_back_to_name() {
        let registry = registry();
        let (id, _) = registry.resolve("other.ns#WidgetNotFound").unwrap();
        assert_eq!(id.namespace(), "example.widgets");
    }

    #[test]
    fn test_deserialize_known_and_unknown() {
        let registry = registry();
        let response = parts(StatusCode::NOT_FOUND);

        let known = registry.deserialize(
            &WireError::new("WidgetNotFound:http://internal.example/").with_message("gone"),
            &response,
            &Bytes::new(),
        );
        assert_eq!(known.as_service_error(), Some(&WidgetError::NotFound));
        assert_eq!(known.metadata().unwrap().message(), Some("gone"));

        let unknown = registry.deserialize(&WireError::new("Mystery"), &response, &Bytes::new());
        match unknown {
            SdkError::UnknownService(err) => {
                assert_eq!(err.metadata().code(), Some("Mystery"));
                assert_eq!(err.metadata().status(), StatusCode::NOT_FOUND);
            }
            other => panic!("expected unknown service error, got {}", other.kind()),
        }
    }

    #[test]
    fn test_failing_deserializer_is_client_error() {
        let registry: TypeRegistry<WidgetError> = TypeRegistry::new().with(
            ShapeId::new("example.widgets", "Broken"),
            |_, _| Err(ClientError::Deserialization { message: "bad payload".into(), source: None }),
        );
        let err = registry.deserialize(
            &WireError::new("Broken"),
            &parts(StatusCode::BAD_REQUEST),
            &Bytes::new(),
        );
        assert!(err.is_client_error());
    }
}
