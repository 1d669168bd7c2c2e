//! Immutable operation descriptors.
//!
//! Generated glue builds one [`OperationDescriptor`] per operation and shares it
//! (behind an `Arc`) between every invocation. The runtime only reads it.

use crate::registry::{ShapeId, TypeRegistry};
use std::sync::Arc;

/// Static facts about the service an operation belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSchema {
    id: ShapeId,
    version: String,
    signing_name: Option<String>,
}

impl ServiceSchema {
    /// Creates a service schema.
    pub fn new(id: ShapeId, version: impl Into<String>) -> Self {
        Self {
            id,
            version: version.into(),
            signing_name: None,
        }
    }

    /// Sets the name used in signing scopes (defaults to the lowercased service name).
    #[must_use]
    pub fn with_signing_name(mut self, signing_name: impl Into<String>) -> Self {
        self.signing_name = Some(signing_name.into());
        self
    }

    /// Returns the service shape id.
    #[must_use]
    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// Returns the API version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the signing name.
    #[must_use]
    pub fn signing_name(&self) -> String {
        self.signing_name
            .clone()
            .unwrap_or_else(|| self.id.name().to_ascii_lowercase())
    }
}

/// Describes one operation: its shapes, modeled errors and auth candidates.
pub struct OperationDescriptor<E> {
    service: Arc<ServiceSchema>,
    id: ShapeId,
    input: ShapeId,
    output: ShapeId,
    errors: TypeRegistry<E>,
    auth_schemes: Vec<String>,
}

impl<E> OperationDescriptor<E> {
    /// Creates a descriptor with no modeled errors and no auth candidates.
    pub fn new(service: Arc<ServiceSchema>, id: ShapeId, input: ShapeId, output: ShapeId) -> Self {
        Self {
            service,
            id,
            input,
            output,
            errors: TypeRegistry::new(),
            auth_schemes: Vec::new(),
        }
    }

    /// Sets the modeled error registry.
    #[must_use]
    pub fn with_errors(mut self, errors: TypeRegistry<E>) -> Self {
        self.errors = errors;
        self
    }

    /// Sets the ordered auth scheme candidates.
    #[must_use]
    pub fn with_auth_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auth_schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the service schema.
    #[must_use]
    pub fn service(&self) -> &ServiceSchema {
        &self.service
    }

    /// Returns the operation shape id.
    #[must_use]
    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Returns the input shape id.
    #[must_use]
    pub fn input(&self) -> &ShapeId {
        &self.input
    }

    /// Returns the output shape id.
    #[must_use]
    pub fn output(&self) -> &ShapeId {
        &self.output
    }

    /// Returns the modeled error registry.
    #[must_use]
    pub fn errors(&self) -> &TypeRegistry<E> {
        &self.errors
    }

    /// Returns the auth scheme candidates in model order.
    #[must_use]
    pub fn auth_schemes(&self) -> &[String] {
        &self.auth_schemes
    }
}

impl<E> std::fmt::Debug for OperationDescriptor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("service", &self.service.id().to_string())
            .field("id", &self.id.to_string())
            .field("input", &self.input.to_string())
            .field("output", &self.output.to_string())
            .field("errors", &self.errors)
            .field("auth_schemes", &self.auth_schemes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_accessors() {
        let service = Arc::new(ServiceSchema::new(
            ShapeId::new("example.widgets", "WidgetService"),
            "2024-01-01",
        ));
        let descriptor: OperationDescriptor<()> = OperationDescriptor::new(
            service,
            ShapeId::new("example.widgets", "GetWidget"),
            ShapeId::new("example.widgets", "GetWidgetInput"),
            ShapeId::new("example.widgets", "GetWidgetOutput"),
        )
        .with_auth_schemes(["aws.auth#sigv4", "smithy.api#noAuth"]);

        assert_eq!(descriptor.name(), "GetWidget");
        assert_eq!(descriptor.service().signing_name(), "widgetservice");
        assert_eq!(descriptor.auth_schemes().len(), 2);
        assert!(descriptor.errors().is_empty());
    }

    #[test]
    fn test_explicit_signing_name() {
        let service = ServiceSchema::new(ShapeId::new("example", "Svc"), "1").with_signing_name("widgets");
        assert_eq!(service.signing_name(), "widgets");
        assert_eq!(service.version(), "1");
    }
}
