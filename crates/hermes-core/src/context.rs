//! Per-invocation context.
//!
//! A [`Context`] is created for every operation call and threaded by `&mut`
//! through every middleware of every attempt. It wraps an [`Attributes`] bag and
//! adds typed accessors for the properties the runtime itself reads and writes.
//! A context is never shared between concurrent invocations.

use crate::attributes::{AttributeKey, Attributes};
use crate::http::Endpoint;
use crate::identity::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A unique identifier for each invocation, using UUID v7.
///
/// Sent to the service in the `amz-sdk-invocation-id` header and recorded on
/// the operation span, so every attempt of one call can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Creates a new time-ordered invocation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produces idempotency tokens for operations that declare one.
pub trait IdempotencyTokenGenerator: Send + Sync + 'static {
    /// Returns a fresh token.
    fn generate(&self) -> String;
}

/// Generates random UUID v4 tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenGenerator;

impl IdempotencyTokenGenerator for UuidTokenGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Checksum algorithms a request may ask the service to validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChecksumAlgorithm {
    /// CRC32.
    Crc32,
    /// CRC32C.
    Crc32c,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
}

impl ChecksumAlgorithm {
    /// Returns the wire name of the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crc32 => "CRC32",
            Self::Crc32c => "CRC32C",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }
}

/// Identifies the operation for logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TelemetryScope {
    /// Service name.
    pub service: String,
    /// Operation name.
    pub operation: String,
}

impl TelemetryScope {
    /// Creates a scope.
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
        }
    }
}

/// The attempt currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptInfo {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Maximum attempts this invocation may make.
    pub max_attempts: u32,
}

/// Well-known context keys.
pub mod keys {
    use super::{
        AttemptInfo, ChecksumAlgorithm, IdempotencyTokenGenerator, TelemetryScope,
    };
    use crate::attributes::{AttributeKey, Attributes};
    use crate::http::Endpoint;
    use crate::identity::Identity;
    use chrono::{DateTime, Utc};
    use std::sync::Arc;

    /// Idempotency token generator.
    pub const IDEMPOTENCY_TOKEN_GENERATOR: AttributeKey<Arc<dyn IdempotencyTokenGenerator>> =
        AttributeKey::new("idempotency_token_generator");
    /// Normalized auth scheme preference list.
    pub const AUTH_SCHEME_PREFERENCE: AttributeKey<Vec<String>> =
        AttributeKey::new("auth_scheme_preference");
    /// Requested checksum algorithm.
    pub const CHECKSUM_ALGORITHM: AttributeKey<ChecksumAlgorithm> =
        AttributeKey::new("checksum_algorithm");
    /// Service and operation names.
    pub const TELEMETRY_SCOPE: AttributeKey<TelemetryScope> = AttributeKey::new("telemetry_scope");
    /// Identity resolved for the current attempt.
    pub const RESOLVED_IDENTITY: AttributeKey<Identity> = AttributeKey::new("resolved_identity");
    /// Signing properties produced by the selected auth scheme.
    pub const SIGNING_PROPERTIES: AttributeKey<Attributes> = AttributeKey::new("signing_properties");
    /// Id of the auth scheme selected for the current attempt.
    pub const SELECTED_AUTH_SCHEME: AttributeKey<String> = AttributeKey::new("selected_auth_scheme");
    /// Current attempt number and attempt limit.
    pub const ATTEMPT: AttributeKey<AttemptInfo> = AttributeKey::new("attempt");
    /// Endpoint requests are sent to.
    pub const ENDPOINT: AttributeKey<Endpoint> = AttributeKey::new("endpoint");
    /// Region requests are signed for.
    pub const REGION: AttributeKey<String> = AttributeKey::new("region");
    /// Fixed wall-clock time for signing; the system clock is used otherwise.
    pub const REQUEST_TIME: AttributeKey<DateTime<Utc>> = AttributeKey::new("request_time");
    /// Estimated offset of the server clock from the local clock.
    pub const CLOCK_SKEW: AttributeKey<chrono::Duration> = AttributeKey::new("clock_skew");
}

/// Parses a comma-separated auth scheme preference.
///
/// Entries are trimmed and empty entries dropped. Returns `None` when nothing
/// is left, which means "no preference".
///
/// ```
/// use hermes_core::normalize_auth_scheme_preference;
///
/// assert_eq!(
///     normalize_auth_scheme_preference(" sigv4 , bearer ,,sigv4a "),
///     Some(vec!["sigv4".to_string(), "bearer".to_string(), "sigv4a".to_string()])
/// );
/// assert_eq!(normalize_auth_scheme_preference(","), None);
/// ```
#[must_use]
pub fn normalize_auth_scheme_preference(value: &str) -> Option<Vec<String>> {
    let entries: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();
    (!entries.is_empty()).then_some(entries)
}

/// Mutable state for one operation invocation.
pub struct Context {
    invocation_id: InvocationId,
    started_at: Instant,
    attributes: Attributes,
}

impl Context {
    /// Creates an empty context with a fresh invocation id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            invocation_id: InvocationId::new(),
            started_at: Instant::now(),
            attributes: Attributes::new(),
        }
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Returns the invocation id.
    #[must_use]
    pub const fn invocation_id(&self) -> InvocationId {
        self.invocation_id
    }

    /// Returns the time since the invocation started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the underlying attribute bag.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the underlying attribute bag mutably.
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &AttributeKey<T>) -> Option<&T> {
        self.attributes.get(key)
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &AttributeKey<T>, value: T) -> Option<T> {
        self.attributes.set(key, value)
    }

    /// Removes the value stored under `key`.
    pub fn remove<T: Send + Sync + 'static>(&mut self, key: &AttributeKey<T>) -> Option<T> {
        self.attributes.remove(key)
    }

    /// Returns the idempotency token generator.
    #[must_use]
    pub fn idempotency_token_generator(&self) -> Option<&Arc<dyn IdempotencyTokenGenerator>> {
        self.get(&keys::IDEMPOTENCY_TOKEN_GENERATOR)
    }

    /// Sets the idempotency token generator.
    pub fn set_idempotency_token_generator(&mut self, generator: Arc<dyn IdempotencyTokenGenerator>) {
        self.set(&keys::IDEMPOTENCY_TOKEN_GENERATOR, generator);
    }

    /// Returns the auth scheme preference list.
    #[must_use]
    pub fn auth_scheme_preference(&self) -> Option<&[String]> {
        self.get(&keys::AUTH_SCHEME_PREFERENCE).map(Vec::as_slice)
    }

    /// Sets the auth scheme preference from a comma-separated string.
    ///
    /// An empty or all-blank value clears the preference.
    pub fn set_auth_scheme_preference(&mut self, value: &str) {
        match normalize_auth_scheme_preference(value) {
            Some(list) => {
                self.set(&keys::AUTH_SCHEME_PREFERENCE, list);
            }
            None => {
                self.remove(&keys::AUTH_SCHEME_PREFERENCE);
            }
        }
    }

    /// Returns the requested checksum algorithm.
    #[must_use]
    pub fn checksum_algorithm(&self) -> Option<ChecksumAlgorithm> {
        self.get(&keys::CHECKSUM_ALGORITHM).copied()
    }

    /// Sets the requested checksum algorithm.
    pub fn set_checksum_algorithm(&mut self, algorithm: ChecksumAlgorithm) {
        self.set(&keys::CHECKSUM_ALGORITHM, algorithm);
    }

    /// Returns the telemetry scope.
    #[must_use]
    pub fn telemetry_scope(&self) -> Option<&TelemetryScope> {
        self.get(&keys::TELEMETRY_SCOPE)
    }

    /// Sets the telemetry scope.
    pub fn set_telemetry_scope(&mut self, scope: TelemetryScope) {
        self.set(&keys::TELEMETRY_SCOPE, scope);
    }

    /// Returns the identity resolved for the current attempt.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.get(&keys::RESOLVED_IDENTITY)
    }

    /// Sets the resolved identity.
    pub fn set_identity(&mut self, identity: Identity) {
        self.set(&keys::RESOLVED_IDENTITY, identity);
    }

    /// Returns the signing properties.
    #[must_use]
    pub fn signing_properties(&self) -> Option<&Attributes> {
        self.get(&keys::SIGNING_PROPERTIES)
    }

    /// Sets the signing properties.
    pub fn set_signing_properties(&mut self, properties: Attributes) {
        self.set(&keys::SIGNING_PROPERTIES, properties);
    }

    /// Returns the id of the selected auth scheme.
    #[must_use]
    pub fn selected_auth_scheme(&self) -> Option<&str> {
        self.get(&keys::SELECTED_AUTH_SCHEME).map(String::as_str)
    }

    /// Records the selected auth scheme.
    pub fn set_selected_auth_scheme(&mut self, scheme_id: impl Into<String>) {
        self.set(&keys::SELECTED_AUTH_SCHEME, scheme_id.into());
    }

    /// Returns the current attempt.
    #[must_use]
    pub fn attempt(&self) -> Option<AttemptInfo> {
        self.get(&keys::ATTEMPT).copied()
    }

    /// Records the current attempt.
    pub fn set_attempt(&mut self, attempt: u32, max_attempts: u32) {
        self.set(&keys::ATTEMPT, AttemptInfo { attempt, max_attempts });
    }

    /// Returns the endpoint.
    #[must_use]
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.get(&keys::ENDPOINT)
    }

    /// Sets the endpoint.
    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.set(&keys::ENDPOINT, endpoint);
    }

    /// Returns the region.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.get(&keys::REGION).map(String::as_str)
    }

    /// Sets the region.
    pub fn set_region(&mut self, region: impl Into<String>) {
        self.set(&keys::REGION, region.into());
    }

    /// Returns the current time for signing, corrected by any known clock skew.
    #[must_use]
    pub fn request_time(&self) -> DateTime<Utc> {
        let now = self.get(&keys::REQUEST_TIME).copied().unwrap_or_else(Utc::now);
        match self.get(&keys::CLOCK_SKEW) {
            Some(skew) => now + *skew,
            None => now,
        }
    }

    /// Pins the wall-clock time used for signing.
    pub fn set_request_time(&mut self, time: DateTime<Utc>) {
        self.set(&keys::REQUEST_TIME, time);
    }

    /// Records the estimated server clock offset.
    pub fn set_clock_skew(&mut self, skew: chrono::Duration) {
        self.set(&keys::CLOCK_SKEW, skew);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("invocation_id", &self.invocation_id)
            .field("elapsed", &self.started_at.elapsed())
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Accumulates attributes, then yields a [`Context`].
#[derive(Default)]
pub struct ContextBuilder {
    invocation_id: Option<InvocationId>,
    attributes: Attributes,
}

impl ContextBuilder {
    /// Uses a fixed invocation id.
    #[must_use]
    pub fn invocation_id(mut self, id: InvocationId) -> Self {
        self.invocation_id = Some(id);
        self
    }

    /// Stores an arbitrary attribute.
    #[must_use]
    pub fn attribute<T: Send + Sync + 'static>(mut self, key: &AttributeKey<T>, value: T) -> Self {
        self.attributes.set(key, value);
        self
    }

    /// Sets the idempotency token generator.
    #[must_use]
    pub fn idempotency_token_generator(self, generator: Arc<dyn IdempotencyTokenGenerator>) -> Self {
        self.attribute(&keys::IDEMPOTENCY_TOKEN_GENERATOR, generator)
    }

    /// Sets the auth scheme preference from a comma-separated string.
    ///
    /// An empty or all-blank value clears any earlier preference.
    #[must_use]
    pub fn auth_scheme_preference(mut self, value: &str) -> Self {
        match normalize_auth_scheme_preference(value) {
            Some(list) => {
                self.attributes.set(&keys::AUTH_SCHEME_PREFERENCE, list);
            }
            None => {
                self.attributes.remove(&keys::AUTH_SCHEME_PREFERENCE);
            }
        }
        self
    }

    /// Sets the checksum algorithm.
    #[must_use]
    pub fn checksum_algorithm(self, algorithm: ChecksumAlgorithm) -> Self {
        self.attribute(&keys::CHECKSUM_ALGORITHM, algorithm)
    }

    /// Sets the telemetry scope.
    #[must_use]
    pub fn telemetry_scope(self, scope: TelemetryScope) -> Self {
        self.attribute(&keys::TELEMETRY_SCOPE, scope)
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn endpoint(self, endpoint: Endpoint) -> Self {
        self.attribute(&keys::ENDPOINT, endpoint)
    }

    /// Sets the region.
    #[must_use]
    pub fn region(self, region: impl Into<String>) -> Self {
        self.attribute(&keys::REGION, region.into())
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> Context {
        Context {
            invocation_id: self.invocation_id.unwrap_or_default(),
            started_at: Instant::now(),
            attributes: self.attributes,
        }
    }
}

impl fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("invocation_id", &self.invocation_id)
            .field("attributes", &self.attributes)
            .finish()
    }
}
