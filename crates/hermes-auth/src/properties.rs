//! Attribute keys for identity and signing properties.
//!
//! Identity properties are what a resolver receives; signing properties are
//! what a scheme's `customize_signing_properties` hook produces for its
//! signer.

use chrono::{DateTime, Utc};
use hermes_core::AttributeKey;

/// Context key: the service's signing name, set by the runtime from the
/// operation's service schema.
pub const SERVICE_SIGNING_NAME: AttributeKey<String> = AttributeKey::new("service_signing_name");

/// Identity property: the scheme being resolved.
pub const SCHEME_ID: AttributeKey<String> = AttributeKey::new("scheme_id");

/// Signing property: the service name in the credential scope.
pub const SIGNING_NAME: AttributeKey<String> = AttributeKey::new("signing_name");

/// Signing property (also an identity property): the region in the
/// credential scope.
pub const SIGNING_REGION: AttributeKey<String> = AttributeKey::new("signing_region");

/// Signing property: the signing timestamp, clock skew already applied.
pub const SIGNING_TIME: AttributeKey<DateTime<Utc>> = AttributeKey::new("signing_time");

/// Signing property: sign `UNSIGNED-PAYLOAD` instead of the body hash.
pub const UNSIGNED_PAYLOAD: AttributeKey<bool> = AttributeKey::new("unsigned_payload");

/// Signing property: URI-encode path segments a second time.
pub const DOUBLE_URI_ENCODE: AttributeKey<bool> = AttributeKey::new("double_uri_encode");
