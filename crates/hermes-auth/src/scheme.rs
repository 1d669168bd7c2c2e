//! Auth schemes.

use crate::properties::{SCHEME_ID, SERVICE_SIGNING_NAME, SIGNING_NAME, SIGNING_REGION, SIGNING_TIME};
use crate::signer::{AnonymousSigner, BearerTokenSigner, Signer};
use crate::sigv4::{SigV4Signer, SignatureCalculator};
use hermes_core::{Attributes, AuthError, Context};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// SigV4 scheme id.
pub const SIGV4_SCHEME_ID: &str = "aws.auth#sigv4";
/// HTTP bearer scheme id.
pub const HTTP_BEARER_SCHEME_ID: &str = "smithy.api#httpBearerAuth";
/// Anonymous scheme id.
pub const NO_AUTH_SCHEME_ID: &str = "smithy.api#noAuth";

/// Returns the part of a scheme id after `#` (the whole id if there is none).
#[must_use]
pub fn short_name(scheme_id: &str) -> &str {
    scheme_id.rsplit_once('#').map_or(scheme_id, |(_, name)| name)
}

/// A way of authenticating requests, identified by a stable scheme id.
pub trait AuthScheme: Send + Sync + fmt::Debug + 'static {
    /// The scheme id (e.g. `aws.auth#sigv4`).
    fn scheme_id(&self) -> &str;

    /// The signer for this scheme.
    fn signer(&self) -> &dyn Signer;

    /// Properties handed to the identity resolver.
    fn identity_properties(&self, ctx: &Context) -> Attributes {
        let mut properties = Attributes::new();
        properties.set(&SCHEME_ID, self.scheme_id().to_string());
        if let Some(region) = ctx.region() {
            properties.set(&SIGNING_REGION, region.to_string());
        }
        properties
    }

    /// Fills in the properties the signer reads.
    fn customize_signing_properties(&self, _ctx: &Context, _properties: &mut Attributes) -> Result<(), AuthError> {
        Ok(())
    }
}

/// `aws.auth#sigv4`.
#[derive(Debug, Clone)]
pub struct SigV4AuthScheme {
    signer: SigV4Signer,
}

impl SigV4AuthScheme {
    /// Creates the scheme around `calculator`.
    pub fn new(calculator: Arc<dyn SignatureCalculator>) -> Self {
        Self {
            signer: SigV4Signer::new(calculator),
        }
    }
}

impl AuthScheme for SigV4AuthScheme {
    fn scheme_id(&self) -> &str {
        SIGV4_SCHEME_ID
    }

    fn signer(&self) -> &dyn Signer {
        &self.signer
    }

    fn customize_signing_properties(&self, ctx: &Context, properties: &mut Attributes) -> Result<(), AuthError> {
        let name = ctx
            .get(&SERVICE_SIGNING_NAME)
            .ok_or(AuthError::MissingSigningProperty(SIGNING_NAME.name()))?;
        let region = ctx
            .region()
            .ok_or(AuthError::MissingSigningProperty(SIGNING_REGION.name()))?;
        properties.set(&SIGNING_NAME, name.clone());
        properties.set(&SIGNING_REGION, region.to_string());
        properties.set(&SIGNING_TIME, ctx.request_time());
        Ok(())
    }
}

/// `smithy.api#httpBearerAuth`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerAuthScheme;

impl AuthScheme for BearerAuthScheme {
    fn scheme_id(&self) -> &str {
        HTTP_BEARER_SCHEME_ID
    }

    fn signer(&self) -> &dyn Signer {
        &BearerTokenSigner
    }
}

/// `smithy.api#noAuth`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthScheme;

impl AuthScheme for NoAuthScheme {
    fn scheme_id(&self) -> &str {
        NO_AUTH_SCHEME_ID
    }

    fn signer(&self) -> &dyn Signer {
        &AnonymousSigner
    }
}

/// Auth schemes implemented by a client, keyed by scheme id.
#[derive(Debug, Clone, Default)]
pub struct AuthSchemes {
    schemes: IndexMap<String, Arc<dyn AuthScheme>>,
}

impl AuthSchemes {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `scheme` under its own id, replacing any earlier one.
    pub fn insert(&mut self, scheme: Arc<dyn AuthScheme>) {
        self.schemes.insert(scheme.scheme_id().to_string(), scheme);
    }

    /// Returns the scheme registered under `scheme_id`.
    #[must_use]
    pub fn get(&self, scheme_id: &str) -> Option<&Arc<dyn AuthScheme>> {
        self.schemes.get(scheme_id)
    }

    /// Registered scheme ids in insertion order.
    pub fn scheme_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.schemes.keys().map(String::as_str)
    }
}
