//! Signers.

use hermes_core::{Attributes, AuthError, BearerToken, Identity, RequestBuilder};
use http::header::{HeaderValue, AUTHORIZATION};
use std::any::type_name;
use std::fmt;

/// Attaches auth material to a request.
///
/// Signing runs once per attempt, after the request is fully built, and never
/// retries on its own.
pub trait Signer: Send + Sync + fmt::Debug + 'static {
    /// Signs `request` in place.
    fn sign(&self, request: &mut RequestBuilder, identity: &Identity, properties: &Attributes) -> Result<(), AuthError>;
}

/// Returns the identity data a signer needs, or a type-mismatch error.
pub fn expect_identity<'a, T: 'static>(identity: &'a Identity) -> Result<&'a T, AuthError> {
    identity.data::<T>().ok_or_else(|| AuthError::IdentityTypeMismatch {
        expected: type_name::<T>(),
        actual: identity.type_name(),
    })
}

/// `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerTokenSigner;

impl Signer for BearerTokenSigner {
    fn sign(&self, request: &mut RequestBuilder, identity: &Identity, _properties: &Attributes) -> Result<(), AuthError> {
        let token = expect_identity::<BearerToken>(identity)?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.token()))
            .map_err(|_| AuthError::signing("bearer token is not a valid header value"))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// Leaves the request untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousSigner;

impl Signer for AnonymousSigner {
    fn sign(&self, _request: &mut RequestBuilder, _identity: &Identity, _properties: &Attributes) -> Result<(), AuthError> {
        Ok(())
    }
}
