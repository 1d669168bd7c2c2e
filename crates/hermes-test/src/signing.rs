//! A deterministic SigV4 calculator.

use hermes_auth::{SignatureCalculator, SigningScope};
use hermes_core::Credentials;

/// Produces predictable hashes and signatures so tests can assert on
/// `Authorization` headers without real cryptography.
///
/// The payload hash is `hash-{len}`; the signature is
/// `sig-{access_key_id}-{region}-{service}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSignatureCalculator;

impl SignatureCalculator for FixedSignatureCalculator {
    fn hash_payload(&self, payload: &[u8]) -> String {
        format!("hash-{}", payload.len())
    }

    fn signature(&self, credentials: &Credentials, scope: &SigningScope, _string_to_sign: &str) -> anyhow::Result<String> {
        Ok(format!("sig-{}-{}-{}", credentials.access_key_id(), scope.region, scope.service))
    }
}
