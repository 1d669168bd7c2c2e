//! Signature Version 4 request signing.
//!
//! Builds the canonical request and string to sign, then hands hashing and
//! HMAC to a [`SignatureCalculator`]. The calculator is the only piece that
//! touches cryptography.
//!
//! Headers set on the request:
//!
//! | Header | Value |
//! |--------|-------|
//! | `x-amz-date` | signing time, `YYYYMMDD'T'HHMMSS'Z'` |
//! | `x-amz-content-sha256` | payload hash or `UNSIGNED-PAYLOAD` |
//! | `x-amz-security-token` | session token, when present |
//! | `authorization` | `AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...` |

use crate::properties::{DOUBLE_URI_ENCODE, SIGNING_NAME, SIGNING_REGION, SIGNING_TIME, UNSIGNED_PAYLOAD};
use crate::signer::{expect_identity, Signer};
use chrono::{DateTime, Utc};
use hermes_core::{Attributes, AuthError, Credentials, Identity, RequestBuilder};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Signing algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash placeholder for unsigned bodies.
pub const UNSIGNED_PAYLOAD_HASH: &str = "UNSIGNED-PAYLOAD";

/// `x-amz-date` header.
pub const X_AMZ_DATE: &str = "x-amz-date";
/// `x-amz-content-sha256` header.
pub const X_AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";
/// `x-amz-security-token` header.
pub const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

const UNSIGNED_HEADERS: &[&str] = &[
    "authorization",
    "user-agent",
    "x-amzn-trace-id",
    "expect",
    "transfer-encoding",
];

/// The credential scope: `date/region/service/aws4_request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningScope {
    /// `YYYYMMDD`.
    pub date: String,
    /// Signing region.
    pub region: String,
    /// Signing name.
    pub service: String,
}

impl fmt::Display for SigningScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/aws4_request", self.date, self.region, self.service)
    }
}

/// The cryptographic collaborator for SigV4.
pub trait SignatureCalculator: Send + Sync + fmt::Debug + 'static {
    /// Lowercase hex SHA-256 of `payload`.
    fn hash_payload(&self, payload: &[u8]) -> String;

    /// Lowercase hex signature of `string_to_sign` under the key derived from
    /// `credentials` and `scope`.
    fn signature(&self, credentials: &Credentials, scope: &SigningScope, string_to_sign: &str) -> anyhow::Result<String>;
}

/// Output of the canonicalization phase, useful for debugging mismatches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// The canonical request text.
    pub text: String,
    /// `;`-separated signed header names.
    pub signed_headers: String,
}

/// SigV4 signer.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    calculator: Arc<dyn SignatureCalculator>,
}

impl SigV4Signer {
    /// Creates a signer using `calculator` for hashing and HMAC.
    pub fn new(calculator: Arc<dyn SignatureCalculator>) -> Self {
        Self { calculator }
    }
}

/// Formats `time` as `YYYYMMDD'T'HHMMSS'Z'`.
#[must_use]
pub fn format_amz_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Builds the canonical request for `request` (which must already carry the
/// `host`-bearing authority and any `x-amz-*` headers to sign).
pub fn canonical_request(request: &RequestBuilder, payload_hash: &str, double_uri_encode: bool) -> Result<CanonicalRequest, AuthError> {
    let host = request
        .authority()
        .ok_or_else(|| AuthError::signing("request has no host; apply an endpoint before signing"))?;

    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    headers.insert("host".to_string(), vec![host.as_str().to_string()]);
    for (name, value) in request.headers() {
        if UNSIGNED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        let value = value
            .to_str()
            .map_err(|_| AuthError::signing(format!("header {name} is not visible ASCII")))?;
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(normalize_header_value(value));
    }

    let canonical_headers: String = headers
        .iter()
        .map(|(name, values)| format!("{name}:{}\n", values.join(",")))
        .collect();
    let signed_headers = headers.keys().map(String::as_str).collect::<Vec<_>>().join(";");

    let text = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method(),
        canonical_uri(request.path(), double_uri_encode),
        canonical_query(request.query()),
        canonical_headers,
        signed_headers,
        payload_hash
    );
    Ok(CanonicalRequest { text, signed_headers })
}

fn canonical_uri(path: &str, double_uri_encode: bool) -> String {
    if !double_uri_encode {
        return path.to_string();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(query: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = query
        .iter()
        .map(|(name, value)| (urlencoding::encode(name).into_owned(), urlencoding::encode(value).into_owned()))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn insert_header(request: &mut RequestBuilder, name: &'static str, value: &str, sensitive: bool) -> Result<(), AuthError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| AuthError::signing(format!("invalid value for {name}")))?;
    value.set_sensitive(sensitive);
    request
        .headers_mut()
        .insert(HeaderName::from_static(name), value);
    Ok(())
}

impl Signer for SigV4Signer {
    fn sign(&self, request: &mut RequestBuilder, identity: &Identity, properties: &Attributes) -> Result<(), AuthError> {
        let credentials = expect_identity::<Credentials>(identity)?;
        let service = properties
            .get(&SIGNING_NAME)
            .ok_or(AuthError::MissingSigningProperty(SIGNING_NAME.name()))?;
        let region = properties
            .get(&SIGNING_REGION)
            .ok_or(AuthError::MissingSigningProperty(SIGNING_REGION.name()))?;
        let time = properties.get(&SIGNING_TIME).copied().unwrap_or_else(Utc::now);
        let unsigned = properties.get(&UNSIGNED_PAYLOAD).copied().unwrap_or(false);
        let double_encode = properties.get(&DOUBLE_URI_ENCODE).copied().unwrap_or(true);

        let amz_date = format_amz_date(time);
        let payload_hash = if unsigned {
            UNSIGNED_PAYLOAD_HASH.to_string()
        } else {
            self.calculator.hash_payload(request.body())
        };

        request.headers_mut().remove(AUTHORIZATION);
        insert_header(request, X_AMZ_DATE, &amz_date, false)?;
        insert_header(request, X_AMZ_CONTENT_SHA256, &payload_hash, false)?;
        if let Some(token) = credentials.session_token() {
            insert_header(request, X_AMZ_SECURITY_TOKEN, token, true)?;
        }

        let canonical = canonical_request(request, &payload_hash, double_encode)?;
        let scope = SigningScope {
            date: time.format("%Y%m%d").to_string(),
            region: region.clone(),
            service: service.clone(),
        };
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            self.calculator.hash_payload(canonical.text.as_bytes())
        );
        let signature = self
            .calculator
            .signature(credentials, &scope, &string_to_sign)
            .map_err(|source| AuthError::Signing {
                message: "signature calculation failed".to_string(),
                source: Some(source),
            })?;

        tracing::trace!(canonical_request = %canonical.text, "computed sigv4 canonical request");

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            credentials.access_key_id(),
            canonical.signed_headers
        );
        let mut value = HeaderValue::from_str(&authorization)
            .map_err(|_| AuthError::signing("authorization header is not a valid header value"))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}
