//! Resolved identities used for signing.
//!
//! An [`Identity`] wraps whatever credential material an identity resolver
//! produced. Signers ask for the concrete type they understand with
//! [`Identity::data`]; a signer handed the wrong kind of identity gets `None`
//! and reports an auth error.

use chrono::{DateTime, Utc};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Type-erased identity with an optional expiration.
#[derive(Clone)]
pub struct Identity {
    data: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    debug: Arc<dyn Fn(&mut fmt::Formatter<'_>) -> fmt::Result + Send + Sync>,
    expiration: Option<DateTime<Utc>>,
}

impl Identity {
    /// Wraps identity data of any type.
    pub fn new<T>(data: T, expiration: Option<DateTime<Utc>>) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        let data = Arc::new(data);
        let for_debug = Arc::clone(&data);
        Self {
            data,
            type_name: type_name::<T>(),
            debug: Arc::new(move |f: &mut fmt::Formatter<'_>| fmt::Debug::fmt(&*for_debug, f)),
            expiration,
        }
    }

    /// Returns the identity data if it is of type `T`.
    #[must_use]
    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }

    /// Returns the Rust type name of the wrapped data.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns when this identity stops being valid.
    #[must_use]
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Returns `true` if the identity expires before `now + buffer`.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, buffer: chrono::Duration) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now + buffer)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Identity { data: ")?;
        (self.debug)(f)?;
        write!(f, ", expiration: {:?} }}", self.expiration)
    }
}

/// Access-key credentials for request signing.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiration,
        }
    }

    /// Returns the access key id.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Returns the secret access key.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Returns the session token, for temporary credentials.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Returns the credential expiration.
    #[must_use]
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }
}

// Secrets never reach logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl From<Credentials> for Identity {
    fn from(credentials: Credentials) -> Self {
        let expiration = credentials.expiration;
        Self::new(credentials, expiration)
    }
}

/// A bearer token for `Authorization: Bearer` auth.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    token: String,
    expiration: Option<DateTime<Utc>>,
}

impl BearerToken {
    /// Creates a token.
    pub fn new(token: impl Into<String>, expiration: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expiration,
        }
    }

    /// Returns the raw token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl From<BearerToken> for Identity {
    fn from(token: BearerToken) -> Self {
        let expiration = token.expiration;
        Self::new(token, expiration)
    }
}

/// The identity used by operations that do not authenticate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Anonymous;

impl From<Anonymous> for Identity {
    fn from(anonymous: Anonymous) -> Self {
        Self::new(anonymous, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_downcast() {
        let identity: Identity = Credentials::new("AKID", "secret", None, None).into();
        assert_eq!(identity.data::<Credentials>().unwrap().access_key_id(), "AKID");
        assert!(identity.data::<BearerToken>().is_none());
        assert!(identity.type_name().ends_with("Credentials"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let identity: Identity =
            Credentials::new("AKID", "very-secret", Some("SESSION123".to_string()), None).into();
        let rendered = format!("{identity:?}");
        assert!(rendered.contains("AKID"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("SESSION123"));

        let bearer = format!("{:?}", BearerToken::new("abc123", None));
        assert!(!bearer.contains("abc123"));
    }

    #[test]
    fn test_expires_within() {
        let now = Utc::now();
        let identity: Identity =
            BearerToken::new("t", Some(now + chrono::Duration::seconds(30))).into();
        assert!(identity.expires_within(now, chrono::Duration::minutes(1)));
        assert!(!identity.expires_within(now, chrono::Duration::seconds(10)));

        let forever: Identity = Anonymous.into();
        assert!(!forever.expires_within(now, chrono::Duration::days(365)));
    }
}
