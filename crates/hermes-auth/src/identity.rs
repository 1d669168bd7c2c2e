//! Identity resolvers.

use crate::properties::{SCHEME_ID, SIGNING_REGION};
use chrono::Utc;
use hermes_core::{Attributes, BoxFuture, Identity};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Produces the identity a scheme signs with.
///
/// Resolvers are registered per scheme id. Fetching credentials (files,
/// environment, metadata services) is the resolver's business; caching is too,
/// see [`CachingIdentityResolver`].
pub trait IdentityResolver: Send + Sync + fmt::Debug + 'static {
    /// Resolves an identity. `properties` carries hints such as
    /// [`SCHEME_ID`](crate::properties::SCHEME_ID) and
    /// [`SIGNING_REGION`](crate::properties::SIGNING_REGION).
    fn resolve_identity<'a>(&'a self, properties: &'a Attributes) -> BoxFuture<'a, anyhow::Result<Identity>>;
}

/// Always returns the same identity.
#[derive(Debug, Clone)]
pub struct StaticIdentityResolver {
    identity: Identity,
}

impl StaticIdentityResolver {
    /// Creates a resolver for `identity`.
    pub fn new(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn resolve_identity<'a>(&'a self, _properties: &'a Attributes) -> BoxFuture<'a, anyhow::Result<Identity>> {
        Box::pin(async move { Ok(self.identity.clone()) })
    }
}

/// Wraps a resolver and reuses its identities until shortly before they
/// expire.
///
/// One identity is cached per scope: the [`SCHEME_ID`] and [`SIGNING_REGION`]
/// properties of the request. A resolver shared across regions therefore
/// never hands one region's credentials to another. Identities without an
/// expiration are cached forever. Concurrent callers wait on one refresh
/// instead of each calling the inner resolver.
pub struct CachingIdentityResolver<R> {
    inner: R,
    refresh_buffer: chrono::Duration,
    cached: Mutex<HashMap<CacheScope, Identity>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheScope {
    scheme_id: Option<String>,
    region: Option<String>,
}

impl CacheScope {
    fn of(properties: &Attributes) -> Self {
        Self {
            scheme_id: properties.get(&SCHEME_ID).cloned(),
            region: properties.get(&SIGNING_REGION).cloned(),
        }
    }
}

impl<R: IdentityResolver> CachingIdentityResolver<R> {
    /// Default seconds before expiry at which a cached identity is refreshed.
    pub const DEFAULT_REFRESH_BUFFER_SECS: i64 = 300;

    /// Wraps `inner` with the default refresh buffer.
    pub fn new(inner: R) -> Self {
        Self::with_refresh_buffer(inner, chrono::Duration::seconds(Self::DEFAULT_REFRESH_BUFFER_SECS))
    }

    /// Wraps `inner`, refreshing `refresh_buffer` before expiry.
    pub fn with_refresh_buffer(inner: R, refresh_buffer: chrono::Duration) -> Self {
        Self {
            inner,
            refresh_buffer,
            cached: Mutex::new(HashMap::new()),
        }
    }

    /// Drops every cached identity.
    pub async fn invalidate(&self) {
        self.cached.lock().await.clear();
    }
}

impl<R: IdentityResolver> fmt::Debug for CachingIdentityResolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingIdentityResolver")
            .field("inner", &self.inner)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish_non_exhaustive()
    }
}

impl<R: IdentityResolver> IdentityResolver for CachingIdentityResolver<R> {
    fn resolve_identity<'a>(&'a self, properties: &'a Attributes) -> BoxFuture<'a, anyhow::Result<Identity>> {
        Box::pin(async move {
            let scope = CacheScope::of(properties);
            let mut cached = self.cached.lock().await;
            if let Some(identity) = cached.get(&scope) {
                if !identity.expires_within(Utc::now(), self.refresh_buffer) {
                    return Ok(identity.clone());
                }
                tracing::debug!(
                    scheme_id = ?scope.scheme_id,
                    region = ?scope.region,
                    expiration = ?identity.expiration(),
                    "refreshing cached identity"
                );
            }
            let identity = self.inner.resolve_identity(properties).await?;
            cached.insert(scope, identity.clone());
            Ok(identity)
        })
    }
}

/// Identity resolvers keyed by scheme id.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolvers {
    resolvers: IndexMap<String, Arc<dyn IdentityResolver>>,
}

impl IdentityResolvers {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver` for `scheme_id`, replacing any earlier one.
    pub fn insert(&mut self, scheme_id: impl Into<String>, resolver: Arc<dyn IdentityResolver>) {
        self.resolvers.insert(scheme_id.into(), resolver);
    }

    /// Returns the resolver for `scheme_id`.
    #[must_use]
    pub fn get(&self, scheme_id: &str) -> Option<&Arc<dyn IdentityResolver>> {
        self.resolvers.get(scheme_id)
    }

    /// Whether a resolver is registered for `scheme_id`.
    #[must_use]
    pub fn contains(&self, scheme_id: &str) -> bool {
        self.resolvers.contains_key(scheme_id)
    }

    /// Registered scheme ids in insertion order.
    pub fn scheme_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.resolvers.keys().map(String::as_str)
    }
}
