//! Client configuration.
//!
//! A [`ClientConfig`] is assembled once with [`ClientConfigBuilder`] and is
//! immutable afterwards; every invocation reads it through an `Arc`.
//!
//! ```ignore
//! use hermes_runtime::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .transport(my_transport)
//!     .endpoint_url("https://widgets.example.com")
//!     .region("eu-west-1")
//!     .auth_scheme_preference("httpBearerAuth")
//!     .build()?;
//!
//! assert_eq!(config.endpoint().host(), "widgets.example.com");
//! ```

use hermes_auth::{
    AuthScheme, AuthSchemes, BearerAuthScheme, IdentityResolver, IdentityResolvers, NoAuthScheme,
    StaticIdentityResolver, NO_AUTH_SCHEME_ID,
};
use hermes_config::HermesConfig;
use hermes_core::{Anonymous, ClientError, Endpoint, IdempotencyTokenGenerator, Transport, UuidTokenGenerator};
use hermes_retry::{ErrorClassifier, RetryConfig, RetryEngine, RetryStrategy};
use hermes_telemetry::ClockSkewStore;
use std::fmt;
use std::sync::Arc;

/// A configuration hook applied while the client is built.
///
/// Plugins run in registration order at the start of
/// [`ClientConfigBuilder::build`] and may change anything on the builder,
/// including registering further plugins (those run after the current batch).
pub type Plugin = Box<dyn FnOnce(ClientConfigBuilder) -> ClientConfigBuilder + Send>;

/// Immutable client configuration.
pub struct ClientConfig {
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    region: Option<String>,
    auth_scheme_preference: Option<String>,
    auth_schemes: AuthSchemes,
    identity_resolvers: IdentityResolvers,
    retry: RetryEngine,
    idempotency_token_generator: Arc<dyn IdempotencyTokenGenerator>,
    clock_skew: Arc<ClockSkewStore>,
}

impl ClientConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// The transport requests are sent through.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Where requests go.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The signing region, if any.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The raw auth scheme preference string, if any.
    #[must_use]
    pub fn auth_scheme_preference(&self) -> Option<&str> {
        self.auth_scheme_preference.as_deref()
    }

    /// Auth schemes this client implements.
    #[must_use]
    pub fn auth_schemes(&self) -> &AuthSchemes {
        &self.auth_schemes
    }

    /// Identity resolvers keyed by scheme id.
    #[must_use]
    pub fn identity_resolvers(&self) -> &IdentityResolvers {
        &self.identity_resolvers
    }

    /// The retry engine shared by every invocation.
    #[must_use]
    pub fn retry_engine(&self) -> &RetryEngine {
        &self.retry
    }

    /// Source of idempotency tokens.
    #[must_use]
    pub fn idempotency_token_generator(&self) -> &Arc<dyn IdempotencyTokenGenerator> {
        &self.idempotency_token_generator
    }

    /// Per-host server clock offsets.
    #[must_use]
    pub fn clock_skew(&self) -> &Arc<ClockSkewStore> {
        &self.clock_skew
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("auth_scheme_preference", &self.auth_scheme_preference)
            .field("auth_schemes", &self.auth_schemes.scheme_ids().collect::<Vec<_>>())
            .field("identity_resolvers", &self.identity_resolvers.scheme_ids().collect::<Vec<_>>())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ClientConfig`].
///
/// Starts with the bearer and anonymous schemes registered and an anonymous
/// identity resolver for `smithy.api#noAuth`. A transport and an endpoint are
/// required.
pub struct ClientConfigBuilder {
    transport: Option<Arc<dyn Transport>>,
    endpoint_url: Option<String>,
    region: Option<String>,
    auth_scheme_preference: Option<String>,
    auth_schemes: AuthSchemes,
    identity_resolvers: IdentityResolvers,
    retry_config: RetryConfig,
    retry_strategy: Option<Arc<dyn RetryStrategy>>,
    idempotency_token_generator: Option<Arc<dyn IdempotencyTokenGenerator>>,
    clock_skew: Option<Arc<ClockSkewStore>>,
    plugins: Vec<Plugin>,
}

impl ClientConfigBuilder {
    /// Creates a builder with the default schemes.
    #[must_use]
    pub fn new() -> Self {
        let mut auth_schemes = AuthSchemes::new();
        auth_schemes.insert(Arc::new(BearerAuthScheme));
        auth_schemes.insert(Arc::new(NoAuthScheme));

        let mut identity_resolvers = IdentityResolvers::new();
        identity_resolvers.insert(NO_AUTH_SCHEME_ID, Arc::new(StaticIdentityResolver::new(Anonymous)));

        Self {
            transport: None,
            endpoint_url: None,
            region: None,
            auth_scheme_preference: None,
            auth_schemes,
            identity_resolvers,
            retry_config: RetryConfig::default(),
            retry_strategy: None,
            idempotency_token_generator: None,
            clock_skew: None,
            plugins: Vec::new(),
        }
    }

    /// Sets the transport.
    #[must_use]
    pub fn transport(self, transport: impl Transport) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    /// Sets an already-shared transport.
    #[must_use]
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the endpoint URL (scheme, host and optional base path).
    #[must_use]
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Sets the signing region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets the comma-separated auth scheme preference.
    #[must_use]
    pub fn auth_scheme_preference(mut self, preference: impl Into<String>) -> Self {
        self.auth_scheme_preference = Some(preference.into());
        self
    }

    /// Registers an auth scheme, replacing any with the same id.
    #[must_use]
    pub fn auth_scheme(mut self, scheme: Arc<dyn AuthScheme>) -> Self {
        self.auth_schemes.insert(scheme);
        self
    }

    /// Registers the identity resolver for `scheme_id`.
    #[must_use]
    pub fn identity_resolver(mut self, scheme_id: impl Into<String>, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.identity_resolvers.insert(scheme_id, resolver);
        self
    }

    /// Sets the retry configuration used by the standard strategy.
    #[must_use]
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Replaces the standard retry strategy.
    ///
    /// The classifier still follows [`retry_config`](Self::retry_config).
    #[must_use]
    pub fn retry_strategy(mut self, strategy: Arc<dyn RetryStrategy>) -> Self {
        self.retry_strategy = Some(strategy);
        self
    }

    /// Sets the idempotency token source.
    #[must_use]
    pub fn idempotency_token_generator(mut self, generator: Arc<dyn IdempotencyTokenGenerator>) -> Self {
        self.idempotency_token_generator = Some(generator);
        self
    }

    /// Shares a clock skew store, e.g. between clients of one host.
    #[must_use]
    pub fn clock_skew_store(mut self, store: Arc<ClockSkewStore>) -> Self {
        self.clock_skew = Some(store);
        self
    }

    /// Registers a plugin.
    #[must_use]
    pub fn plugin<F>(mut self, plugin: F) -> Self
    where
        F: FnOnce(ClientConfigBuilder) -> ClientConfigBuilder + Send + 'static,
    {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Copies the `[retry]`, `[auth]` and `[endpoint]` sections onto the
    /// builder. Unset optional values leave the builder untouched.
    #[must_use]
    pub fn apply_config(mut self, config: &HermesConfig) -> Self {
        self.retry_config = config.retry.clone();
        if let Some(preference) = &config.auth.scheme_preference {
            self.auth_scheme_preference = Some(preference.clone());
        }
        if let Some(url) = &config.endpoint.url {
            self.endpoint_url = Some(url.clone());
        }
        if let Some(region) = &config.endpoint.region {
            self.region = Some(region.clone());
        }
        self
    }

    /// Runs the plugins, then validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// [`ClientError::Configuration`] if the transport or endpoint is missing,
    /// the endpoint does not parse, or the retry configuration is invalid.
    pub fn build(mut self) -> Result<ClientConfig, ClientError> {
        while !self.plugins.is_empty() {
            let plugins = std::mem::take(&mut self.plugins);
            for plugin in plugins {
                self = plugin(self);
            }
        }

        let transport = self
            .transport
            .ok_or_else(|| ClientError::Configuration("no transport configured".to_string()))?;
        let endpoint_url = self
            .endpoint_url
            .ok_or_else(|| ClientError::Configuration("no endpoint configured".to_string()))?;
        let endpoint = Endpoint::parse(&endpoint_url)?;

        let retry = match self.retry_strategy {
            Some(strategy) => {
                self.retry_config.validate()?;
                RetryEngine::new(strategy, ErrorClassifier::new(self.retry_config.retry_server_errors))
            }
            None => RetryEngine::from_config(self.retry_config)?,
        };

        Ok(ClientConfig {
            transport,
            endpoint,
            region: self.region,
            auth_scheme_preference: self.auth_scheme_preference,
            auth_schemes: self.auth_schemes,
            identity_resolvers: self.identity_resolvers,
            retry,
            idempotency_token_generator: self
                .idempotency_token_generator
                .unwrap_or_else(|| Arc::new(UuidTokenGenerator)),
            clock_skew: self.clock_skew.unwrap_or_default(),
        })
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("has_transport", &self.transport.is_some())
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("auth_scheme_preference", &self.auth_scheme_preference)
            .field("retry_config", &self.retry_config)
            .field("plugins", &self.plugins.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_auth::{HTTP_BEARER_SCHEME_ID, SIGV4_SCHEME_ID};
    use hermes_config::{AuthConfig, EndpointConfig};
    use hermes_core::{BoxFuture, HttpRequest, HttpResponse, NetworkError};

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, _request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, NetworkError>> {
            Box::pin(async { Err(NetworkError::timeout("unreachable")) })
        }
    }

    fn builder() -> ClientConfigBuilder {
        ClientConfig::builder()
            .transport(Unreachable)
            .endpoint_url("https://widgets.example.com")
    }

    #[test]
    fn test_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.endpoint().host(), "widgets.example.com");
        assert!(config.region().is_none());
        assert!(config.auth_schemes().get(HTTP_BEARER_SCHEME_ID).is_some());
        assert!(config.auth_schemes().get(SIGV4_SCHEME_ID).is_none());
        assert_eq!(
            config.identity_resolvers().scheme_ids().collect::<Vec<_>>(),
            vec![NO_AUTH_SCHEME_ID]
        );
        assert_eq!(config.retry_engine().strategy().max_attempts(), 3);
        assert!(config.clock_skew().is_empty());
    }

    #[test]
    fn test_missing_transport_or_endpoint() {
        let err = ClientConfig::builder()
            .endpoint_url("https://widgets.example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Configuration(message) if message.contains("transport")));

        let err = ClientConfig::builder().transport(Unreachable).build().unwrap_err();
        assert!(matches!(err, ClientError::Configuration(message) if message.contains("endpoint")));
    }

    #[test]
    fn test_invalid_endpoint_and_retry_config() {
        assert!(builder().endpoint_url("widgets").build().is_err());

        let err = builder()
            .retry_config(RetryConfig {
                max_backoff_ms: 0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn test_apply_config() {
        let hermes = HermesConfig {
            retry: RetryConfig {
                max_retries: 5,
                ..Default::default()
            },
            auth: AuthConfig {
                scheme_preference: Some("noAuth".to_string()),
            },
            endpoint: EndpointConfig {
                url: Some("https://eu.widgets.example.com/v2".to_string()),
                region: Some("eu-west-1".to_string()),
            },
            ..Default::default()
        };

        let config = builder().apply_config(&hermes).build().unwrap();
        assert_eq!(config.endpoint().host(), "eu.widgets.example.com");
        assert_eq!(config.endpoint().base_path(), "/v2");
        assert_eq!(config.region(), Some("eu-west-1"));
        assert_eq!(config.auth_scheme_preference(), Some("noAuth"));
        assert_eq!(config.retry_engine().strategy().max_attempts(), 6);
    }

    #[test]
    fn test_plugins_run_in_order() {
        let config = builder()
            .plugin(|b| b.region("us-east-1"))
            .plugin(|b| b.region("us-west-2").plugin(|b| b.auth_scheme_preference("httpBearerAuth")))
            .build()
            .unwrap();

        assert_eq!(config.region(), Some("us-west-2"));
        assert_eq!(config.auth_scheme_preference(), Some("httpBearerAuth"));
    }
}
