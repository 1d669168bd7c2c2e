//! The root configuration type and its builder.

use hermes_core::Endpoint;
use hermes_retry::RetryConfig;
use hermes_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::{AuthConfig, ConfigError, EndpointConfig};

/// Complete client configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to read it from files and the
/// environment.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.retry.max_retries, 2);
/// assert!(config.endpoint.url.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Retry and quota settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Auth scheme selection.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Where requests go.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LogConfig,
}

impl HermesConfig {
    /// Creates a configuration builder.
    ///
    /// ```
    /// use hermes_config::{EndpointConfig, HermesConfig};
    ///
    /// let config = HermesConfig::builder()
    ///     .endpoint(EndpointConfig {
    ///         url: Some("https://widgets.example.com".to_string()),
    ///         region: Some("us-west-2".to_string()),
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.endpoint.region.as_deref(), Some("us-west-2"));
    /// ```
    #[must_use]
    pub fn builder() -> HermesConfigBuilder {
        HermesConfigBuilder::new()
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry
            .validate()
            .map_err(|err| ConfigError::invalid_value("retry", err.to_string()))?;

        if let Some(url) = &self.endpoint.url {
            Endpoint::parse(url).map_err(|err| ConfigError::invalid_value("endpoint.url", err.to_string()))?;
        }
        if let Some(region) = &self.endpoint.region {
            if region.trim().is_empty() {
                return Err(ConfigError::invalid_value("endpoint.region", "must not be empty"));
            }
        }

        if self.auth.scheme_preference.is_some() && self.auth.scheme_preference_list().is_none() {
            return Err(ConfigError::invalid_value(
                "auth.scheme_preference",
                "must name at least one scheme",
            ));
        }

        self.logging
            .validate()
            .map_err(|err| ConfigError::invalid_value("logging.level", err.to_string()))?;

        Ok(())
    }

    /// Defaults with pretty, verbose logging.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LogConfig::development(),
            ..Self::default()
        }
    }
}

/// Builder for [`HermesConfig`].
#[derive(Debug, Default)]
pub struct HermesConfigBuilder {
    config: HermesConfig,
}

impl HermesConfigBuilder {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry section.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the auth section.
    #[must_use]
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.config.auth = auth;
        self
    }

    /// Sets the endpoint section.
    #[must_use]
    pub fn endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.config.endpoint = endpoint;
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Returns the configuration without validating it.
    #[must_use]
    pub fn build(self) -> HermesConfig {
        self.config
    }

    /// Returns the configuration if it validates.
    ///
    /// # Errors
    ///
    /// See [`HermesConfig::validate`].
    pub fn build_validated(self) -> Result<HermesConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_retry::JitterMode;

    #[test]
    fn test_default_config_validates() {
        assert!(HermesConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_retry_section() {
        let config = HermesConfig::builder()
            .retry(RetryConfig {
                max_backoff_ms: 0,
                ..Default::default()
            })
            .build();

        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "retry"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_endpoint_url() {
        let result = HermesConfig::builder()
            .endpoint(EndpointConfig {
                url: Some("not a url".to_string()),
                region: None,
            })
            .build_validated();

        match result {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "endpoint.url"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_blank_region_rejected() {
        let config = HermesConfig::builder()
            .endpoint(EndpointConfig {
                url: None,
                region: Some("  ".to_string()),
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_scheme_preference_rejected() {
        let config = HermesConfig::builder()
            .auth(AuthConfig {
                scheme_preference: Some(" , ".to_string()),
            })
            .build();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_development_preset() {
        let config = HermesConfig::development();
        assert!(!config.logging.json_format);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_toml_sections() {
        let config: HermesConfig = toml::from_str(
            r#"
            [retry]
            max_retries = 5
            jitter = "none"

            [retry.costs]
            throttling_retry = 20

            [auth]
            scheme_preference = "httpBearerAuth"

            [endpoint]
            url = "https://widgets.example.com/v1"
            region = "eu-central-1"
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.jitter, JitterMode::None);
        assert_eq!(config.retry.costs.throttling_retry, 20);
        assert_eq!(config.retry.costs.retry, 5);
        assert_eq!(config.auth.scheme_preference.as_deref(), Some("httpBearerAuth"));
        assert_eq!(config.endpoint.region.as_deref(), Some("eu-central-1"));
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<HermesConfig, _> = toml::from_str("[server]\nhttp_addr = \"0.0.0.0:80\"");
        assert!(result.is_err());
    }
}
