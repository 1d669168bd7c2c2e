//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use hermes_retry::JitterMode;

use crate::{ConfigError, HermesConfig};

/// Loads [`HermesConfig`] from layered sources.
///
/// Later layers override earlier ones:
/// 1. Built-in defaults
/// 2. A TOML or JSON file
/// 3. Environment variables named `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("hermes.toml")?
///     .with_env_prefix("WIDGETS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
    file_loaded: bool,
}

impl ConfigLoader {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = HermesConfig::default();
        self
    }

    /// Resets to [`HermesConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Reads a file, picking the format from its extension.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, has an unknown extension or
    /// does not parse.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let file_config = Self::parse_file(&content, path)?;
        self.merge_config(file_config);
        self.file_loaded = true;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file) but a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Parses configuration from a string in `format` (`toml` or `json`).
    ///
    /// # Errors
    ///
    /// Fails on an unknown format or a parse error.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let parsed = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };

        self.merge_config(parsed);
        Ok(self)
    }

    /// Enables environment overrides under `prefix`.
    ///
    /// With prefix `WIDGETS`, `WIDGETS__RETRY__MAX_RETRIES=5` sets
    /// `retry.max_retries` and `WIDGETS__ENDPOINT__REGION=eu-west-1` sets
    /// `endpoint.region`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads a `.env` file from the working directory if one exists.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        let _ = dotenvy::dotenv();
        self
    }

    /// Whether a file layer has been applied.
    #[must_use]
    pub fn file_loaded(&self) -> bool {
        self.file_loaded
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Fails if an override does not parse or the result does not validate.
    pub fn load(mut self) -> Result<HermesConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration as layered so far, skipping environment
    /// overrides and validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HermesConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<HermesConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    // Sections a file omits come back as defaults, so a file replaces the
    // whole configuration.
    fn merge_config(&mut self, file_config: HermesConfig) {
        self.config = file_config;
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut overrides: Vec<(String, String)> = env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        overrides.sort();

        for (key, value) in overrides {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = path.split("__").collect();
        let retry = &mut self.config.retry;

        match parts.as_slice() {
            ["RETRY", "MAX_RETRIES"] => retry.max_retries = parse_number(key, value)?,
            ["RETRY", "INITIAL_CAPACITY"] => retry.initial_capacity = parse_number(key, value)?,
            ["RETRY", "SCALE_FACTOR_MS"] => retry.scale_factor_ms = parse_number(key, value)?,
            ["RETRY", "MAX_BACKOFF_MS"] => retry.max_backoff_ms = parse_number(key, value)?,
            ["RETRY", "JITTER"] => {
                retry.jitter = parse_jitter(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected none, full or decorrelated"))?;
            }
            ["RETRY", "RETRY_SERVER_ERRORS"] => retry.retry_server_errors = parse_flag(key, value)?,
            ["RETRY", "COSTS", "ACQUIRE"] => retry.costs.acquire = parse_number(key, value)?,
            ["RETRY", "COSTS", "RETRY"] => retry.costs.retry = parse_number(key, value)?,
            ["RETRY", "COSTS", "THROTTLING_RETRY"] => retry.costs.throttling_retry = parse_number(key, value)?,
            ["RETRY", "COSTS", "SUCCESS_INCREMENT"] => retry.costs.success_increment = parse_number(key, value)?,

            ["AUTH", "SCHEME_PREFERENCE"] => self.config.auth.scheme_preference = non_empty(value),

            ["ENDPOINT", "URL"] => self.config.endpoint.url = non_empty(value),
            ["ENDPOINT", "REGION"] => self.config.endpoint.region = non_empty(value),

            ["LOGGING", "ENABLED"] => self.config.logging.enabled = parse_flag(key, value)?,
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "JSON_FORMAT"] => self.config.logging.json_format = parse_flag(key, value)?,
            ["LOGGING", "SPAN_EVENTS"] => self.config.logging.span_events = parse_flag(key, value)?,
            ["LOGGING", "FILE_LINE_INFO"] => self.config.logging.file_line_info = parse_flag(key, value)?,
            ["LOGGING", "INCLUDE_TARGET"] => self.config.logging.include_target = parse_flag(key, value)?,

            _ => return Err(ConfigError::env_parse_error(key, "unknown configuration key")),
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected non-negative integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_jitter(s: &str) -> Option<JitterMode> {
    match s.trim().to_lowercase().as_str() {
        "none" => Some(JitterMode::None),
        "full" => Some(JitterMode::Full),
        "decorrelated" => Some(JitterMode::Decorrelated),
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
