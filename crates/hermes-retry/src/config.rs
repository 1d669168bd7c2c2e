//! Retry configuration.

use crate::error::RetryError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How computed backoff delays are randomized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterMode {
    /// Use the exponential delay as-is.
    None,
    /// Uniform in `[0, delay]`.
    #[default]
    Full,
    /// Uniform in `[scale_factor, previous_delay * 3]`, capped at the maximum.
    Decorrelated,
}

/// Retry quota weights.
///
/// ```
/// use hermes_retry::RetryCosts;
///
/// let costs = RetryCosts::default();
/// assert_eq!(costs.retry, 5);
/// assert_eq!(costs.throttling_retry, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryCosts {
    /// Minimum capacity a partition must have left to admit a new invocation.
    /// Not deducted.
    #[serde(default = "default_acquire_cost")]
    pub acquire: u32,

    /// Charged for retrying a transient or server error.
    #[serde(default = "default_retry_cost")]
    pub retry: u32,

    /// Charged for retrying a throttling error.
    #[serde(default = "default_throttling_retry_cost")]
    pub throttling_retry: u32,

    /// Deposited on every successful invocation, up to the initial capacity.
    #[serde(default = "default_success_increment")]
    pub success_increment: u32,
}

impl Default for RetryCosts {
    fn default() -> Self {
        Self {
            acquire: default_acquire_cost(),
            retry: default_retry_cost(),
            throttling_retry: default_throttling_retry_cost(),
            success_increment: default_success_increment(),
        }
    }
}

fn default_acquire_cost() -> u32 {
    1
}

fn default_retry_cost() -> u32 {
    5
}

fn default_throttling_retry_cost() -> u32 {
    10
}

fn default_success_increment() -> u32 {
    1
}

/// Retry configuration section.
///
/// # Example
///
/// ```
/// use hermes_retry::{JitterMode, RetryConfig};
///
/// let config = RetryConfig {
///     max_retries: 4,
///     jitter: JitterMode::None,
///     ..Default::default()
/// };
/// assert_eq!(config.max_attempts(), 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Starting (and maximum) capacity of each partition's bucket.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: u32,

    /// Base backoff delay in milliseconds.
    #[serde(default = "default_scale_factor_ms")]
    pub scale_factor_ms: u64,

    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Jitter applied to the exponential delay.
    #[serde(default)]
    pub jitter: JitterMode,

    /// Retry `server_error` classified failures too.
    #[serde(default)]
    pub retry_server_errors: bool,

    /// Quota weights.
    #[serde(default)]
    pub costs: RetryCosts,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_capacity: default_initial_capacity(),
            scale_factor_ms: default_scale_factor_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: JitterMode::default(),
            retry_server_errors: false,
            costs: RetryCosts::default(),
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_capacity() -> u32 {
    500
}

fn default_scale_factor_ms() -> u64 {
    25
}

fn default_max_backoff_ms() -> u64 {
    20_000
}

impl RetryConfig {
    /// A configuration that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total attempts including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Base backoff delay.
    #[must_use]
    pub const fn scale_factor(&self) -> Duration {
        Duration::from_millis(self.scale_factor_ms)
    }

    /// Backoff ceiling.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `RetryError::InvalidConfig` if:
    /// - the backoff ceiling is zero or below the scale factor
    /// - the acquisition cost exceeds the bucket capacity
    pub fn validate(&self) -> Result<(), RetryError> {
        if self.max_backoff_ms == 0 {
            return Err(RetryError::InvalidConfig("max_backoff_ms must be greater than 0".into()));
        }
        if self.scale_factor_ms > self.max_backoff_ms {
            return Err(RetryError::InvalidConfig(format!(
                "scale_factor_ms ({}) exceeds max_backoff_ms ({})",
                self.scale_factor_ms, self.max_backoff_ms
            )));
        }
        if self.costs.acquire > self.initial_capacity {
            return Err(RetryError::InvalidConfig(format!(
                "acquire cost ({}) exceeds initial_capacity ({})",
                self.costs.acquire, self.initial_capacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(config.initial_capacity, 500);
        assert_eq!(config.scale_factor(), Duration::from_millis(25));
        assert_eq!(config.max_backoff(), Duration::from_secs(20));
        assert_eq!(config.jitter, JitterMode::Full);
        assert!(!config.retry_server_errors);
        assert_eq!(config.costs, RetryCosts::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled() {
        assert_eq!(RetryConfig::disabled().max_attempts(), 1);
    }

    #[test]
    fn test_validation_failures() {
        let config = RetryConfig {
            max_backoff_ms: 0,
            scale_factor_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RetryConfig {
            scale_factor_ms: 500,
            max_backoff_ms: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RetryConfig {
            initial_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RetryConfig = toml::from_str(
            r#"
            max_retries = 5
            jitter = "decorrelated"

            [costs]
            throttling_retry = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 5);
        assert_eq!(config.jitter, JitterMode::Decorrelated);
        assert_eq!(config.costs.throttling_retry, 3);
        assert_eq!(config.costs.retry, 5);
        assert_eq!(config.initial_capacity, 500);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(toml::from_str::<RetryConfig>("max_attempts = 3").is_err());
    }
}
