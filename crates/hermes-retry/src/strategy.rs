//! Retry strategies.

use crate::backoff::Backoff;
use crate::bucket::RetryPartitions;
use crate::config::RetryConfig;
use crate::error::RetryError;
use crate::token::RetryToken;
use hermes_core::ErrorType;
use hermes_telemetry::metrics::record_retry_quota;
use std::fmt;
use std::time::Duration;

/// What the engine knows about a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryInfo {
    /// The failed attempt (1-based).
    pub attempt: u32,
    /// Its classification.
    pub error_type: ErrorType,
    /// Server-supplied delay hint.
    pub retry_after: Option<Duration>,
}

/// Quota and backoff policy consulted by [`RetryEngine`](crate::RetryEngine).
pub trait RetryStrategy: Send + Sync + fmt::Debug + 'static {
    /// Total attempts allowed per invocation.
    fn max_attempts(&self) -> u32;

    /// Reserves quota for a new invocation. Never blocks.
    fn acquire_token(&self, partition: &str) -> Result<RetryToken, RetryError>;

    /// Charges the quota for a retry and returns how long to wait first.
    fn schedule_retry(&self, token: &mut RetryToken, info: &RetryInfo) -> Result<Duration, RetryError>;

    /// Credits the quota after a successful invocation.
    fn record_success(&self, token: &mut RetryToken);

    /// Ends the token's admission.
    fn release_token(&self, token: RetryToken);
}

/// Token-bucket strategy with exponential backoff.
#[derive(Debug)]
pub struct StandardRetryStrategy {
    config: RetryConfig,
    backoff: Backoff,
    partitions: RetryPartitions,
}

impl StandardRetryStrategy {
    /// Creates a strategy from a validated configuration.
    pub fn new(config: RetryConfig) -> Result<Self, RetryError> {
        config.validate()?;
        Ok(Self {
            backoff: Backoff::from_config(&config),
            partitions: RetryPartitions::new(config.initial_capacity),
            config,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Per-partition buckets.
    #[must_use]
    pub const fn partitions(&self) -> &RetryPartitions {
        &self.partitions
    }

    const fn retry_cost(&self, error_type: ErrorType) -> u32 {
        match error_type {
            ErrorType::Throttling => self.config.costs.throttling_retry,
            ErrorType::Transient | ErrorType::ServerError | ErrorType::ClientError => self.config.costs.retry,
        }
    }
}

impl Default for StandardRetryStrategy {
    fn default() -> Self {
        let config = RetryConfig::default();
        Self {
            backoff: Backoff::from_config(&config),
            partitions: RetryPartitions::new(config.initial_capacity),
            config,
        }
    }
}

impl RetryStrategy for StandardRetryStrategy {
    fn max_attempts(&self) -> u32 {
        self.config.max_attempts()
    }

    fn acquire_token(&self, partition: &str) -> Result<RetryToken, RetryError> {
        let bucket = self.partitions.bucket(partition);
        let available = bucket.acquire(self.config.costs.acquire)?;
        record_retry_quota(partition, available);
        Ok(RetryToken::new(bucket))
    }

    fn schedule_retry(&self, token: &mut RetryToken, info: &RetryInfo) -> Result<Duration, RetryError> {
        let available = token.bucket().charge(self.retry_cost(info.error_type))?;
        record_retry_quota(token.partition(), available);

        let computed = self
            .backoff
            .delay(info.attempt, token.last_delay(), &mut rand::thread_rng());
        let delay = self.backoff.with_hint(computed, info.retry_after);
        token.record_retry(delay);
        Ok(delay)
    }

    fn record_success(&self, token: &mut RetryToken) {
        let available = token.bucket().deposit(self.config.costs.success_increment);
        record_retry_quota(token.partition(), available);
    }

    fn release_token(&self, mut token: RetryToken) {
        let available = token.release();
        record_retry_quota(token.partition(), available);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{JitterMode, RetryCosts};

    fn strategy(capacity: u32) -> StandardRetryStrategy {
        StandardRetryStrategy::new(RetryConfig {
            max_retries: 3,
            initial_capacity: capacity,
            jitter: JitterMode::None,
            ..Default::default()
        })
        .unwrap()
    }

    fn info(attempt: u32, error_type: ErrorType) -> RetryInfo {
        RetryInfo {
            attempt,
            error_type,
            retry_after: None,
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = RetryConfig {
            max_backoff_ms: 0,
            ..Default::default()
        };
        assert!(StandardRetryStrategy::new(config).is_err());
    }

    #[test]
    fn test_costs_by_error_type() {
        let strategy = strategy(100);
        let mut token = strategy.acquire_token("p").unwrap();
        let bucket = strategy.partitions().get("p").unwrap();
        assert_eq!(bucket.available(), 100);

        strategy.schedule_retry(&mut token, &info(1, ErrorType::Transient)).unwrap();
        assert_eq!(bucket.available(), 95);

        strategy.schedule_retry(&mut token, &info(2, ErrorType::Throttling)).unwrap();
        assert_eq!(bucket.available(), 85);

        strategy.record_success(&mut token);
        assert_eq!(bucket.available(), 86);

        strategy.release_token(token);
        assert_eq!(bucket.available(), 86);
        assert_eq!(bucket.outstanding(), 0);
    }

    #[test]
    fn test_delays_grow_without_jitter() {
        let strategy = strategy(100);
        let mut token = strategy.acquire_token("p").unwrap();
        let first = strategy.schedule_retry(&mut token, &info(1, ErrorType::Transient)).unwrap();
        let second = strategy.schedule_retry(&mut token, &info(2, ErrorType::Transient)).unwrap();
        assert_eq!(first, Duration::from_millis(25));
        assert_eq!(second, Duration::from_millis(50));
        assert_eq!(token.retries(), 2);
    }

    #[test]
    fn test_retry_after_hint_wins() {
        let strategy = strategy(100);
        let mut token = strategy.acquire_token("p").unwrap();
        let delay = strategy
            .schedule_retry(
                &mut token,
                &RetryInfo {
                    attempt: 1,
                    error_type: ErrorType::Throttling,
                    retry_after: Some(Duration::from_millis(700)),
                },
            )
            .unwrap();
        assert_eq!(delay, Duration::from_millis(700));
    }

    #[test]
    fn test_exhausted_quota() {
        let strategy = StandardRetryStrategy::new(RetryConfig {
            initial_capacity: 6,
            costs: RetryCosts {
                retry: 5,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

        let mut token = strategy.acquire_token("p").unwrap();
        strategy.schedule_retry(&mut token, &info(1, ErrorType::Transient)).unwrap();
        let err = strategy
            .schedule_retry(&mut token, &info(2, ErrorType::Transient))
            .unwrap_err();
        assert!(matches!(err, RetryError::NoCapacity { available: 1, required: 5, .. }));

        strategy.release_token(token);
        assert!(strategy.acquire_token("p").is_ok());
    }

    #[test]
    fn test_acquire_fails_on_empty_bucket() {
        let strategy = strategy(1);
        strategy.partitions().bucket("p").charge(1).unwrap();
        assert!(matches!(
            strategy.acquire_token("p"),
            Err(RetryError::NoCapacity { .. })
        ));
        assert!(strategy.acquire_token("other").is_ok());
    }

    #[test]
    fn test_concurrent_tokens_beyond_capacity() {
        let strategy = strategy(2);
        let held: Vec<_> = (0..5).map(|_| strategy.acquire_token("p").unwrap()).collect();
        let bucket = strategy.partitions().get("p").unwrap();
        assert_eq!(bucket.outstanding(), 5);
        assert_eq!(bucket.available(), 2);

        for token in held {
            strategy.release_token(token);
        }
        assert_eq!(bucket.outstanding(), 0);
        assert_eq!(bucket.available(), 2);
    }
}
