//! The retry loop.

use crate::classifier::ErrorClassifier;
use crate::config::RetryConfig;
use crate::error::RetryError;
use crate::strategy::{RetryInfo, RetryStrategy, StandardRetryStrategy};
use hermes_core::{BoxFuture, ClientError, Context, ModeledError, SdkError};
use hermes_telemetry::metrics::record_retry;
use std::sync::Arc;
use tracing::Instrument;

/// Runs attempts until one succeeds, a failure is final, or the quota runs out.
///
/// Cloning is cheap and shares the strategy (and so the partition buckets).
#[derive(Debug, Clone)]
pub struct RetryEngine {
    strategy: Arc<dyn RetryStrategy>,
    classifier: ErrorClassifier,
}

impl RetryEngine {
    /// Creates an engine around `strategy`.
    pub fn new(strategy: Arc<dyn RetryStrategy>, classifier: ErrorClassifier) -> Self {
        Self { strategy, classifier }
    }

    /// Creates an engine with the standard strategy.
    pub fn from_config(config: RetryConfig) -> Result<Self, RetryError> {
        let classifier = ErrorClassifier::new(config.retry_server_errors);
        Ok(Self::new(Arc::new(StandardRetryStrategy::new(config)?), classifier))
    }

    /// The strategy in use.
    pub fn strategy(&self) -> &Arc<dyn RetryStrategy> {
        &self.strategy
    }

    /// The classifier in use.
    pub const fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Drives `attempt` under the retry policy for `partition`.
    ///
    /// `attempt` runs once per try; the context's attempt number is set before
    /// each call. The returned error is always the most recent attempt's.
    /// If the returned future is dropped mid-flight the token is still
    /// released.
    pub async fn execute<O, E, F>(&self, ctx: &mut Context, partition: &str, mut attempt: F) -> Result<O, SdkError<E>>
    where
        E: ModeledError,
        F: for<'c> FnMut(&'c mut Context) -> BoxFuture<'c, Result<O, SdkError<E>>>,
    {
        let mut token = self
            .strategy
            .acquire_token(partition)
            .map_err(|err| SdkError::Client(ClientError::from(err)))?;

        let max_attempts = self.strategy.max_attempts();
        let mut number = 1;
        loop {
            ctx.set_attempt(number, max_attempts);
            let span = tracing::debug_span!("attempt", attempt = number, max_attempts);
            let result = attempt(ctx).instrument(span).await;

            let err = match result {
                Ok(output) => {
                    self.strategy.record_success(&mut token);
                    self.strategy.release_token(token);
                    return Ok(output);
                }
                Err(err) => err,
            };

            let error_type = self.classifier.error_type(&err);
            if number >= max_attempts || !self.classifier.is_error_retryable(&err) {
                tracing::debug!(
                    attempt = number,
                    error_type = error_type.as_str(),
                    error_kind = err.kind(),
                    "attempt failed, not retrying"
                );
                self.strategy.release_token(token);
                return Err(err);
            }

            let info = RetryInfo {
                attempt: number,
                error_type,
                retry_after: err.metadata().and_then(|metadata| metadata.retry_after()),
            };
            let delay = match self.strategy.schedule_retry(&mut token, &info) {
                Ok(delay) => delay,
                Err(quota) => {
                    tracing::debug!(attempt = number, error = %quota, "retry quota exhausted");
                    self.strategy.release_token(token);
                    return Err(err);
                }
            };

            tracing::warn!(
                attempt = number,
                error_type = error_type.as_str(),
                delay_ms = delay.as_millis() as u64,
                partition,
                "retrying after failed attempt"
            );
            if let Some(scope) = ctx.telemetry_scope() {
                record_retry(&scope.service, &scope.operation, error_type.as_str());
            }

            tokio::time::sleep(delay).await;
            number += 1;
        }
    }
}

impl Default for RetryEngine {
    fn default() -> Self {
        Self::new(Arc::new(StandardRetryStrategy::default()), ErrorClassifier::default())
    }
}
