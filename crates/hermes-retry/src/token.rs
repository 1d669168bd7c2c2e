//! Retry tokens.

use crate::bucket::TokenBucket;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// An invocation's admission against its partition's retry quota.
///
/// Returned by [`RetryStrategy::acquire_token`](crate::RetryStrategy::acquire_token).
/// The token is released exactly once: either through
/// [`RetryStrategy::release_token`](crate::RetryStrategy::release_token), or
/// on drop if the invocation was cancelled first.
pub struct RetryToken {
    bucket: Arc<TokenBucket>,
    retries: u32,
    last_delay: Option<Duration>,
    released: bool,
}

impl RetryToken {
    /// Wraps an admission already acquired from `bucket`.
    #[must_use]
    pub fn new(bucket: Arc<TokenBucket>) -> Self {
        Self {
            bucket,
            retries: 0,
            last_delay: None,
            released: false,
        }
    }

    /// The partition this token draws from.
    #[must_use]
    pub fn partition(&self) -> &str {
        self.bucket.partition()
    }

    /// Retries scheduled under this token so far.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// The most recent backoff delay.
    #[must_use]
    pub const fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    /// The bucket this token draws from.
    #[must_use]
    pub fn bucket(&self) -> &TokenBucket {
        &self.bucket
    }

    /// Notes a scheduled retry and its delay.
    pub fn record_retry(&mut self, delay: Duration) {
        self.retries += 1;
        self.last_delay = Some(delay);
    }

    /// Releases the admission and returns the capacity now available.
    /// Idempotent.
    pub fn release(&mut self) -> u32 {
        if self.released {
            return self.bucket.available();
        }
        self.released = true;
        self.bucket.release()
    }
}

impl fmt::Debug for RetryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryToken")
            .field("partition", &self.partition())
            .field("retries", &self.retries)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for RetryToken {
    fn drop(&mut self) {
        if !self.released {
            tracing::trace!(partition = self.partition(), "releasing retry token on drop");
            self.release();
        }
    }
}
