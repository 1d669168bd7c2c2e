//! Retry quota buckets.
//!
//! Each partition (usually an endpoint host) owns one [`TokenBucket`].
//! Acquiring, charging, and depositing happen under one short lock so they are
//! atomic relative to each other.

use crate::error::RetryError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug)]
struct BucketState {
    available: u32,
    outstanding: usize,
}

/// A partition's retry quota.
#[derive(Debug)]
pub struct TokenBucket {
    partition: String,
    capacity: u32,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket.
    #[must_use]
    pub fn new(partition: impl Into<String>, capacity: u32) -> Self {
        Self {
            partition: partition.into(),
            capacity,
            state: Mutex::new(BucketState {
                available: capacity,
                outstanding: 0,
            }),
        }
    }

    /// The partition this bucket belongs to.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Initial (and maximum) capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Capacity currently left.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.state.lock().available
    }

    /// Tokens acquired and not yet released.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Admits a new invocation if at least `cost` is left.
    ///
    /// Nothing is deducted: an in-flight call does not hold quota, so healthy
    /// traffic is never limited by capacity. Only retries drain the bucket.
    pub fn acquire(&self, cost: u32) -> Result<u32, RetryError> {
        let mut state = self.state.lock();
        if state.available < cost {
            return Err(self.no_capacity(state.available, cost));
        }
        state.outstanding += 1;
        Ok(state.available)
    }

    /// Spends `cost` on a retry.
    pub fn charge(&self, cost: u32) -> Result<u32, RetryError> {
        let mut state = self.state.lock();
        if state.available < cost {
            return Err(self.no_capacity(state.available, cost));
        }
        state.available -= cost;
        Ok(state.available)
    }

    /// Deposits `amount`, never above the initial capacity.
    pub fn deposit(&self, amount: u32) -> u32 {
        let mut state = self.state.lock();
        state.available = state.available.saturating_add(amount).min(self.capacity);
        state.available
    }

    /// Ends an admitted invocation.
    ///
    /// Prefer releasing through [`RetryToken`](crate::RetryToken), which
    /// guarantees a single release.
    pub fn release(&self) -> u32 {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(1);
        state.available
    }

    fn no_capacity(&self, available: u32, required: u32) -> RetryError {
        RetryError::NoCapacity {
            partition: self.partition.clone(),
            available,
            required,
        }
    }
}

/// Lazily created buckets keyed by partition id.
#[derive(Debug)]
pub struct RetryPartitions {
    capacity: u32,
    buckets: DashMap<String, Arc<TokenBucket>>,
}

impl RetryPartitions {
    /// Creates an empty set whose buckets start at `capacity`.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            buckets: DashMap::new(),
        }
    }

    /// Returns the bucket for `partition`, creating it on first use.
    pub fn bucket(&self, partition: &str) -> Arc<TokenBucket> {
        if let Some(bucket) = self.buckets.get(partition) {
            return Arc::clone(bucket.value());
        }
        Arc::clone(
            self.buckets
                .entry(partition.to_string())
                .or_insert_with(|| Arc::new(TokenBucket::new(partition, self.capacity)))
                .value(),
        )
    }

    /// Returns the bucket for `partition` if one exists.
    #[must_use]
    pub fn get(&self, partition: &str) -> Option<Arc<TokenBucket>> {
        self.buckets.get(partition).map(|bucket| Arc::clone(bucket.value()))
    }

    /// Number of partitions seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no partition has been used yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let bucket = TokenBucket::new("p", 10);
        assert_eq!(bucket.acquire(1).unwrap(), 10);
        assert_eq!(bucket.outstanding(), 1);
        assert_eq!(bucket.release(), 10);
        assert_eq!(bucket.outstanding(), 0);
    }

    #[test]
    fn test_in_flight_calls_do_not_hold_capacity() {
        let bucket = TokenBucket::new("p", 3);
        for _ in 0..10 {
            bucket.acquire(1).unwrap();
        }
        assert_eq!(bucket.outstanding(), 10);
        assert_eq!(bucket.available(), 3);

        bucket.charge(3).unwrap();
        assert!(bucket.acquire(1).is_err());
        assert_eq!(bucket.outstanding(), 10);
    }

    #[test]
    fn test_charge_fails_without_capacity() {
        let bucket = TokenBucket::new("p", 12);
        assert_eq!(bucket.charge(10).unwrap(), 2);
        let err = bucket.charge(5).unwrap_err();
        assert_eq!(
            err,
            RetryError::NoCapacity {
                partition: "p".into(),
                available: 2,
                required: 5
            }
        );
        assert_eq!(bucket.available(), 2);
    }

    #[test]
    fn test_deposit_is_capped() {
        let bucket = TokenBucket::new("p", 10);
        bucket.charge(3).unwrap();
        assert_eq!(bucket.deposit(1), 8);
        assert_eq!(bucket.deposit(100), 10);
    }

    #[test]
    fn test_acquire_without_capacity_does_not_count() {
        let bucket = TokenBucket::new("p", 0);
        assert!(bucket.acquire(1).is_err());
        assert_eq!(bucket.outstanding(), 0);
    }

    #[test]
    fn test_partitions_are_independent() {
        let partitions = RetryPartitions::new(20);
        assert!(partitions.is_empty());

        partitions.bucket("a.example.com").charge(15).unwrap();
        let b = partitions.bucket("b.example.com");

        assert_eq!(b.available(), 20);
        assert_eq!(partitions.get("a.example.com").unwrap().available(), 5);
        assert!(Arc::ptr_eq(&partitions.bucket("b.example.com"), &b));
        assert_eq!(partitions.len(), 2);
        assert!(partitions.get("c.example.com").is_none());
    }
}
