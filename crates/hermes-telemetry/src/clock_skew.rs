//! Per-host clock skew.
//!
//! Signing schemes reject requests whose timestamp drifts too far from the
//! server clock. The deserialize phase records `server_time - local_time` per
//! host here, and signing adds the recorded offset to the local clock.

use chrono::Duration;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Thread-safe map of host to observed clock offset.
///
/// Shared by every operation of a client, so one skewed response corrects the
/// signing time of all later calls to that host.
#[derive(Debug, Default)]
pub struct ClockSkewStore {
    offsets: RwLock<HashMap<String, Duration>>,
}

impl ClockSkewStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest offset for `host`, replacing any earlier one.
    pub fn record(&self, host: &str, skew: Duration) {
        tracing::trace!(host, skew_ms = skew.num_milliseconds(), "recorded clock skew");
        self.offsets.write().insert(host.to_ascii_lowercase(), skew);
    }

    /// Returns the recorded offset for `host`.
    #[must_use]
    pub fn get(&self, host: &str) -> Option<Duration> {
        self.offsets.read().get(&host.to_ascii_lowercase()).copied()
    }

    /// Number of hosts with a recorded offset.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.read().len()
    }

    /// Whether no offsets have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.read().is_empty()
    }

    /// Forgets every offset.
    pub fn clear(&self) {
        self.offsets.write().clear();
    }
}
