//! Exponential backoff with jitter.

use crate::config::{JitterMode, RetryConfig};
use rand::Rng;
use std::time::Duration;

/// Computes the delay before a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    scale_factor: Duration,
    max_backoff: Duration,
    jitter: JitterMode,
}

impl Backoff {
    /// Creates a backoff policy.
    #[must_use]
    pub const fn new(scale_factor: Duration, max_backoff: Duration, jitter: JitterMode) -> Self {
        Self {
            scale_factor,
            max_backoff,
            jitter,
        }
    }

    /// Creates the policy described by `config`.
    #[must_use]
    pub const fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.scale_factor(), config.max_backoff(), config.jitter)
    }

    /// The backoff ceiling.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Un-jittered delay after the given (1-based) failed attempt:
    /// `min(max_backoff, scale_factor * 2^(attempt - 1))`.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt.saturating_sub(1))
            .and_then(|factor| self.scale_factor.checked_mul(factor))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Jittered delay after the given failed attempt.
    ///
    /// `previous` is the delay slept before this attempt, if any; only
    /// decorrelated jitter uses it.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, previous: Option<Duration>, rng: &mut R) -> Duration {
        match self.jitter {
            JitterMode::None => self.base_delay(attempt),
            JitterMode::Full => uniform(rng, Duration::ZERO, self.base_delay(attempt)),
            JitterMode::Decorrelated => {
                let lower = self.scale_factor.min(self.max_backoff);
                let upper = previous
                    .unwrap_or(self.scale_factor)
                    .checked_mul(3)
                    .unwrap_or(self.max_backoff)
                    .min(self.max_backoff)
                    .max(lower);
                uniform(rng, lower, upper)
            }
        }
    }

    /// Applies a server retry hint: the hint replaces the computed delay,
    /// capped at the ceiling.
    #[must_use]
    pub fn with_hint(&self, computed: Duration, hint: Option<Duration>) -> Duration {
        hint.map_or(computed, |hint| hint.min(self.max_backoff))
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, lower: Duration, upper: Duration) -> Duration {
    if upper <= lower {
        return lower;
    }
    let nanos = rng.gen_range(lower.as_nanos() as u64..=upper.as_nanos() as u64);
    Duration::from_nanos(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn backoff(jitter: JitterMode) -> Backoff {
        Backoff::new(Duration::from_millis(25), Duration::from_secs(20), jitter)
    }

    #[test]
    fn test_base_delay_doubles_then_plateaus() {
        let policy = backoff(JitterMode::None);
        assert_eq!(policy.base_delay(1), Duration::from_millis(25));
        assert_eq!(policy.base_delay(2), Duration::from_millis(50));
        assert_eq!(policy.base_delay(3), Duration::from_millis(100));
        assert_eq!(policy.base_delay(10), Duration::from_millis(12_800));
        assert_eq!(policy.base_delay(11), Duration::from_secs(20));
        assert_eq!(policy.base_delay(60), Duration::from_secs(20));
        assert_eq!(policy.base_delay(u32::MAX), Duration::from_secs(20));
    }

    #[test]
    fn test_no_jitter_is_deterministic() {
        let policy = backoff(JitterMode::None);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(policy.delay(3, None, &mut rng), Duration::from_millis(100));
    }

    #[test]
    fn test_hint_overrides_and_is_capped() {
        let policy = backoff(JitterMode::Full);
        let computed = Duration::from_millis(40);
        assert_eq!(policy.with_hint(computed, None), computed);
        assert_eq!(
            policy.with_hint(computed, Some(Duration::from_millis(1_500))),
            Duration::from_millis(1_500)
        );
        assert_eq!(
            policy.with_hint(computed, Some(Duration::from_secs(600))),
            Duration::from_secs(20)
        );
    }

    proptest! {
        #[test]
        fn base_delay_is_monotonic_and_capped(attempt in 1u32..200) {
            let policy = backoff(JitterMode::None);
            let current = policy.base_delay(attempt);
            prop_assert!(current <= policy.max_backoff());
            prop_assert!(policy.base_delay(attempt + 1) >= current);
        }

        #[test]
        fn full_jitter_stays_within_base(attempt in 1u32..40, seed in any::<u64>()) {
            let policy = backoff(JitterMode::Full);
            let mut rng = StdRng::seed_from_u64(seed);
            let delay = policy.delay(attempt, None, &mut rng);
            prop_assert!(delay <= policy.base_delay(attempt));
        }

        #[test]
        fn decorrelated_jitter_stays_in_range(previous_ms in 0u64..60_000, seed in any::<u64>()) {
            let policy = backoff(JitterMode::Decorrelated);
            let mut rng = StdRng::seed_from_u64(seed);
            let delay = policy.delay(4, Some(Duration::from_millis(previous_ms)), &mut rng);
            prop_assert!(delay >= Duration::from_millis(25));
            prop_assert!(delay <= Duration::from_secs(20));
            prop_assert!(delay <= Duration::from_millis(previous_ms * 3).max(Duration::from_millis(25)));
        }
    }
}
