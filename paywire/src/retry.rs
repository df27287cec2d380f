//! Bounded exponential backoff for paid submissions.

use rand::RngExt;
use rand::rng;
use std::time::Duration;

/// How often and how patiently a single candidate is resubmitted.
///
/// State is never stored here: the engine passes an explicit attempt counter,
/// so concurrent calls sharing one policy do not interfere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor applied per failed attempt.
    pub multiplier: f64,
    /// Upper bound of the uniform jitter added to each delay.
    pub max_jitter: Duration,
    /// Ceiling on the delay before jitter.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_jitter: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Sets the attempt bound. Zero is treated as one.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Submissions allowed per candidate, including the first. Never zero.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the growth factor.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the jitter bound.
    #[must_use]
    pub const fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Sets the delay ceiling.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Whether another submission is allowed after `attempts` have been made.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        let bound = if self.max_attempts == 0 { 1 } else { self.max_attempts };
        attempts < bound
    }

    /// Backoff before the next submission, without jitter.
    ///
    /// `failed` counts the attempts that already failed, starting at 1.
    #[must_use]
    pub fn base_delay_for(&self, failed: u32) -> Duration {
        let exponent = i32::try_from(failed.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.max(1.0).powi(exponent);
        let secs = self.base_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Backoff before the next submission, with jitter in `[0, max_jitter]`.
    #[must_use]
    pub fn delay_for(&self, failed: u32) -> Duration {
        let base = self.base_delay_for(failed);
        let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.base_delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.base_delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default().with_max_delay(Duration::from_secs(3));
        assert_eq!(policy.base_delay_for(10), Duration::from_secs(3));
        assert_eq!(policy.base_delay_for(u32::MAX), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let policy = RetryPolicy::default();
        for failed in 1..4 {
            let base = policy.base_delay_for(failed);
            let delay = policy.delay_for(failed);
            assert!(delay >= base);
            assert!(delay <= base + policy.max_jitter);
        }
    }

    #[test]
    fn test_later_retry_always_waits_longer_when_jitter_is_small() {
        let policy = RetryPolicy::default().with_max_jitter(Duration::from_millis(100));
        for _ in 0..50 {
            assert!(policy.delay_for(2) > policy.delay_for(1));
        }
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let policy = RetryPolicy::default().with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(1));

        let literal = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(literal.should_retry(0));
        assert!(!literal.should_retry(1));
    }
}
