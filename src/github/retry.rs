// Bounded exponential backoff for polling GitHub state that is computed
// asynchronously on the server side (e.g. the mergeable flag)

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            base_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the given zero-based attempt: base * 2^attempt,
    /// capped at `max_delay`. With jitter the delay is drawn from [d/2, d].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let half = delay / 2;
        let spread = rand::rng().random_range(0..=half.as_millis() as u64);
        half + Duration::from_millis(spread)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
            jitter: false,
        }
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let config = no_jitter();
        assert_eq!(config.delay_for(0), Duration::from_millis(500));
        assert_eq!(config.delay_for(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = no_jitter();
        assert_eq!(config.delay_for(3), Duration::from_secs(3));
        assert_eq!(config.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig {
            jitter: true,
            ..no_jitter()
        };
        for attempt in 0..6 {
            let upper = no_jitter().delay_for(attempt);
            let delay = config.delay_for(attempt);
            assert!(delay >= upper / 2, "{delay:?} below half of {upper:?}");
            assert!(delay <= upper, "{delay:?} above {upper:?}");
        }
    }
}
