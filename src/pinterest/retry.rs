use rand::Rng;
use std::time::Duration;

/// Backoff schedule for the create-pin retry loop: the pause before attempt
/// `k` is `2^k * base_delay` plus a uniform jitter in `[0, max_jitter)`.
/// Kept as a small standalone unit so tests can zero the jitter and assert
/// the exact schedule.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl BackoffPolicy {
    /// The production policy the platform's published rate limits call for.
    pub fn publish_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
        }
    }

    /// Deterministic variant for tests and offline schedule inspection.
    pub fn without_jitter(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_jitter: Duration::ZERO,
        }
    }

    /// Pause taken before attempt `attempt` (1-based; attempt 1 never waits).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay * 2u32.saturating_pow(attempt);
        exponential + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_doubles_without_jitter() {
        let policy = BackoffPolicy::without_jitter(3, Duration::from_millis(1000));
        assert_eq!(policy.delay_before(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_before(3), Duration::from_millis(8000));
    }

    #[test]
    fn jitter_stays_inside_bound() {
        let policy = BackoffPolicy::publish_default();
        for _ in 0..50 {
            let delay = policy.delay_before(2);
            assert!(delay >= Duration::from_millis(4000));
            assert!(delay < Duration::from_millis(5000));
        }
    }
}
