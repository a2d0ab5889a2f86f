use chrono::TimeDelta;

use crate::config::RetryConfig;

/// Exponential backoff with a ceiling: `min(max, base * 2^(attempt - 1))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay_seconds: u64,
    max_delay_seconds: u64,
}

/// What to do with a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(TimeDelta),
    DeadLetter,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(base_delay_seconds: u64, max_delay_seconds: u64) -> Self {
        Self {
            base_delay_seconds,
            max_delay_seconds,
        }
    }

    #[must_use]
    pub const fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.base_delay_seconds, config.max_delay_seconds)
    }

    /// Backoff in seconds before retrying after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_seconds(&self, attempt: u32) -> u64 {
        let multiplier = 2_u64
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);

        self.base_delay_seconds
            .saturating_mul(multiplier)
            .min(self.max_delay_seconds)
    }

    #[must_use]
    pub fn delay(&self, attempt: u32) -> TimeDelta {
        let seconds = i64::try_from(self.delay_seconds(attempt)).unwrap_or(i64::MAX);
        TimeDelta::try_seconds(seconds).unwrap_or(TimeDelta::MAX)
    }

    /// Decide the fate of a job whose failure count has just become `retry_count`.
    #[must_use]
    pub fn decide(&self, retry_count: i32, max_retries: i32) -> RetryDecision {
        if retry_count > max_retries {
            RetryDecision::DeadLetter
        } else {
            let attempt = u32::try_from(retry_count).unwrap_or(1).max(1);
            RetryDecision::RetryAfter(self.delay(attempt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_schedule() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_seconds(1), 30);
        assert_eq!(policy.delay_seconds(2), 60);
        assert_eq!(policy.delay_seconds(3), 120);
        assert_eq!(policy.delay_seconds(4), 240);
        assert_eq!(policy.delay_seconds(5), 480);
        assert_eq!(policy.delay_seconds(6), 600);
        assert_eq!(policy.delay_seconds(10), 600);
    }

    #[test]
    fn test_huge_attempt_numbers_saturate_at_cap() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_seconds(64), 600);
        assert_eq!(policy.delay_seconds(u32::MAX), 600);
        assert_eq!(policy.delay(u32::MAX), TimeDelta::seconds(600));
    }

    #[test]
    fn test_decide_retries_until_threshold_is_exceeded() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.decide(1, 3),
            RetryDecision::RetryAfter(TimeDelta::seconds(30))
        );
        assert_eq!(
            policy.decide(3, 3),
            RetryDecision::RetryAfter(TimeDelta::seconds(120))
        );
        assert_eq!(policy.decide(4, 3), RetryDecision::DeadLetter);
    }

    #[test]
    fn test_zero_max_retries_dead_letters_on_first_failure() {
        assert_eq!(
            RetryPolicy::default().decide(1, 0),
            RetryDecision::DeadLetter
        );
    }

    #[test]
    fn test_custom_policy() {
        let policy = RetryPolicy::new(5, 20);

        assert_eq!(policy.delay_seconds(1), 5);
        assert_eq!(policy.delay_seconds(2), 10);
        assert_eq!(policy.delay_seconds(3), 20);
        assert_eq!(policy.delay_seconds(4), 20);
    }
}
