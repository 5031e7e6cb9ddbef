use std::time::Duration;

/// How often a request rejected with `401 Unauthorized` is retried, and how
/// long to pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthRetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for AuthRetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, backoff: Duration::from_secs(5) }
    }
}

impl AuthRetryPolicy {
    /// Total attempts a request gets, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allows_three_retries() {
        let policy = AuthRetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert!(policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let policy = AuthRetryPolicy { max_retries: 0, backoff: Duration::ZERO };
        assert!(!policy.should_retry(1));
    }
}
