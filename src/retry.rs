//! Bounded exponential backoff for transient failures.
//!
//! Two independent retry layers use this policy: the HTTP transport (network
//! errors and retryable statuses) and the query state machine (errors the
//! server flags as retryable). Each layer keeps its own attempt counter.

use std::time::Duration;

/// Retry policy with exponential backoff and a hard attempt bound.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,

    /// Upper bound on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = (self.base_delay.as_millis() as u64)
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(millis).min(self.max_delay)
    }

    /// Whether another retry is allowed after `attempt` retries so far.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// HTTP statuses the transport retries: request timeout, too many requests,
/// service unavailable, gateway timeout.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 503 | 504)
}
