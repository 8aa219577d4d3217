//! Timeout and retry policy for upstream requests.

use std::time::Duration;

/// Upper bound on a single backoff sleep.
pub const MAX_BACKOFF: Duration = Duration::from_millis(5_000);

const FALLBACK_TIMEOUT_MS: u64 = 30_000;
const FALLBACK_BASE_DELAY_MS: u64 = 600;

/// Whether an HTTP status is worth another attempt.
///
/// 408, 409, 425, 429 and every 5xx are retryable; everything else is final.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 425 | 429) || status >= 500
}

/// Per-request timeout and exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Hard limit for one attempt (connect + headers + body).
    pub timeout: Duration,
    /// Attempts after the first one.
    pub retries: u32,
    /// Delay before the second attempt; doubles each time.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy from millisecond values; zero timeouts and delays fall
    /// back to 30 s and 600 ms.
    pub fn from_millis(timeout_ms: u64, retries: u32, base_delay_ms: u64) -> Self {
        let timeout_ms = if timeout_ms == 0 {
            FALLBACK_TIMEOUT_MS
        } else {
            timeout_ms
        };
        let base_delay_ms = if base_delay_ms == 0 {
            FALLBACK_BASE_DELAY_MS
        } else {
            base_delay_ms
        };
        Self {
            timeout: Duration::from_millis(timeout_ms),
            retries,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    /// A single attempt with the given timeout.
    pub fn single_attempt(timeout_ms: u64) -> Self {
        Self::from_millis(timeout_ms, 0, FALLBACK_BASE_DELAY_MS)
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Sleep before the attempt following `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Timeout in milliseconds, as echoed in timeout failures.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(FALLBACK_TIMEOUT_MS, 2, FALLBACK_BASE_DELAY_MS)
    }
}
