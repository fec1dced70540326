//! Exponential back-off with jitter for transient probe failures.
//!
//! Only errors for which [`ProbeError::is_retryable`] holds are retried.
//! Everything else, including [`ProbeError::BreakerOpen`], is returned after
//! the first attempt.

use std::future::Future;
use std::time::Duration;

use kwrank_core::AppConfig;

use crate::error::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `1` disables retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the uniform random delay added to each back-off.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            jitter: Duration::from_millis(config.retry_jitter_ms),
        }
    }

    /// Back-off to sleep after failed attempt number `attempt` (1-based).
    ///
    /// | Attempt | Delay (before jitter) |
    /// |---------|-----------------------|
    /// | 1 | `base_delay` |
    /// | 2 | `base_delay` x 2 |
    /// | 3 | `base_delay` x 4 |
    ///
    /// The jittered value is capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.jitter.mul_f64(rand::random::<f64>())
        };
        backoff.saturating_add(jitter).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or `max_attempts` attempts have been made.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once attempts
    /// are exhausted.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ProbeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProbeError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() || attempt >= max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    #[allow(clippy::cast_possible_truncation)]
                    let delay_ms = delay.as_millis() as u64;
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms,
                        error = %err,
                        "transient probe error, retrying after back-off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
