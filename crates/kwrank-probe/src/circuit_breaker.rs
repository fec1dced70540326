//! Circuit breaker guarding the upstream search endpoint.
//!
//! # State Machine
//!
//! ```text
//! ┌────────┐  N consecutive failures  ┌────────┐  reset timeout  ┌──────────┐
//! │ Closed ├─────────────────────────►│  Open  ├────────────────►│ HalfOpen │
//! └───▲────┘                          └───▲────┘                 └────┬─────┘
//!     │                                   │        any failure        │
//!     │                                   └───────────────────────────┤
//!     │               M consecutive successes                         │
//!     └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! While half-open only one trial call runs at a time; concurrent callers
//! fail fast with [`ProbeError::BreakerOpen`] just as they do while open.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kwrank_core::AppConfig;
use serde::Serialize;
use tokio::time::Instant;

use crate::error::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast until the reset timeout has elapsed.
    Open,
    /// A single trial call at a time decides whether to close or re-open.
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

impl BreakerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            failure_threshold: config.breaker_failure_threshold,
            success_threshold: config.breaker_success_threshold,
            reset_timeout: Duration::from_secs(config.breaker_reset_timeout_secs),
        }
    }
}

/// Read-only view of the breaker's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Time since the most recent failure, if any.
    #[serde(skip)]
    pub since_last_failure: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_time: Option<Instant>,
    trial_in_flight: bool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure_time: None,
            trial_in_flight: false,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `operation` if the breaker admits it and records the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::BreakerOpen`] without running `operation` when
    /// the breaker is open, or half-open with a trial already in flight.
    /// Otherwise returns whatever `operation` returns.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, ProbeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProbeError>>,
    {
        self.try_acquire()?;
        let mut pending = PendingCall {
            breaker: self,
            settled: false,
        };
        let result = operation().await;
        pending.settled = true;
        match &result {
            Ok(_) => self.record_success(),
            Err(err) => self.record_failure(err),
        }
        result
    }

    /// Admits or rejects one call, moving Open to HalfOpen once the reset
    /// timeout has passed.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::BreakerOpen`] with the remaining wait when the
    /// call is rejected.
    pub fn try_acquire(&self) -> Result<(), ProbeError> {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure_time
                    .map_or(self.config.reset_timeout, |t| t.elapsed());
                if elapsed >= self.config.reset_timeout {
                    inner.state = BreakerState::HalfOpen;
                    inner.consecutive_successes = 0;
                    inner.trial_in_flight = true;
                    tracing::info!("circuit breaker half-open, admitting trial call");
                    Ok(())
                } else {
                    Err(open_error(self.config.reset_timeout - elapsed))
                }
            }
            BreakerState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(open_error(Duration::ZERO))
                } else {
                    inner.trial_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Records a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures = 0;
                inner.consecutive_successes = inner.consecutive_successes.saturating_add(1);
            }
            BreakerState::HalfOpen => {
                inner.trial_in_flight = false;
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    tracing::info!("circuit breaker closed after successful trials");
                }
            }
            // A call admitted before the breaker opened finished late.
            BreakerState::Open => {}
        }
    }

    /// Records a failed call.
    pub fn record_failure(&self, err: &ProbeError) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.consecutive_successes = 0;
        inner.last_failure_time = Some(Instant::now());
        match inner.state {
            BreakerState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = BreakerState::Open;
                    tracing::warn!(
                        consecutive_failures = inner.consecutive_failures,
                        reset_timeout_secs = self.config.reset_timeout.as_secs(),
                        error = %err,
                        "circuit breaker opened"
                    );
                }
            }
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.trial_in_flight = false;
                tracing::warn!(error = %err, "circuit breaker trial failed, re-opened");
            }
            BreakerState::Open => {}
        }
    }

    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            since_last_failure: inner.last_failure_time.map(|t| t.elapsed()),
        }
    }

    /// Returns to Closed with all counters cleared.
    pub fn reset(&self) {
        *self.lock() = Inner::default();
        tracing::info!("circuit breaker reset");
    }

    fn release_trial(&self) {
        let mut inner = self.lock();
        if inner.state == BreakerState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }
}

/// Frees the half-open trial slot if the guarded future is dropped before
/// it completes.
struct PendingCall<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release_trial();
        }
    }
}

fn open_error(remaining: Duration) -> ProbeError {
    #[allow(clippy::cast_possible_truncation)]
    let retry_in_ms = remaining.as_millis() as u64;
    ProbeError::BreakerOpen { retry_in_ms }
}

#[cfg(test)]
#[path = "circuit_breaker_test.rs"]
mod tests;
