//! Bounded worker pool with a shared start-rate limit and cooperative stop.
//!
//! `concurrency` workers pull boxed tasks from one queue. Before a task
//! starts, its worker waits for a token from a `governor` bucket that admits
//! at most `interval_cap` starts per `interval` across the whole pool.
//!
//! The bucket is an `Arc`, so schedulers built with
//! [`Scheduler::with_limiter`] over one [`SharedLimiter`] draw from the same
//! budget.
//!
//! The [`StopSignal`] is checked when a task is dequeued and again once the
//! rate token has been granted. A task that sees it set is dropped unrun and
//! counted as skipped; tasks already running always finish.

use std::num::NonZeroU32;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use kwrank_core::AppConfig;
use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub concurrency: usize,
    pub interval: Duration,
    /// Task starts admitted per `interval`. Also the burst size.
    pub interval_cap: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            interval: Duration::from_millis(1_000),
            interval_cap: 20,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            interval: Duration::from_millis(config.rate_interval_ms),
            interval_cap: config.rate_interval_cap,
        }
    }
}

/// Shared early-stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sent once per completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    /// The total announced with [`Scheduler::expect_total`], or the tasks
    /// submitted so far if that is larger.
    pub total: usize,
}

/// A start-rate bucket that several schedulers can share.
pub type SharedLimiter = Arc<DefaultDirectRateLimiter>;

/// Builds a bucket admitting `interval_cap` starts per `interval`.
///
/// Returns `Ok(None)` for a zero `interval`, which disables rate limiting.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidOption`] when `interval_cap` is zero.
pub fn rate_limiter(
    interval: Duration,
    interval_cap: u32,
) -> Result<Option<SharedLimiter>, ValidationError> {
    let cap = NonZeroU32::new(interval_cap).ok_or_else(|| {
        ValidationError::InvalidOption("rate interval cap must be at least 1".to_string())
    })?;
    Ok(Quota::with_period(interval / cap.get())
        .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(cap)))))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub submitted: usize,
    pub completed: usize,
    pub skipped: usize,
}

type Task = BoxFuture<'static, ()>;

struct Shared {
    stop: StopSignal,
    limiter: Option<SharedLimiter>,
    pending: watch::Sender<usize>,
    expected: AtomicUsize,
    submitted: AtomicUsize,
    completed: AtomicUsize,
    skipped: AtomicUsize,
    progress: Option<mpsc::UnboundedSender<Progress>>,
}

impl Shared {
    fn finish_one(&self) {
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    fn complete(&self) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(tx) = &self.progress {
            // A dropped receiver only means nobody is listening.
            let _ = tx.send(Progress {
                completed,
                total: self
                    .expected
                    .load(Ordering::SeqCst)
                    .max(self.submitted.load(Ordering::SeqCst)),
            });
        }
        self.finish_one();
    }

    fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.finish_one();
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
    sender: Option<mpsc::UnboundedSender<Task>>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("workers", &self.workers.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Spawns the worker pool with its own rate bucket. Must be called from
    /// inside a tokio runtime.
    ///
    /// A zero `interval` disables rate limiting.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOption`] when `concurrency` or
    /// `interval_cap` is zero.
    pub fn new(
        config: SchedulerConfig,
        stop: StopSignal,
        progress: Option<mpsc::UnboundedSender<Progress>>,
    ) -> Result<Self, ValidationError> {
        let limiter = rate_limiter(config.interval, config.interval_cap)?;
        Self::with_limiter(config, limiter, stop, progress)
    }

    /// Spawns the worker pool drawing start tokens from `limiter`.
    ///
    /// `config.interval` and `config.interval_cap` are not consulted; the
    /// limiter already carries the rate.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOption`] when `concurrency` is zero.
    pub fn with_limiter(
        config: SchedulerConfig,
        limiter: Option<SharedLimiter>,
        stop: StopSignal,
        progress: Option<mpsc::UnboundedSender<Progress>>,
    ) -> Result<Self, ValidationError> {
        if config.concurrency == 0 {
            return Err(ValidationError::InvalidOption(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let (pending, _) = watch::channel(0usize);
        let shared = Arc::new(Shared {
            stop,
            limiter,
            pending,
            expected: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            progress,
        });

        let (sender, receiver) = mpsc::unbounded_channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..config.concurrency)
            .map(|_| tokio::spawn(worker(Arc::clone(&receiver), Arc::clone(&shared))))
            .collect();

        Ok(Self {
            config,
            sender: Some(sender),
            workers,
            shared,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    #[must_use]
    pub fn stop_signal(&self) -> &StopSignal {
        &self.shared.stop
    }

    /// Announces how many tasks this scheduler will receive, so progress
    /// totals are right before every task has been added.
    pub fn expect_total(&self, total: usize) {
        self.shared.expected.store(total, Ordering::SeqCst);
    }

    /// Enqueues `task`. Returns `false` if the scheduler has been shut down.
    pub fn add<F>(&self, task: F) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Some(sender) = &self.sender else {
            return false;
        };
        self.shared.pending.send_modify(|n| *n += 1);
        self.shared.submitted.fetch_add(1, Ordering::SeqCst);
        if sender.send(Box::pin(task)).is_err() {
            self.shared.submitted.fetch_sub(1, Ordering::SeqCst);
            self.shared.finish_one();
            return false;
        }
        true
    }

    /// Waits until every enqueued task has completed or been skipped.
    pub async fn on_idle(&self) {
        let mut pending = self.shared.pending.subscribe();
        // The sender lives in `self.shared`, so this cannot observe a closed channel.
        let _ = pending.wait_for(|n| *n == 0).await;
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.shared.submitted.load(Ordering::SeqCst),
            completed: self.shared.completed.load(Ordering::SeqCst),
            skipped: self.shared.skipped.load(Ordering::SeqCst),
        }
    }

    /// Closes the queue and waits for the workers to drain it.
    pub async fn shutdown(mut self) {
        self.sender.take();
        for handle in std::mem::take(&mut self.workers) {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "scheduler worker exited abnormally");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for handle in &self.workers {
            handle.abort();
        }
    }
}

async fn worker(receiver: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>, shared: Arc<Shared>) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(task) = next else { break };

        if shared.stop.is_stopped() {
            shared.skip();
            continue;
        }
        if let Some(limiter) = &shared.limiter {
            limiter.until_ready().await;
        }
        if shared.stop.is_stopped() {
            shared.skip();
            continue;
        }

        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
            tracing::error!("scheduled task panicked");
        }
        shared.complete();
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
