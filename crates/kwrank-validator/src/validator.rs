//! Batch rank validation: cache lookups, scheduled probes, aggregation.
//!
//! Each candidate is looked up in the [`ResultCache`] first. Misses become
//! scheduled tasks that run [`RankProbe::locate`] under the circuit breaker,
//! with the [`RetryPolicy`] wrapped around each breaker-guarded attempt.
//! Outcomes are written back to the cache; errors are not.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use kwrank_core::{AppConfig, CandidateKeyword};
use kwrank_probe::{
    BreakerConfig, BreakerSnapshot, CircuitBreaker, Fetcher, ProbeConfig, RankProbe, RetryPolicy,
};
use tokio::sync::mpsc;

use crate::cache::{CacheConfig, CacheStats, ResultCache};
use crate::error::ValidationError;
use crate::scheduler::{
    rate_limiter, Progress, Scheduler, SchedulerConfig, SharedLimiter, StopSignal,
};
use crate::types::{BatchOptions, BatchOutcome, BatchRequest, ValidationEvent, ValidationResult};

/// Everything a [`RankValidator`] needs besides its fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub probe: ProbeConfig,
    pub breaker: BreakerConfig,
    pub retry: RetryPolicy,
    pub cache: CacheConfig,
    pub rate_interval: Duration,
    pub rate_interval_cap: u32,
    /// Options used when a caller has no overrides of their own.
    pub defaults: BatchOptions,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            probe: ProbeConfig::default(),
            breaker: BreakerConfig::default(),
            retry: RetryPolicy::default(),
            cache: CacheConfig::default(),
            rate_interval: scheduler.interval,
            rate_interval_cap: scheduler.interval_cap,
            defaults: BatchOptions::default(),
        }
    }
}

impl ValidatorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let scheduler = SchedulerConfig::from_app_config(config);
        Self {
            probe: ProbeConfig::from_app_config(config),
            breaker: BreakerConfig::from_app_config(config),
            retry: RetryPolicy::from_app_config(config),
            cache: CacheConfig::from_app_config(config),
            rate_interval: scheduler.interval,
            rate_interval_cap: scheduler.interval_cap,
            defaults: BatchOptions::from_app_config(config),
        }
    }
}

struct Inner<F> {
    probe: RankProbe<F>,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    cache: ResultCache,
    /// One start-rate budget for every batch on this validator.
    limiter: Option<SharedLimiter>,
}

/// Validates candidate keywords against one target listing.
///
/// The breaker, cache and start-rate limit are shared by every batch run
/// through the same validator, including batches running concurrently. Build separate validators for isolated state.
pub struct RankValidator<F> {
    inner: Arc<Inner<F>>,
    defaults: BatchOptions,
}

impl<F> std::fmt::Debug for RankValidator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankValidator")
            .field("breaker", &self.inner.breaker.snapshot())
            .field("cache", &self.inner.cache.stats())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Per-batch state shared with every scheduled task.
struct BatchState {
    slots: Mutex<Vec<Option<ValidationResult>>>,
    winners: AtomicUsize,
    max_rank: u32,
    early_stop_count: usize,
    stop: StopSignal,
    events: Option<mpsc::UnboundedSender<ValidationEvent>>,
}

impl BatchState {
    /// Stores a result and raises the stop signal once enough winners exist.
    fn store(&self, index: usize, result: ValidationResult) {
        if result.is_winner(self.max_rank) {
            let winners = self.winners.fetch_add(1, Ordering::SeqCst) + 1;
            if self.early_stop_count > 0
                && winners >= self.early_stop_count
                && !self.stop.is_stopped()
            {
                self.stop.stop();
                tracing::info!(
                    winners,
                    early_stop_count = self.early_stop_count,
                    "early stop reached, no new probes will start"
                );
            }
        }
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    fn emit(&self, event: ValidationEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver only means the caller stopped listening.
            let _ = tx.send(event);
        }
    }

    fn record(&self, index: usize, result: ValidationResult) {
        let winner = self.events.is_some() && result.is_winner(self.max_rank);
        let event = winner.then(|| ValidationEvent::Winner {
            result: result.clone(),
        });
        self.store(index, result);
        if let Some(event) = event {
            self.emit(event);
        }
    }
}

impl<F: Fetcher + 'static> RankValidator<F> {
    /// # Errors
    ///
    /// Returns [`ValidationError::Probe`] if the probe configuration is
    /// invalid (unparseable search URL or blank state marker), or
    /// [`ValidationError::InvalidOption`] for a zero rate interval cap.
    pub fn new(fetcher: F, config: ValidatorConfig) -> Result<Self, ValidationError> {
        let ValidatorConfig {
            probe,
            breaker,
            retry,
            cache,
            rate_interval,
            rate_interval_cap,
            defaults,
        } = config;
        let inner = Inner {
            probe: RankProbe::new(fetcher, probe)?,
            breaker: CircuitBreaker::new(breaker),
            retry,
            cache: ResultCache::new(cache),
            limiter: rate_limiter(rate_interval, rate_interval_cap)?,
        };
        Ok(Self {
            inner: Arc::new(inner),
            defaults,
        })
    }

    #[must_use]
    pub fn default_options(&self) -> BatchOptions {
        self.defaults
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    #[must_use]
    pub fn breaker_snapshot(&self) -> BreakerSnapshot {
        self.inner.breaker.snapshot()
    }

    /// Validates every candidate and returns the aggregate.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] only when the request itself is invalid.
    /// Probe failures are reported per candidate in [`BatchOutcome::all`].
    pub async fn validate_batch(
        &self,
        request: BatchRequest,
    ) -> Result<BatchOutcome, ValidationError> {
        self.run(request, None).await
    }

    /// Like [`Self::validate_batch`], also sending [`ValidationEvent`]s on
    /// `events` as the batch progresses. `Completed` is always the last
    /// event sent. Sending never waits on the receiver.
    ///
    /// # Errors
    ///
    /// Same as [`Self::validate_batch`]; no events are sent for a rejected
    /// request.
    pub async fn validate_batch_streaming(
        &self,
        request: BatchRequest,
        events: mpsc::UnboundedSender<ValidationEvent>,
    ) -> Result<BatchOutcome, ValidationError> {
        self.run(request, Some(events)).await
    }

    async fn run(
        &self,
        request: BatchRequest,
        events: Option<mpsc::UnboundedSender<ValidationEvent>>,
    ) -> Result<BatchOutcome, ValidationError> {
        request.validate()?;
        let BatchRequest {
            target_id,
            candidates,
            options,
        } = request;
        let total = candidates.len();

        let stop = StopSignal::new();
        let batch = Arc::new(BatchState {
            slots: Mutex::new(vec![None; total]),
            winners: AtomicUsize::new(0),
            max_rank: options.max_rank,
            early_stop_count: options.early_stop_count,
            stop: stop.clone(),
            events,
        });

        let mut cached_winners = Vec::new();
        let mut misses = Vec::new();
        for (index, candidate) in candidates.iter().enumerate() {
            match self.inner.cache.get(&candidate.keyword, &target_id) {
                Some(entry) => {
                    let result = ValidationResult::from_cache_entry(candidate, &entry);
                    if result.is_winner(options.max_rank) {
                        cached_winners.push(result.clone());
                    }
                    batch.store(index, result);
                }
                None => misses.push(index),
            }
        }

        tracing::info!(
            target_id = %target_id,
            total,
            cached = total - misses.len(),
            scheduled = misses.len(),
            "starting batch validation"
        );
        batch.emit(ValidationEvent::Started {
            target_id: target_id.clone(),
            total,
            cached: total - misses.len(),
            scheduled: misses.len(),
        });
        for result in cached_winners {
            batch.emit(ValidationEvent::Winner { result });
        }

        let (progress_tx, forwarder) = match &batch.events {
            Some(events) => {
                let (tx, mut rx) = mpsc::unbounded_channel::<Progress>();
                let events = events.clone();
                let handle = tokio::spawn(async move {
                    while let Some(p) = rx.recv().await {
                        let event = ValidationEvent::Progress {
                            completed: p.completed,
                            total: p.total,
                        };
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                });
                (Some(tx), Some(handle))
            }
            None => (None, None),
        };

        let scheduler = Scheduler::with_limiter(
            SchedulerConfig {
                concurrency: options.concurrency,
                ..SchedulerConfig::default()
            },
            self.inner.limiter.clone(),
            stop,
            progress_tx,
        )?;
        scheduler.expect_total(misses.len());

        let target: Arc<str> = Arc::from(target_id.as_str());
        for index in misses {
            let candidate = candidates[index].clone();
            let inner = Arc::clone(&self.inner);
            let batch = Arc::clone(&batch);
            let target = Arc::clone(&target);
            let max_pages = options.max_pages;
            scheduler.add(async move {
                let result = inner.check(&candidate, &target, max_pages).await;
                batch.record(index, result);
            });
        }

        scheduler.on_idle().await;
        let stats = scheduler.stats();
        scheduler.shutdown().await;
        if let Some(handle) = forwarder {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "progress forwarder exited abnormally");
            }
        }

        let slots = std::mem::take(
            &mut *batch.slots.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let mut all = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        for (slot, candidate) in slots.into_iter().zip(candidates) {
            match slot {
                Some(result) => all.push(result),
                None => skipped.push(candidate),
            }
        }
        all.sort_by(compare_results);
        let winners: Vec<ValidationResult> = all
            .iter()
            .filter(|r| r.is_winner(options.max_rank))
            .cloned()
            .collect();

        let outcome = BatchOutcome {
            target_id,
            total,
            processed: all.len(),
            winners,
            all,
            skipped,
            cache_stats: self.inner.cache.stats(),
        };

        tracing::info!(
            target_id = %outcome.target_id,
            processed = outcome.processed,
            winners = outcome.winners.len(),
            skipped = outcome.skipped.len(),
            probes_completed = stats.completed,
            "batch validation finished"
        );
        batch.emit(ValidationEvent::Completed {
            total,
            processed: outcome.processed,
            winners: outcome.winners.len(),
            skipped: outcome.skipped.len(),
        });

        Ok(outcome)
    }
}

impl<F: Fetcher> Inner<F> {
    /// Probes one candidate under retry and breaker, caching a clean outcome.
    async fn check(
        &self,
        candidate: &CandidateKeyword,
        target_id: &str,
        max_pages: u32,
    ) -> ValidationResult {
        let keyword = candidate.keyword.as_str();
        let outcome = self
            .retry
            .run(|| {
                self.breaker
                    .call(|| self.probe.locate(keyword, target_id, max_pages))
            })
            .await;

        match outcome {
            Ok(outcome) => {
                self.cache.set(keyword, target_id, outcome);
                ValidationResult::from_outcome(candidate, outcome)
            }
            Err(err) => {
                tracing::warn!(keyword, target_id, error = %err, "rank probe failed");
                ValidationResult::failed(candidate, err.to_string())
            }
        }
    }
}

/// Ranked results first by rank, unranked after, ties broken by keyword.
fn compare_results(a: &ValidationResult, b: &ValidationResult) -> CmpOrdering {
    match (a.rank, b.rank) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
    .then_with(|| a.keyword.cmp(&b.keyword))
}
