//! Batch request, per-candidate result, and event types.

use chrono::{DateTime, Utc};
use kwrank_core::{AppConfig, CandidateKeyword, Tier};
use kwrank_probe::ProbeOutcome;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, CacheStats};
use crate::error::ValidationError;

/// Resolved outcome for one candidate keyword.
///
/// Exactly one of `rank`, `not_found` and `error` describes the outcome.
/// Fields are public for reading; build values through the constructors so
/// that stays true.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub keyword: String,
    pub tier: Tier,
    pub rank: Option<u32>,
    pub page: Option<u32>,
    pub from_cache: bool,
    pub not_found: bool,
    pub error: Option<String>,
    pub found_at: Option<DateTime<Utc>>,
}

impl ValidationResult {
    /// The target appeared at `rank` on `page`.
    #[must_use]
    pub fn found(candidate: &CandidateKeyword, rank: u32, page: u32, from_cache: bool) -> Self {
        Self {
            keyword: candidate.keyword.clone(),
            tier: candidate.tier,
            rank: Some(rank),
            page: Some(page),
            from_cache,
            not_found: false,
            error: None,
            found_at: Some(Utc::now()),
        }
    }

    #[must_use]
    pub fn not_found(candidate: &CandidateKeyword, from_cache: bool) -> Self {
        Self {
            keyword: candidate.keyword.clone(),
            tier: candidate.tier,
            rank: None,
            page: None,
            from_cache,
            not_found: true,
            error: None,
            found_at: None,
        }
    }

    /// The probe failed; errors are never served from cache.
    #[must_use]
    pub fn failed(candidate: &CandidateKeyword, error: impl Into<String>) -> Self {
        Self {
            keyword: candidate.keyword.clone(),
            tier: candidate.tier,
            rank: None,
            page: None,
            from_cache: false,
            not_found: false,
            error: Some(error.into()),
            found_at: None,
        }
    }

    #[must_use]
    pub fn from_outcome(candidate: &CandidateKeyword, outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Found { rank, page } => Self::found(candidate, rank, page, false),
            ProbeOutcome::NotFound => Self::not_found(candidate, false),
        }
    }

    /// Rebuilds a result from a cache hit. A found entry keeps the time it
    /// was originally cached as `found_at`.
    #[must_use]
    pub fn from_cache_entry(candidate: &CandidateKeyword, entry: &CacheEntry) -> Self {
        match entry.outcome {
            ProbeOutcome::Found { rank, page } => Self {
                found_at: Some(entry.cached_at),
                ..Self::found(candidate, rank, page, true)
            },
            ProbeOutcome::NotFound => Self::not_found(candidate, true),
        }
    }

    #[must_use]
    pub fn is_winner(&self, max_rank: u32) -> bool {
        self.rank.is_some_and(|rank| rank <= max_rank)
    }
}

/// Per-batch knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    /// Worker tasks probing in parallel.
    pub concurrency: usize,
    /// A result ranked at or above this is a winner.
    pub max_rank: u32,
    pub max_pages: u32,
    /// Stop starting new probes once this many winners are known. `0` disables.
    pub early_stop_count: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 10,
            max_rank: 5,
            max_pages: 2,
            early_stop_count: 0,
        }
    }
}

impl BatchOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            max_rank: config.max_rank,
            max_pages: config.max_pages,
            early_stop_count: 0,
        }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOption`] for a zero concurrency,
    /// `max_rank` or `max_pages`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.concurrency == 0 {
            return Err(ValidationError::InvalidOption(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_rank == 0 {
            return Err(ValidationError::InvalidOption(
                "max_rank must be at least 1".to_string(),
            ));
        }
        if self.max_pages == 0 {
            return Err(ValidationError::InvalidOption(
                "max_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub target_id: String,
    pub candidates: Vec<CandidateKeyword>,
    pub options: BatchOptions,
}

impl BatchRequest {
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingTargetId`] for a blank target,
    /// [`ValidationError::EmptyCandidates`] for an empty candidate list, or
    /// the first invalid option.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target_id.trim().is_empty() {
            return Err(ValidationError::MissingTargetId);
        }
        if self.candidates.is_empty() {
            return Err(ValidationError::EmptyCandidates);
        }
        self.options.validate()
    }
}

/// Aggregate result of one batch.
///
/// Every candidate appears exactly once across `all` and `skipped`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub target_id: String,
    pub total: usize,
    pub processed: usize,
    /// Results with `rank <= max_rank`, best rank first.
    pub winners: Vec<ValidationResult>,
    /// Every processed result ordered by rank, unranked last, then keyword.
    pub all: Vec<ValidationResult>,
    /// Candidates never started because the batch stopped early.
    pub skipped: Vec<CandidateKeyword>,
    pub cache_stats: CacheStats,
}

/// Streamed batch events, serialized as `{"event": "...", ...}` JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ValidationEvent {
    Started {
        target_id: String,
        total: usize,
        cached: usize,
        scheduled: usize,
    },
    /// One scheduled probe finished.
    Progress { completed: usize, total: usize },
    Winner { result: ValidationResult },
    Completed {
        total: usize,
        processed: usize,
        winners: usize,
        skipped: usize,
    },
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
