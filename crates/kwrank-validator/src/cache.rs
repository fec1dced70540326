//! TTL cache of probe outcomes keyed by `(keyword, target_id)`.
//!
//! Entries live in a [`DashMap`] so concurrent workers read and write
//! without a global lock. Expired entries are dropped lazily on read and
//! by a background sweep task that is aborted when the cache is dropped.
//!
//! The cache is not size-bounded: a long-running process probing an
//! unbounded keyword space grows until the next sweep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use kwrank_core::AppConfig;
use kwrank_probe::ProbeOutcome;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3_600),
            sweep_interval: Duration::from_secs(600),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.cache_ttl_secs),
            sweep_interval: Duration::from_secs(config.cache_sweep_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub outcome: ProbeOutcome,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    #[must_use]
    pub fn new(outcome: ProbeOutcome, cached_at: DateTime<Utc>) -> Self {
        Self { outcome, cached_at }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    expires_at: Instant,
}

#[derive(Debug)]
struct Shared {
    entries: DashMap<String, Slot>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Shared {
    /// Removes every expired entry and returns how many were dropped.
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.expires_at > now);
        before.saturating_sub(self.entries.len())
    }
}

#[derive(Debug)]
pub struct ResultCache {
    config: CacheConfig,
    shared: Arc<Shared>,
    sweeper: Option<JoinHandle<()>>,
}

fn cache_key(keyword: &str, target_id: &str) -> String {
    format!("{keyword}:{target_id}")
}

impl ResultCache {
    /// Creates an empty cache.
    ///
    /// The periodic sweep only starts when called from inside a tokio
    /// runtime; outside one, expired entries are still dropped on read.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let shared = Arc::new(Shared {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        });

        let sweeper = if config.sweep_interval.is_zero() {
            None
        } else {
            tokio::runtime::Handle::try_current()
                .ok()
                .map(|handle| handle.spawn(sweep_loop(Arc::clone(&shared), config.sweep_interval)))
        };

        Self {
            config,
            shared,
            sweeper,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the live entry for the pair, counting a hit or a miss.
    ///
    /// An expired entry counts as a miss and is removed.
    #[must_use]
    pub fn get(&self, keyword: &str, target_id: &str) -> Option<CacheEntry> {
        let key = cache_key(keyword, target_id);
        let now = Instant::now();
        if let Some(slot) = self.shared.entries.get(&key) {
            if slot.expires_at > now {
                self.shared.hits.fetch_add(1, Ordering::Relaxed);
                return Some(slot.entry.clone());
            }
        }
        self.shared
            .entries
            .remove_if(&key, |_, slot| slot.expires_at <= now);
        self.shared.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores `outcome` for the pair, stamping `cached_at` with the current time.
    pub fn set(&self, keyword: &str, target_id: &str, outcome: ProbeOutcome) {
        let slot = Slot {
            entry: CacheEntry::new(outcome, Utc::now()),
            expires_at: Instant::now() + self.config.ttl,
        };
        self.shared.entries.insert(cache_key(keyword, target_id), slot);
    }

    /// Whether a live entry exists. Does not touch the hit/miss counters.
    #[must_use]
    pub fn has(&self, keyword: &str, target_id: &str) -> bool {
        let now = Instant::now();
        self.shared
            .entries
            .get(&cache_key(keyword, target_id))
            .is_some_and(|slot| slot.expires_at > now)
    }

    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        self.shared.entries.clear();
        self.shared.hits.store(0, Ordering::Relaxed);
        self.shared.misses.store(0, Ordering::Relaxed);
    }

    /// Runs one sweep immediately, returning the number of entries removed.
    pub fn sweep(&self) -> usize {
        self.shared.sweep()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.shared.hits.load(Ordering::Relaxed),
            misses: self.shared.misses.load(Ordering::Relaxed),
            keys: self.shared.entries.len(),
        }
    }
}

impl Drop for ResultCache {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

async fn sweep_loop(shared: Arc<Shared>, every: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    loop {
        ticker.tick().await;
        let removed = shared.sweep();
        if removed > 0 {
            tracing::debug!(removed, remaining = shared.entries.len(), "swept expired cache entries");
        }
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
