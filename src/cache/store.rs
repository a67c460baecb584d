//! Response cache storage.
//!
//! A process-wide map from request fingerprint to a previously computed
//! response body, with per-entry TTL. Expired entries are dropped lazily on
//! read and eagerly by [`ResponseCache::sweep_expired`]. Capacity is not
//! bounded; only time evicts.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use jobscout_api_types::{CacheStats, PatternClear};
use metrics::{counter, gauge};
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "jobscout_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "jobscout_cache_miss_total";
pub(crate) const METRIC_CACHE_EXPIRED: &str = "jobscout_cache_expired_total";
pub(crate) const METRIC_CACHE_KEYS: &str = "jobscout_cache_keys";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("pattern must not be empty")]
    EmptyPattern,
}

struct CacheEntry<V> {
    value: V,
    /// `None` for entries written with a zero TTL, or a TTL past the clock's range.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    expired: AtomicU64,
}

impl Counters {
    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.expired.store(0, Ordering::Relaxed);
    }
}

/// Keyed TTL store for JSON-serializable responses.
///
/// `V` defaults to [`serde_json::Value`]; callers that only ever cache one
/// response shape can store that type directly.
pub struct ResponseCache<V = Value> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    counters: Counters,
}

impl<V: Clone> ResponseCache<V> {
    /// Create an empty cache using the configured default TTL.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_default_ttl(config.default_ttl())
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            counters: Counters::default(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a live entry. A miss is a normal outcome, never an error.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let lookup = {
            let entries = rw_read(&self.entries, SOURCE, "get");
            entries.get(key).map(|entry| {
                if entry.is_expired(now) {
                    None
                } else {
                    Some(entry.value.clone())
                }
            })
        };

        match lookup {
            Some(Some(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                counter!(METRIC_CACHE_HIT).increment(1);
                Some(value)
            }
            Some(None) => {
                self.remove_if_expired(key, now);
                self.record_miss();
                None
            }
            None => {
                self.record_miss();
                None
            }
        }
    }

    /// Insert or replace an entry. A zero `ttl` stores the entry without expiry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: if ttl.is_zero() {
                None
            } else {
                now.checked_add(ttl)
            },
        };

        let held = {
            let mut entries = rw_write(&self.entries, SOURCE, "set");
            entries.insert(key.into(), entry);
            live_count(&entries, now)
        };

        self.counters.sets.fetch_add(1, Ordering::Relaxed);
        gauge!(METRIC_CACHE_KEYS).set(held as f64);
    }

    /// Insert or replace an entry using the default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Remove an entry. Returns true if a live entry was removed.
    pub fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        let (removed, held) = {
            let mut entries = rw_write(&self.entries, SOURCE, "delete");
            let removed = entries.remove(key);
            (removed, live_count(&entries, now))
        };
        gauge!(METRIC_CACHE_KEYS).set(held as f64);

        match removed {
            Some(entry) if entry.is_expired(now) => {
                self.record_expired(1);
                false
            }
            Some(_) => {
                self.counters.deletes.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Returns the number of entries dropped.
    pub fn flush(&self) -> usize {
        let removed = {
            let mut entries = rw_write(&self.entries, SOURCE, "flush");
            let count = entries.len();
            entries.clear();
            count
        };

        self.counters
            .deletes
            .fetch_add(removed as u64, Ordering::Relaxed);
        gauge!(METRIC_CACHE_KEYS).set(0.0);
        removed
    }

    /// Names of all live keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "keys")
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        live_count(&rw_read(&self.entries, SOURCE, "len"), Instant::now())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete every live key containing `pattern` as a plain substring.
    pub fn clear_by_pattern(&self, pattern: &str) -> Result<PatternClear, CacheError> {
        if pattern.is_empty() {
            return Err(CacheError::EmptyPattern);
        }

        let now = Instant::now();
        let (expired, deleted, remaining) = {
            let mut entries = rw_write(&self.entries, SOURCE, "clear_by_pattern");

            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            let expired = before - entries.len();

            let live = entries.len();
            entries.retain(|key, _| !key.contains(pattern));
            let remaining = entries.len();

            (expired, live - remaining, remaining)
        };

        if expired > 0 {
            self.record_expired(expired);
        }
        self.counters
            .deletes
            .fetch_add(deleted as u64, Ordering::Relaxed);
        gauge!(METRIC_CACHE_KEYS).set(remaining as f64);

        Ok(PatternClear {
            pattern: pattern.to_string(),
            deleted_count: deleted,
            remaining_keys: remaining,
        })
    }

    /// Drop all expired entries. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let (removed, held) = {
            let mut entries = rw_write(&self.entries, SOURCE, "sweep_expired");
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            (before - entries.len(), entries.len())
        };

        if removed > 0 {
            self.record_expired(removed);
        }
        gauge!(METRIC_CACHE_KEYS).set(held as f64);
        removed
    }

    /// Cumulative counters since creation or the last [`reset_stats`](Self::reset_stats).
    pub fn stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };

        CacheStats {
            hits,
            misses,
            keys: self.len(),
            sets: self.counters.sets.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
            hit_rate,
            default_ttl_seconds: self.default_ttl.as_secs(),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    fn remove_if_expired(&self, key: &str, now: Instant) {
        let mut entries = rw_write(&self.entries, SOURCE, "remove_if_expired");
        // A concurrent `set` may have replaced the entry since the read.
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            drop(entries);
            self.record_expired(1);
        }
    }

    fn record_miss(&self) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        counter!(METRIC_CACHE_MISS).increment(1);
    }

    fn record_expired(&self, count: usize) {
        self.counters
            .expired
            .fetch_add(count as u64, Ordering::Relaxed);
        counter!(METRIC_CACHE_EXPIRED).increment(count as u64);
    }
}

fn live_count<V>(entries: &HashMap<String, CacheEntry<V>>, now: Instant) -> usize {
    entries
        .values()
        .filter(|entry| !entry.is_expired(now))
        .count()
}
