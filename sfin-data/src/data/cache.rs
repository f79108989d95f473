//! Result cache for upstream statement payloads.
//!
//! In-memory TTL cache keyed by request fingerprint. Expired entries are
//! logically absent and evicted lazily on access; no background sweep.
//! Hit/miss counters are monotonic for the process lifetime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use super::normalize_ticker;

/// Cache entry with TTL.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    fetched_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at >= self.ttl
    }
}

/// A fresh cache hit: the payload plus when it was fetched upstream.
#[derive(Debug, Clone)]
pub struct CachedValue {
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
}

/// Fingerprint-keyed result cache.
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Maximum entry count; unbounded when absent
    max_entries: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create an unbounded cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache holding at most `max` entries.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            max_entries: Some(max),
            ..Self::new()
        }
    }

    /// Look up a fingerprint. Missing or expired entries count as a miss;
    /// an expired entry is removed on the way out.
    pub fn get(&self, fingerprint: &str) -> Option<CachedValue> {
        let now = Utc::now();

        let expired = {
            let entries = self.entries.read().ok()?;
            match entries.get(fingerprint) {
                Some(entry) if !entry.is_expired(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(CachedValue {
                        payload: entry.payload.clone(),
                        fetched_at: entry.fetched_at,
                    });
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            // Lazy eviction; re-check under the write lock in case the
            // entry was refreshed between the two lock acquisitions.
            if let Ok(mut entries) = self.entries.write() {
                if entries.get(fingerprint).is_some_and(|e| e.is_expired(now)) {
                    entries.remove(fingerprint);
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a payload. Last write wins for an existing fingerprint.
    pub fn put(&self, fingerprint: &str, payload: Value, ttl: Duration) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if let Some(max) = self.max_entries {
            if !entries.contains_key(fingerprint) && entries.len() >= max {
                let now = Utc::now();
                entries.retain(|_, e| !e.is_expired(now));

                // Still at capacity with fresh entries: drop the oldest fetch.
                while entries.len() >= max {
                    let oldest = entries
                        .iter()
                        .min_by_key(|(_, e)| e.fetched_at)
                        .map(|(k, _)| k.clone());
                    match oldest {
                        Some(key) => {
                            entries.remove(&key);
                        }
                        None => break,
                    }
                }
            }
        }

        entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                payload,
                fetched_at: Utc::now(),
                ttl,
            },
        );
    }

    /// Remove a single fingerprint. Returns whether an entry existed.
    pub fn invalidate(&self, fingerprint: &str) -> bool {
        self.entries
            .write()
            .map(|mut entries| entries.remove(fingerprint).is_some())
            .unwrap_or(false)
    }

    /// Remove every entry for a ticker, across all statement kinds.
    /// Returns the number of entries removed.
    pub fn invalidate_ticker(&self, ticker: &str) -> usize {
        let prefix = format!("{}:", normalize_ticker(ticker));
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        before - entries.len()
    }

    /// Remove every entry. Hit/miss counters are process-lifetime monotonic
    /// and survive a clear. Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        self.entries
            .write()
            .map(|mut entries| {
                let count = entries.len();
                entries.clear();
                count
            })
            .unwrap_or(0)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let (entries, expired) = self
            .entries
            .read()
            .map(|m| {
                let total = m.len();
                let expired = m.values().filter(|e| e.is_expired(now)).count();
                (total, expired)
            })
            .unwrap_or((0, 0));

        CacheStats {
            entries,
            active_entries: entries - expired,
            expired_entries: expired,
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}

// ============================================================================
// Tests
// ============================================================================
