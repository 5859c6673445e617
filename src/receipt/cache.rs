//! Time-bounded cache of verification results.
//!
//! Results are keyed by receipt content hash and ignored once older than the
//! TTL. Stale entries are never evicted proactively; the next verification of
//! the same receipt overwrites them.
//!
//! The cache is not synchronized on its own. The verifier keeps it behind the
//! same lock as the in-flight table so a lookup sees either a cached result or
//! a pending verification, never neither.

use super::types::{ReceiptKey, VerificationResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default lifetime of a cached result (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    result: VerificationResult,
    stored_at: Instant,
}

/// Cache statistics for monitoring.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing fresh.
    pub misses: u64,
    /// Results stored.
    pub additions: u64,
    /// Entries currently held, fresh or stale.
    pub entries: usize,
    /// Verifications currently running.
    pub in_flight: usize,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Verification results keyed by receipt hash.
#[derive(Debug)]
pub struct VerificationCache {
    entries: HashMap<ReceiptKey, CacheEntry>,
    ttl: Duration,
    hits: u64,
    misses: u64,
    additions: u64,
}

impl VerificationCache {
    /// Create a cache with the default TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Create a cache whose entries stay fresh for `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            hits: 0,
            misses: 0,
            additions: 0,
        }
    }

    /// Return the cached result for `key` if it is younger than the TTL.
    pub fn get_fresh(&mut self, key: &ReceiptKey, now: Instant) -> Option<VerificationResult> {
        let fresh = self
            .entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.result.clone());

        if fresh.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        fresh
    }

    /// Store a result, replacing any previous entry for `key`.
    pub fn insert(&mut self, key: ReceiptKey, result: VerificationResult, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                result,
                stored_at: now,
            },
        );
        self.additions += 1;
    }

    /// Snapshot of the counters. `in_flight` is filled in by the verifier.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            additions: self.additions,
            entries: self.entries.len(),
            in_flight: 0,
        }
    }

    /// Number of entries, fresh or stale.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for VerificationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::receipt::types::{FailureCode, VerificationFailure};

    fn failure(status: i64) -> VerificationResult {
        Err(VerificationFailure::new(FailureCode::Status(status), "rejected"))
    }

    #[test]
    fn test_cache_basic_operations() {
        let mut cache = VerificationCache::new();
        let now = Instant::now();
        let key1 = [1u8; 32];
        let key2 = [2u8; 32];

        // Initially empty
        assert!(cache.is_empty());
        assert!(cache.get_fresh(&key1, now).is_none());

        cache.insert(key1, failure(21003), now);
        assert_eq!(cache.get_fresh(&key1, now), Some(failure(21003)));
        assert!(cache.get_fresh(&key2, now).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entries_expire_at_ttl() {
        let mut cache = VerificationCache::with_ttl(Duration::from_secs(300));
        let stored = Instant::now();
        let key = [7u8; 32];
        cache.insert(key, failure(21005), stored);

        assert!(cache
            .get_fresh(&key, stored + Duration::from_millis(299_999))
            .is_some());
        // Exactly at the TTL the entry is stale.
        assert!(cache
            .get_fresh(&key, stored + Duration::from_secs(300))
            .is_none());
        // Stale entries are ignored, not removed.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_supersedes_stale_entry() {
        let mut cache = VerificationCache::with_ttl(Duration::from_secs(1));
        let t0 = Instant::now();
        let key = [3u8; 32];
        cache.insert(key, failure(21005), t0);

        let t1 = t0 + Duration::from_secs(5);
        assert!(cache.get_fresh(&key, t1).is_none());
        cache.insert(key, failure(21010), t1);
        assert_eq!(cache.get_fresh(&key, t1), Some(failure(21010)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_stats() {
        let mut cache = VerificationCache::new();
        let now = Instant::now();
        let key = [1u8; 32];

        // Miss
        assert!(cache.get_fresh(&key, now).is_none());
        cache.insert(key, failure(21003), now);
        // Hit
        assert!(cache.get_fresh(&key, now).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.additions, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = VerificationCache::new();
        let now = Instant::now();
        cache.insert([1u8; 32], failure(1), now);
        cache.insert([2u8; 32], failure(2), now);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
