//
//  aem-cli
//  api/cache.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Response Cache
//!
//! A capacity- and time-bounded cache for GET responses.
//!
//! - Keys are SHA-256 digests of `METHOD:URL`.
//! - Values are the serialized response body plus the instant it was captured.
//! - When full, the least recently accessed entry is evicted.
//! - Staleness is checked when an entry is read; nothing sweeps in the background.
//!
//! Recency bookkeeping and TTL live behind one mutex, so concurrent bulk GETs
//! through the same client cannot corrupt the eviction order. Two concurrent
//! misses on the same key may both reach the network; the cache is an
//! optimisation, not a request de-duplicator.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Default time-to-live for cached responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of cached responses.
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 500;

/// Cache key: SHA-256 of `METHOD:URL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    pub fn new(method: &str, url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b":");
        hasher.update(url.as_bytes());
        Self(hasher.finalize().into())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    captured_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.captured_at.elapsed() < ttl
    }
}

struct CacheState {
    entries: LruCache<CacheKey, CacheEntry>,
    ttl: Duration,
}

/// Snapshot of cache occupancy, as reported by `cache_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub total_entries: usize,
    pub valid_entries: usize,
    pub ttl_seconds: u64,
    pub max_entries: usize,
}

impl CacheStats {
    /// Flat key/value pairs in report order.
    pub fn as_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("enabled", self.enabled.to_string()),
            ("total_entries", self.total_entries.to_string()),
            ("valid_entries", self.valid_entries.to_string()),
            ("ttl_seconds", self.ttl_seconds.to_string()),
            ("max_entries", self.max_entries.to_string()),
        ]
    }
}

/// Thread-safe LRU response cache with lazy TTL expiry.
pub struct ResponseCache {
    state: Mutex<CacheState>,
}

impl ResponseCache {
    /// Creates a cache holding at most `max_entries` responses (minimum 1).
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                ttl,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Entries are plain data; a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the cached body when a fresh entry exists, marking it as
    /// recently used. Stale entries are left in place until overwritten or
    /// evicted.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let mut state = self.lock();
        let ttl = state.ttl;
        let fresh = state.entries.peek(key).is_some_and(|e| e.is_fresh(ttl));
        if !fresh {
            return None;
        }
        state.entries.get(key).map(|e| e.body.clone())
    }

    /// Stores a body, replacing any previous entry for `key` and evicting the
    /// least recently used entry when full.
    pub fn insert(&self, key: CacheKey, body: String) {
        let mut state = self.lock();
        let entry = CacheEntry {
            body,
            captured_at: Instant::now(),
        };
        if let Some((evicted, _)) = state.entries.push(key, entry) {
            if evicted != key {
                tracing::debug!("Response cache full, evicted least recently used entry");
            }
        }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains(key)
    }

    pub fn ttl(&self) -> Duration {
        self.lock().ttl
    }

    /// Changes the TTL. Existing entries are judged against the new value.
    pub fn set_ttl(&self, ttl: Duration) {
        self.lock().ttl = ttl;
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    /// Occupancy report. `enabled` is owned by the client and passed through.
    pub fn stats(&self, enabled: bool) -> CacheStats {
        let state = self.lock();
        let valid = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_fresh(state.ttl))
            .count();

        CacheStats {
            enabled,
            total_entries: state.entries.len(),
            valid_entries: valid,
            ttl_seconds: state.ttl.as_secs(),
            max_entries: state.entries.cap().get(),
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_ENTRIES, DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: usize) -> CacheKey {
        CacheKey::new("GET", &format!("http://localhost/{n}"))
    }

    #[test]
    fn test_key_depends_on_method_and_url() {
        assert_eq!(CacheKey::new("GET", "http://a/x"), CacheKey::new("GET", "http://a/x"));
        assert_ne!(CacheKey::new("GET", "http://a/x"), CacheKey::new("POST", "http://a/x"));
        assert_ne!(CacheKey::new("GET", "http://a/x"), CacheKey::new("GET", "http://a/y"));
    }

    #[test]
    fn test_evicts_least_recently_accessed() {
        let cache = ResponseCache::new(3, Duration::from_secs(60));
        cache.insert(key(1), "one".into());
        cache.insert(key(2), "two".into());
        cache.insert(key(3), "three".into());

        // Touch 1 so 2 becomes the least recently used.
        assert_eq!(cache.get(&key(1)).as_deref(), Some("one"));

        cache.insert(key(4), "four".into());
        assert_eq!(cache.len(), 3);
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
        assert!(cache.contains(&key(4)));
    }

    #[test]
    fn test_stale_entries_are_not_served() {
        let cache = ResponseCache::new(10, Duration::from_millis(20));
        cache.insert(key(1), "body".into());
        assert!(cache.get(&key(1)).is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&key(1)).is_none());

        let stats = cache.stats(true);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.valid_entries, 0);
    }

    #[test]
    fn test_reinsert_refreshes_timestamp() {
        let cache = ResponseCache::new(10, Duration::from_millis(30));
        cache.insert(key(1), "old".into());
        std::thread::sleep(Duration::from_millis(40));
        cache.insert(key(1), "new".into());
        assert_eq!(cache.get(&key(1)).as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stats_pairs() {
        let cache = ResponseCache::new(500, Duration::from_secs(300));
        cache.insert(key(1), "a".into());
        let pairs = cache.stats(false).as_pairs();
        let keys: Vec<_> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            ["enabled", "total_entries", "valid_entries", "ttl_seconds", "max_entries"]
        );
        assert_eq!(pairs[0].1, "false");
        assert_eq!(pairs[1].1, "1");
        assert_eq!(pairs[3].1, "300");
        assert_eq!(pairs[4].1, "500");
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::default();
        cache.insert(key(1), "a".into());
        cache.clear();
        assert!(cache.is_empty());
    }
}
