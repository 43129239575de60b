//! Cache layer for upstream lookups
//!
//! This module provides traits and a TTL-bounded in-memory implementation.
//! The cache layer uses a trait hierarchy:
//!
//! - **ReadCache**: For read-only cache operations
//! - **WriteCache**: Extends ReadCache with write operations
//!
//! A failed lookup is stored like any other value (as `None` for version
//! lookups), so an unreachable upstream is not asked again until the entry
//! expires. Time comes from an injectable [`Clock`] so expiry can be tested
//! without sleeping.

use std::fmt::{self, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default TTL for version lookups (1 hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default TTL for free-text search lookups (5 minutes)
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(5 * 60);

/// Trait for read-only cache operations
pub trait ReadCache<V>: Send + Sync {
    /// Get a value from the cache
    ///
    /// Returns `None` if the key doesn't exist or the entry is expired.
    fn get(&self, key: &str) -> Option<V>;

    /// Check if a key exists in the cache (without cloning the value out)
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Trait for writeable cache operations
pub trait WriteCache<V>: ReadCache<V> {
    /// Insert a value into the cache
    ///
    /// If a value with the same key already exists, it will be overwritten.
    fn insert(&self, key: String, value: V);

    fn remove(&self, key: &str);

    /// Clear all entries from the cache
    fn clear(&self);
}

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    elapsed_ms: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            elapsed_ms: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }
}

/// Cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// An entry is still fresh at exactly `ttl` after insertion.
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) > self.ttl
    }
}

/// In-memory cache using DashMap for thread-safety
///
/// Concurrent lookups of the same key may both miss and both insert; the
/// later insert wins and the map stays consistent.
#[derive(Clone)]
pub struct MemoryCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> fmt::Debug for MemoryCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> MemoryCache<V> {
    /// Create a new cache with default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a new cache with custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remove all expired entries from the cache
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(
                "Cleaned up {} expired cache entries ({} remaining)",
                removed,
                self.entries.len()
            );
        }
        removed
    }

    /// Get statistics about the cache contents
    ///
    /// Returns counts of total, expired, and valid entries.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let total = self.entries.len();
        let expired = self
            .entries
            .iter()
            .filter(|e| e.is_expired(now))
            .count();
        CacheStats {
            total_entries: total,
            expired_entries: expired,
            valid_entries: total.saturating_sub(expired),
        }
    }

    /// Get the number of entries in the cache (including expired)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodically drop expired entries until the runtime shuts down.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_cleanup_task(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await; // Skip immediate first tick

            loop {
                interval.tick().await;
                let stats = cache.stats();
                let removed = cache.cleanup_expired();
                if removed > 0 {
                    tracing::info!(
                        "Background cleanup: removed {} expired entries (was: {})",
                        removed,
                        stats
                    );
                }
            }
        })
    }
}

impl<V: Clone + Send + Sync + 'static> ReadCache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let lookup = self
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.data.clone()));

        match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                // Another thread may have refreshed the entry in between.
                self.entries.remove_if(key, |_, entry| entry.is_expired(now));
                None
            }
            None => None,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> WriteCache<V> for MemoryCache<V> {
    fn insert(&self, key: String, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                data: value,
                inserted_at: self.clock.now(),
                ttl: self.ttl,
            },
        );
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

/// Statistics about cache contents
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Total number of entries in the cache
    pub total_entries: usize,
    /// Number of expired entries
    pub expired_entries: usize,
    /// Number of valid (non-expired) entries
    pub valid_entries: usize,
}

impl Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ total: {}, expired: {}, valid: {} }}",
            self.total_entries, self.expired_entries, self.valid_entries
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_cache(ttl: Duration) -> (MemoryCache<Option<String>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (MemoryCache::with_clock(ttl, clock.clone()), clock)
    }

    #[test]
    fn test_entry_expires_just_past_ttl() {
        let (cache, clock) = manual_cache(DEFAULT_TTL);
        cache.insert("maven:a:b".to_string(), Some("1.0".to_string()));

        clock.advance(DEFAULT_TTL);
        assert_eq!(cache.get("maven:a:b"), Some(Some("1.0".to_string())));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("maven:a:b"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_negative_result_is_cached() {
        let (cache, _clock) = manual_cache(DEFAULT_TTL);
        cache.insert("maven:a:missing".to_string(), None);
        assert_eq!(cache.get("maven:a:missing"), Some(None));
        assert!(cache.contains("maven:a:missing"));
    }

    #[test]
    fn test_memory_cache_cleanup_expired() {
        let (cache, clock) = manual_cache(Duration::from_secs(10));

        cache.insert("key1".to_string(), Some("1".to_string()));
        cache.insert("key2".to_string(), Some("2".to_string()));
        assert_eq!(cache.len(), 2);

        clock.advance(Duration::from_secs(11));

        let removed = cache.cleanup_expired();
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_memory_cache_cleanup_partial() {
        let (cache, clock) = manual_cache(Duration::from_secs(200));

        cache.insert("key1".to_string(), None);
        clock.advance(Duration::from_secs(150));
        cache.insert("key2".to_string(), None);
        clock.advance(Duration::from_secs(100));

        let removed = cache.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("key2").is_some());
    }

    #[test]
    fn test_memory_cache_stats() {
        let (cache, clock) = manual_cache(Duration::from_secs(100));

        cache.insert("key1".to_string(), None);
        cache.insert("key2".to_string(), None);

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 0);
        assert_eq!(stats.valid_entries, 2);

        clock.advance(Duration::from_secs(150));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 2);
        assert_eq!(stats.valid_entries, 0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            total_entries: 10,
            expired_entries: 3,
            valid_entries: 7,
        };
        let display = format!("{}", stats);
        assert!(display.contains("total: 10"));
        assert!(display.contains("expired: 3"));
        assert!(display.contains("valid: 7"));
    }

    #[test]
    fn test_write_cache_remove_and_clear() {
        let cache: MemoryCache<Vec<String>> = MemoryCache::new();
        let cache_ref: &dyn WriteCache<Vec<String>> = &cache;

        cache_ref.insert("key1".to_string(), vec!["a".to_string()]);
        cache_ref.insert("key2".to_string(), Vec::new());
        cache_ref.remove("key1");
        assert!(cache.get("key1").is_none());
        assert!(cache.get("key2").is_some());

        cache_ref.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = MemoryCache::<Option<String>>::new();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let cache = cache.clone();
                scope.spawn(move || {
                    for j in 0..100 {
                        cache.insert(format!("key{}", j % 10), Some(format!("{i}")));
                        let _ = cache.get(&format!("key{}", j % 10));
                    }
                });
            }
        });
        assert_eq!(cache.len(), 10);
    }
}
