//! Bounded LRU caches with TTL
//!
//! Safe under concurrent readers and a single writer per key; a miss
//! under concurrency may recompute in both tasks (entries are
//! idempotent), so no coalescing is attempted.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
    last_used: u64,
}

/// Size-bounded map with per-entry TTL and strict least-recently-used
/// eviction on insertion.
pub struct TtlLru<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    capacity: usize,
    ttl: Duration,
    clock: AtomicU64,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlLru<K, V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
            clock: AtomicU64::new(0),
        }
    }

    /// Get a live entry, refreshing its recency
    pub fn get(&self, key: &K) -> Option<V> {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.write().ok()?;
        let entry = entries.get_mut(key)?;
        if Instant::now() >= entry.expires_at {
            entries.remove(key);
            return None;
        }
        entry.last_used = tick;
        Some(entry.value.clone())
    }

    /// Insert a value, evicting the least recently used entry when full
    pub fn insert(&self, key: K, value: V) {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            // Drop expired entries first; evict by recency only if none
            let now = Instant::now();
            let before = entries.len();
            entries.retain(|_, e| now < e.expires_at);
            if entries.len() == before {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_used)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
                last_used: tick,
            },
        );
    }

    /// Number of entries, live or expired
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// Key for the search-result cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultCacheKey {
    pub collection: &'static str,
    pub query: String,
    pub limit: usize,
}

impl ResultCacheKey {
    pub fn new(collection: &'static str, query: &str, limit: usize) -> Self {
        Self {
            collection,
            query: query.trim().to_lowercase(),
            limit,
        }
    }
}

/// Key for the embedding cache: the trimmed input text
pub fn embedding_cache_key(text: &str) -> String {
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_get_set() {
        let cache: TtlLru<String, u32> = TtlLru::new(10, Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
    }

    #[test]
    fn test_expiry() {
        let cache: TtlLru<String, u32> = TtlLru::new(10, Duration::from_millis(50));
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_strict_eviction_on_insert() {
        let cache: TtlLru<u32, u32> = TtlLru::new(2, Duration::from_secs(60));
        cache.insert(1, 10);
        cache.insert(2, 20);
        // Touch 1 so 2 becomes least recently used
        assert_eq!(cache.get(&1), Some(10));
        cache.insert(3, 30);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let cache: TtlLru<u32, u32> = TtlLru::new(2, Duration::from_secs(60));
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(1, 11);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some(11));
        assert_eq!(cache.get(&2), Some(20));
    }

    #[test]
    fn test_result_cache_key_normalizes_query() {
        let a = ResultCacheKey::new("catalog", "  Distributed Systems ", 10);
        let b = ResultCacheKey::new("catalog", "distributed systems", 10);
        assert_eq!(a, b);
        let c = ResultCacheKey::new("chunks", "distributed systems", 10);
        assert_ne!(a, c);
    }
}
