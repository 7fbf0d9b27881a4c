//! In-memory response cache keyed by call arguments.
//!
//! Used both for whole answers (keyed by the question) and for individual
//! model completions (keyed by model identity and messages).

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Bounded cache that evicts the oldest entry once full.
pub struct ResponseCache<K, V> {
    inner: RwLock<Inner<K, V>>,
    max_entries: usize,
}

struct Inner<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    hits: u64,
    misses: u64,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `max_entries` values. Zero disables storage.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
            max_entries,
        }
    }

    /// Look up a value, recording a hit or a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.write();
        match inner.entries.get(key).cloned() {
            Some(value) => {
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Store a value, evicting the oldest entries past capacity.
    pub fn insert(&self, key: K, value: V) {
        if self.max_entries == 0 {
            return;
        }
        let mut inner = self.write();
        if inner.entries.insert(key.clone(), value).is_none() {
            inner.order.push_back(key);
        }
        while inner.entries.len() > self.max_entries {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.read();
        CacheStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner<K, V>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner<K, V>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let cache: ResponseCache<String, String> = ResponseCache::new(4);
        assert!(cache.get(&"john 3:16".to_string()).is_none());

        cache.insert("john 3:16".to_string(), "For God so loved".to_string());
        assert_eq!(
            cache.get(&"john 3:16".to_string()).as_deref(),
            Some("For God so loved")
        );

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_evicts_oldest() {
        let cache = ResponseCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(3, "c");

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.get(&3), Some("c"));
    }

    #[test]
    fn test_overwrite_does_not_grow_order() {
        let cache = ResponseCache::new(2);
        cache.insert(1, "a");
        cache.insert(1, "b");
        cache.insert(2, "c");

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some("b"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = ResponseCache::new(0);
        cache.insert("q", 1);
        assert!(cache.is_empty());
    }
}
