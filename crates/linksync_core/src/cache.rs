//! Small expiring cache with explicit invalidation.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Something that drops cached state when the underlying data changes.
///
/// The sync engine calls registered hooks after any run that rewrote the
/// buffer; request handlers call them after local mutations.
pub trait InvalidationHook: Send + Sync {
    /// Drops every cached entry.
    fn invalidate_all(&self);
}

/// Hit/miss counters for a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Stored entries. Expired ones are dropped on their next lookup.
    pub entries: usize,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

struct Entries<K, V> {
    map: HashMap<K, CacheEntry<V>>,
    /// Bumped by every invalidation.
    generation: u64,
}

/// A key → value cache whose entries expire after a fixed TTL.
///
/// A zero TTL disables caching: nothing is stored and every lookup misses.
/// Values loaded through [`TtlCache::get_or_insert_with`] are discarded if an
/// invalidation happened while they were being computed.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<Entries<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                generation: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached value if present and not expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        match entries.map.get(key) {
            Some(entry) if entry.expires_at > now => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.map.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Returns the cached value or computes, caches and returns a fresh one.
    ///
    /// The fresh value is returned but not cached if the cache was
    /// invalidated while `load` ran.
    pub fn get_or_insert_with(&self, key: K, load: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let generation = self.entries.lock().generation;
        let value = load();

        if !self.ttl.is_zero() {
            let mut entries = self.entries.lock();
            if entries.generation == generation {
                let entry = CacheEntry {
                    value: value.clone(),
                    expires_at: Instant::now() + self.ttl,
                };
                entries.map.insert(key, entry);
            }
        }
        value
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl<K, V> InvalidationHook for TtlCache<K, V>
where
    K: Eq + Hash + Send,
    V: Send,
{
    fn invalidate_all(&self) {
        let mut entries = self.entries.lock();
        entries.generation += 1;
        entries.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn get_after_insert() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.get_or_insert_with("links", || vec![1, 2, 3]);

        assert_eq!(cache.get(&"links"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get(&"other"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn entries_expire() {
        let cache = TtlCache::new(Duration::from_millis(20));
        cache.get_or_insert_with(1u32, || "value");
        thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get(&1), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.get_or_insert_with(1u32, || "value");
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn invalidation() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.get_or_insert_with("a", || 1);
        cache.get_or_insert_with("b", || 2);

        assert_eq!(cache.len(), 2);

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidation_through_hook_object() {
        let cache = std::sync::Arc::new(TtlCache::new(Duration::from_secs(60)));
        cache.get_or_insert_with("links".to_string(), || 42);

        let hook: std::sync::Arc<dyn InvalidationHook> = cache.clone();
        hook.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn get_or_insert_with_loads_once() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let mut loads = 0;

        for _ in 0..3 {
            let value = cache.get_or_insert_with("k", || {
                loads += 1;
                7
            });
            assert_eq!(value, 7);
        }
        assert_eq!(loads, 1);
    }

    #[test]
    fn load_racing_an_invalidation_is_not_cached() {
        let cache = TtlCache::new(Duration::from_secs(60));

        let stale = cache.get_or_insert_with("links", || {
            // A writer commits and invalidates while the old view is loading.
            cache.invalidate_all();
            vec!["old"]
        });
        assert_eq!(stale, vec!["old"]);
        assert!(cache.is_empty());

        let fresh = cache.get_or_insert_with("links", || vec!["old", "new"]);
        assert_eq!(fresh, vec!["old", "new"]);
        assert_eq!(cache.get(&"links"), Some(vec!["old", "new"]));
    }
}
