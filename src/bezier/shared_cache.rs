//! A mutex-guarded map from value key to weakly-held shared instance.
//!
//! This is the one piece of process-wide state in the crate, isolated behind
//! an explicit type so tests can run against their own instance instead of
//! the global one.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Deduplicating cache of shared values.
///
/// Entries hold weak references only: a value lives exactly as long as some
/// caller keeps a strong handle, and the stale map slot is evicted lazily on
/// the next lookup that misses it.
#[derive(Debug)]
pub struct SharedCache<K, V> {
    entries: Mutex<HashMap<K, Weak<V>>>,
}

impl<K: Eq + Hash, V> Default for SharedCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SharedCache<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the live instance for `key`, evicting a dead slot on miss.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(weak) => match weak.upgrade() {
                Some(value) => Some(value),
                None => {
                    entries.remove(key);
                    None
                }
            },
            None => None,
        }
    }

    /// Register `value` under `key`.
    ///
    /// When two builders race, the second insertion replaces the first entry;
    /// both callers keep their own strong reference, so neither build is
    /// wasted user-visibly. Duplicate construction under contention is an
    /// accepted cost, not a correctness bug.
    pub fn insert(&self, key: K, value: &Arc<V>) {
        self.lock().insert(key, Arc::downgrade(value));
    }

    /// Number of map slots, live or stale. Test instrumentation.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Return `true` when the cache holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Weak<V>>> {
        // A panic mid-insert cannot corrupt the map itself; recover instead
        // of poisoning every later lookup.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_an_empty_cache() {
        let cache = SharedCache::<u64, String>::default();
        assert!(cache.is_empty());
        assert!(cache.get(&0).is_none());
    }

    #[test]
    fn get_returns_live_instances_only() {
        let cache: SharedCache<u32, String> = SharedCache::new();
        let value = Arc::new("hello".to_owned());
        cache.insert(7, &value);
        assert!(cache.get(&7).is_some_and(|v| Arc::ptr_eq(&v, &value)));

        drop(value);
        // The slot is still there, but the value is gone; the miss evicts it.
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&7).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn distinct_keys_do_not_alias() {
        let cache: SharedCache<u32, u32> = SharedCache::new();
        let a = Arc::new(1);
        let b = Arc::new(2);
        cache.insert(1, &a);
        cache.insert(2, &b);
        assert_eq!(*cache.get(&1).unwrap(), 1);
        assert_eq!(*cache.get(&2).unwrap(), 2);
    }
}
