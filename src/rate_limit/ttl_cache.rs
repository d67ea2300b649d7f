//! Time-to-live cache with a bounded number of entries.
//!
//! Two independent policies apply:
//!
//! - **TTL** decides freshness. It is checked lazily on read; a stale entry
//!   stays in the map until it is replaced, evicted or purged.
//! - **Capacity** bounds memory. Inserting a new key into a full cache evicts
//!   the entry with the oldest insertion instant. Eviction never happens on
//!   read.
//!
//! Every operation takes the current instant explicitly, so freshness can be
//! tested without sleeping.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use universalis_price_cache::rate_limit::TtlCache;
//!
//! let mut cache: TtlCache<u32, &str> = TtlCache::new(Duration::from_secs(300), 2);
//! let t0 = Instant::now();
//!
//! cache.insert(1, "first", t0);
//! assert_eq!(cache.get(&1, t0 + Duration::from_secs(299)), Some(&"first"));
//! assert_eq!(cache.get(&1, t0 + Duration::from_secs(300)), None);
//!
//! // The stale entry is still there until something replaces it.
//! assert_eq!(cache.peek(&1), Some(&"first"));
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A stored value and the instant it was inserted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,
    /// When the value was inserted
    pub inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Age of the entry at `now`, zero if `now` is before insertion.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }
}

/// A cache that expires entries after a TTL and holds at most `capacity` keys.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    cache: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    capacity: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a new TTL cache.
    ///
    /// A `capacity` of zero is treated as one; the cache always keeps the
    /// most recent insertion.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            cache: HashMap::with_capacity(capacity),
            ttl,
            capacity,
        }
    }

    /// Insert a value stamped with `now`, replacing any entry for `key`.
    ///
    /// Returns the evicted key and value when a new key pushed the cache past
    /// its capacity.
    pub fn insert(&mut self, key: K, value: V, now: Instant) -> Option<(K, V)> {
        let evicted = if !self.cache.contains_key(&key) && self.cache.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        self.cache.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
        evicted
    }

    /// Get a value if it exists and is younger than the TTL at `now`.
    pub fn get(&self, key: &K, now: Instant) -> Option<&V> {
        self.get_entry(key, now).map(|entry| &entry.value)
    }

    /// Get a fresh entry along with its insertion instant.
    pub fn get_entry(&self, key: &K, now: Instant) -> Option<&CacheEntry<V>> {
        self.cache.get(key).filter(|entry| self.is_fresh(entry, now))
    }

    /// Get a value regardless of its age.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.cache.get(key).map(|entry| &entry.value)
    }

    /// Get an entry regardless of its age.
    pub fn peek_entry(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.cache.get(key)
    }

    /// Get the age of an entry at `now`, stale or not.
    pub fn get_age(&self, key: &K, now: Instant) -> Option<Duration> {
        self.cache.get(key).map(|entry| entry.age(now))
    }

    /// Remove an entry, returning its value whatever its age.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.cache.remove(key).map(|entry| entry.value)
    }

    /// Check if a fresh entry exists for `key`.
    pub fn contains(&self, key: &K, now: Instant) -> bool {
        self.get(key, now).is_some()
    }

    /// Remove all entries that are stale at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.age(now) < ttl);
        before - self.cache.len()
    }

    /// Get the number of entries in the cache (including stale ones).
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Get the number of fresh entries at `now`.
    pub fn active_count(&self, now: Instant) -> usize {
        self.cache
            .values()
            .filter(|entry| self.is_fresh(entry, now))
            .count()
    }

    /// Clear all entries from the cache.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Get the TTL duration for this cache.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        entry.age(now) < self.ttl
    }

    fn evict_oldest(&mut self) -> Option<(K, V)> {
        let oldest = self
            .cache
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone())?;
        self.cache
            .remove(&oldest)
            .map(|entry| (oldest, entry.value))
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new(
            Duration::from_secs(super::limits::CACHE_TTL_SECS),
            super::limits::CACHE_CAPACITY,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache: TtlCache<String, i32> = TtlCache::new(secs(60), 10);
        let now = Instant::now();

        cache.insert("key1".to_string(), 100, now);
        assert_eq!(cache.get(&"key1".to_string(), now), Some(&100));
        assert_eq!(cache.get(&"key2".to_string(), now), None);
    }

    #[test]
    fn test_remove() {
        let mut cache: TtlCache<String, i32> = TtlCache::new(secs(60), 10);
        let now = Instant::now();

        cache.insert("key1".to_string(), 100, now);
        assert_eq!(cache.remove(&"key1".to_string()), Some(100));
        assert_eq!(cache.get(&"key1".to_string(), now), None);
    }

    #[test]
    fn test_expiration_is_lazy() {
        let mut cache: TtlCache<u32, i32> = TtlCache::new(secs(300), 10);
        let t0 = Instant::now();

        cache.insert(1, 100, t0);
        assert!(cache.contains(&1, t0 + secs(299)));
        assert!(!cache.contains(&1, t0 + secs(300)));

        // Expired but still stored
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&1), Some(&100));
        assert_eq!(cache.get_age(&1, t0 + secs(301)), Some(secs(301)));
    }

    #[test]
    fn test_replace_restamps_entry() {
        let mut cache: TtlCache<u32, i32> = TtlCache::new(secs(300), 10);
        let t0 = Instant::now();

        cache.insert(1, 100, t0);
        cache.insert(1, 200, t0 + secs(301));

        let entry = cache.get_entry(&1, t0 + secs(302)).unwrap();
        assert_eq!(entry.value, 200);
        assert_eq!(entry.inserted_at, t0 + secs(301));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cleanup() {
        let mut cache: TtlCache<u32, i32> = TtlCache::new(secs(60), 10);
        let t0 = Instant::now();

        cache.insert(1, 100, t0);
        cache.insert(2, 200, t0 + secs(30));
        assert_eq!(cache.active_count(t0 + secs(70)), 1);

        assert_eq!(cache.cleanup(t0 + secs(70)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&2, t0 + secs(70)));
    }

    #[test]
    fn test_capacity_evicts_oldest_inserted() {
        let mut cache: TtlCache<u32, i32> = TtlCache::new(secs(300), 2);
        let t0 = Instant::now();

        assert_eq!(cache.insert(1, 100, t0 + secs(2)), None);
        assert_eq!(cache.insert(2, 200, t0), None);
        assert_eq!(cache.insert(3, 300, t0 + secs(3)), Some((2, 200)));

        assert_eq!(cache.len(), 2);
        assert!(cache.peek(&1).is_some());
        assert!(cache.peek(&3).is_some());
    }

    #[test]
    fn test_replacing_at_capacity_does_not_evict() {
        let mut cache: TtlCache<u32, i32> = TtlCache::new(secs(300), 2);
        let t0 = Instant::now();

        cache.insert(1, 100, t0);
        cache.insert(2, 200, t0 + secs(1));
        assert_eq!(cache.insert(1, 150, t0 + secs(2)), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek(&2), Some(&200));
    }

    #[test]
    fn test_reads_never_evict() {
        let mut cache: TtlCache<u32, i32> = TtlCache::new(secs(10), 1);
        let t0 = Instant::now();

        cache.insert(1, 100, t0);
        assert_eq!(cache.get(&1, t0 + secs(60)), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut cache: TtlCache<u32, i32> = TtlCache::new(secs(10), 0);
        let t0 = Instant::now();

        cache.insert(1, 100, t0);
        cache.insert(2, 200, t0 + secs(1));
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.peek(&2), Some(&200));
        assert_eq!(cache.peek(&1), None);
    }
}
