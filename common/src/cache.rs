use std::{
    hash::Hash,
    time::{Duration, Instant},
};

use dashmap::DashMap;

/// Concurrent map whose entries expire after a fixed TTL.
///
/// Expired entries are dropped lazily when read, or in bulk by
/// [`TtlCache::purge_expired`]. Nothing in here is authoritative.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, (V, Instant)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let value = {
            let entry = self.entries.get(key)?;
            let (value, expires_at) = entry.value();
            (*expires_at > now).then(|| value.clone())
        };
        if value.is_none() {
            self.entries.remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        }
        value
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now() + self.ttl));
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, (_, expires_at)| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_served() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("1.1.1.1", "AU");

        assert_eq!(cache.get(&"1.1.1.1"), Some("AU"));
        assert_eq!(cache.get(&"8.8.8.8"), None);
    }

    #[test]
    fn expired_entries_are_dropped_on_read() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("1.1.1.1", "AU");

        assert_eq!(cache.get(&"1.1.1.1"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_sweeps_expired_entries() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert(1, "a");
        cache.insert(2, "b");

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 0);
    }
}
