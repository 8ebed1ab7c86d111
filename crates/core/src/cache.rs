//! Time-to-live cache with caller-supplied clock.
//!
//! The cache never reads the system clock: every call takes `now`, so
//! expiry is deterministic under test and the owner decides what time means.

use chrono::{DateTime, Duration, Utc};
use rustc_hash::FxHashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// Key-value cache whose entries expire `ttl` after insertion.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: FxHashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: FxHashMap::default(),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live value for `key` at `now`.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| &entry.value)
    }

    /// Store `value`, replacing any previous entry.
    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.stored_at < ttl);
        before - self.entries.len()
    }

    /// Stored entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entries_expire_after_ttl() {
        let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        let mut cache = TtlCache::new(Duration::minutes(30));
        cache.insert("kmcc", 7, t0);
        assert_eq!(cache.get(&"kmcc", t0 + Duration::minutes(29)), Some(&7));
        assert_eq!(cache.get(&"kmcc", t0 + Duration::minutes(30)), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(t0 + Duration::hours(1)), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn reinsert_refreshes() {
        let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
        let mut cache = TtlCache::new(Duration::minutes(10));
        cache.insert(1u64, "a", t0);
        cache.insert(1u64, "b", t0 + Duration::minutes(8));
        assert_eq!(cache.get(&1, t0 + Duration::minutes(15)), Some(&"b"));
        assert_eq!(cache.remove(&1), Some("b"));
    }
}
