//! Process-local cache with per-entry expiry.
//!
//! Entries are never persisted; an expired entry reads as absent. Expired
//! entries are dropped on lookup and swept on every insert, so the map never
//! holds more than one TTL window of keys.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Key-value store whose entries expire after a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, StoredEntry<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Stores a value under the cache-wide TTL, replacing any previous entry.
    pub fn put(&mut self, key: K, value: V) {
        self.put_at(key, value, Instant::now());
    }

    fn put_at(&mut self, key: K, value: V, now: Instant) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        let swept = before - self.entries.len();
        if swept > 0 {
            tracing::debug!("Swept {} expired cache entries", swept);
        }

        let expires_at = now + self.ttl;
        self.entries.insert(key, StoredEntry { value, expires_at });
    }

    /// Retrieves a value if it exists and has not expired.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if now < entry.expires_at => {
                tracing::debug!("Key found and still fresh");
                Some(entry.value.clone())
            }
            Some(_) => {
                tracing::debug!("Key found but expired");
                self.entries.remove(key);
                None
            }
            None => {
                tracing::debug!("Key not found");
                None
            }
        }
    }

    /// Number of stored entries, expired ones included until the next insert
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
