//! In-process cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::{is_stale, Cache, Cached};
use crate::core::CacheError;

/// Thread-safe in-memory cache with an optional TTL.
pub struct MemoryCache<V> {
    ttl: Option<Duration>,
    entries: RwLock<HashMap<String, (V, Instant)>>,
}

impl<V> MemoryCache<V> {
    /// Cache whose entries never go stale.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cache whose entries go stale `ttl` after they were set.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<Cached<V>> {
        let entries = self.entries.read();
        entries.get(key).map(|(value, stored_at)| Cached {
            value: value.clone(),
            is_stale: is_stale(stored_at.elapsed(), self.ttl),
        })
    }

    fn set(&self, key: &str, value: V) -> Result<(), CacheError> {
        self.entries
            .write()
            .insert(key.to_owned(), (value, Instant::now()));
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
