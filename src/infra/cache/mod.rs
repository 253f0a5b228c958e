//! Cache backends for batch results.
//!
//! The executor itself never caches; callers inject a [`Cache`] and wrap their
//! batch with a lookup before and a `set` after. Reads are stale-aware: an
//! entry older than the backend's TTL is still returned, flagged
//! `is_stale`, so callers can serve it while they refresh.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use std::time::Duration;

use crate::core::CacheError;

/// A cached value and whether it outlived its TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<V> {
    /// Stored value.
    pub value: V,
    /// True once the entry is older than the backend's TTL.
    pub is_stale: bool,
}

/// Key-value cache shared between batches.
pub trait Cache<V>: Send + Sync {
    /// Look up `key`. Unreadable entries count as missing.
    fn get(&self, key: &str) -> Option<Cached<V>>;

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot persist the value.
    fn set(&self, key: &str, value: V) -> Result<(), CacheError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot persist the removal.
    fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

fn is_stale(age: Duration, ttl: Option<Duration>) -> bool {
    ttl.is_some_and(|ttl| age >= ttl)
}
