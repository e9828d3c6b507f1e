//! Cache Layer
//!
//! `CacheProvider` is the host's key-value cache, used for relation map
//! snapshots. Its failures are never fatal: a failed read is a miss and a
//! failed write is dropped. `AccessCache` memoizes decisions for the
//! lifetime of one resolver.

pub mod access;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::CacheError;

pub use access::AccessCache;

/// Host-provided key-value cache.
pub trait CacheProvider: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    fn set(&self, key: &str, value: Value) -> Result<(), CacheError>;

    fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

/// Process-local cache backed by a `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Value>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl CacheProvider for InMemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl CacheProvider for NoCache {
    fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: Value) -> Result<(), CacheError> {
        Ok(())
    }

    fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Read and decode a cached value. Backend and decode failures are misses.
pub(crate) fn get_typed<T: DeserializeOwned>(cache: &dyn CacheProvider, key: &str) -> Option<T> {
    let value = match cache.get(key) {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache read failed, recomputing");
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            let error = CacheError::Decode {
                key: key.to_string(),
                reason: e.to_string(),
            };
            tracing::warn!(%error, "Discarding undecodable cache entry");
            None
        }
    }
}

/// Encode and store a value. Failures are logged and dropped.
pub(crate) fn set_typed<T: Serialize>(cache: &dyn CacheProvider, key: &str, value: &T) {
    let encoded = match serde_json::to_value(value) {
        Ok(encoded) => encoded,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to encode cache entry");
            return;
        }
    };

    if let Err(e) = cache.set(key, encoded) {
        tracing::warn!(key, error = %e, "Cache write failed");
    }
}

/// Invalidate a key. Failures are logged; the next read recomputes anyway
/// once the in-process snapshot is gone.
pub(crate) fn invalidate_key(cache: &dyn CacheProvider, key: &str) {
    if let Err(e) = cache.invalidate(key) {
        tracing::warn!(key, error = %e, "Cache invalidation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct BrokenCache;

    impl CacheProvider for BrokenCache {
        fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        fn set(&self, _key: &str, _value: Value) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }

        fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_string()))
        }
    }

    #[test]
    fn test_typed_round_trip() {
        let cache = InMemoryCache::new();
        let value: BTreeMap<String, u32> = [("a".to_string(), 1)].into();
        set_typed(&cache, "k", &value);

        let read: Option<BTreeMap<String, u32>> = get_typed(&cache, "k");
        assert_eq!(read, Some(value));

        invalidate_key(&cache, "k");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_backend_failure_is_a_miss() {
        let cache = BrokenCache;
        set_typed(&cache, "k", &1_u32);
        let read: Option<u32> = get_typed(&cache, "k");
        assert_eq!(read, None);
        invalidate_key(&cache, "k");
    }

    #[test]
    fn test_undecodable_entry_is_a_miss() {
        let cache = InMemoryCache::new();
        cache.set("k", Value::String("not a number".into())).unwrap();
        let read: Option<u32> = get_typed(&cache, "k");
        assert_eq!(read, None);
    }

    #[test]
    fn test_no_cache_never_hits() {
        let cache = NoCache;
        set_typed(&cache, "k", &1_u32);
        assert_eq!(get_typed::<u32>(&cache, "k"), None);
    }
}
