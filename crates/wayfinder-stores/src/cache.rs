//! TTL + LRU in-memory cache.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::clock::Clock;
use crate::StoreError;

#[derive(Debug, Clone)]
struct CacheItem {
    value: Value,
    expires_at: f64,
}

#[derive(Debug, Default)]
struct CacheState {
    items: HashMap<String, CacheItem>,
    order: VecDeque<String>,
}

/// In-memory cache with per-entry TTL and least-recently-used eviction.
///
/// The cache owns stored values; `get` hands out clones. Recency is a total
/// order: every hit and every insert moves the key to the back of the order
/// queue, and eviction always removes from the front.
pub struct MemoryCache {
    max_size: usize,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

impl MemoryCache {
    /// Create a cache holding at most `max_size` entries.
    pub fn new(max_size: usize, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        if max_size == 0 {
            return Err(StoreError::Invalid("max_size must be > 0".to_string()));
        }
        Ok(Self {
            max_size,
            clock,
            state: Mutex::new(CacheState::default()),
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Look up `key`. Expired entries are purged and reported as a miss; a
    /// hit promotes the entry to most-recently-used.
    pub fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut state = self.lock_state()?;
        let expired = match state.items.get(key) {
            None => return Ok(None),
            Some(item) => item.expires_at <= self.clock.now(),
        };
        if expired {
            Self::remove_entry(&mut state, key);
            return Ok(None);
        }
        Self::touch_order(&mut state.order, key);
        Ok(state.items.get(key).map(|item| item.value.clone()))
    }

    /// Store `value` under `key` for `ttl_seconds`. A non-positive TTL
    /// deletes any existing entry and stores nothing.
    pub fn set(&self, key: &str, value: Value, ttl_seconds: f64) -> Result<(), StoreError> {
        let mut state = self.lock_state()?;
        if ttl_seconds <= 0.0 {
            Self::remove_entry(&mut state, key);
            return Ok(());
        }

        let expires_at = self.clock.now() + ttl_seconds;
        state
            .items
            .insert(key.to_string(), CacheItem { value, expires_at });
        Self::touch_order(&mut state.order, key);
        while state.items.len() > self.max_size {
            if let Some(oldest) = state.order.pop_front() {
                state.items.remove(&oldest);
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Remove `key` unconditionally. Returns whether an entry existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.lock_state()?;
        Ok(Self::remove_entry(&mut state, key))
    }

    /// Purge every entry whose expiry has passed; returns the count removed.
    pub fn cleanup_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut state = self.lock_state()?;
        let expired: Vec<String> = state
            .items
            .iter()
            .filter(|(_, item)| item.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            Self::remove_entry(&mut state, key);
        }
        Ok(expired.len())
    }

    /// Number of live entries (expired-but-unpurged entries included).
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock_state()?.items.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, CacheState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }

    fn touch_order(order: &mut VecDeque<String>, key: &str) {
        order.retain(|id| id != key);
        order.push_back(key.to_string());
    }

    fn remove_entry(state: &mut CacheState, key: &str) -> bool {
        let removed = state.items.remove(key).is_some();
        if removed {
            state.order.retain(|id| id != key);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn cache_with_clock(max_size: usize) -> (MemoryCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = MemoryCache::new(max_size, clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let clock = Arc::new(ManualClock::new());
        assert!(matches!(
            MemoryCache::new(0, clock),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_ttl_expiry() {
        let (cache, clock) = cache_with_clock(4);
        cache.set("weather:rome", json!({"temp": 20}), 10.0).unwrap();

        assert_eq!(
            cache.get("weather:rome").unwrap(),
            Some(json!({"temp": 20}))
        );
        clock.advance(10.1);
        assert_eq!(cache.get("weather:rome").unwrap(), None);
        // expired entry was purged, not just hidden
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn test_lru_eviction_order() {
        let (cache, _clock) = cache_with_clock(2);
        cache.set("a", json!("A"), 100.0).unwrap();
        cache.set("b", json!("B"), 100.0).unwrap();

        // reading "a" refreshes its recency, so "b" is the eviction victim
        assert_eq!(cache.get("a").unwrap(), Some(json!("A")));
        cache.set("c", json!("C"), 100.0).unwrap();

        assert_eq!(cache.get("a").unwrap(), Some(json!("A")));
        assert_eq!(cache.get("b").unwrap(), None);
        assert_eq!(cache.get("c").unwrap(), Some(json!("C")));
    }

    #[test]
    fn test_non_positive_ttl_deletes() {
        let (cache, _clock) = cache_with_clock(4);
        cache.set("k", json!("v"), 100.0).unwrap();
        cache.set("k", json!("v2"), 0.0).unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn test_set_replaces_existing_entry() {
        let (cache, clock) = cache_with_clock(4);
        cache.set("k", json!("old"), 5.0).unwrap();
        clock.advance(3.0);
        cache.set("k", json!("new"), 5.0).unwrap();
        clock.advance(3.0);
        // the replacement's expiry counts from the second set
        assert_eq!(cache.get("k").unwrap(), Some(json!("new")));
    }

    #[test]
    fn test_delete_and_cleanup_expired() {
        let (cache, clock) = cache_with_clock(4);
        cache.set("short", json!(1), 5.0).unwrap();
        cache.set("long", json!(2), 50.0).unwrap();

        assert!(!cache.delete("missing").unwrap());
        clock.advance(10.0);
        assert_eq!(cache.cleanup_expired().unwrap(), 1);
        assert_eq!(cache.get("long").unwrap(), Some(json!(2)));
        assert!(cache.delete("long").unwrap());
        assert!(cache.is_empty().unwrap());
    }
}
