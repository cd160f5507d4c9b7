//! Volatile, in-process mapping cache.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use jobfill_config::CacheConfig;

use crate::Mappings;

struct SessionEntry {
    mappings: Mappings,
    inserted: Instant,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted.elapsed() >= ttl
    }
}

#[derive(Default)]
struct SessionState {
    entries: HashMap<String, SessionEntry>,
    /// Keys in insertion order, oldest first.
    order: VecDeque<String>,
}

impl SessionState {
    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

/// Whole-request mapping cache for the current process.
///
/// Keyed by the full request signature (see [`crate::session_key`]), so any
/// change to the fields or the user's data misses automatically. Entries
/// expire after `ttl`; inserting past `capacity` drops the oldest key.
pub struct SessionMappingCache {
    ttl: Duration,
    capacity: usize,
    state: Mutex<SessionState>,
}

impl SessionMappingCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.session_ttl(), config.session_capacity)
    }

    pub fn get(&self, key: &str) -> Option<Mappings> {
        let mut state = self.state.lock();
        let expired = state.entries.get(key)?.is_expired(self.ttl);
        if expired {
            state.remove(key);
            return None;
        }
        state.entries.get(key).map(|e| e.mappings.clone())
    }

    pub fn insert(&self, key: String, mappings: Mappings) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.remove(&key);
        while state.order.len() >= self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
        state.order.push_back(key.clone());
        state.entries.insert(
            key,
            SessionEntry {
                mappings,
                inserted: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobfill_protocols::MappingResult;

    fn mappings(value: &str) -> Mappings {
        Mappings::from([("fp1".to_string(), MappingResult::with_value(value))])
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl() {
        let cache = SessionMappingCache::new(Duration::from_secs(300), 30);
        cache.insert("k".to_string(), mappings("Jane"));

        tokio::time::advance(Duration::from_secs(299)).await;
        let hit = cache.get("k").unwrap();
        assert_eq!(hit["fp1"].value.as_deref(), Some("Jane"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_ttl() {
        let cache = SessionMappingCache::new(Duration::from_secs(300), 30);
        cache.insert("k".to_string(), mappings("Jane"));

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_eviction() {
        let cache = SessionMappingCache::new(Duration::from_secs(300), 3);
        for key in ["a", "b", "c", "d"] {
            cache.insert(key.to_string(), mappings(key));
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.get("a").is_none());
        assert!(cache.get("d").is_some());
    }

    #[tokio::test]
    async fn test_reinsert_moves_key_to_back() {
        let cache = SessionMappingCache::new(Duration::from_secs(300), 2);
        cache.insert("a".to_string(), mappings("1"));
        cache.insert("b".to_string(), mappings("2"));
        cache.insert("a".to_string(), mappings("3"));
        cache.insert("c".to_string(), mappings("4"));

        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").unwrap()["fp1"].value.as_deref(), Some("3"));
        assert!(cache.get("c").is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_stores_nothing() {
        let cache = SessionMappingCache::new(Duration::from_secs(300), 0);
        cache.insert("a".to_string(), mappings("1"));
        assert!(cache.get("a").is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = SessionMappingCache::from_config(&CacheConfig::default());
        cache.insert("a".to_string(), mappings("1"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
