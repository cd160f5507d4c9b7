//! Two-tier fingerprint cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use jobfill_config::CacheConfig;
use jobfill_protocols::{Clock, DurableStore, MappingResult};

use crate::durable::{DurableFingerprintCache, DurableSettings};
use crate::error::CacheError;
use crate::session::SessionMappingCache;
use crate::Mappings;

/// Entry counts of both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub durable_entries: usize,
    pub durable_fresh: usize,
    pub session_entries: usize,
}

/// Durable per-fingerprint tier plus volatile whole-request tier.
pub struct FingerprintCache {
    durable: DurableFingerprintCache,
    session: SessionMappingCache,
}

impl FingerprintCache {
    pub fn new(durable: DurableFingerprintCache, session: SessionMappingCache) -> Self {
        Self { durable, session }
    }

    pub fn from_config(
        config: &CacheConfig,
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            DurableFingerprintCache::new(store, clock, DurableSettings::from_config(config)),
            SessionMappingCache::from_config(config),
        )
    }

    /// Durable hits for `fingerprints`; anything absent is a miss.
    pub async fn get_cached(
        &self,
        fingerprints: &[String],
    ) -> Result<HashMap<String, MappingResult>, CacheError> {
        self.durable.get_cached(fingerprints).await
    }

    pub async fn set_cached(&self, mappings: &Mappings) -> Result<usize, CacheError> {
        self.durable.set_cached(mappings).await
    }

    pub fn get_cached_mapping(&self, key: &str) -> Option<Mappings> {
        self.session.get(key)
    }

    pub fn set_cached_mapping(&self, key: String, mappings: Mappings) {
        self.session.insert(key, mappings);
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let (durable_entries, durable_fresh) = self.durable.counts().await?;
        Ok(CacheStats {
            durable_entries,
            durable_fresh,
            session_entries: self.session.len(),
        })
    }

    /// Empty both tiers.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.session.clear();
        self.durable.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobfill_protocols::ManualClock;
    use jobfill_storage::MemoryStore;

    fn cache() -> FingerprintCache {
        FingerprintCache::from_config(
            &CacheConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(1_000)),
        )
    }

    #[tokio::test]
    async fn test_tiers_are_independent() {
        let cache = cache();
        let mappings = Mappings::from([("fp1".to_string(), MappingResult::with_value("Jane"))]);

        cache.set_cached_mapping("request".to_string(), mappings.clone());
        assert!(cache.get_cached(&["fp1".to_string()]).await.unwrap().is_empty());

        cache.set_cached(&mappings).await.unwrap();
        assert_eq!(cache.get_cached(&["fp1".to_string()]).await.unwrap().len(), 1);
        assert_eq!(cache.get_cached_mapping("request"), Some(mappings));
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let cache = cache();
        let mappings = Mappings::from([
            ("fp1".to_string(), MappingResult::with_value("Jane")),
            ("fp2".to_string(), MappingResult::default()),
        ]);
        cache.set_cached(&mappings).await.unwrap();
        cache.set_cached_mapping("request".to_string(), mappings);

        let stats = cache.stats().await.unwrap();
        assert_eq!(
            stats,
            CacheStats {
                durable_entries: 1,
                durable_fresh: 1,
                session_entries: 1,
            }
        );

        cache.clear().await.unwrap();
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.durable_entries, 0);
        assert_eq!(stats.session_entries, 0);
    }
}
