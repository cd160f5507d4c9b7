//! Durable fingerprint cache tier.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use jobfill_config::CacheConfig;
use jobfill_protocols::{load_json, save_json, Clock, DurableStore, MappingResult, StorageError};

use crate::error::CacheError;

/// Durable storage key holding the whole tier.
pub const DURABLE_CACHE_KEY: &str = "fieldFingerprintCache";

/// One cached mapping with the time it was written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub mapping: MappingResult,
    /// Milliseconds since the Unix epoch.
    pub cached_at: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: i64, ttl_millis: i64) -> bool {
        now - self.cached_at < ttl_millis
    }
}

type Entries = BTreeMap<String, CacheEntry>;

/// Durable tier limits.
#[derive(Debug, Clone, Copy)]
pub struct DurableSettings {
    pub ttl_millis: i64,
    /// Entry count above which a write sweeps the tier.
    pub max_entries: usize,
    /// Entries a sweep keeps, newest first.
    pub retain_entries: usize,
}

impl DurableSettings {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            ttl_millis: config.durable_ttl_millis(),
            max_entries: config.durable_max_entries,
            retain_entries: config.durable_retain_entries,
        }
    }
}

impl Default for DurableSettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

/// Fingerprint to mapping cache that survives restarts.
///
/// Stale entries are treated as absent on read and stay in storage until a
/// write sweeps them out. Writes re-stamp `cached_at`; reads never do.
pub struct DurableFingerprintCache {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    settings: DurableSettings,
    /// Serializes read-modify-write cycles.
    write_lock: tokio::sync::Mutex<()>,
}

impl DurableFingerprintCache {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>, settings: DurableSettings) -> Self {
        Self {
            store,
            clock,
            settings,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Fresh cached mappings for the requested fingerprints.
    pub async fn get_cached(
        &self,
        fingerprints: &[String],
    ) -> Result<HashMap<String, MappingResult>, CacheError> {
        if fingerprints.is_empty() {
            return Ok(HashMap::new());
        }
        let entries = self.read_entries().await?;
        let now = self.clock.now_millis();

        let hits: HashMap<String, MappingResult> = fingerprints
            .iter()
            .filter_map(|fp| {
                entries
                    .get(fp)
                    .filter(|entry| entry.is_fresh(now, self.settings.ttl_millis))
                    .map(|entry| (fp.clone(), entry.mapping.clone()))
            })
            .collect();

        debug!(
            "Durable cache: {} hit(s) of {} requested",
            hits.len(),
            fingerprints.len()
        );
        Ok(hits)
    }

    /// Merge mappings that carry a value, stamped now, then sweep.
    ///
    /// Returns the number of entries written.
    pub async fn set_cached(
        &self,
        mappings: &HashMap<String, MappingResult>,
    ) -> Result<usize, CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        let now = self.clock.now_millis();

        let mut written = 0;
        for (fp, mapping) in mappings {
            if fp.is_empty() || !mapping.has_value() {
                continue;
            }
            entries.insert(
                fp.clone(),
                CacheEntry {
                    mapping: mapping.clone(),
                    cached_at: now,
                },
            );
            written += 1;
        }
        if written == 0 {
            return Ok(0);
        }

        let evicted = evict_oldest(&mut entries, &self.settings);
        if evicted > 0 {
            debug!("Durable cache swept {} old entries", evicted);
        }

        save_json(self.store.as_ref(), DURABLE_CACHE_KEY, &entries).await?;
        Ok(written)
    }

    /// Total and fresh entry counts.
    pub async fn counts(&self) -> Result<(usize, usize), CacheError> {
        let entries = self.read_entries().await?;
        let now = self.clock.now_millis();
        let fresh = entries
            .values()
            .filter(|e| e.is_fresh(now, self.settings.ttl_millis))
            .count();
        Ok((entries.len(), fresh))
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(DURABLE_CACHE_KEY).await?;
        Ok(())
    }

    async fn read_entries(&self) -> Result<Entries, CacheError> {
        match load_json::<Entries>(self.store.as_ref(), DURABLE_CACHE_KEY).await {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err(StorageError::Serialization(e)) => {
                // Unreadable content is dropped on the next write.
                warn!("Ignoring unreadable fingerprint cache: {}", e);
                Ok(Entries::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Drop the oldest entries once the count exceeds `max_entries`, keeping the
/// `retain_entries` most recently stamped. Ties break on fingerprint.
fn evict_oldest(entries: &mut Entries, settings: &DurableSettings) -> usize {
    if entries.len() <= settings.max_entries {
        return 0;
    }
    let mut by_age: Vec<(i64, String)> = entries
        .iter()
        .map(|(fp, entry)| (entry.cached_at, fp.clone()))
        .collect();
    by_age.sort();

    let to_delete = entries.len().saturating_sub(settings.retain_entries);
    for (_, fp) in by_age.into_iter().take(to_delete) {
        entries.remove(&fp);
    }
    to_delete
}

#[cfg(test)]
#[path = "durable_tests.rs"]
mod tests;
