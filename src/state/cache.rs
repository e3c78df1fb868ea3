use crate::state::storage::{KeyValueStore, StorageError};
use chrono::Utc;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const CACHE_PREFIX: &str = "gametime-cache:";
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// Epoch milliseconds at write time.
    timestamp: i64,
    data: Value,
    /// Lifetime in milliseconds.
    ttl: i64,
}

impl CacheEntry {
    fn is_fresh(&self, now: i64) -> bool {
        now - self.timestamp < self.ttl
    }
}

/// Pull-based TTL memoization over the persistent store. Expired entries are
/// removed by the read that finds them; nothing evicts in the background.
///
/// Failures never reach the caller: a bad read is a miss and a failed write
/// is only logged.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = namespaced(key);
        let raw = match self.store.get(&full_key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("cache read failed for {key}: {e}");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("discarding malformed cache entry {key}: {e}");
                return None;
            }
        };

        if !entry.is_fresh(Utc::now().timestamp_millis()) {
            debug!("cache entry {key} expired");
            if let Err(e) = self.store.remove(&full_key) {
                warn!("could not remove expired cache entry {key}: {e}");
            }
            return None;
        }

        serde_json::from_value(entry.data)
            .inspect_err(|e| warn!("cache entry {key} has an unexpected shape: {e}"))
            .ok()
    }

    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(e) => {
                warn!("could not serialize cache entry {key}: {e}");
                return;
            }
        };
        let entry = CacheEntry {
            timestamp: Utc::now().timestamp_millis(),
            data,
            ttl: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        };

        let result = serde_json::to_string(&entry)
            .map_err(StorageError::from)
            .and_then(|payload| self.store.set(&namespaced(key), &payload));
        if let Err(e) = result {
            warn!("cache write failed for {key}: {e}");
        }
    }

    pub fn set_default<T: Serialize>(&self, key: &str, data: &T) {
        self.set(key, data, DEFAULT_TTL);
    }

    /// Drop entries that are expired or unreadable. Keys for past dates are
    /// never read again, so nothing else would ever remove them.
    pub fn prune_expired(&self) -> usize {
        let now = Utc::now().timestamp_millis();
        self.cache_keys()
            .into_iter()
            .filter(|k| {
                let stale = match self.store.get(k) {
                    Ok(Some(raw)) => !serde_json::from_str::<CacheEntry>(&raw).is_ok_and(|e| e.is_fresh(now)),
                    Ok(None) => false,
                    Err(e) => {
                        warn!("could not read cache entry {k}: {e}");
                        false
                    }
                };
                stale && self.remove_logged(k)
            })
            .count()
    }

    /// Remove every cache entry, leaving other stored keys alone.
    pub fn clear(&self) -> usize {
        self.cache_keys().into_iter().filter(|k| self.remove_logged(k)).count()
    }

    fn cache_keys(&self) -> Vec<String> {
        match self.store.keys() {
            Ok(keys) => keys.into_iter().filter(|k| k.starts_with(CACHE_PREFIX)).collect(),
            Err(e) => {
                warn!("could not list cache entries: {e}");
                Vec::new()
            }
        }
    }

    fn remove_logged(&self, key: &str) -> bool {
        match self.store.remove(key) {
            Ok(()) => true,
            Err(e) => {
                warn!("could not remove cache entry {key}: {e}");
                false
            }
        }
    }
}

fn namespaced(key: &str) -> String {
    format!("{CACHE_PREFIX}{key}")
}
