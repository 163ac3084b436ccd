//! Lookup result cache with per-entry TTL and JSON persistence.
//!
//! Each entry carries its own absolute expiry, so values cached with
//! different lifetimes coexist. Persists to a JSON file under the bot's
//! data directory; a missing or corrupt file starts an empty cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single cached value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached payload (typically a JSON document).
    pub value: String,
    /// Unix timestamp after which the entry is stale.
    pub expires_at: u64,
}

/// Persistent store serialized to JSON.
#[derive(Debug, Serialize, Deserialize, Default)]
struct CacheStore {
    entries: HashMap<String, CacheEntry>,
}

/// Key/value cache where every entry expires at its own deadline.
pub struct TtlCache {
    store: CacheStore,
    path: PathBuf,
    max_entries: usize,
}

impl TtlCache {
    /// Open a cache backed by `path`, loading any persisted entries.
    ///
    /// `max_entries` is clamped to a minimum of 1.
    pub fn open(path: PathBuf, max_entries: usize) -> Self {
        let store = Self::load_from_disk(&path);
        Self {
            store,
            path,
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a value. Returns `None` if the key is absent or expired;
    /// an expired entry is dropped on observation.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = Self::now_secs();
        match self.store.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                debug!(key, "cache entry expired, removing");
                self.store.entries.remove(key);
                // Deferred disk write, flushed on the next put().
                None
            }
            None => None,
        }
    }

    /// Insert or replace a value with the given time-to-live.
    ///
    /// Sweeps expired entries first, then evicts the entries nearest to
    /// expiry while over capacity.
    pub fn put(&mut self, key: String, value: String, ttl: Duration) {
        let now = Self::now_secs();
        self.sweep_expired(now);
        while self.store.entries.len() >= self.max_entries
            && !self.store.entries.contains_key(&key)
        {
            self.evict_nearest_expiry();
        }
        self.store.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now.saturating_add(ttl.as_secs()),
            },
        );
        self.save_to_disk();
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.store.entries.clear();
        self.save_to_disk();
    }

    pub fn len(&self) -> usize {
        self.store.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.entries.is_empty()
    }

    // -- private helpers ---------------------------------------------------

    fn sweep_expired(&mut self, now: u64) {
        self.store.entries.retain(|_, entry| entry.expires_at > now);
    }

    fn evict_nearest_expiry(&mut self) {
        if let Some(key) = self
            .store
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone())
        {
            debug!(key = %key, "evicting cache entry nearest to expiry");
            self.store.entries.remove(&key);
        }
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn load_from_disk(path: &Path) -> CacheStore {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(store) => store,
                Err(e) => {
                    warn!("Cache file is corrupt, starting empty: {}", e);
                    CacheStore::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheStore::default(),
            Err(e) => {
                warn!("Failed to read cache file, starting empty: {}", e);
                CacheStore::default()
            }
        }
    }

    fn save_to_disk(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(data) = serde_json::to_string_pretty(&self.store) {
            if let Err(e) = std::fs::write(&self.path, data) {
                warn!("Failed to save cache file: {}", e);
            }
        }
    }
}
