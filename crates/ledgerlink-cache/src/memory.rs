//! In-memory implementation of the Cache trait.
//!
//! Entries live in a map guarded by an RwLock. Expiry uses the tokio clock so
//! tests can drive it with a paused runtime.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::traits::Cache;

/// Configuration for [`MemoryCache`].
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum number of live entries.
    pub max_entries: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self { max_entries: 1024 }
    }
}

struct Entry {
    value: Bytes,
    /// `None` when the TTL reaches past what the clock can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-memory TTL cache.
///
/// All data is lost when the cache is dropped. Thread-safe via RwLock.
pub struct MemoryCache {
    config: MemoryCacheConfig,
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Create an empty cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryCacheConfig::default())
    }

    pub fn with_config(config: MemoryCacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless a writer refreshed it in the meantime.
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
            debug!(key, "cache entry expired");
        }
        Ok(None)
    }

    async fn set_with_expire(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;

        if !entries.contains_key(key) && entries.len() >= self.config.max_entries {
            let before = entries.len();
            entries.retain(|_, e| e.is_live(now));
            debug!(purged = before - entries.len(), "purged expired cache entries");

            if entries.len() >= self.config.max_entries {
                return Err(CacheError::Full {
                    max_entries: self.config.max_entries,
                });
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now.checked_add(ttl),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}
