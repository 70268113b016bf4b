//! Query-result cache.
//!
//! Always keeps an in-memory tier; when a directory is configured, entries are
//! also written there as JSON so they survive restarts. Expiry is lazy: stale
//! entries are discarded when read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use scout_core::SearchRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::error::DiscoveryError;
use crate::types::DiscoveryOutcome;

/// Bumped whenever the cached shape or search semantics change, so old
/// entries stop matching.
pub const CACHE_KEY_VERSION: &str = "search_v3";

pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Normalized cache key for `request`.
///
/// Query and location are trimmed and lowercased; radius, limit and the page
/// position complete the key.
#[must_use]
pub fn cache_key(request: &SearchRequest) -> String {
    let page = request
        .continuation
        .as_ref()
        .map_or_else(|| "0".to_owned(), scout_core::Continuation::encode);
    format!(
        "{CACHE_KEY_VERSION}:{}:{}:{}:{}:{page}",
        request.query.trim().to_lowercase(),
        request.location.trim().to_lowercase(),
        request.radius_miles,
        request.limit,
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub outcome: DiscoveryOutcome,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age.num_seconds() >= 0 && age.num_seconds().unsigned_abs() < self.ttl_secs
    }
}

/// Thread-safe result cache shared by concurrent searches.
#[derive(Debug, Default)]
pub struct ResultCache {
    memory: RwLock<HashMap<String, CacheEntry>>,
    dir: Option<PathBuf>,
}

impl ResultCache {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A cache that also persists entries under `dir`. The directory is
    /// created on first write.
    #[must_use]
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            memory: RwLock::default(),
            dir: Some(dir.into()),
        }
    }

    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// The cached outcome for `key` if present and fresh.
    pub async fn get(&self, key: &str) -> Option<DiscoveryOutcome> {
        let now = Utc::now();
        let stale = {
            let memory = self.memory.read().await;
            match memory.get(key) {
                Some(entry) if entry.is_fresh_at(now) => return Some(entry.outcome.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if stale {
            // A put may have landed since the read lock was released.
            let mut memory = self.memory.write().await;
            let fresh = memory
                .get(key)
                .filter(|entry| entry.is_fresh_at(Utc::now()))
                .map(|entry| entry.outcome.clone());
            if fresh.is_some() {
                return fresh;
            }
            memory.remove(key);
        }

        let path = self.entry_path(key)?;
        let entry = match read_entry(&path).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable cache entry");
                let _ = tokio::fs::remove_file(&path).await;
                return None;
            }
        };
        if entry.key != key || !entry.is_fresh_at(now) {
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        let outcome = entry.outcome.clone();
        self.memory.write().await.insert(key.to_owned(), entry);
        Some(outcome)
    }

    /// Stores `outcome` under `key` for `ttl`. Empty result sets are not
    /// stored, so a transient empty answer is retried on the next call.
    ///
    /// Disk write failures are logged; the in-memory entry is kept.
    pub async fn put(&self, key: &str, outcome: &DiscoveryOutcome, ttl: Duration) {
        if outcome.results.is_empty() {
            tracing::debug!(key, "not caching empty result set");
            return;
        }
        let entry = CacheEntry {
            key: key.to_owned(),
            outcome: DiscoveryOutcome {
                from_cache: false,
                ..outcome.clone()
            },
            created_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
        };

        if let Some(path) = self.entry_path(key) {
            if let Err(e) = write_entry(&path, &entry).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to persist cache entry");
            }
        }
        self.memory.write().await.insert(key.to_owned(), entry);
    }

    /// Removes every entry from memory and disk. Returns the number of disk
    /// entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Cache`] if the cache directory cannot be read
    /// or an entry cannot be deleted.
    pub async fn clear(&self) -> Result<usize, DiscoveryError> {
        self.memory.write().await.clear();
        let Some(dir) = &self.dir else {
            return Ok(0);
        };
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        self.dir.as_ref().map(|dir| dir.join(format!("{digest}.json")))
    }
}

async fn read_entry(path: &Path) -> Result<Option<CacheEntry>, DiscoveryError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| DiscoveryError::Deserialize {
            context: format!("cache entry {}", path.display()),
            source: e,
        })
}

/// Writes to a sibling temp file and renames it into place so readers never
/// see a partial entry.
async fn write_entry(path: &Path, entry: &CacheEntry) -> Result<(), DiscoveryError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_vec(entry).map_err(|e| DiscoveryError::Deserialize {
        context: format!("cache entry {}", entry.key),
        source: e,
    })?;
    let tmp = path.with_extension(format!("tmp-{:016x}", rand::random::<u64>()));
    tokio::fs::write(&tmp, &body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
