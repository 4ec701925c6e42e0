//! Lookup caches: an on-disk TTL cache and a memoizing provider decorator.

use super::{ComponentMetadata, EcosystemKey, MetadataProvider, ProviderError};
use crate::error::{Result, SbomEnrichError};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Cache key for metadata lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    /// Provider the answer came from
    pub provider: String,
    /// Package URL without qualifiers
    pub purl: String,
}

impl CacheKey {
    pub fn new(provider: impl Into<String>, key: &EcosystemKey) -> Self {
        Self {
            provider: provider.into(),
            purl: key.purl.clone(),
        }
    }

    /// Convert to a filesystem-safe filename using SHA256 hash.
    #[must_use]
    pub fn to_filename(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("provider:{}|purl:{}", self.provider, self.purl));
        let hash = hasher.finalize();
        format!("{hash:x}.json")
    }
}

/// On-disk form of a lookup answer. `None` records a confirmed miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedAnswer {
    metadata: Option<ComponentMetadata>,
}

/// File-based cache with TTL support.
#[derive(Debug)]
pub struct FileCache {
    /// Cache directory
    cache_dir: PathBuf,
    /// Time-to-live for cached entries
    ttl: Duration,
}

impl FileCache {
    /// Create a new file cache.
    pub fn new(cache_dir: PathBuf, ttl: Duration) -> Result<Self> {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).map_err(|e| SbomEnrichError::io(&cache_dir, e))?;
        }
        Ok(Self { cache_dir, ttl })
    }

    /// Get a cached answer for a key.
    ///
    /// The outer `None` means not cached or expired; `Some(None)` is a cached miss.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Option<ComponentMetadata>> {
        let path = self.cache_dir.join(key.to_filename());

        let metadata = fs::metadata(&path).ok()?;

        let modified = metadata.modified().ok()?;
        let age = modified.elapsed().ok()?;
        if age > self.ttl {
            let _ = fs::remove_file(&path);
            return None;
        }

        let data = fs::read_to_string(&path).ok()?;
        serde_json::from_str::<CachedAnswer>(&data)
            .ok()
            .map(|answer| answer.metadata)
    }

    /// Store an answer in the cache.
    pub fn set(&self, key: &CacheKey, metadata: Option<&ComponentMetadata>) -> Result<()> {
        let path = self.cache_dir.join(key.to_filename());
        let data = serde_json::to_string(&CachedAnswer {
            metadata: metadata.cloned(),
        })?;
        fs::write(&path, data).map_err(|e| SbomEnrichError::io(&path, e))?;
        Ok(())
    }
}

/// Memoizing decorator around any provider.
///
/// Answers (including confirmed misses) are kept in memory for the life of
/// the decorator and, when a [`FileCache`] is attached, on disk across runs.
/// Errors are never cached.
pub struct CachedProvider<P> {
    inner: P,
    memory: DashMap<String, Option<ComponentMetadata>>,
    disk: Option<FileCache>,
    hits: AtomicUsize,
}

impl<P: MetadataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            memory: DashMap::new(),
            disk: None,
            hits: AtomicUsize::new(0),
        }
    }

    /// Back the in-memory cache with a file cache
    #[must_use]
    pub fn with_file_cache(mut self, cache: FileCache) -> Self {
        self.disk = Some(cache);
        self
    }

    /// Lookups answered without calling the inner provider
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Entries held in memory
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }
}

#[async_trait]
impl<P: MetadataProvider> MetadataProvider for CachedProvider<P> {
    async fn lookup(
        &self,
        key: &EcosystemKey,
    ) -> std::result::Result<Option<ComponentMetadata>, ProviderError> {
        if let Some(cached) = self.memory.get(&key.purl) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        let cache_key = CacheKey::new(self.inner.name(), key);
        if let Some(disk) = &self.disk {
            if let Some(answer) = disk.get(&cache_key) {
                tracing::debug!("File cache hit for {}", key.purl);
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.memory.insert(key.purl.clone(), answer.clone());
                return Ok(answer);
            }
        }

        let answer = self.inner.lookup(key).await?;

        if let Some(disk) = &self.disk {
            if let Err(e) = disk.set(&cache_key, answer.as_ref()) {
                tracing::warn!("Failed to write cache entry for {}: {}", key.purl, e);
            }
        }
        self.memory.insert(key.purl.clone(), answer.clone());
        Ok(answer)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn cache_hits(&self) -> usize {
        self.hits()
    }
}
