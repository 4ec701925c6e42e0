//! Component metadata enrichment.
//!
//! This module fills missing component metadata (license, description,
//! homepage, identifiers) from external sources. Enrichment never overwrites
//! a field that already has a value and never fails a run: provider problems
//! are recorded in the [`EnrichmentLog`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sbom_enrich::enrichment::{Enricher, EnricherConfig, OfflineProvider};
//! use sbom_enrich::pipeline::CancelToken;
//! # async fn run(document: sbom_enrich::model::Document) -> sbom_enrich::Result<()> {
//! let provider = OfflineProvider::from_file("metadata.json".as_ref())?;
//! let enricher = Enricher::new(Arc::new(provider), EnricherConfig::default());
//! let (document, log) = enricher.enrich(document, &CancelToken::new()).await;
//! log.stats.log_summary();
//! # Ok(())
//! # }
//! ```

mod cache;
mod enricher;
mod offline;
#[cfg(feature = "registry")]
mod registry;
mod stats;
mod traits;

pub use cache::{CacheKey, CachedProvider, FileCache};
pub use enricher::{fill_missing, Enricher, EnricherConfig};
pub use offline::{OfflineProvider, OFFLINE_PROVIDER_NAME};
#[cfg(feature = "registry")]
pub use registry::{RegistryConfig, RegistryProvider, REGISTRY_PROVIDER_NAME};
pub use stats::{EnrichmentLog, EnrichmentStats, LogEntry, LogEvent};
pub use traits::{
    strip_qualifiers, ComponentMetadata, EcosystemKey, EnrichmentResult, MetadataProvider,
    ProviderError,
};

use crate::config::{EnrichmentConfig, ProviderKind};
use crate::error::{Result, SbomEnrichError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

impl From<&EnrichmentConfig> for EnricherConfig {
    fn from(config: &EnrichmentConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
        }
    }
}

/// Build the enricher an [`EnrichmentConfig`] describes.
pub fn build_enricher(config: &EnrichmentConfig) -> Result<Enricher> {
    let provider = build_provider(config)?;
    Ok(Enricher::new(provider, EnricherConfig::from(config)))
}

fn build_provider(config: &EnrichmentConfig) -> Result<Arc<dyn MetadataProvider>> {
    match config.provider {
        ProviderKind::Offline => {
            let path = config.offline_db.as_ref().ok_or_else(|| {
                SbomEnrichError::config("the offline provider needs `enrichment.offline_db`")
            })?;
            Ok(Arc::new(OfflineProvider::from_file(path)?))
        }
        ProviderKind::Registry => build_registry_provider(config),
    }
}

#[cfg(feature = "registry")]
fn build_registry_provider(config: &EnrichmentConfig) -> Result<Arc<dyn MetadataProvider>> {
    let registry = RegistryProvider::new(RegistryConfig {
        api_base: config.api_base.clone(),
        timeout: Duration::from_secs(config.timeout_secs),
    })?;
    let cached = CachedProvider::new(registry);
    if config.bypass_cache {
        return Ok(Arc::new(cached));
    }

    let cache_dir = config.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let ttl = Duration::from_secs(config.cache_ttl_hours * 3600);
    match FileCache::new(cache_dir, ttl) {
        Ok(file_cache) => Ok(Arc::new(cached.with_file_cache(file_cache))),
        Err(e) => {
            tracing::warn!("File cache unavailable, continuing without it: {}", e);
            Ok(Arc::new(cached))
        }
    }
}

#[cfg(not(feature = "registry"))]
fn build_registry_provider(_config: &EnrichmentConfig) -> Result<Arc<dyn MetadataProvider>> {
    Err(SbomEnrichError::config(
        "the registry provider requires the `registry` feature",
    ))
}

/// Get the default cache directory
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("sbom-enrich")
        .join("metadata")
}
