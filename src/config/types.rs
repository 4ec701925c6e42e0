//! Configuration types for sbom-enrich runs.

use crate::augment::{MetadataPatch, PatchSpec, PatchSpecError};
use crate::pipeline::{default_workers, OutputFormat};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Unified application configuration that can be loaded from CLI args or config files.
///
/// Constructed from a config file, CLI arguments, or both (with CLI
/// overriding file settings).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// Batch execution settings
    pub pipeline: PipelineConfig,
    /// Metadata enrichment settings
    pub enrichment: EnrichmentConfig,
    /// Patches applied to every input, in order (`[document.|primary.]field=value`
    /// overwrites, `field+=value` appends)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<String>,
}

impl AppConfig {
    /// Create a new `AppConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AppConfig` builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse the configured patch specs, in order.
    pub fn metadata_patches(&self) -> Result<Vec<MetadataPatch>, PatchSpecError> {
        self.patches
            .iter()
            .map(|spec| spec.parse::<PatchSpec>().map(MetadataPatch::from))
            .collect()
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

/// Builder for constructing `AppConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the worker count.
    pub const fn workers(mut self, workers: Option<usize>) -> Self {
        self.config.pipeline.workers = workers;
        self
    }

    /// Set the family enriched documents are written in.
    pub const fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.pipeline.output_format = format;
        self
    }

    /// Enable or disable enrichment.
    pub const fn enrichment_enabled(mut self, enabled: bool) -> Self {
        self.config.enrichment.enabled = enabled;
        self
    }

    /// Use the offline provider backed by a JSON table.
    pub fn offline_db(mut self, path: PathBuf) -> Self {
        self.config.enrichment.provider = ProviderKind::Offline;
        self.config.enrichment.offline_db = Some(path);
        self
    }

    /// Set the registry API base URL.
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config.enrichment.api_base = url.into();
        self
    }

    /// Set the maximum number of concurrent lookups.
    pub const fn max_concurrent(mut self, max: usize) -> Self {
        self.config.enrichment.max_concurrent = max;
        self
    }

    /// Set the per-call timeout.
    pub const fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.enrichment.timeout_secs = secs;
        self
    }

    /// Set the retry budget per lookup.
    pub const fn max_retries(mut self, retries: u32) -> Self {
        self.config.enrichment.max_retries = retries;
        self
    }

    /// Set the cache directory.
    pub fn cache_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.enrichment.cache_dir = dir;
        self
    }

    /// Bypass the provider cache.
    pub const fn bypass_cache(mut self, bypass: bool) -> Self {
        self.config.enrichment.bypass_cache = bypass;
        self
    }

    /// Append patch specs.
    pub fn patches(mut self, patches: impl IntoIterator<Item = String>) -> Self {
        self.config.patches.extend(patches);
        self
    }

    /// Build the `AppConfig`.
    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Sub-configuration Types
// ============================================================================

/// Batch execution configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    /// Inputs processed concurrently (default: available parallelism, at most 8)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub workers: Option<usize>,
    /// Family enriched documents are written in
    pub output_format: OutputFormat,
}

impl PipelineConfig {
    /// Configured worker count, or the default
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers).max(1)
    }
}

/// Metadata source used for enrichment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Package registry metadata API
    #[default]
    Registry,
    /// Local JSON table keyed by package URL
    Offline,
}

/// Enrichment configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Enable enrichment (if false, no enrichment is performed)
    pub enabled: bool,
    /// Metadata provider
    pub provider: ProviderKind,
    /// Base URL of the registry metadata API
    pub api_base: String,
    /// JSON table for the offline provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_db: Option<PathBuf>,
    /// Maximum concurrent lookups per document
    #[schemars(range(min = 1))]
    pub max_concurrent: usize,
    /// Per-call timeout in seconds
    #[schemars(range(min = 1))]
    pub timeout_secs: u64,
    /// Retries after the first attempt for retryable failures
    pub max_retries: u32,
    /// First retry delay in milliseconds, doubled per attempt
    pub backoff_base_ms: u64,
    /// Upper bound on the retry delay in milliseconds
    pub backoff_max_ms: u64,
    /// Cache directory for provider answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// Cache time-to-live in hours
    #[schemars(range(min = 1))]
    pub cache_ttl_hours: u64,
    /// Skip the provider cache
    pub bypass_cache: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: ProviderKind::Registry,
            api_base: "https://packages.ecosyste.ms".to_string(),
            offline_db: None,
            max_concurrent: 8,
            timeout_secs: 10,
            max_retries: 3,
            backoff_base_ms: 250,
            backoff_max_ms: 5_000,
            cache_dir: None,
            cache_ttl_hours: 24,
            bypass_cache: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::{ApplyMode, PatchSubject};

    #[test]
    fn test_builder() {
        let config = AppConfig::builder()
            .workers(Some(2))
            .offline_db(PathBuf::from("db.json"))
            .patches(["primary.author+=Jane".to_string()])
            .build();
        assert_eq!(config.pipeline.effective_workers(), 2);
        assert_eq!(config.enrichment.provider, ProviderKind::Offline);
        assert_eq!(config.patches.len(), 1);
    }

    #[test]
    fn test_metadata_patches_keep_order() {
        let config = AppConfig::builder()
            .patches(["license=MIT".to_string(), "primary.author+=Jane".to_string()])
            .build();
        let patches = config.metadata_patches().unwrap();
        assert_eq!(patches[0].subject, PatchSubject::Document);
        assert_eq!(patches[1].mode, ApplyMode::Append);

        let broken = AppConfig::builder().patches(["license".to_string()]).build();
        assert!(broken.metadata_patches().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig =
            serde_yaml_ng::from_str("enrichment:\n  provider: offline\n").unwrap();
        assert_eq!(config.enrichment.provider, ProviderKind::Offline);
        assert_eq!(config.enrichment.max_retries, 3);
        assert!(config.enrichment.enabled);
        assert_eq!(config.pipeline.output_format, OutputFormat::Same);
    }
}
