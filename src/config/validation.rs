//! Configuration validation for sbom-enrich.
//!
//! Provides validation traits and implementations for all configuration types.

use super::types::{AppConfig, EnrichmentConfig, PipelineConfig, ProviderKind};
use crate::augment::PatchSpec;

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.pipeline.validate());
        if self.enrichment.enabled {
            errors.extend(self.enrichment.validate());
        }

        for (i, spec) in self.patches.iter().enumerate() {
            if let Err(e) = spec.parse::<PatchSpec>() {
                errors.push(ConfigError::new(format!("patches[{i}]"), e.to_string()));
            }
        }

        errors
    }
}

impl Validatable for PipelineConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.workers == Some(0) {
            errors.push(ConfigError::new(
                "pipeline.workers",
                "Worker count must be at least 1",
            ));
        }
        errors
    }
}

impl Validatable for EnrichmentConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.max_concurrent == 0 {
            errors.push(ConfigError::new(
                "enrichment.max_concurrent",
                "Must be at least 1",
            ));
        }
        if self.timeout_secs == 0 {
            errors.push(ConfigError::new(
                "enrichment.timeout_secs",
                "Timeout must be at least 1 second",
            ));
        }
        if self.cache_ttl_hours == 0 {
            errors.push(ConfigError::new(
                "enrichment.cache_ttl_hours",
                "Cache TTL must be at least 1 hour",
            ));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            errors.push(ConfigError::new(
                "enrichment.backoff_base_ms",
                format!(
                    "Base delay {}ms exceeds the maximum delay {}ms",
                    self.backoff_base_ms, self.backoff_max_ms
                ),
            ));
        }

        match self.provider {
            ProviderKind::Registry => {
                if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://")
                {
                    errors.push(ConfigError::new(
                        "enrichment.api_base",
                        format!("Expected an http(s) URL, got '{}'", self.api_base),
                    ));
                }
            }
            ProviderKind::Offline => match &self.offline_db {
                None => errors.push(ConfigError::new(
                    "enrichment.offline_db",
                    "The offline provider needs a metadata table",
                )),
                Some(path) if !path.exists() => errors.push(ConfigError::new(
                    "enrichment.offline_db",
                    format!("File does not exist: {}", path.display()),
                )),
                Some(_) => {}
            },
        }

        errors
    }
}
