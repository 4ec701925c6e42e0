//! Configuration module for sbom-enrich.
//!
//! This module provides:
//! - Type-safe configuration structures
//! - Validation for all configuration values
//! - YAML config file loading and discovery
//! - CLI argument merging
//!
//! # Quick Start
//!
//! ```rust
//! use sbom_enrich::config::{AppConfig, Validatable};
//!
//! let config = AppConfig::builder()
//!     .workers(Some(4))
//!     .max_retries(1)
//!     .build();
//! assert!(config.is_valid());
//! ```
//!
//! # Configuration File
//!
//! Place a `.sbom-enrich.yaml` file in your project root or `~/.config/sbom-enrich/`:
//!
//! ```yaml
//! pipeline:
//!   workers: 4
//!   output_format: cyclonedx
//! enrichment:
//!   provider: offline
//!   offline_db: ./metadata.json
//! patches:
//!   - "primary.supplier=Acme Corp"
//! ```

pub mod file;
mod types;
mod validation;

pub use types::{AppConfig, AppConfigBuilder, EnrichmentConfig, PipelineConfig, ProviderKind};
pub use validation::{ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    ConfigFileError,
};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// The schema documents every option of `.sbom-enrich.yaml` and can be used
/// by editors for validation and autocompletion.
pub fn generate_json_schema() -> serde_json::Result<String> {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_schema_names_sections() {
        let schema = generate_json_schema().unwrap();
        assert!(schema.contains("\"pipeline\""));
        assert!(schema.contains("\"enrichment\""));
        assert!(schema.contains("\"offline\""));
    }
}
