//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::types::{AppConfig, EnrichmentConfig};
use crate::pipeline::OutputFormat;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
const CONFIG_FILE_NAMES: &[&str] = &[
    ".sbom-enrich.yaml",
    ".sbom-enrich.yml",
    "sbom-enrich.yaml",
    "sbom-enrich.yml",
];

/// Directory name under the user config directory
const APP_DIR: &str = "sbom-enrich";

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (~/.config/sbom-enrich/)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path.filter(|p| p.exists()) {
        return Some(path.to_path_buf());
    }

    let cwd = std::env::current_dir().ok();
    let candidates = [
        cwd.clone(),
        cwd.as_deref().and_then(find_git_root),
        dirs::config_dir().map(|dir| dir.join(APP_DIR)),
        dirs::home_dir(),
    ];
    candidates
        .iter()
        .flatten()
        .find_map(|dir| find_config_in_dir(dir))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Find the git repository root by walking up the directory tree.
fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let git_dir = current.join(".git");
        if git_dir.exists() {
            return Some(current.to_path_buf());
        }

        current = current.parent()?;
    }
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug)]
pub enum ConfigFileError {
    /// File not found
    NotFound(PathBuf),
    /// IO error reading file
    Io(std::io::Error),
    /// YAML parsing error
    Parse(serde_yaml_ng::Error),
}

impl std::fmt::Display for ConfigFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            Self::Io(e) => write!(f, "Failed to read config file: {e}"),
            Self::Parse(e) => write!(f, "Failed to parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigFileError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yaml_ng::Error> for ConfigFileError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::Parse(err)
    }
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml_ng::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl AppConfig {
    /// Merge another config into this one, with `other` taking precedence.
    ///
    /// Values of `other` that equal the defaults are treated as unset, so
    /// layering CLI args over a file only replaces what the user passed.
    /// Patches accumulate: file patches first, then `other`'s.
    pub fn merge(&mut self, other: &Self) {
        if other.pipeline.workers.is_some() {
            self.pipeline.workers = other.pipeline.workers;
        }
        if other.pipeline.output_format != OutputFormat::Same {
            self.pipeline.output_format = other.pipeline.output_format;
        }

        let defaults = EnrichmentConfig::default();
        let (ours, theirs) = (&mut self.enrichment, &other.enrichment);
        if !theirs.enabled {
            ours.enabled = false;
        }
        if theirs.provider != defaults.provider {
            ours.provider = theirs.provider;
        }
        if theirs.api_base != defaults.api_base {
            ours.api_base.clone_from(&theirs.api_base);
        }
        if theirs.offline_db.is_some() {
            ours.offline_db.clone_from(&theirs.offline_db);
        }
        if theirs.max_concurrent != defaults.max_concurrent {
            ours.max_concurrent = theirs.max_concurrent;
        }
        if theirs.timeout_secs != defaults.timeout_secs {
            ours.timeout_secs = theirs.timeout_secs;
        }
        if theirs.max_retries != defaults.max_retries {
            ours.max_retries = theirs.max_retries;
        }
        if theirs.backoff_base_ms != defaults.backoff_base_ms {
            ours.backoff_base_ms = theirs.backoff_base_ms;
        }
        if theirs.backoff_max_ms != defaults.backoff_max_ms {
            ours.backoff_max_ms = theirs.backoff_max_ms;
        }
        if theirs.cache_dir.is_some() {
            ours.cache_dir.clone_from(&theirs.cache_dir);
        }
        if theirs.cache_ttl_hours != defaults.cache_ttl_hours {
            ours.cache_ttl_hours = theirs.cache_ttl_hours;
        }
        if theirs.bypass_cache {
            ours.bypass_cache = true;
        }

        self.patches.extend(other.patches.iter().cloned());
    }

    /// Load from file and merge with CLI overrides.
    #[must_use]
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        cli_overrides: &Self,
    ) -> (Self, Option<PathBuf>) {
        let (mut config, loaded_from) = load_or_default(config_path);
        config.merge(cli_overrides);
        (config, loaded_from)
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AppConfig::default();
    format!(
        r"# sbom-enrich configuration
# Place this file at .sbom-enrich.yaml in your project root or ~/.config/sbom-enrich/

{}
",
        serde_yaml_ng::to_string(&example).unwrap_or_default()
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".sbom-enrich.yaml");
        std::fs::write(&config_path, "pipeline:\n  workers: 2\n").unwrap();

        let found = find_config_in_dir(tmp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_dir_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_in_dir(tmp.path()), None);
    }

    #[test]
    fn test_find_git_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_git_root(&nested), Some(tmp.path().to_path_buf()));
    }

    #[test]
    fn test_load_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");

        let yaml = r#"
pipeline:
  workers: 4
  output_format: spdx
enrichment:
  provider: offline
  offline_db: ./metadata.json
  max_retries: 1
patches:
  - "primary.author+=Jane Doe"
"#;
        std::fs::write(&config_path, yaml).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.pipeline.workers, Some(4));
        assert_eq!(config.pipeline.output_format, OutputFormat::Spdx);
        assert_eq!(config.enrichment.provider, ProviderKind::Offline);
        assert_eq!(config.enrichment.max_retries, 1);
        assert_eq!(config.enrichment.timeout_secs, 10);
        assert_eq!(config.patches.len(), 1);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("broken.yaml");
        std::fs::write(&config_path, "pipeline: [not, a, map").unwrap();

        let (config, loaded_from) = load_or_default(Some(&config_path));
        assert_eq!(config, AppConfig::default());
        assert_eq!(loaded_from, None);
    }

    #[test]
    fn test_config_merge() {
        let mut base = AppConfig::default();
        base.enrichment.max_retries = 5;
        base.patches.push("license=MIT".to_string());

        let overrides = AppConfig::builder()
            .workers(Some(3))
            .enrichment_enabled(false)
            .timeout_secs(30)
            .patches(["primary.version=2.0".to_string()])
            .build();
        base.merge(&overrides);

        assert_eq!(base.pipeline.workers, Some(3));
        assert!(!base.enrichment.enabled);
        assert_eq!(base.enrichment.timeout_secs, 30);
        assert_eq!(base.enrichment.max_retries, 5);
        assert_eq!(base.patches, vec!["license=MIT", "primary.version=2.0"]);
    }

    #[test]
    fn test_generate_example_config() {
        let example = generate_example_config();
        assert!(example.contains("enrichment:"));
        assert!(example.contains("max_concurrent"));
    }

    #[test]
    fn test_discover_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("custom-config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "pipeline:\n  workers: 1").unwrap();

        let discovered = discover_config_file(Some(&config_path));
        assert_eq!(discovered, Some(config_path));
    }
}
