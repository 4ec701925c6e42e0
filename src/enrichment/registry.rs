//! Live package registry lookups through the ecosyste.ms packages API.

use super::{ComponentMetadata, EcosystemKey, MetadataProvider, ProviderError};
use crate::error::{Result, SbomEnrichError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const REGISTRY_PROVIDER_NAME: &str = "ecosyste.ms";

/// Registry client configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL of the packages API
    pub api_base: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            api_base: "https://packages.ecosyste.ms".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// One package record from `/api/v1/packages/lookup`
#[derive(Debug, Deserialize)]
struct PackageRecord {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    repository_url: Option<String>,
    #[serde(default)]
    normalized_licenses: Vec<String>,
    #[serde(default)]
    licenses: Option<String>,
    #[serde(default)]
    purl: Option<String>,
}

impl PackageRecord {
    fn into_metadata(self) -> ComponentMetadata {
        let license = if self.normalized_licenses.is_empty() {
            self.licenses.filter(|l| !l.trim().is_empty())
        } else {
            Some(self.normalized_licenses.join(" AND "))
        };
        ComponentMetadata {
            license,
            description: self.description.filter(|d| !d.trim().is_empty()),
            cpe: None,
            purl: self.purl,
            homepage: self
                .homepage
                .or(self.repository_url)
                .filter(|h| !h.trim().is_empty()),
        }
    }
}

/// HTTP-backed metadata provider.
pub struct RegistryProvider {
    client: reqwest::Client,
    config: RegistryConfig,
}

fn network_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(err.to_string())
    }
}

impl RegistryProvider {
    /// Create a new registry provider.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| {
                SbomEnrichError::provider("creating HTTP client", network_error(&e))
            })?;

        Ok(Self { client, config })
    }

    fn lookup_url(&self) -> String {
        format!(
            "{}/api/v1/packages/lookup",
            self.config.api_base.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl MetadataProvider for RegistryProvider {
    async fn lookup(
        &self,
        key: &EcosystemKey,
    ) -> std::result::Result<Option<ComponentMetadata>, ProviderError> {
        let response = self
            .client
            .get(self.lookup_url())
            .query(&[("purl", key.purl.as_str())])
            .send()
            .await
            .map_err(|e| network_error(&e))?;

        let status = response.status();
        match status.as_u16() {
            404 => return Ok(None),
            429 => return Err(ProviderError::RateLimited),
            _ if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let records: Vec<PackageRecord> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        tracing::debug!("{} returned {} record(s) for {}", REGISTRY_PROVIDER_NAME, records.len(), key);
        Ok(records.into_iter().next().map(PackageRecord::into_metadata))
    }

    fn name(&self) -> &str {
        REGISTRY_PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.api_base, "https://packages.ecosyste.ms");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_lookup_url_trims_slash() {
        let provider = RegistryProvider::new(RegistryConfig {
            api_base: "http://localhost:8080/".to_string(),
            ..RegistryConfig::default()
        })
        .unwrap();
        assert_eq!(
            provider.lookup_url(),
            "http://localhost:8080/api/v1/packages/lookup"
        );
    }

    #[test]
    fn test_record_mapping() {
        let record: PackageRecord = serde_json::from_str(
            r#"{"name": "lodash", "description": "Lodash modular utilities.",
                "normalized_licenses": ["MIT"], "licenses": "MIT",
                "repository_url": "https://github.com/lodash/lodash"}"#,
        )
        .unwrap();
        let metadata = record.into_metadata();
        assert_eq!(metadata.license.as_deref(), Some("MIT"));
        assert_eq!(
            metadata.homepage.as_deref(),
            Some("https://github.com/lodash/lodash")
        );
    }

    #[test]
    fn test_record_mapping_blank_fields() {
        let record: PackageRecord =
            serde_json::from_str(r#"{"description": " ", "licenses": ""}"#).unwrap();
        assert!(record.into_metadata().is_empty());
    }
}
