//! Metadata provider abstraction.
//!
//! A [`MetadataProvider`] answers "what does the outside world know about this
//! package?" for one [`EcosystemKey`] at a time. Providers are composable:
//! [`CachedProvider`](super::CachedProvider) wraps any other provider.

use crate::model::{Component, ComponentId, Ecosystem};
use async_trait::async_trait;
use packageurl::PackageUrl;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registry lookup key derived from a component's package URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EcosystemKey {
    pub package_manager: Ecosystem,
    pub namespace: Option<String>,
    pub name: String,
    pub version: Option<String>,
    /// Package URL without qualifiers or subpath
    pub purl: String,
}

impl EcosystemKey {
    /// Build a key from the first package URL that parses.
    ///
    /// A PURL without a version borrows the component's version, so
    /// `pkg:npm/lodash` on a component at `4.17.21` looks up
    /// `pkg:npm/lodash@4.17.21`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the component has no package URL
    /// or none of them parse.
    pub fn from_component(component: &Component) -> Result<Self, String> {
        let purls = &component.identifiers.purls;
        if purls.is_empty() {
            return Err("no package URL".to_string());
        }

        let mut last_error = String::new();
        for raw in purls {
            match PackageUrl::from_str(raw) {
                Ok(parsed) => {
                    let version = parsed
                        .version()
                        .map(str::to_string)
                        .or_else(|| component.version.clone());
                    let mut purl = strip_qualifiers(raw).to_string();
                    if parsed.version().is_none() {
                        if let Some(v) = &version {
                            purl = format!("{purl}@{v}");
                        }
                    }
                    return Ok(Self {
                        package_manager: Ecosystem::from_purl_type(parsed.ty()),
                        namespace: parsed.namespace().map(str::to_string),
                        name: parsed.name().to_string(),
                        version,
                        purl,
                    });
                }
                Err(e) => last_error = format!("unparsable package URL '{raw}': {e}"),
            }
        }
        Err(last_error)
    }
}

impl fmt::Display for EcosystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.purl)
    }
}

/// Drop the `?qualifiers` and `#subpath` parts of a package URL.
#[must_use]
pub fn strip_qualifiers(purl: &str) -> &str {
    let end = purl.find(['?', '#']).unwrap_or(purl.len());
    &purl[..end]
}

/// Metadata a provider knows about a package. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl ComponentMetadata {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.license.is_none()
            && self.description.is_none()
            && self.cpe.is_none()
            && self.purl.is_none()
            && self.homepage.is_none()
    }
}

/// Metadata found for one component, tagged with the provider it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub component: ComponentId,
    pub metadata: ComponentMetadata,
    pub source: String,
}

/// Why a provider lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ProviderError {
    #[error("Request timeout")]
    Timeout,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Cache error: {0}")]
    Cache(String),
}

impl ProviderError {
    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimited | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::InvalidResponse(_) | Self::Cache(_) => false,
        }
    }
}

/// Source of package metadata.
///
/// `Ok(None)` means the provider answered and knows nothing about the
/// package; errors are reserved for lookups that did not complete.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use sbom_enrich::enrichment::{ComponentMetadata, EcosystemKey, MetadataProvider, ProviderError};
///
/// struct Everything;
///
/// #[async_trait]
/// impl MetadataProvider for Everything {
///     async fn lookup(&self, _key: &EcosystemKey) -> Result<Option<ComponentMetadata>, ProviderError> {
///         Ok(Some(ComponentMetadata {
///             license: Some("MIT".to_string()),
///             ..ComponentMetadata::default()
///         }))
///     }
///
///     fn name(&self) -> &str {
///         "everything"
///     }
/// }
/// ```
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Look up metadata for one package.
    async fn lookup(&self, key: &EcosystemKey)
        -> Result<Option<ComponentMetadata>, ProviderError>;

    /// Provenance tag recorded with every result.
    fn name(&self) -> &str;

    /// Lookups answered from a cache so far
    fn cache_hits(&self) -> usize {
        0
    }
}

#[async_trait]
impl<P: MetadataProvider + ?Sized> MetadataProvider for std::sync::Arc<P> {
    async fn lookup(
        &self,
        key: &EcosystemKey,
    ) -> Result<Option<ComponentMetadata>, ProviderError> {
        (**self).lookup(key).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn cache_hits(&self) -> usize {
        (**self).cache_hits()
    }
}
