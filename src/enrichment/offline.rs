//! Offline metadata table.
//!
//! A JSON object mapping package URLs to metadata:
//!
//! ```json
//! {
//!   "pkg:npm/lodash@4.17.21": { "license": "MIT", "description": "Lodash modular utilities." }
//! }
//! ```
//!
//! Keys are normalized by dropping qualifiers and subpath, matching how
//! [`EcosystemKey`] is built.

use super::traits::strip_qualifiers;
use super::{ComponentMetadata, EcosystemKey, MetadataProvider, ProviderError};
use crate::error::{ErrorContext, Result, SbomEnrichError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

pub const OFFLINE_PROVIDER_NAME: &str = "offline";

/// In-memory metadata table keyed by package URL.
#[derive(Debug, Clone, Default)]
pub struct OfflineProvider {
    table: HashMap<String, ComponentMetadata>,
}

impl OfflineProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| SbomEnrichError::io(path, e))?;
        Self::from_json(&data).with_context(|| format!("loading offline table {}", path.display()))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let raw: HashMap<String, ComponentMetadata> = serde_json::from_str(data)
            .map_err(|e| SbomEnrichError::config(format!("invalid offline table: {e}")))?;
        let mut provider = Self::new();
        for (purl, metadata) in raw {
            provider.insert(&purl, metadata);
        }
        Ok(provider)
    }

    /// Add or replace an entry
    pub fn insert(&mut self, purl: &str, metadata: ComponentMetadata) {
        self.table
            .insert(strip_qualifiers(purl.trim()).to_string(), metadata);
    }

    #[must_use]
    pub fn with_entry(mut self, purl: &str, metadata: ComponentMetadata) -> Self {
        self.insert(purl, metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl MetadataProvider for OfflineProvider {
    async fn lookup(
        &self,
        key: &EcosystemKey,
    ) -> std::result::Result<Option<ComponentMetadata>, ProviderError> {
        Ok(self.table.get(&key.purl).cloned())
    }

    fn name(&self) -> &str {
        OFFLINE_PROVIDER_NAME
    }
}
