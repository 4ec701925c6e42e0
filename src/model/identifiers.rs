//! Component identifiers and references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Format-local reference of a component (`bom-ref` in CycloneDX, `SPDXID` in SPDX).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the raw reference value
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Derive an SPDX-safe element id (`SPDXRef-` followed by `[A-Za-z0-9.-]`).
    #[must_use]
    pub fn to_spdx_id(&self) -> String {
        if self.0.starts_with("SPDXRef-") {
            return self.0.clone();
        }
        let sanitized: String = self
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '-' })
            .collect();
        format!("SPDXRef-{sanitized}")
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ComponentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Standardized identifiers attached to a component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentIdentifiers {
    /// Package URLs
    pub purls: Vec<String>,
    /// CPE identifiers (2.2 or 2.3 formatted)
    pub cpes: Vec<String>,
}

impl ComponentIdentifiers {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.purls.is_empty() && self.cpes.is_empty()
    }

    /// First PURL, the one used for ecosystem resolution
    #[must_use]
    pub fn primary_purl(&self) -> Option<&str> {
        self.purls.first().map(String::as_str)
    }
}

/// Ecosystem/package manager type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ecosystem {
    Npm,
    PyPi,
    Cargo,
    Maven,
    Golang,
    Nuget,
    RubyGems,
    Composer,
    Swift,
    Hex,
    Pub,
    Conda,
    Deb,
    Rpm,
    Apk,
    Oci,
    Generic,
    Unknown(String),
}

impl Ecosystem {
    /// Parse ecosystem from PURL type
    pub fn from_purl_type(purl_type: &str) -> Self {
        match purl_type.to_lowercase().as_str() {
            "npm" => Self::Npm,
            "pypi" => Self::PyPi,
            "cargo" => Self::Cargo,
            "maven" => Self::Maven,
            "golang" | "go" => Self::Golang,
            "nuget" => Self::Nuget,
            "gem" => Self::RubyGems,
            "composer" => Self::Composer,
            "swift" => Self::Swift,
            "hex" => Self::Hex,
            "pub" => Self::Pub,
            "conda" => Self::Conda,
            "deb" => Self::Deb,
            "rpm" => Self::Rpm,
            "apk" => Self::Apk,
            "oci" | "docker" => Self::Oci,
            "generic" => Self::Generic,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Whether a package registry can be asked about this ecosystem.
    ///
    /// OS-distribution and generic packages have no central registry.
    #[must_use]
    pub const fn has_registry(&self) -> bool {
        !matches!(
            self,
            Self::Deb | Self::Rpm | Self::Apk | Self::Generic | Self::Unknown(_)
        )
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Npm => write!(f, "npm"),
            Self::PyPi => write!(f, "pypi"),
            Self::Cargo => write!(f, "cargo"),
            Self::Maven => write!(f, "maven"),
            Self::Golang => write!(f, "golang"),
            Self::Nuget => write!(f, "nuget"),
            Self::RubyGems => write!(f, "gem"),
            Self::Composer => write!(f, "composer"),
            Self::Swift => write!(f, "swift"),
            Self::Hex => write!(f, "hex"),
            Self::Pub => write!(f, "pub"),
            Self::Conda => write!(f, "conda"),
            Self::Deb => write!(f, "deb"),
            Self::Rpm => write!(f, "rpm"),
            Self::Apk => write!(f, "apk"),
            Self::Oci => write!(f, "oci"),
            Self::Generic => write!(f, "generic"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// Human-facing reference to a component by name and version.
///
/// Used in findings and enrichment log entries, which must stay meaningful
/// after the document they came from is gone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    pub name: String,
    pub version: Option<String>,
}

impl ComponentRef {
    #[must_use]
    pub fn from_component(component: &super::Component) -> Self {
        Self {
            name: component.name.clone(),
            version: component.version.clone(),
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}
