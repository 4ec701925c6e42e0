//! Metadata structures for SBOM documents and components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire schema family of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaFamily {
    CycloneDx,
    Spdx,
}

impl SchemaFamily {
    /// Spec version written when a document is serialized into a family it
    /// was not parsed from.
    #[must_use]
    pub const fn default_spec_version(&self) -> &'static str {
        match self {
            Self::CycloneDx => "1.6",
            Self::Spdx => "SPDX-2.3",
        }
    }

    /// Short lowercase tag used in file names
    #[must_use]
    pub const fn file_tag(&self) -> &'static str {
        match self {
            Self::CycloneDx => "cdx",
            Self::Spdx => "spdx",
        }
    }
}

impl fmt::Display for SchemaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycloneDx => write!(f, "CycloneDX"),
            Self::Spdx => write!(f, "SPDX"),
        }
    }
}

impl FromStr for SchemaFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cyclonedx" | "cdx" => Ok(Self::CycloneDx),
            "spdx" => Ok(Self::Spdx),
            other => Err(format!("unknown schema family '{other}' (expected cyclonedx or spdx)")),
        }
    }
}

/// Document-level metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Authors of the SBOM data
    pub authors: Vec<Author>,
    /// Supplier of the described software
    pub supplier: Option<Organization>,
    /// License of the document itself
    pub license: Option<super::LicenseExpression>,
    /// Source repository of the described software
    pub repository_url: Option<String>,
    /// Lifecycle stage the SBOM was produced in
    pub lifecycle: Option<Lifecycle>,
    /// Creation timestamp
    pub timestamp: Option<DateTime<Utc>>,
    /// Tools that produced or modified the document, in order
    pub tools: Vec<Tool>,
}

/// SBOM author
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: Option<String>,
}

impl Author {
    #[must_use]
    pub const fn new(name: String) -> Self {
        Self { name, email: None }
    }

    /// Parse `Name <email>` or a bare name.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let (Some(open), true) = (value.rfind('<'), value.ends_with('>')) {
            let name = value[..open].trim().to_string();
            let email = value[open + 1..value.len() - 1].trim().to_string();
            return Self {
                name,
                email: (!email.is_empty()).then_some(email),
            };
        }
        Self::new(value.to_string())
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) => write!(f, "{} <{}>", self.name, email),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Tool in the provenance chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub version: Option<String>,
}

impl Tool {
    /// Parse `name@version` or a bare name.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().rsplit_once('@') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => Self {
                name: name.to_string(),
                version: Some(version.to_string()),
            },
            _ => Self {
                name: value.trim().to_string(),
                version: None,
            },
        }
    }
}

/// Organization/supplier information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization name
    pub name: String,
    /// Contact URLs
    pub urls: Vec<String>,
}

impl Organization {
    /// Create a new organization with just a name
    #[must_use]
    pub const fn new(name: String) -> Self {
        Self {
            name,
            urls: Vec::new(),
        }
    }
}

/// Lifecycle phase in which the SBOM was produced
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    Design,
    PreBuild,
    Build,
    PostBuild,
    Operations,
    Discovery,
    Decommission,
    /// Custom named phase
    Other(String),
}

impl Lifecycle {
    /// Parse a phase name; names outside the standard set become `Other`.
    #[must_use]
    pub fn from_phase(phase: &str) -> Self {
        match phase.trim().to_lowercase().as_str() {
            "design" => Self::Design,
            "pre-build" | "prebuild" => Self::PreBuild,
            "build" => Self::Build,
            "post-build" | "postbuild" => Self::PostBuild,
            "operations" => Self::Operations,
            "discovery" => Self::Discovery,
            "decommission" => Self::Decommission,
            _ => Self::Other(phase.trim().to_string()),
        }
    }

    /// The standard phase name, or `None` for custom phases
    #[must_use]
    pub const fn phase(&self) -> Option<&'static str> {
        match self {
            Self::Design => Some("design"),
            Self::PreBuild => Some("pre-build"),
            Self::Build => Some("build"),
            Self::PostBuild => Some("post-build"),
            Self::Operations => Some("operations"),
            Self::Discovery => Some("discovery"),
            Self::Decommission => Some("decommission"),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(name) => write!(f, "{name}"),
            standard => write!(f, "{}", standard.phase().unwrap_or_default()),
        }
    }
}

/// Component type classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ComponentType {
    Application,
    Framework,
    #[default]
    Library,
    Container,
    OperatingSystem,
    Device,
    Firmware,
    File,
    Other(String),
}

impl ComponentType {
    /// Parse a CycloneDX-style type name (`operating-system`, `library`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "application" => Self::Application,
            "framework" => Self::Framework,
            "library" => Self::Library,
            "container" => Self::Container,
            "operating-system" => Self::OperatingSystem,
            "device" => Self::Device,
            "firmware" => Self::Firmware,
            "file" => Self::File,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application => write!(f, "application"),
            Self::Framework => write!(f, "framework"),
            Self::Library => write!(f, "library"),
            Self::Container => write!(f, "container"),
            Self::OperatingSystem => write!(f, "operating-system"),
            Self::Device => write!(f, "device"),
            Self::Firmware => write!(f, "firmware"),
            Self::File => write!(f, "file"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Cryptographic hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash {
    /// Hash algorithm
    pub algorithm: HashAlgorithm,
    /// Hash value (hex encoded)
    pub value: String,
}

impl Hash {
    /// Create a new hash
    #[must_use]
    pub const fn new(algorithm: HashAlgorithm, value: String) -> Self {
        Self { algorithm, value }
    }
}

/// Hash algorithm types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Sha3_256,
    Sha3_512,
    Blake2b256,
    Blake3,
    Other(String),
}

impl HashAlgorithm {
    /// Parse an algorithm name in either CycloneDX (`SHA-256`) or SPDX (`SHA256`) spelling.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.to_uppercase().replace(['-', '_'], "").as_str() {
            "MD5" => Self::Md5,
            "SHA1" => Self::Sha1,
            "SHA256" => Self::Sha256,
            "SHA384" => Self::Sha384,
            "SHA512" => Self::Sha512,
            "SHA3256" => Self::Sha3_256,
            "SHA3512" => Self::Sha3_512,
            "BLAKE2B256" => Self::Blake2b256,
            "BLAKE3" => Self::Blake3,
            _ => Self::Other(name.to_string()),
        }
    }

    /// CycloneDX spelling
    #[must_use]
    pub fn cyclonedx_name(&self) -> String {
        match self {
            Self::Md5 => "MD5".to_string(),
            Self::Sha1 => "SHA-1".to_string(),
            Self::Sha256 => "SHA-256".to_string(),
            Self::Sha384 => "SHA-384".to_string(),
            Self::Sha512 => "SHA-512".to_string(),
            Self::Sha3_256 => "SHA3-256".to_string(),
            Self::Sha3_512 => "SHA3-512".to_string(),
            Self::Blake2b256 => "BLAKE2b-256".to_string(),
            Self::Blake3 => "BLAKE3".to_string(),
            Self::Other(s) => s.clone(),
        }
    }

    /// SPDX spelling
    #[must_use]
    pub fn spdx_name(&self) -> String {
        match self {
            Self::Md5 => "MD5".to_string(),
            Self::Sha1 => "SHA1".to_string(),
            Self::Sha256 => "SHA256".to_string(),
            Self::Sha384 => "SHA384".to_string(),
            Self::Sha512 => "SHA512".to_string(),
            Self::Sha3_256 => "SHA3-256".to_string(),
            Self::Sha3_512 => "SHA3-512".to_string(),
            Self::Blake2b256 => "BLAKE2b-256".to_string(),
            Self::Blake3 => "BLAKE3".to_string(),
            Self::Other(s) => s.clone(),
        }
    }
}
