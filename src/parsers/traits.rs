//! Parser trait definitions and detection confidence.
//!
//! Each schema family implements [`SchemaParser`], which both decodes wire
//! bytes into a [`Document`] and encodes a document back into that family.

use crate::error::Result;
use crate::model::{Document, SchemaFamily};

/// Confidence level for format detection
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FormatConfidence(f32);

impl FormatConfidence {
    /// No confidence - definitely not this format
    pub const NONE: Self = Self(0.0);
    /// Low confidence - might be this format
    pub const LOW: Self = Self(0.25);
    /// Medium confidence - likely this format
    pub const MEDIUM: Self = Self(0.5);
    /// High confidence - almost certainly this format
    pub const HIGH: Self = Self(0.75);
    /// Certain - definitely this format
    pub const CERTAIN: Self = Self(1.0);

    /// Create a new confidence value
    #[must_use]
    pub const fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Get the confidence value
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }

    /// Check if this confidence indicates the format can be parsed
    #[must_use]
    pub fn can_parse(&self) -> bool {
        self.0 >= super::MIN_CONFIDENCE_THRESHOLD
    }
}

impl Default for FormatConfidence {
    fn default() -> Self {
        Self::NONE
    }
}

/// Detection result from a parser
#[derive(Debug, Clone)]
pub struct FormatDetection {
    /// Confidence that this parser can handle the content
    pub confidence: FormatConfidence,
    /// Detected version if applicable
    pub version: Option<String>,
    /// Any issues detected that might affect parsing
    pub warnings: Vec<String>,
}

impl FormatDetection {
    /// Create a detection result indicating no match
    #[must_use]
    pub const fn no_match() -> Self {
        Self::with_confidence(FormatConfidence::NONE)
    }

    /// Create a detection result with confidence
    #[must_use]
    pub const fn with_confidence(confidence: FormatConfidence) -> Self {
        Self {
            confidence,
            version: None,
            warnings: Vec::new(),
        }
    }

    /// Set the detected version
    #[must_use]
    pub fn version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// Add a warning
    #[must_use]
    pub fn warning(mut self, warning: &str) -> Self {
        self.warnings.push(warning.to_string());
        self
    }
}

/// Codec for one schema family.
///
/// `detect()` is a lightweight marker scan, so format selection never needs
/// trial-and-error decoding.
pub trait SchemaParser {
    /// Schema family handled by this parser
    fn family(&self) -> SchemaFamily;

    /// Decode a document from string content
    fn parse_str(&self, content: &str) -> Result<Document>;

    /// Encode a document as pretty-printed JSON in this family
    fn serialize(&self, document: &Document) -> Result<Vec<u8>>;

    /// Get supported format versions
    fn supported_versions(&self) -> &'static [&'static str];

    /// Get format name
    fn format_name(&self) -> &'static str {
        match self.family() {
            SchemaFamily::CycloneDx => "CycloneDX",
            SchemaFamily::Spdx => "SPDX",
        }
    }

    /// Detect if this parser can handle the given content
    fn detect(&self, content: &str) -> FormatDetection;

    /// Quick check if this parser can likely handle the content
    fn can_parse(&self, content: &str) -> bool {
        self.detect(content).confidence.can_parse()
    }
}

/// Extract the string value following `"key"` without a full parse.
pub(crate) fn extract_json_string(content: &str, key: &str) -> Option<String> {
    let needle = format!("\"{key}\"");
    let idx = content.find(&needle)?;
    let after = &content[idx + needle.len()..];
    let value_part = after.trim_start().strip_prefix(':')?.trim_start();
    let after_quote = value_part.strip_prefix('"')?;
    let end = after_quote.find('"')?;
    Some(after_quote[..end].to_string())
}
