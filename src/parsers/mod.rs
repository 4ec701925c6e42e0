//! Schema family codecs.
//!
//! Decodes CycloneDX and SPDX JSON into the schema-agnostic [`Document`] and
//! encodes documents back into either family.
//!
//! ## Format Detection
//!
//! When no family is declared, each parser reports a confidence score
//! (0.0-1.0) from a cheap marker scan and the most confident parser above
//! [`MIN_CONFIDENCE_THRESHOLD`] is used. Ties and weak matches are rejected.
//!
//! ## Usage
//!
//! ```no_run
//! use sbom_enrich::model::SchemaFamily;
//! use sbom_enrich::parsers::{parse, serialize};
//!
//! let bytes = std::fs::read("sbom.json").unwrap();
//! let document = parse(&bytes, None).unwrap();
//! let spdx = serialize(&document, SchemaFamily::Spdx).unwrap();
//! ```

mod cyclonedx;
mod detection;
mod spdx;
mod traits;

pub use cyclonedx::CycloneDxParser;
pub use detection::{DetectionResult, FormatDetector, MIN_CONFIDENCE_THRESHOLD};
pub use spdx::SpdxParser;
pub use traits::{FormatConfidence, FormatDetection, SchemaParser};

use crate::error::{Result, SbomEnrichError, SchemaErrorKind};
use crate::model::{Document, SchemaFamily};

/// Result of format detection
#[derive(Debug, Clone)]
pub struct DetectedFormat {
    /// Detected schema family
    pub family: SchemaFamily,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Detected version if available
    pub version: Option<String>,
    /// Any warnings about the detection
    pub warnings: Vec<String>,
}

/// Detect the schema family of content without decoding it.
///
/// Returns None if no family could be detected with sufficient confidence.
#[must_use]
pub fn detect_format(content: &str) -> Option<DetectedFormat> {
    let result = FormatDetector::new().detect_from_content(content);
    if !result.can_parse() {
        return None;
    }
    result.family.map(|family| DetectedFormat {
        family,
        confidence: result.confidence.value(),
        version: result.version,
        warnings: result.warnings,
    })
}

/// Decode bytes into a document.
///
/// With a declared family only that family's decoder is tried; otherwise the
/// family is sniffed from top-level markers.
pub fn parse(bytes: &[u8], declared: Option<SchemaFamily>) -> Result<Document> {
    let content = std::str::from_utf8(bytes).map_err(|e| {
        SbomEnrichError::schema(
            "reading input",
            SchemaErrorKind::InvalidJson(format!("input is not UTF-8: {e}")),
        )
    })?;
    FormatDetector::new().parse_str(content, declared)
}

/// Encode a document as pretty-printed JSON in the target family.
pub fn serialize(document: &Document, target: SchemaFamily) -> Result<Vec<u8>> {
    FormatDetector::new().parser(target).serialize(document)
}
