//! Centralized format detection and parser selection.

use super::traits::{FormatConfidence, FormatDetection, SchemaParser};
use super::{CycloneDxParser, SpdxParser};
use crate::error::{Result, SbomEnrichError, SchemaErrorKind};
use crate::model::{Document, SchemaFamily};

/// Minimum confidence threshold for accepting a format detection.
/// This is LOW confidence (0.25) - the parser believes it might be able to handle the content.
pub const MIN_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Result of format detection.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// The family that should handle this content, if detected.
    pub family: Option<SchemaFamily>,
    /// Confidence level of the detection.
    pub confidence: FormatConfidence,
    /// Detected version if available.
    pub version: Option<String>,
    /// Any warnings about the detection.
    pub warnings: Vec<String>,
}

impl DetectionResult {
    /// Create a result indicating no format was detected.
    #[must_use]
    pub fn unknown(reason: &str) -> Self {
        Self {
            family: None,
            confidence: FormatConfidence::NONE,
            version: None,
            warnings: vec![reason.to_string()],
        }
    }

    fn detected(family: SchemaFamily, detection: FormatDetection) -> Self {
        Self {
            family: Some(family),
            confidence: detection.confidence,
            version: detection.version,
            warnings: detection.warnings,
        }
    }

    /// Check if the detection is confident enough to parse.
    #[must_use]
    pub fn can_parse(&self) -> bool {
        self.family.is_some() && self.confidence.value() >= MIN_CONFIDENCE_THRESHOLD
    }
}

/// Format detector and dispatcher for both schema families.
pub struct FormatDetector {
    cyclonedx: CycloneDxParser,
    spdx: SpdxParser,
    min_confidence: f32,
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDetector {
    /// Create a new format detector with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cyclonedx: CycloneDxParser::new(),
            spdx: SpdxParser::new(),
            min_confidence: MIN_CONFIDENCE_THRESHOLD,
        }
    }

    /// Parser for a schema family
    #[must_use]
    pub fn parser(&self, family: SchemaFamily) -> &dyn SchemaParser {
        match family {
            SchemaFamily::CycloneDx => &self.cyclonedx,
            SchemaFamily::Spdx => &self.spdx,
        }
    }

    /// Detect format from full content string.
    #[must_use]
    pub fn detect_from_content(&self, content: &str) -> DetectionResult {
        let trimmed = content.trim_start();
        if trimmed.is_empty() {
            return DetectionResult::unknown("Empty content");
        }
        if !trimmed.starts_with('{') {
            return DetectionResult::unknown("Content is not a JSON object");
        }
        let cdx_detection = self.cyclonedx.detect(content);
        let spdx_detection = self.spdx.detect(content);

        self.select_best_parser(cdx_detection, spdx_detection)
    }

    /// Select the best parser based on detection results.
    ///
    /// Ambiguous or weak matches yield an unknown result rather than a default family.
    fn select_best_parser(
        &self,
        cdx_detection: FormatDetection,
        spdx_detection: FormatDetection,
    ) -> DetectionResult {
        let cdx_conf = cdx_detection.confidence.value();
        let spdx_conf = spdx_detection.confidence.value();

        tracing::debug!(
            "Format detection: CycloneDX={:.2}, SPDX={:.2}, threshold={:.2}",
            cdx_conf,
            spdx_conf,
            self.min_confidence
        );

        if cdx_conf >= self.min_confidence && cdx_conf > spdx_conf {
            DetectionResult::detected(SchemaFamily::CycloneDx, cdx_detection)
        } else if spdx_conf >= self.min_confidence && spdx_conf > cdx_conf {
            DetectionResult::detected(SchemaFamily::Spdx, spdx_detection)
        } else {
            let mut result =
                DetectionResult::unknown("Could not detect SBOM format with sufficient confidence");

            if cdx_conf > 0.0 {
                result.warnings.push(format!(
                    "CycloneDX detection: {:.0}% confidence (threshold: {:.0}%)",
                    cdx_conf * 100.0,
                    self.min_confidence * 100.0
                ));
            }
            if spdx_conf > 0.0 {
                result.warnings.push(format!(
                    "SPDX detection: {:.0}% confidence (threshold: {:.0}%)",
                    spdx_conf * 100.0,
                    self.min_confidence * 100.0
                ));
            }

            result
        }
    }

    /// Decode content, either with the declared family or after sniffing one.
    pub fn parse_str(&self, content: &str, declared: Option<SchemaFamily>) -> Result<Document> {
        match declared {
            Some(family) => {
                self.check_declared(content, family)?;
                self.parser(family).parse_str(content)
            }
            None => {
                let detection = self.detect_from_content(content);
                for warning in &detection.warnings {
                    tracing::debug!("{}", warning);
                }
                match detection.family {
                    Some(family) if detection.can_parse() => self.parser(family).parse_str(content),
                    _ => Err(SbomEnrichError::unknown_format(
                        detection
                            .warnings
                            .first()
                            .cloned()
                            .unwrap_or_else(|| "no schema markers found".to_string()),
                    )),
                }
            }
        }
    }

    /// Reject content that clearly belongs to the other family.
    fn check_declared(&self, content: &str, family: SchemaFamily) -> Result<()> {
        let other = match family {
            SchemaFamily::CycloneDx => SchemaFamily::Spdx,
            SchemaFamily::Spdx => SchemaFamily::CycloneDx,
        };
        let own = self.parser(family).detect(content).confidence;
        let foreign = self.parser(other).detect(content).confidence;
        if foreign >= FormatConfidence::HIGH && foreign > own {
            return Err(SbomEnrichError::schema(
                format!("declared {family}"),
                SchemaErrorKind::FamilyMismatch {
                    expected: family.to_string(),
                    reason: format!("content carries {other} markers"),
                },
            ));
        }
        Ok(())
    }
}
