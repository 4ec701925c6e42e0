//! Output handling for enriched documents and reports.

use super::outcome::{BatchReport, FailureRecord, Stage};
use crate::error::{ErrorContext, Result, SbomEnrichError};
use crate::model::{Document, SchemaFamily};
use crate::parsers::serialize;
use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Target for output - either stdout or a file
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// Write to stdout
    Stdout,
    /// Write to a file
    File(PathBuf),
}

impl OutputTarget {
    /// Create output target from optional path
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) => Self::File(p),
            None => Self::Stdout,
        }
    }

    /// Check if output is to a terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stdout) && std::io::stdout().is_terminal()
    }
}

/// Schema family enriched documents are written in
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Keep each input's own family
    #[default]
    Same,
    #[value(name = "cyclonedx")]
    CycloneDx,
    Spdx,
}

impl OutputFormat {
    /// Family to write a document that was read as `source`
    #[must_use]
    pub const fn target_family(self, source: SchemaFamily) -> SchemaFamily {
        match self {
            Self::Same => source,
            Self::CycloneDx => SchemaFamily::CycloneDx,
            Self::Spdx => SchemaFamily::Spdx,
        }
    }
}

/// Batch and score report formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable text
    #[default]
    Summary,
    /// Structured JSON
    Json,
}

/// Determine if color should be used based on flags and environment
pub fn should_use_color(no_color_flag: bool) -> bool {
    !no_color_flag && std::env::var("NO_COLOR").is_err()
}

/// Write output to the target (stdout or file)
pub fn write_output(content: &str, target: &OutputTarget, quiet: bool) -> anyhow::Result<()> {
    match target {
        OutputTarget::Stdout => {
            println!("{content}");
            Ok(())
        }
        OutputTarget::File(path) => {
            std::fs::write(path, content).map_err(|e| SbomEnrichError::io(path, e))?;
            if !quiet {
                tracing::info!("Report written to {}", path.display());
            }
            Ok(())
        }
    }
}

/// File name for the enriched copy of `label` in `family`.
///
/// `app.cdx.json` in CycloneDX becomes `app.enriched.cdx.json`.
#[must_use]
pub fn enriched_file_name(label: &str, family: SchemaFamily) -> String {
    format!("{}.enriched.{}.json", enriched_stem(label), family.file_tag())
}

fn enriched_stem(label: &str) -> String {
    let stem = Path::new(label)
        .file_stem()
        .map_or_else(|| label.to_string(), |s| s.to_string_lossy().into_owned());
    let stem = stem
        .strip_suffix(".cdx")
        .or_else(|| stem.strip_suffix(".spdx"))
        .unwrap_or(&stem);
    if stem.is_empty() {
        "sbom".to_string()
    } else {
        stem.to_string()
    }
}

/// Hands out distinct output file names within one batch.
///
/// The first input to want a name gets [`enriched_file_name`]; later
/// inputs mapping to a taken name get their batch index appended to the stem.
#[derive(Debug, Default)]
pub struct OutputNames {
    taken: HashSet<String>,
}

impl OutputNames {
    pub fn claim(&mut self, index: usize, label: &str, family: SchemaFamily) -> String {
        let name = enriched_file_name(label, family);
        if self.taken.insert(name.clone()) {
            return name;
        }
        let stem = enriched_stem(label);
        let mut suffix = index;
        loop {
            let name = format!("{stem}-{suffix}.enriched.{}.json", family.file_tag());
            if self.taken.insert(name.clone()) {
                tracing::debug!("{}: output name taken, writing {}", label, name);
                return name;
            }
            suffix += 1;
        }
    }
}

/// Serialize an enriched document as `family` and write it to `path`
pub fn write_enriched(document: &Document, family: SchemaFamily, path: &Path) -> Result<()> {
    let bytes = serialize(document, family)
        .with_context(|| format!("serializing as {family}"))?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| SbomEnrichError::io(dir, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| SbomEnrichError::io(path, e))?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Write every processed input of `report` into `dir`.
///
/// An input whose document cannot be serialized or written becomes a
/// [`Stage::Write`] failure in the report; the rest are still written.
/// Returns the label and path of each written file, in input order.
pub fn write_batch_outputs(
    report: &mut BatchReport,
    format: OutputFormat,
    dir: &Path,
) -> Vec<(String, PathBuf)> {
    let mut names = OutputNames::default();
    let mut written = Vec::new();
    let mut failures = Vec::new();
    for (position, outcome) in report.outcomes.iter().enumerate() {
        let Some(processed) = outcome.status.processed() else {
            continue;
        };
        let family = format.target_family(processed.document.schema);
        let path = dir.join(names.claim(outcome.index, &outcome.label, family));
        match write_enriched(&processed.document, family, &path) {
            Ok(()) => written.push((outcome.label.clone(), path)),
            Err(e) => {
                tracing::warn!("{}: write failed: {}", outcome.label, e);
                failures.push((position, FailureRecord::from_error(Stage::Write, &e)));
            }
        }
    }
    for (position, record) in failures {
        report.record_failure(position, record);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Component;
    use crate::pipeline::{exit_codes, FailureKind, InputOutcome, OutcomeStatus, Processed};

    #[test]
    fn test_output_target_from_option() {
        assert!(matches!(OutputTarget::from_option(None), OutputTarget::Stdout));
        let path = PathBuf::from("/tmp/test.json");
        match OutputTarget::from_option(Some(path.clone())) {
            OutputTarget::File(p) => assert_eq!(p, path),
            OutputTarget::Stdout => panic!("Expected File variant"),
        }
    }

    #[test]
    fn test_target_family() {
        assert_eq!(
            OutputFormat::Same.target_family(SchemaFamily::Spdx),
            SchemaFamily::Spdx
        );
        assert_eq!(
            OutputFormat::CycloneDx.target_family(SchemaFamily::Spdx),
            SchemaFamily::CycloneDx
        );
    }

    #[test]
    fn test_enriched_file_name() {
        assert_eq!(
            enriched_file_name("in/app.cdx.json", SchemaFamily::CycloneDx),
            "app.enriched.cdx.json"
        );
        assert_eq!(
            enriched_file_name("bom.spdx.json", SchemaFamily::CycloneDx),
            "bom.enriched.cdx.json"
        );
        assert_eq!(
            enriched_file_name("sbom.json", SchemaFamily::Spdx),
            "sbom.enriched.spdx.json"
        );
        assert_eq!(
            enriched_file_name("stdin", SchemaFamily::Spdx),
            "stdin.enriched.spdx.json"
        );
    }

    #[test]
    fn test_write_enriched_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("app.enriched.spdx.json");
        write_enriched(&empty(), SchemaFamily::Spdx, &path).unwrap();
        let written = std::fs::read(&path).unwrap();
        let reparsed = crate::parsers::parse(&written, None).unwrap();
        assert_eq!(reparsed.schema, SchemaFamily::Spdx);
    }

    #[test]
    fn test_output_names_disambiguate_same_stem() {
        let mut names = OutputNames::default();
        assert_eq!(
            names.claim(0, "a/sbom.json", SchemaFamily::CycloneDx),
            "sbom.enriched.cdx.json"
        );
        assert_eq!(
            names.claim(1, "b/sbom.json", SchemaFamily::CycloneDx),
            "sbom-1.enriched.cdx.json"
        );
        assert_eq!(
            names.claim(2, "c/sbom.json", SchemaFamily::Spdx),
            "sbom.enriched.spdx.json"
        );
        assert_eq!(
            names.claim(3, "sbom-1.json", SchemaFamily::CycloneDx),
            "sbom-1-3.enriched.cdx.json"
        );
    }

    fn empty() -> Document {
        Document::new(SchemaFamily::CycloneDx, "1.6")
    }

    fn processed(document: Document) -> OutcomeStatus {
        let score = crate::quality::score(&document);
        OutcomeStatus::Success(Processed {
            document,
            score,
            enrichment: None,
            rejected_patches: Vec::new(),
        })
    }

    fn outcome(index: usize, label: &str, status: OutcomeStatus) -> InputOutcome {
        InputOutcome {
            index,
            label: label.to_string(),
            status,
        }
    }

    #[test]
    fn test_write_batch_outputs_isolates_serialize_failure() {
        // Both references map to SPDXRef-pkg-a
        let mut clashing = empty();
        clashing.add_component(Component::new("a", "pkg:a")).unwrap();
        clashing.add_component(Component::new("b", "pkg/a")).unwrap();
        let mut report = BatchReport::new(vec![
            outcome(0, "bad.cdx.json", processed(clashing)),
            outcome(1, "good.cdx.json", processed(empty())),
        ]);
        let dir = tempfile::tempdir().unwrap();

        let written = write_batch_outputs(&mut report, OutputFormat::Spdx, dir.path());

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, "good.cdx.json");
        assert!(dir.path().join("good.enriched.spdx.json").exists());
        assert!(!dir.path().join("bad.enriched.spdx.json").exists());
        let failure = report.outcomes[0].status.failure().unwrap();
        assert_eq!(
            (failure.stage, failure.kind),
            (Stage::Write, FailureKind::Structural)
        );
        assert_eq!(report.exit_code(), exit_codes::PARTIAL_FAILURE);
    }

    #[test]
    fn test_write_batch_outputs_keeps_same_stem_inputs() {
        let mut report = BatchReport::new(vec![
            outcome(0, "a/sbom.json", processed(empty())),
            outcome(1, "b/sbom.json", processed(empty())),
        ]);
        let dir = tempfile::tempdir().unwrap();

        let written = write_batch_outputs(&mut report, OutputFormat::Same, dir.path());

        assert_eq!(written.len(), 2);
        assert_ne!(written[0].1, written[1].1);
        assert!(written.iter().all(|(_, path)| path.exists()));
        assert_eq!(report.exit_code(), exit_codes::SUCCESS);
    }

    #[test]
    fn test_should_use_color_with_flag() {
        assert!(!should_use_color(true));
    }
}
