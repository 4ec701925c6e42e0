//! Per-input results and the batch report.

use super::exit_codes;
use crate::augment::PatchFailure;
use crate::enrichment::EnrichmentLog;
use crate::error::SbomEnrichError;
use crate::model::{Document, SchemaFamily};
use crate::quality::ScoreReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where an input's bytes come from
#[derive(Debug, Clone)]
pub enum InputSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// One document to process
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Name used in logs and reports
    pub label: String,
    pub source: InputSource,
    /// Declared schema family; sniffed when `None`
    pub schema: Option<SchemaFamily>,
}

impl PipelineInput {
    /// Input read from a file, labelled with its path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: path.display().to_string(),
            source: InputSource::Path(path),
            schema: None,
        }
    }

    pub fn from_bytes(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            source: InputSource::Bytes(bytes.into()),
            schema: None,
        }
    }

    #[must_use]
    pub const fn with_schema(mut self, schema: Option<SchemaFamily>) -> Self {
        self.schema = schema;
        self
    }
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Read,
    Parse,
    Augment,
    Enrich,
    Score,
    /// Serializing or writing the enriched document
    Write,
    /// A worker panicked; the running stage is unknown
    Internal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Parse => "parse",
            Self::Augment => "augment",
            Self::Enrich => "enrich",
            Self::Score => "score",
            Self::Write => "write",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Class of a fatal per-input failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Io,
    Schema,
    Structural,
    Internal,
}

impl From<&SbomEnrichError> for FailureKind {
    fn from(err: &SbomEnrichError) -> Self {
        match err {
            SbomEnrichError::Io { .. } => Self::Io,
            SbomEnrichError::Schema { .. } => Self::Schema,
            SbomEnrichError::Structural { .. } => Self::Structural,
            _ => Self::Internal,
        }
    }
}

/// Why an input was abandoned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub stage: Stage,
    pub kind: FailureKind,
    pub message: String,
}

impl FailureRecord {
    pub fn from_error(stage: Stage, err: &SbomEnrichError) -> Self {
        Self {
            stage,
            kind: FailureKind::from(err),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

/// Everything produced for a successfully processed input
#[derive(Debug, Clone, Serialize)]
pub struct Processed {
    #[serde(skip)]
    pub document: Document,
    pub score: ScoreReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentLog>,
    pub rejected_patches: Vec<PatchFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success(Processed),
    /// Processed, but some lookups failed or were cancelled
    PartialEnrichment(Processed),
    Fatal(FailureRecord),
    Cancelled,
}

impl OutcomeStatus {
    #[must_use]
    pub const fn processed(&self) -> Option<&Processed> {
        match self {
            Self::Success(p) | Self::PartialEnrichment(p) => Some(p),
            Self::Fatal(_) | Self::Cancelled => None,
        }
    }

    #[must_use]
    pub const fn failure(&self) -> Option<&FailureRecord> {
        match self {
            Self::Fatal(record) => Some(record),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "ok",
            Self::PartialEnrichment(_) => "partial",
            Self::Fatal(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InputOutcome {
    /// Position of the input in the batch
    pub index: usize,
    pub label: String,
    pub status: OutcomeStatus,
}

/// Aggregate counters over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    /// Success plus partial enrichment
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub patches_rejected: usize,
    /// Mean overall score across processed inputs
    pub mean_score: Option<f64>,
}

impl BatchSummary {
    #[must_use]
    pub fn from_outcomes(outcomes: &[InputOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        let mut score_total = 0.0;
        for outcome in outcomes {
            match &outcome.status {
                OutcomeStatus::Success(_) => summary.succeeded += 1,
                OutcomeStatus::PartialEnrichment(_) => {
                    summary.succeeded += 1;
                    summary.partial += 1;
                }
                OutcomeStatus::Fatal(_) => summary.failed += 1,
                OutcomeStatus::Cancelled => summary.cancelled += 1,
            }
            if let Some(processed) = outcome.status.processed() {
                summary.patches_rejected += processed.rejected_patches.len();
                score_total += processed.score.overall;
            }
        }
        if summary.succeeded > 0 {
            summary.mean_score = Some(score_total / summary.succeeded as f64);
        }
        summary
    }

    /// Process exit code for this batch
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.cancelled > 0 {
            exit_codes::CANCELLED
        } else if self.failed == 0 {
            exit_codes::SUCCESS
        } else if self.succeeded == 0 {
            exit_codes::ALL_FAILED
        } else {
            exit_codes::PARTIAL_FAILURE
        }
    }
}

/// Outcomes in input order plus their summary
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<InputOutcome>,
    pub summary: BatchSummary,
}

impl BatchReport {
    #[must_use]
    pub fn new(outcomes: Vec<InputOutcome>) -> Self {
        let summary = BatchSummary::from_outcomes(&outcomes);
        Self { outcomes, summary }
    }

    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.summary.exit_code()
    }

    /// Replace the outcome at `position` with a failure and recount the summary.
    pub fn record_failure(&mut self, position: usize, record: FailureRecord) {
        if let Some(outcome) = self.outcomes.get_mut(position) {
            outcome.status = OutcomeStatus::Fatal(record);
            self.summary = BatchSummary::from_outcomes(&self.outcomes);
        }
    }
}
