//! **SBOM augmentation, enrichment and quality scoring.**
//!
//! `sbom-enrich` reads CycloneDX and SPDX JSON documents into one
//! schema-agnostic [`Document`], lets callers patch document and primary
//! component metadata, fills missing component metadata from a package
//! metadata provider, and scores the result against a fixed quality rubric.
//! A batch orchestrator runs that pipeline over many inputs at once and
//! reports one outcome per input.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: the [`Document`] model. Components keep document order;
//!   relationship endpoints and the primary component always resolve.
//! - **[`parsers`]**: decoding and encoding for both schema families, with
//!   format detection when no family is declared.
//! - **[`augment`]**: atomic [`MetadataPatch`] application in overwrite or
//!   append mode.
//! - **[`enrichment`]**: the [`Enricher`] and its [`MetadataProvider`]s
//!   (registry API, offline table, caching decorator).
//! - **[`quality`]**: rubric scoring with per-attribute findings.
//! - **[`pipeline`]**: the batch [`Orchestrator`], outcomes and exit codes.
//!
//! ## Getting Started
//!
//! ```
//! use sbom_enrich::augment::{apply, MetadataPatch, PatchSubject};
//! use sbom_enrich::parsers::parse;
//! use sbom_enrich::quality::score;
//!
//! let json = br#"{
//!     "bomFormat": "CycloneDX",
//!     "specVersion": "1.5",
//!     "metadata": {"component": {"type": "application", "name": "app", "bom-ref": "app"}},
//!     "components": []
//! }"#;
//! let mut document = parse(json, None)?;
//!
//! let patch = MetadataPatch::overwrite(PatchSubject::PrimaryComponent)
//!     .with_field("version", "1.2.0")
//!     .with_field("supplier", "Acme Corp");
//! apply(&mut document, &patch)?;
//!
//! let report = score(&document);
//! assert!((0.0..=1.0).contains(&report.overall));
//! # Ok::<(), sbom_enrich::SbomEnrichError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `registry` (default): the HTTP registry metadata provider. Adds `reqwest`.
//!   Without it only the offline provider is available.

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod augment;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod model;
pub mod parsers;
pub mod pipeline;
pub mod quality;

// Re-export main types for convenience
pub use augment::{apply, apply_all, ApplyMode, MetadataPatch, PatchFailure, PatchSubject};
pub use config::{AppConfig, AppConfigBuilder, ConfigError, EnrichmentConfig, Validatable};
pub use enrichment::{
    ComponentMetadata, EcosystemKey, Enricher, EnricherConfig, EnrichmentLog, MetadataProvider,
    ProviderError,
};
pub use error::{ErrorContext, Result, SbomEnrichError};
pub use model::{Component, ComponentId, Document, SchemaFamily};
pub use parsers::{parse, serialize};
pub use pipeline::{BatchReport, CancelToken, Orchestrator, OutcomeStatus, PipelineInput};
pub use quality::{score, QualityGrade, ScoreReport};
