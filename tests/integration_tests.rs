//! Integration tests for sbom-enrich
//!
//! These tests run the public API end to end: parsing, augmentation,
//! enrichment, scoring and batch processing over the fixture documents.

use sbom_enrich::{
    augment::{apply, apply_all, MetadataPatch, PatchSubject},
    enrichment::{Enricher, EnricherConfig, LogEvent, OfflineProvider},
    model::SchemaFamily,
    parsers::{detect_format, parse, serialize},
    pipeline::{exit_codes, CancelToken, FailureKind, Orchestrator, OutcomeStatus, PipelineInput},
    quality::{score, Attribute, FindingSubject},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).expect("fixture should exist")
}

fn offline_enricher() -> Enricher {
    let provider = OfflineProvider::from_file(&fixture_path("offline-db.json"))
        .expect("offline table should load");
    Enricher::new(Arc::new(provider), EnricherConfig::default())
}

// ============================================================================
// Parser Tests
// ============================================================================

mod parser_tests {
    use super::*;

    #[test]
    fn test_parse_cyclonedx_minimal() {
        let doc = parse(&fixture_bytes("cyclonedx/minimal.cdx.json"), None)
            .expect("Failed to parse CycloneDX SBOM");

        // test-app (metadata.component) + lodash + internal-utils
        assert_eq!(doc.component_count(), 3);
        assert_eq!(doc.schema, SchemaFamily::CycloneDx);
        assert_eq!(doc.primary_component().unwrap().name, "test-app");
        let names: Vec<_> = doc.components().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["test-app", "lodash", "internal-utils"]);
    }

    #[test]
    fn test_parse_spdx_minimal() {
        let doc = parse(&fixture_bytes("spdx/minimal.spdx.json"), None)
            .expect("Failed to parse SPDX SBOM");

        assert_eq!(doc.component_count(), 3);
        assert_eq!(doc.schema, SchemaFamily::Spdx);
        assert_eq!(doc.primary_component().unwrap().name, "test-app");

        let express = doc.components().find(|c| c.name == "express").unwrap();
        assert!(!express.has_known_license(), "NOASSERTION is not a license");
    }

    #[test]
    fn test_detect_format() {
        let cdx = String::from_utf8(fixture_bytes("cyclonedx/minimal.cdx.json")).unwrap();
        let spdx = String::from_utf8(fixture_bytes("spdx/minimal.spdx.json")).unwrap();

        assert_eq!(detect_format(&cdx).unwrap().family, SchemaFamily::CycloneDx);
        assert_eq!(detect_format(&spdx).unwrap().family, SchemaFamily::Spdx);
        assert!(detect_format(r#"{"name": "not an sbom"}"#).is_none());
    }

    #[test]
    fn test_declared_family_mismatch_is_rejected() {
        let result = parse(
            &fixture_bytes("cyclonedx/minimal.cdx.json"),
            Some(SchemaFamily::Spdx),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_dangling_relationship_is_rejected() {
        let result = parse(&fixture_bytes("cyclonedx/dangling.cdx.json"), None);
        assert!(result.is_err(), "dangling dependsOn must fail parsing");
    }

    #[test]
    fn test_round_trip_preserves_document() {
        for name in ["cyclonedx/minimal.cdx.json", "spdx/minimal.spdx.json"] {
            let doc = parse(&fixture_bytes(name), None).unwrap();
            let bytes = serialize(&doc, doc.schema).unwrap();
            let reparsed = parse(&bytes, Some(doc.schema)).unwrap();
            assert_eq!(reparsed, doc, "{name} should survive a round trip");
        }
    }

    #[test]
    fn test_cross_family_conversion_keeps_components() {
        let doc = parse(&fixture_bytes("cyclonedx/minimal.cdx.json"), None).unwrap();
        let spdx = serialize(&doc, SchemaFamily::Spdx).unwrap();
        let converted = parse(&spdx, Some(SchemaFamily::Spdx)).unwrap();

        assert_eq!(converted.component_count(), doc.component_count());
        assert_eq!(converted.primary_component().unwrap().name, "test-app");
        assert_eq!(converted.relationships().len(), doc.relationships().len());
    }
}

// ============================================================================
// Augmentation Tests
// ============================================================================

mod augment_tests {
    use super::*;

    #[test]
    fn test_append_author_twice_keeps_both() {
        let mut doc = parse(&fixture_bytes("cyclonedx/minimal.cdx.json"), None).unwrap();
        let patch = MetadataPatch::append(PatchSubject::PrimaryComponent)
            .with_field("author", "Jane Doe");

        apply(&mut doc, &patch).unwrap();
        apply(&mut doc, &patch).unwrap();

        let primary = doc.primary_component().unwrap();
        assert_eq!(primary.authors, vec!["Jane Doe", "Jane Doe"]);
    }

    #[test]
    fn test_append_document_author_extends_list() {
        let mut doc = parse(&fixture_bytes("spdx/minimal.spdx.json"), None).unwrap();
        let patch = MetadataPatch::append(PatchSubject::Document)
            .with_field("author", "Jane Doe <jane@example.com>");

        apply(&mut doc, &patch).unwrap();

        let author = doc.metadata.authors.last().unwrap();
        assert_eq!(author.name, "Jane Doe");
        assert_eq!(author.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_overwrite_license_twice_is_idempotent() {
        let mut doc = parse(&fixture_bytes("cyclonedx/minimal.cdx.json"), None).unwrap();
        let patch = MetadataPatch::overwrite(PatchSubject::PrimaryComponent)
            .with_field("license", "Apache-2.0");

        apply(&mut doc, &patch).unwrap();
        let once = doc.clone();
        apply(&mut doc, &patch).unwrap();

        assert_eq!(doc, once);
        let license = doc.primary_component().unwrap().license.as_ref().unwrap();
        assert_eq!(license.expression, "Apache-2.0");
    }

    #[test]
    fn test_rejected_patch_leaves_document_unchanged() {
        let mut doc = parse(&fixture_bytes("spdx/minimal.spdx.json"), None).unwrap();
        let before = doc.clone();
        let patches = vec![
            MetadataPatch::overwrite(PatchSubject::PrimaryComponent)
                .with_field("version", "2.0.0")
                .with_field("purl", "not a purl"),
            MetadataPatch::overwrite(PatchSubject::Document).with_field("supplier", "Acme Corp"),
        ];

        let failures = apply_all(&mut doc, &patches);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 0);
        assert_eq!(
            doc.primary_component().unwrap().version,
            before.primary_component().unwrap().version
        );
        assert_eq!(doc.metadata.supplier.as_ref().unwrap().name, "Acme Corp");
    }

    #[test]
    fn test_primary_patch_without_primary_fails() {
        let mut doc = sbom_enrich::model::Document::new(SchemaFamily::CycloneDx, "1.6");
        let patch =
            MetadataPatch::overwrite(PatchSubject::PrimaryComponent).with_field("version", "1");
        assert!(apply(&mut doc, &patch).is_err());
    }
}

// ============================================================================
// Enrichment and Quality Tests
// ============================================================================

mod enrichment_tests {
    use super::*;

    #[tokio::test]
    async fn test_unresolvable_component_is_logged_and_flagged() {
        let doc = parse(&fixture_bytes("cyclonedx/minimal.cdx.json"), None).unwrap();
        let (doc, log) = offline_enricher().enrich(doc, &CancelToken::new()).await;

        let lodash = doc.components().find(|c| c.name == "lodash").unwrap();
        assert_eq!(lodash.license.as_ref().unwrap().expression, "MIT");
        assert_eq!(lodash.homepage.as_deref(), Some("https://lodash.com/"));

        let entry = log
            .entries_for("internal-utils")
            .next()
            .expect("internal-utils should be logged");
        assert!(matches!(entry.event, LogEvent::Unresolvable { .. }));

        let report = score(&doc);
        assert!(report.findings.iter().any(|f| {
            f.attribute == Attribute::License
                && matches!(&f.subject, FindingSubject::Component { name, .. } if name == "internal-utils")
        }));
        assert!(!report.findings.iter().any(|f| {
            f.attribute == Attribute::License
                && matches!(&f.subject, FindingSubject::Component { name, .. } if name == "lodash")
        }));
    }

    #[tokio::test]
    async fn test_enrichment_replaces_noassertion_license() {
        let doc = parse(&fixture_bytes("spdx/minimal.spdx.json"), None).unwrap();
        let (doc, log) = offline_enricher().enrich(doc, &CancelToken::new()).await;

        let express = doc.components().find(|c| c.name == "express").unwrap();
        assert!(express.has_known_license());
        let lodash = doc.components().find(|c| c.name == "lodash").unwrap();
        assert_eq!(lodash.license.as_ref().unwrap().expression, "MIT");
        assert_eq!(log.stats.failed, 0);
    }

    #[tokio::test]
    async fn test_enrichment_improves_score() {
        let doc = parse(&fixture_bytes("spdx/minimal.spdx.json"), None).unwrap();
        let before = score(&doc).overall;
        let (doc, _) = offline_enricher().enrich(doc, &CancelToken::new()).await;
        let after = score(&doc).overall;
        assert!(after > before, "expected {after} > {before}");
    }

    #[test]
    fn test_score_is_deterministic_and_bounded() {
        let doc = parse(&fixture_bytes("cyclonedx/minimal.cdx.json"), None).unwrap();
        let first = score(&doc);
        let second = score(&doc);
        assert_eq!(first.overall, second.overall);
        assert_eq!(first.findings, second.findings);
        assert!((0.0..=1.0).contains(&first.overall));
        assert_eq!(first.component_count, 3);
    }
}

// ============================================================================
// Batch Tests
// ============================================================================

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_with_dangling_input_is_partial_failure() {
        let inputs = vec![
            PipelineInput::from_path(fixture_path("cyclonedx/minimal.cdx.json")),
            PipelineInput::from_path(fixture_path("cyclonedx/dangling.cdx.json")),
            PipelineInput::from_path(fixture_path("spdx/minimal.spdx.json")),
        ];
        let report = Orchestrator::new(2)
            .with_enricher(offline_enricher())
            .run(inputs, CancelToken::new())
            .await;

        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].status.processed().is_some());
        match &report.outcomes[1].status {
            OutcomeStatus::Fatal(failure) => assert_eq!(failure.kind, FailureKind::Structural),
            other => panic!("expected fatal outcome, got {}", other.label()),
        }
        assert!(report.outcomes[2].status.processed().is_some());

        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.exit_code(), exit_codes::PARTIAL_FAILURE);
    }

    #[tokio::test]
    async fn test_batch_of_failures_exits_all_failed() {
        let inputs = vec![
            PipelineInput::from_path(fixture_path("cyclonedx/dangling.cdx.json")),
            PipelineInput::from_bytes("garbage", b"not json".to_vec()),
        ];
        let report = Orchestrator::new(2).run(inputs, CancelToken::new()).await;
        assert_eq!(report.summary.failed, 2);
        assert_eq!(report.exit_code(), exit_codes::ALL_FAILED);
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds() {
        let report = Orchestrator::new(2).run(Vec::new(), CancelToken::new()).await;
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.exit_code(), exit_codes::SUCCESS);
    }
}
