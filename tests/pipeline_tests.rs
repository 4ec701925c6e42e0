//! End-to-end tests for the `run` and `convert` command handlers.
//!
//! Each test drives a handler the way `main` does, with an offline metadata
//! table so no network access is needed.

use sbom_enrich::{
    cli::{run_batch, run_convert, RunOptions},
    config::{load_config_file, AppConfig},
    model::SchemaFamily,
    parsers::parse,
    pipeline::{exit_codes, OutputFormat, ReportFormat},
};
use std::path::{Path, PathBuf};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn offline_config() -> AppConfig {
    AppConfig::builder()
        .workers(Some(2))
        .offline_db(fixture_path("offline-db.json"))
        .build()
}

fn options(inputs: Vec<PathBuf>, out: &Path) -> RunOptions {
    RunOptions {
        inputs,
        output_dir: Some(out.join("enriched")),
        report_file: Some(out.join("report.json")),
        report_format: ReportFormat::Json,
        quiet: true,
        no_color: true,
        ..RunOptions::default()
    }
}

fn read_report(out: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(out.join("report.json")).expect("report written");
    serde_json::from_str(&text).expect("report is JSON")
}

#[test]
fn test_run_writes_enriched_documents_and_report() {
    let out = tempfile::tempdir().unwrap();
    let inputs = vec![
        fixture_path("cyclonedx/minimal.cdx.json"),
        fixture_path("spdx/minimal.spdx.json"),
    ];

    let code = run_batch(&offline_config(), options(inputs, out.path())).unwrap();
    assert_eq!(code, exit_codes::SUCCESS);

    let cdx = std::fs::read(out.path().join("enriched/minimal.enriched.cdx.json")).unwrap();
    let doc = parse(&cdx, Some(SchemaFamily::CycloneDx)).unwrap();
    let lodash = doc.components().find(|c| c.name == "lodash").unwrap();
    assert_eq!(lodash.license.as_ref().unwrap().expression, "MIT");

    let spdx = std::fs::read(out.path().join("enriched/minimal.enriched.spdx.json")).unwrap();
    let doc = parse(&spdx, Some(SchemaFamily::Spdx)).unwrap();
    let express = doc.components().find(|c| c.name == "express").unwrap();
    assert!(express.has_known_license());

    let report = read_report(out.path());
    assert_eq!(report["summary"]["total"], 2);
    assert_eq!(report["summary"]["failed"], 0);
    assert!(report["summary"]["mean_score"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_run_with_dangling_input_is_partial_failure() {
    let out = tempfile::tempdir().unwrap();
    let inputs = vec![
        fixture_path("cyclonedx/minimal.cdx.json"),
        fixture_path("cyclonedx/dangling.cdx.json"),
        fixture_path("spdx/minimal.spdx.json"),
    ];

    let code = run_batch(&offline_config(), options(inputs, out.path())).unwrap();
    assert_eq!(code, exit_codes::PARTIAL_FAILURE);

    let report = read_report(out.path());
    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[1]["status"]["status"], "fatal");
    assert_eq!(outcomes[1]["status"]["kind"], "structural");
    assert!(!out
        .path()
        .join("enriched/dangling.enriched.cdx.json")
        .exists());
}

#[test]
fn test_run_with_unconvertible_input_still_writes_siblings() {
    let out = tempfile::tempdir().unwrap();
    // `pkg:a` and `pkg/a` both become SPDXRef-pkg-a
    let bad = out.path().join("bad.cdx.json");
    std::fs::write(
        &bad,
        r#"{"bomFormat": "CycloneDX", "specVersion": "1.6", "components": [
            {"type": "library", "name": "a", "bom-ref": "pkg:a"},
            {"type": "library", "name": "b", "bom-ref": "pkg/a"}
        ]}"#,
    )
    .unwrap();
    let config = AppConfig::builder()
        .enrichment_enabled(false)
        .output_format(OutputFormat::Spdx)
        .build();
    let inputs = vec![bad, fixture_path("cyclonedx/minimal.cdx.json")];

    let code = run_batch(&config, options(inputs, out.path())).unwrap();
    assert_eq!(code, exit_codes::PARTIAL_FAILURE);

    assert!(out
        .path()
        .join("enriched/minimal.enriched.spdx.json")
        .exists());
    assert!(!out.path().join("enriched/bad.enriched.spdx.json").exists());
    let report = read_report(out.path());
    let failed = &report["outcomes"][0]["status"];
    assert_eq!(failed["status"], "fatal");
    assert_eq!(failed["stage"], "write");
    assert_eq!(failed["kind"], "structural");
    assert_eq!(report["summary"]["succeeded"], 1);
    assert_eq!(report["summary"]["failed"], 1);
}

#[test]
fn test_run_applies_patches_and_converts_output() {
    let out = tempfile::tempdir().unwrap();
    let config = AppConfig::builder()
        .enrichment_enabled(false)
        .output_format(OutputFormat::Spdx)
        .patches([
            "primary.supplier=Acme Corp".to_string(),
            "author+=Jane Doe".to_string(),
            "author+=Jane Doe".to_string(),
        ])
        .build();
    let inputs = vec![fixture_path("cyclonedx/minimal.cdx.json")];

    let code = run_batch(&config, options(inputs, out.path())).unwrap();
    assert_eq!(code, exit_codes::SUCCESS);

    let bytes = std::fs::read(out.path().join("enriched/minimal.enriched.spdx.json")).unwrap();
    let doc = parse(&bytes, Some(SchemaFamily::Spdx)).unwrap();
    let primary = doc.primary_component().unwrap();
    assert_eq!(primary.supplier.as_ref().unwrap().name, "Acme Corp");
    assert_eq!(doc.metadata.authors.len(), 2);
}

#[test]
fn test_run_with_config_file() {
    let out = tempfile::tempdir().unwrap();
    let config_path = out.path().join("sbom-enrich.yaml");
    std::fs::write(
        &config_path,
        format!(
            "pipeline:\n  workers: 1\nenrichment:\n  provider: offline\n  offline_db: {}\npatches:\n  - \"document.lifecycle=build\"\n",
            fixture_path("offline-db.json").display()
        ),
    )
    .unwrap();

    let config = load_config_file(&config_path).unwrap();
    assert_eq!(config.pipeline.workers, Some(1));
    assert_eq!(config.patches.len(), 1);

    let inputs = vec![fixture_path("cyclonedx/minimal.cdx.json")];
    let code = run_batch(&config, options(inputs, out.path())).unwrap();
    assert_eq!(code, exit_codes::SUCCESS);

    let bytes = std::fs::read(out.path().join("enriched/minimal.enriched.cdx.json")).unwrap();
    let doc = parse(&bytes, None).unwrap();
    assert!(doc.metadata.lifecycle.is_some());
}

#[test]
fn test_run_rejects_invalid_patch_spec() {
    let out = tempfile::tempdir().unwrap();
    let config = AppConfig::builder()
        .enrichment_enabled(false)
        .patches(["no equals sign".to_string()])
        .build();
    let inputs = vec![fixture_path("cyclonedx/minimal.cdx.json")];
    assert!(run_batch(&config, options(inputs, out.path())).is_err());
}

#[test]
fn test_run_missing_offline_db_is_config_error() {
    let out = tempfile::tempdir().unwrap();
    let config = AppConfig::builder()
        .offline_db(out.path().join("missing.json"))
        .build();
    let inputs = vec![fixture_path("cyclonedx/minimal.cdx.json")];
    assert!(run_batch(&config, options(inputs, out.path())).is_err());
}

#[test]
fn test_convert_cyclonedx_to_spdx() {
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("converted.spdx.json");
    run_convert(
        fixture_path("cyclonedx/minimal.cdx.json"),
        None,
        SchemaFamily::Spdx,
        Some(target.clone()),
    )
    .unwrap();

    let bytes = std::fs::read(&target).unwrap();
    let doc = parse(&bytes, None).unwrap();
    assert_eq!(doc.schema, SchemaFamily::Spdx);
    assert_eq!(doc.component_count(), 3);
}
