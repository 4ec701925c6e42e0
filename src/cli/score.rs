//! Score command handler.
//!
//! Implements the `score` subcommand for assessing SBOM quality.

use super::read_input;
use crate::model::SchemaFamily;
use crate::parsers::parse;
use crate::pipeline::{exit_codes, should_use_color, write_output, OutputTarget, ReportFormat};
use crate::quality::{score, QualityGrade, ScoreReport};
use anyhow::{Context, Result};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Score command configuration
pub struct ScoreOptions {
    pub sbom_path: PathBuf,
    pub schema: Option<SchemaFamily>,
    pub output: ReportFormat,
    pub output_file: Option<PathBuf>,
    pub min_score: Option<f64>,
    pub no_color: bool,
}

/// Run the score command, returning the desired exit code.
pub fn run_score(options: ScoreOptions) -> Result<i32> {
    let bytes = read_input(&options.sbom_path)?;
    let document = parse(&bytes, options.schema)
        .with_context(|| format!("Failed to parse {}", options.sbom_path.display()))?;
    let report = score(&document);

    let output_text = match options.output {
        ReportFormat::Json => format_score_json(&report, &options.sbom_path)?,
        ReportFormat::Summary => format_score_report(
            &report,
            &options.sbom_path,
            should_use_color(options.no_color),
        ),
    };
    write_output(
        &output_text,
        &OutputTarget::from_option(options.output_file),
        false,
    )?;

    if let Some(threshold) = options.min_score {
        if report.overall < threshold {
            tracing::error!(
                "Quality score {:.2} is below minimum threshold {:.2}",
                report.overall,
                threshold
            );
            return Ok(exit_codes::BELOW_MIN_SCORE);
        }
    }

    Ok(exit_codes::SUCCESS)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn format_score_json(report: &ScoreReport, path: &Path) -> Result<String> {
    let output = json!({
        "tool": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "sbom": display_name(path),
        "report": report,
    });
    serde_json::to_string_pretty(&output).context("Failed to serialize score report")
}

/// Format a score report for terminal output
pub fn format_score_report(report: &ScoreReport, path: &Path, use_color: bool) -> String {
    let (grade_color, reset) = if use_color {
        let color = match report.grade {
            QualityGrade::A | QualityGrade::B => "\x1b[32m",
            QualityGrade::C | QualityGrade::D => "\x1b[33m",
            QualityGrade::F => "\x1b[31m",
        };
        (color, "\x1b[0m")
    } else {
        ("", "")
    };

    let mut lines = vec![
        format!("SBOM Quality Report: {}", display_name(path)),
        format!(
            "Rubric v{}, {} component(s)",
            report.rubric_version, report.component_count
        ),
        String::new(),
        format!(
            "Overall Score: {grade_color}{:.2} (Grade: {} - {}){reset}",
            report.overall,
            report.grade.letter(),
            report.grade.description()
        ),
        String::new(),
    ];

    for category in &report.categories {
        lines.push(format!(
            "{} (weight {:.2}): {:.2}",
            category.category, category.weight, category.score
        ));
        for check in &category.checks {
            lines.push(format!(
                "  {:<26} {:.2}  (weight {:.3})",
                check.attribute.name(),
                check.score,
                check.weight
            ));
        }
    }

    if !report.findings.is_empty() {
        lines.push(String::new());
        lines.push(format!("Findings ({}):", report.findings.len()));
        for finding in &report.findings {
            lines.push(format!("  - {finding}"));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Document;

    #[test]
    fn test_format_score_report_lists_findings() {
        let document = Document::new(SchemaFamily::CycloneDx, "1.6");
        let report = score(&document);
        let text = format_score_report(&report, Path::new("dir/app.json"), false);
        assert!(text.starts_with("SBOM Quality Report: app.json"));
        assert!(text.contains("NTIA minimum elements"));
        assert!(text.contains("Findings ("));
    }

    #[test]
    fn test_min_score_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sbom.json");
        std::fs::write(&path, r#"{"bomFormat": "CycloneDX", "specVersion": "1.5", "components": []}"#).unwrap();
        let options = ScoreOptions {
            sbom_path: path,
            schema: None,
            output: ReportFormat::Json,
            output_file: Some(dir.path().join("score.json")),
            min_score: Some(0.99),
            no_color: true,
        };
        assert_eq!(run_score(options).unwrap(), exit_codes::BELOW_MIN_SCORE);
    }
}
