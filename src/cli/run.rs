//! Run command handler.
//!
//! Implements the `run` subcommand: the full parse → augment → enrich →
//! score pipeline over a batch of inputs.

use crate::config::{AppConfig, Validatable};
use crate::enrichment::build_enricher;
use crate::model::SchemaFamily;
use crate::pipeline::{
    should_use_color, write_batch_outputs, write_output, BatchReport, CancelToken, Orchestrator,
    OutcomeStatus, OutputTarget, PipelineInput, ReportFormat,
};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Run command options that are not part of the config file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Input documents; `-` reads stdin
    pub inputs: Vec<PathBuf>,
    /// Declared schema family for every input
    pub schema: Option<SchemaFamily>,
    /// Directory enriched documents are written to
    pub output_dir: Option<PathBuf>,
    /// Batch report destination (stdout if not specified)
    pub report_file: Option<PathBuf>,
    pub report_format: ReportFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Run the batch, returning the desired exit code.
///
/// The caller is responsible for calling `std::process::exit()` with the
/// returned code when it is non-zero.
pub fn run_batch(config: &AppConfig, options: RunOptions) -> Result<i32> {
    let errors = config.validate();
    if !errors.is_empty() {
        let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration:\n  {}", lines.join("\n  "));
    }
    if options.inputs.is_empty() {
        bail!("No inputs given");
    }

    let patches = config
        .metadata_patches()
        .context("Invalid patch")?;
    let mut orchestrator =
        Orchestrator::new(config.pipeline.effective_workers()).with_patches(patches);
    if config.enrichment.enabled {
        let enricher =
            build_enricher(&config.enrichment).context("Failed to set up enrichment")?;
        tracing::info!("Enriching with provider '{}'", enricher.provider_name());
        orchestrator = orchestrator.with_enricher(enricher);
    }

    let inputs = options
        .inputs
        .iter()
        .map(|path| load_input(path, options.schema))
        .collect::<Result<Vec<_>>>()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let mut report = runtime.block_on(async {
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling batch");
                trigger.cancel();
            }
        });
        orchestrator.run(inputs, cancel).await
    });

    if let Some(dir) = &options.output_dir {
        let written = write_batch_outputs(&mut report, config.pipeline.output_format, dir);
        if !options.quiet {
            for (label, path) in &written {
                tracing::info!("{}: wrote {}", label, path.display());
            }
        }
    }

    let text = match options.report_format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(&report).context("Failed to serialize batch report")?
        }
        ReportFormat::Summary => format_batch_summary(&report, should_use_color(options.no_color)),
    };
    write_output(
        &text,
        &OutputTarget::from_option(options.report_file),
        options.quiet,
    )?;

    Ok(report.exit_code())
}

/// Path input, or stdin for `-`
fn load_input(path: &Path, schema: Option<SchemaFamily>) -> Result<PipelineInput> {
    if path.as_os_str() == "-" {
        let bytes = super::read_input(path)?;
        return Ok(PipelineInput::from_bytes("stdin", bytes).with_schema(schema));
    }
    Ok(PipelineInput::from_path(path).with_schema(schema))
}

/// Human-readable batch report
pub fn format_batch_summary(report: &BatchReport, use_color: bool) -> String {
    let paint = |code: &str, text: &str| {
        if use_color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    };

    let summary = &report.summary;
    let mut lines = vec![format!(
        "Processed {} input(s): {} succeeded ({} partial), {} failed, {} cancelled",
        summary.total, summary.succeeded, summary.partial, summary.failed, summary.cancelled
    )];

    for outcome in &report.outcomes {
        let tag = format!("[{}]", outcome.status.label());
        let tag = match &outcome.status {
            OutcomeStatus::Success(_) => paint("32", &tag),
            OutcomeStatus::PartialEnrichment(_) => paint("33", &tag),
            OutcomeStatus::Fatal(_) | OutcomeStatus::Cancelled => paint("31", &tag),
        };
        let detail = match &outcome.status {
            OutcomeStatus::Success(p) | OutcomeStatus::PartialEnrichment(p) => {
                let mut detail = format!(
                    "score {:.2} ({}), {} finding(s)",
                    p.score.overall,
                    p.score.grade.letter(),
                    p.score.findings.len()
                );
                if let Some(log) = &p.enrichment {
                    let stats = &log.stats;
                    detail.push_str(&format!(
                        ", enriched {}/{} (failed {}, unresolvable {})",
                        stats.enriched, stats.components_total, stats.failed, stats.unresolvable
                    ));
                }
                if !p.rejected_patches.is_empty() {
                    detail.push_str(&format!(
                        ", {} patch(es) rejected",
                        p.rejected_patches.len()
                    ));
                }
                detail
            }
            OutcomeStatus::Fatal(record) => record.to_string(),
            OutcomeStatus::Cancelled => "not completed".to_string(),
        };
        lines.push(format!("  {tag:<12} {}: {detail}", outcome.label));
    }

    if let Some(mean) = summary.mean_score {
        lines.push(format!("Mean score: {mean:.2}"));
    }
    if summary.patches_rejected > 0 {
        lines.push(format!("Patches rejected: {}", summary.patches_rejected));
    }
    lines.join("\n")
}
