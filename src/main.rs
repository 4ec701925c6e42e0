//! sbom-enrich: SBOM augmentation, enrichment and quality scoring
//!
//! Batch tool for `CycloneDX` and SPDX JSON documents.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sbom_enrich::{
    cli,
    config::{AppConfig, ProviderKind},
    model::SchemaFamily,
    pipeline::{exit_codes, OutputFormat, ReportFormat},
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sbom-enrich")]
#[command(version)]
#[command(about = "Augment, enrich and score SBOMs", long_about = None)]
#[command(after_help = "EXIT CODES:
    0    Every input succeeded (possibly with partial enrichment)
    1    Some inputs failed / score below --min-score
    2    Every input failed
    3    Error occurred
    130  Cancelled

EXAMPLES:
    # Enrich a batch offline and write enriched copies
    sbom-enrich run sboms/*.json --offline-db metadata.json -d out/

    # Set the primary component's supplier and append an author
    sbom-enrich run app.cdx.json -p 'primary.supplier=Acme Corp' -p 'author+=Jane Doe'

    # Gate CI on quality
    sbom-enrich score app.cdx.json --min-score 0.8")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output (also respects `NO_COLOR` env)
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `run` subcommand
#[derive(Parser)]
struct RunArgs {
    /// Input SBOM files (`-` for stdin)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Declared schema family of the inputs (cyclonedx, spdx); detected if omitted
    #[arg(long)]
    schema: Option<SchemaFamily>,

    /// Metadata patch, applied in order: `[document.|primary.]field=value`, or `+=` to append
    #[arg(short, long = "patch", value_name = "SPEC")]
    patches: Vec<String>,

    /// Skip metadata enrichment
    #[arg(long)]
    no_enrich: bool,

    /// Enrich from a local JSON table keyed by package URL instead of the registry
    #[arg(long, value_name = "FILE")]
    offline_db: Option<PathBuf>,

    /// Registry metadata API base URL
    #[arg(long, env = "SBOM_ENRICH_API_BASE", value_name = "URL")]
    api_base: Option<String>,

    /// Inputs processed concurrently
    #[arg(long)]
    workers: Option<usize>,

    /// Concurrent metadata lookups per document
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Per-lookup timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Retries per lookup for transient failures
    #[arg(long)]
    max_retries: Option<u32>,

    /// Cache directory for provider answers
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Bypass the provider cache
    #[arg(long)]
    no_cache: bool,

    /// Write enriched documents to this directory
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Schema family of written documents
    #[arg(long, value_enum)]
    output_format: Option<OutputFormat>,

    /// Write the batch report to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Batch report format
    #[arg(long, value_enum, default_value = "summary")]
    report_format: ReportFormat,
}

impl RunArgs {
    /// CLI values as a config layer over the file config
    fn overrides(&self) -> AppConfig {
        let mut builder = AppConfig::builder()
            .workers(self.workers)
            .enrichment_enabled(!self.no_enrich)
            .cache_dir(self.cache_dir.clone())
            .bypass_cache(self.no_cache)
            .patches(self.patches.iter().cloned());
        if let Some(path) = &self.offline_db {
            builder = builder.offline_db(path.clone());
        }
        if let Some(url) = &self.api_base {
            builder = builder.api_base(url.clone());
        }
        if let Some(max) = self.max_concurrent {
            builder = builder.max_concurrent(max);
        }
        if let Some(secs) = self.timeout {
            builder = builder.timeout_secs(secs);
        }
        if let Some(retries) = self.max_retries {
            builder = builder.max_retries(retries);
        }
        if let Some(format) = self.output_format {
            builder = builder.output_format(format);
        }
        builder.build()
    }
}

/// Arguments for the `score` subcommand
#[derive(Parser)]
struct ScoreArgs {
    /// SBOM file to score (`-` for stdin)
    input: PathBuf,

    /// Declared schema family; detected if omitted
    #[arg(long)]
    schema: Option<SchemaFamily>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    output: ReportFormat,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,

    /// Exit with code 1 if the overall score (0.0-1.0) is below this value
    #[arg(long)]
    min_score: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the augment, enrich and score pipeline over a batch of SBOMs
    Run(RunArgs),

    /// Score an SBOM against the quality rubric
    Score(ScoreArgs),

    /// Convert an SBOM to another schema family
    Convert {
        /// SBOM file to convert (`-` for stdin)
        input: PathBuf,

        /// Target schema family (cyclonedx, spdx)
        #[arg(long)]
        to: SchemaFamily,

        /// Declared schema family of the input; detected if omitted
        #[arg(long)]
        schema: Option<SchemaFamily>,

        /// Output file path (stdout if not specified)
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    match dispatch(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(exit_codes::ERROR);
        }
    }
}

fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Run(args) => {
            let (config, loaded_from) =
                AppConfig::from_file_with_overrides(cli.config.as_deref(), &args.overrides());
            if let Some(path) = &loaded_from {
                tracing::debug!("Loaded config from {}", path.display());
            }
            if config.enrichment.enabled && config.enrichment.provider == ProviderKind::Registry {
                tracing::debug!("Registry API: {}", config.enrichment.api_base);
            }
            cli::run_batch(
                &config,
                cli::RunOptions {
                    inputs: args.inputs,
                    schema: args.schema,
                    output_dir: args.output_dir,
                    report_file: args.report,
                    report_format: args.report_format,
                    quiet: cli.quiet,
                    no_color: cli.no_color,
                },
            )
        }

        Commands::Score(args) => cli::run_score(cli::ScoreOptions {
            sbom_path: args.input,
            schema: args.schema,
            output: args.output,
            output_file: args.output_file,
            min_score: args.min_score,
            no_color: cli.no_color,
        }),

        Commands::Convert {
            input,
            to,
            schema,
            output_file,
        } => {
            cli::run_convert(input, schema, to, output_file)?;
            Ok(exit_codes::SUCCESS)
        }

        Commands::ConfigSchema { output } => {
            let schema = sbom_enrich::config::generate_json_schema()
                .context("failed to serialize config schema")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => println!("{schema}"),
            }
            Ok(exit_codes::SUCCESS)
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sbom-enrich", &mut io::stdout());
            Ok(exit_codes::SUCCESS)
        }
    }
}
