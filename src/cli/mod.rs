//! CLI command handlers.
//!
//! This module provides testable command handlers that are invoked by main.rs.
//! Each handler implements the business logic for a specific CLI subcommand.

mod convert;
mod run;
mod score;

pub use convert::run_convert;
pub use run::{format_batch_summary, run_batch, RunOptions};
pub use score::{format_score_report, run_score, ScoreOptions};

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read a single input document; `-` reads stdin
fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read stdin")?;
        return Ok(bytes);
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
