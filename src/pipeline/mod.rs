//! Batch pipeline orchestration.
//!
//! Runs parse → augment → enrich → score over a batch of inputs with a
//! bounded worker pool, and turns per-input outcomes into a
//! [`BatchReport`] and a process exit code.

mod cancel;
mod orchestrator;
mod outcome;
mod output;

pub use cancel::CancelToken;
pub use orchestrator::{default_workers, Orchestrator};
pub use outcome::{
    BatchReport, BatchSummary, FailureKind, FailureRecord, InputOutcome, InputSource,
    OutcomeStatus, PipelineInput, Processed, Stage,
};
pub use output::{
    enriched_file_name, should_use_color, write_batch_outputs, write_enriched, write_output,
    OutputFormat, OutputNames, OutputTarget, ReportFormat,
};

/// Exit codes for CI/CD integration
pub mod exit_codes {
    /// Every input succeeded, possibly with partial enrichment
    pub const SUCCESS: i32 = 0;
    /// Some inputs failed, at least one succeeded
    pub const PARTIAL_FAILURE: i32 = 1;
    /// Every input failed
    pub const ALL_FAILED: i32 = 2;
    /// An error occurred outside any input
    pub const ERROR: i32 = 3;
    /// `score` result below `--min-score`
    pub const BELOW_MIN_SCORE: i32 = 1;
    /// Cancelled by the operator
    pub const CANCELLED: i32 = 130;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_values() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::PARTIAL_FAILURE, 1);
        assert_eq!(exit_codes::ALL_FAILED, 2);
        assert_eq!(exit_codes::ERROR, 3);
        assert_eq!(exit_codes::CANCELLED, 130);
    }
}
