//! Batch orchestration.
//!
//! Each input runs parse, augment, enrich and score on one worker task.
//! Inputs are independent: a fatal error in one never stops its siblings,
//! and every input ends up with exactly one outcome in input order.

use super::cancel::CancelToken;
use super::outcome::{
    BatchReport, FailureKind, FailureRecord, InputOutcome, InputSource, OutcomeStatus,
    PipelineInput, Processed, Stage,
};
use crate::augment::{apply_all, MetadataPatch};
use crate::enrichment::Enricher;
use crate::error::SbomEnrichError;
use crate::parsers::parse;
use crate::quality;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Default worker count: available parallelism, capped at 8
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map_or(1, std::num::NonZeroUsize::get)
        .min(8)
}

/// State shared by every worker
struct WorkerContext {
    patches: Vec<MetadataPatch>,
    enricher: Option<Enricher>,
}

/// Runs batches of inputs through the pipeline
pub struct Orchestrator {
    patches: Vec<MetadataPatch>,
    enricher: Option<Enricher>,
    workers: usize,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(default_workers())
    }
}

impl Orchestrator {
    /// Create an orchestrator with `workers` concurrent inputs (at least one)
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            patches: Vec::new(),
            enricher: None,
            workers: workers.max(1),
        }
    }

    /// Patches applied to every input, in order
    #[must_use]
    pub fn with_patches(mut self, patches: Vec<MetadataPatch>) -> Self {
        self.patches = patches;
        self
    }

    /// Enable enrichment
    #[must_use]
    pub fn with_enricher(mut self, enricher: Enricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Process a batch.
    ///
    /// Cancelling `cancel` stops scheduling, aborts in-flight inputs and
    /// returns what has completed; the rest are reported `Cancelled`.
    pub async fn run(&self, inputs: Vec<PipelineInput>, cancel: CancelToken) -> BatchReport {
        let start = Instant::now();
        let labels: Vec<String> = inputs.iter().map(|i| i.label.clone()).collect();
        let mut slots: Vec<Option<OutcomeStatus>> = labels.iter().map(|_| None).collect();
        tracing::info!(
            "Processing {} input(s) with {} worker(s)",
            labels.len(),
            self.workers
        );

        let shared = Arc::new(WorkerContext {
            patches: self.patches.clone(),
            enricher: self.enricher.clone(),
        });
        let mut pending = inputs.into_iter().enumerate();
        let mut tasks = JoinSet::new();
        loop {
            while !cancel.is_cancelled() && tasks.len() < self.workers {
                let Some((index, input)) = pending.next() else {
                    break;
                };
                let context = Arc::clone(&shared);
                let token = cancel.clone();
                tasks.spawn(async move {
                    let label = input.label.clone();
                    let status = AssertUnwindSafe(process_input(&context, input, &token))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            let message = panic_message(panic.as_ref());
                            tracing::error!("{}: worker panicked: {}", label, message);
                            OutcomeStatus::Fatal(FailureRecord {
                                stage: Stage::Internal,
                                kind: FailureKind::Internal,
                                message,
                            })
                        });
                    (index, status)
                });
            }
            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::warn!("Cancellation requested, aborting in-flight inputs");
                    tasks.abort_all();
                    break;
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, status))) => slots[index] = Some(status),
                    Some(Err(e)) => tracing::error!("Worker task failed: {}", e),
                    None => break,
                },
            }
        }

        // Tasks that finished before the abort still yield their outcome
        while let Some(joined) = tasks.join_next().await {
            if let Ok((index, status)) = joined {
                slots[index] = Some(status);
            }
        }

        let outcomes = labels
            .into_iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (label, status))| InputOutcome {
                index,
                label,
                status: status.unwrap_or(OutcomeStatus::Cancelled),
            })
            .collect();
        let report = BatchReport::new(outcomes);
        tracing::info!(
            "Batch finished in {:?}: {} succeeded, {} failed, {} cancelled",
            start.elapsed(),
            report.summary.succeeded,
            report.summary.failed,
            report.summary.cancelled
        );
        report
    }
}

async fn process_input(
    context: &WorkerContext,
    input: PipelineInput,
    cancel: &CancelToken,
) -> OutcomeStatus {
    let label = input.label;
    let bytes = match input.source {
        InputSource::Bytes(bytes) => bytes,
        InputSource::Path(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => return fatal(&label, Stage::Read, &SbomEnrichError::io(path, e)),
        },
    };

    let mut document = match parse(&bytes, input.schema) {
        Ok(document) => document,
        Err(e) => return fatal(&label, Stage::Parse, &e),
    };
    tracing::debug!(
        "{}: parsed {} {} component(s)",
        label,
        document.component_count(),
        document.schema
    );

    let rejected_patches = apply_all(&mut document, &context.patches);
    for failure in &rejected_patches {
        tracing::warn!("{}: patch {} rejected: {}", label, failure.index, failure.reason);
    }

    let (document, enrichment) = match &context.enricher {
        Some(enricher) => {
            let (document, log) = enricher.enrich(document, cancel).await;
            (document, Some(log))
        }
        None => (document, None),
    };

    let score = quality::score(&document);
    tracing::info!(
        "{}: score {:.2} ({})",
        label,
        score.overall,
        score.grade.letter()
    );

    let partial = enrichment
        .as_ref()
        .is_some_and(|log| log.stats.failed > 0 || log.cancelled_count() > 0);
    let processed = Processed {
        document,
        score,
        enrichment,
        rejected_patches,
    };
    if partial {
        OutcomeStatus::PartialEnrichment(processed)
    } else {
        OutcomeStatus::Success(processed)
    }
}

fn fatal(label: &str, stage: Stage, err: &SbomEnrichError) -> OutcomeStatus {
    tracing::warn!("{}: {} failed: {}", label, stage, err);
    OutcomeStatus::Fatal(FailureRecord::from_error(stage, err))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::PatchSubject;
    use crate::enrichment::{
        ComponentMetadata, EcosystemKey, EnricherConfig, MetadataProvider, OfflineProvider,
        ProviderError,
    };
    use crate::pipeline::exit_codes;
    use async_trait::async_trait;
    use std::time::Duration;

    const GOOD: &str = r#"{
        "bomFormat": "CycloneDX", "specVersion": "1.5",
        "metadata": {"component": {"type": "application", "name": "app", "version": "1.0", "bom-ref": "app"}},
        "components": [
            {"type": "library", "name": "lib", "version": "2.0", "bom-ref": "lib",
             "purl": "pkg:npm/lib@2.0"}
        ],
        "dependencies": [{"ref": "app", "dependsOn": ["lib"]}]
    }"#;

    const DANGLING: &str = r#"{
        "bomFormat": "CycloneDX", "specVersion": "1.5",
        "components": [{"type": "library", "name": "lib", "version": "2.0", "bom-ref": "lib"}],
        "dependencies": [{"ref": "lib", "dependsOn": ["missing"]}]
    }"#;

    fn input(label: &str, content: &str) -> PipelineInput {
        PipelineInput::from_bytes(label, content.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_sibling_inputs_survive_a_fatal_one() {
        let report = Orchestrator::new(2)
            .run(
                vec![input("a", GOOD), input("b", DANGLING), input("c", GOOD)],
                CancelToken::new(),
            )
            .await;

        assert_eq!(report.outcomes.len(), 3);
        assert!(matches!(report.outcomes[0].status, OutcomeStatus::Success(_)));
        let failure = report.outcomes[1].status.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Structural);
        assert_eq!(failure.stage, Stage::Parse);
        assert!(matches!(report.outcomes[2].status, OutcomeStatus::Success(_)));
        assert_eq!(report.exit_code(), exit_codes::PARTIAL_FAILURE);
    }

    #[tokio::test]
    async fn test_outcomes_keep_input_order() {
        let inputs = (0..10).map(|i| input(&format!("in-{i}"), GOOD)).collect();
        let report = Orchestrator::new(3).run(inputs, CancelToken::new()).await;
        for (i, outcome) in report.outcomes.iter().enumerate() {
            assert_eq!(outcome.index, i);
            assert_eq!(outcome.label, format!("in-{i}"));
        }
        assert_eq!(report.exit_code(), exit_codes::SUCCESS);
    }

    #[tokio::test]
    async fn test_missing_file_is_read_failure() {
        let report = Orchestrator::new(1)
            .run(
                vec![PipelineInput::from_path("/nonexistent/sbom.json")],
                CancelToken::new(),
            )
            .await;
        let failure = report.outcomes[0].status.failure().unwrap();
        assert_eq!((failure.stage, failure.kind), (Stage::Read, FailureKind::Io));
        assert_eq!(report.exit_code(), exit_codes::ALL_FAILED);
    }

    #[tokio::test]
    async fn test_patches_and_enrichment_applied() {
        let provider = OfflineProvider::new().with_entry(
            "pkg:npm/lib@2.0",
            ComponentMetadata {
                license: Some("MIT".into()),
                ..ComponentMetadata::default()
            },
        );
        let patch = MetadataPatch::overwrite(PatchSubject::Document)
            .with_field("author", "Jane Doe")
            .with_field("bogus", "x");
        let orchestrator = Orchestrator::new(1)
            .with_patches(vec![patch])
            .with_enricher(Enricher::new(Arc::new(provider), EnricherConfig::default()));

        let report = orchestrator
            .run(vec![input("a", GOOD)], CancelToken::new())
            .await;
        let processed = report.outcomes[0].status.processed().unwrap();
        assert_eq!(processed.rejected_patches.len(), 1);
        assert!(processed.document.metadata.authors.is_empty());
        let log = processed.enrichment.as_ref().unwrap();
        assert_eq!(log.stats.enriched, 1);
        assert_eq!(report.summary.patches_rejected, 1);
    }

    struct Stalled;

    #[async_trait]
    impl MetadataProvider for Stalled {
        async fn lookup(
            &self,
            _key: &EcosystemKey,
        ) -> Result<Option<ComponentMetadata>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_cancel_reports_every_input() {
        let config = EnricherConfig {
            timeout: Duration::from_secs(3600),
            ..EnricherConfig::default()
        };
        let orchestrator =
            Orchestrator::new(1).with_enricher(Enricher::new(Arc::new(Stalled), config));
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let inputs = vec![input("a", GOOD), input("b", GOOD), input("c", GOOD)];
        let report = orchestrator.run(inputs, cancel).await;

        assert_eq!(report.outcomes.len(), 3);
        assert!(report.summary.cancelled >= 2);
        assert_eq!(report.exit_code(), exit_codes::CANCELLED);
    }

    struct Panicking;

    #[async_trait]
    impl MetadataProvider for Panicking {
        async fn lookup(
            &self,
            key: &EcosystemKey,
        ) -> Result<Option<ComponentMetadata>, ProviderError> {
            panic!("lookup of {key} exploded");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_worker_panic_is_internal_failure() {
        let orchestrator = Orchestrator::new(2)
            .with_enricher(Enricher::new(Arc::new(Panicking), EnricherConfig::default()));
        let report = orchestrator
            .run(vec![input("a", GOOD), input("b", DANGLING)], CancelToken::new())
            .await;

        let panicked = report.outcomes[0].status.failure().unwrap();
        assert_eq!(
            (panicked.stage, panicked.kind),
            (Stage::Internal, FailureKind::Internal)
        );
        assert!(panicked.message.contains("exploded"));
        assert_eq!(report.outcomes[1].status.failure().unwrap().stage, Stage::Parse);
        assert_eq!(report.exit_code(), exit_codes::ALL_FAILED);
    }

    #[tokio::test]
    async fn test_already_cancelled_schedules_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = Orchestrator::new(4)
            .run(vec![input("a", GOOD), input("b", GOOD)], cancel)
            .await;
        assert_eq!(report.summary.cancelled, 2);
    }

    #[test]
    fn test_default_workers_bounded() {
        let workers = default_workers();
        assert!((1..=8).contains(&workers));
    }
}
