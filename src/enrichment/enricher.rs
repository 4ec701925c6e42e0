//! Concurrent component enrichment.
//!
//! Lookups fan out through a bounded `buffer_unordered` stream. Every result
//! is sent over a channel to one merge actor that owns the document, so the
//! document is only ever mutated from a single place and lookups never block
//! on each other.

use super::{
    ComponentMetadata, EcosystemKey, EnrichmentLog, EnrichmentResult, LogEvent, MetadataProvider,
    ProviderError,
};
use crate::model::{Component, ComponentId, ComponentRef, Document, LicenseExpression};
use crate::pipeline::CancelToken;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Runtime settings for an [`Enricher`].
#[derive(Debug, Clone)]
pub struct EnricherConfig {
    /// Lookups in flight at once
    pub max_concurrent: usize,
    /// Deadline for a single provider call
    pub timeout: Duration,
    /// Extra attempts after a retryable failure
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt
    pub backoff_base: Duration,
    /// Upper bound on a single retry delay
    pub backoff_max: Duration,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            timeout: Duration::from_secs(10),
            max_retries: 3,
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_secs(5),
        }
    }
}

impl EnricherConfig {
    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }
}

/// One component queued for lookup
struct Job {
    id: ComponentId,
    reference: ComponentRef,
    key: EcosystemKey,
}

/// Message from a finished lookup to the merge actor
struct LookupReport {
    id: ComponentId,
    reference: ComponentRef,
    attempts: u32,
    outcome: Result<Option<EnrichmentResult>, ProviderError>,
}

/// Fills missing component metadata from a [`MetadataProvider`].
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn MetadataProvider>,
    config: EnricherConfig,
}

impl Enricher {
    pub fn new(provider: Arc<dyn MetadataProvider>, config: EnricherConfig) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    #[must_use]
    pub const fn config(&self) -> &EnricherConfig {
        &self.config
    }

    /// Enrich every component that is missing metadata.
    ///
    /// Provider failures are logged per component and never abort the run.
    /// On cancellation the partially enriched document is returned and every
    /// queued component that was not merged is logged as cancelled.
    pub async fn enrich(
        &self,
        document: Document,
        cancel: &CancelToken,
    ) -> (Document, EnrichmentLog) {
        let start = Instant::now();
        let hits_before = self.provider.cache_hits();
        let mut log = EnrichmentLog::new();
        log.stats.components_total = document.component_count();

        let mut jobs = Vec::new();
        for component in document.components() {
            let reference = ComponentRef::from_component(component);
            if is_complete(component) {
                log.record(reference, LogEvent::AlreadyComplete);
                continue;
            }
            match EcosystemKey::from_component(component) {
                Ok(key) => jobs.push(Job {
                    id: component.id.clone(),
                    reference,
                    key,
                }),
                Err(reason) => {
                    tracing::debug!("Skipping {}: {}", reference, reason);
                    log.record(reference, LogEvent::Unresolvable { reason });
                }
            }
        }
        log.stats.queried = jobs.len();

        let pending: Vec<(ComponentId, ComponentRef)> = jobs
            .iter()
            .map(|job| (job.id.clone(), job.reference.clone()))
            .collect();

        tracing::info!(
            "Enriching {} of {} components via {}",
            jobs.len(),
            log.stats.components_total,
            self.provider.name()
        );

        let (tx, rx) = mpsc::channel(self.config.max_concurrent.max(1));
        let producer = self.run_lookups(jobs, tx, cancel);
        let actor = merge_actor(document, log, rx, self.provider.name().to_string());
        let ((), (document, mut log, merged)) = tokio::join!(producer, actor);

        for (id, reference) in pending {
            if !merged.contains(&id) {
                log.record(reference, LogEvent::Cancelled);
            }
        }

        log.stats.cache_hits = self.provider.cache_hits().saturating_sub(hits_before);
        log.stats.duration = start.elapsed();
        log.stats.log_summary();
        (document, log)
    }

    async fn run_lookups(
        &self,
        jobs: Vec<Job>,
        tx: mpsc::Sender<LookupReport>,
        cancel: &CancelToken,
    ) {
        {
            let tx = &tx;
            let source = self.provider.name();
            let lookups = stream::iter(jobs)
                .map(move |job| async move {
                    let (result, attempts) = self.lookup_with_retry(&job.key).await;
                    let outcome = result.map(|found| {
                        found.map(|metadata| EnrichmentResult {
                            component: job.id.clone(),
                            metadata,
                            source: source.to_string(),
                        })
                    });
                    let report = LookupReport {
                        id: job.id,
                        reference: job.reference,
                        attempts,
                        outcome,
                    };
                    if tx.send(report).await.is_err() {
                        tracing::debug!("Merge actor stopped before a lookup report");
                    }
                })
                .buffer_unordered(self.config.max_concurrent.max(1))
                .for_each(|()| futures::future::ready(()));

            tokio::select! {
                () = lookups => {}
                () = cancel.cancelled() => {
                    tracing::warn!("Enrichment cancelled; abandoning in-flight lookups");
                }
            }
        }
        drop(tx);
    }

    /// Call the provider with a deadline, retrying retryable failures.
    async fn lookup_with_retry(
        &self,
        key: &EcosystemKey,
    ) -> (Result<Option<ComponentMetadata>, ProviderError>, u32) {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = tokio::time::timeout(self.config.timeout, self.provider.lookup(key))
                .await
                .unwrap_or(Err(ProviderError::Timeout));
            match result {
                Err(e) if e.is_retryable() && attempt <= self.config.max_retries => {
                    let delay = self.config.backoff(attempt);
                    tracing::debug!(
                        "Lookup for {} failed ({}), retry {} after {:?}",
                        key,
                        e,
                        attempt,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return (other, attempt),
            }
        }
    }
}

/// Whether every enrichable field is already present
fn is_complete(component: &Component) -> bool {
    component.has_known_license()
        && is_present(component.description.as_deref())
        && is_present(component.homepage.as_deref())
        && !component.identifiers.purls.is_empty()
        && !component.identifiers.cpes.is_empty()
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Sole owner of the document while lookups run.
async fn merge_actor(
    mut document: Document,
    mut log: EnrichmentLog,
    mut rx: mpsc::Receiver<LookupReport>,
    source: String,
) -> (Document, EnrichmentLog, HashSet<ComponentId>) {
    let mut merged = HashSet::new();

    while let Some(report) = rx.recv().await {
        log.stats.retries += report.attempts.saturating_sub(1) as usize;
        let event = match report.outcome {
            Ok(Some(result)) => match document.component_mut(&result.component) {
                Some(component) => {
                    let fields = fill_missing(component, &result.metadata);
                    if fields.is_empty() {
                        LogEvent::NotFound {
                            source: result.source,
                        }
                    } else {
                        tracing::debug!("Enriched {} with {}", report.reference, fields.join(", "));
                        LogEvent::Enriched {
                            source: result.source,
                            fields,
                        }
                    }
                }
                None => LogEvent::NotFound {
                    source: result.source,
                },
            },
            Ok(None) => LogEvent::NotFound {
                source: source.clone(),
            },
            Err(error) => {
                tracing::warn!(
                    "Lookup for {} failed after {} attempt(s): {}",
                    report.reference,
                    report.attempts,
                    error
                );
                LogEvent::Failed {
                    source: source.clone(),
                    error,
                    attempts: report.attempts,
                }
            }
        };
        log.record(report.reference, event);
        merged.insert(report.id);
    }

    (document, log, merged)
}

/// Copy provider metadata into empty fields only. Returns the filled field names.
pub fn fill_missing(component: &mut Component, metadata: &ComponentMetadata) -> Vec<String> {
    let mut filled = Vec::new();

    if !component.has_known_license() {
        if let Some(license) = LicenseExpression::from_declared(metadata.license.as_deref()) {
            component.license = Some(license);
            filled.push("license".to_string());
        }
    }
    if fill_string(&mut component.description, metadata.description.as_deref()) {
        filled.push("description".to_string());
    }
    if fill_string(&mut component.homepage, metadata.homepage.as_deref()) {
        filled.push("homepage".to_string());
    }
    if fill_list(&mut component.identifiers.purls, metadata.purl.as_deref()) {
        filled.push("purl".to_string());
    }
    if fill_list(&mut component.identifiers.cpes, metadata.cpe.as_deref()) {
        filled.push("cpe".to_string());
    }

    filled
}

fn fill_string(slot: &mut Option<String>, value: Option<&str>) -> bool {
    if is_present(slot.as_deref()) {
        return false;
    }
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => {
            *slot = Some(v.to_string());
            true
        }
        None => false,
    }
}

fn fill_list(list: &mut Vec<String>, value: Option<&str>) -> bool {
    if !list.is_empty() {
        return false;
    }
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => {
            list.push(v.to_string());
            true
        }
        None => false,
    }
}
