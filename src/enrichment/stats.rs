//! Enrichment log and statistics.

use super::ProviderError;
use crate::model::ComponentRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Per-component record of an enrichment run plus aggregate counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentLog {
    pub entries: Vec<LogEntry>,
    pub stats: EnrichmentStats,
}

impl EnrichmentLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event and bump the matching counter
    pub fn record(&mut self, component: ComponentRef, event: LogEvent) {
        match &event {
            LogEvent::Enriched { .. } => self.stats.enriched += 1,
            LogEvent::Unresolvable { .. } => self.stats.unresolvable += 1,
            LogEvent::NotFound { .. } => self.stats.not_found += 1,
            LogEvent::Failed { .. } => self.stats.failed += 1,
            LogEvent::AlreadyComplete | LogEvent::Cancelled => {}
        }
        self.entries.push(LogEntry { component, event });
    }

    /// Entries for a component name
    pub fn entries_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries.iter().filter(move |e| e.component.name == name)
    }

    /// Number of components that were not merged because the run was cancelled
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.event, LogEvent::Cancelled))
            .count()
    }

    /// Whether any lookup failed outright
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.stats.failed > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub component: ComponentRef,
    pub event: LogEvent,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.event)
    }
}

/// What happened to one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    /// Provider data filled at least one empty field
    Enriched { source: String, fields: Vec<String> },
    /// Every enrichable field was already present; not queried
    AlreadyComplete,
    /// No usable lookup key
    Unresolvable { reason: String },
    /// Provider answered but has nothing (or nothing new) for the package
    NotFound { source: String },
    /// Lookup did not complete
    Failed {
        source: String,
        error: ProviderError,
        attempts: u32,
    },
    /// Run was cancelled before this component was merged
    Cancelled,
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enriched { source, fields } => {
                write!(f, "enriched from {source} ({})", fields.join(", "))
            }
            Self::AlreadyComplete => write!(f, "already complete"),
            Self::Unresolvable { reason } => write!(f, "unresolvable: {reason}"),
            Self::NotFound { source } => write!(f, "not found in {source}"),
            Self::Failed {
                source,
                error,
                attempts,
            } => write!(f, "{source} failed after {attempts} attempt(s): {error}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Statistics from an enrichment operation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentStats {
    /// Components in the document
    pub components_total: usize,
    /// Components a provider was asked about
    pub queried: usize,
    /// Components that gained at least one field
    pub enriched: usize,
    /// Components without a usable package URL
    pub unresolvable: usize,
    /// Lookups that returned nothing
    pub not_found: usize,
    /// Lookups that failed after all retries
    pub failed: usize,
    /// Lookups answered from a cache
    pub cache_hits: usize,
    /// Extra attempts spent on retryable failures
    pub retries: usize,
    /// Duration of the enrichment operation
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl EnrichmentStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a summary of the enrichment operation
    pub fn log_summary(&self) {
        tracing::info!(
            "Enrichment complete: {}/{} components enriched, {} queried, {} unresolvable, \
             {} not found, {} failed, {} cache hits, {} retries in {:?}",
            self.enriched,
            self.components_total,
            self.queried,
            self.unresolvable,
            self.not_found,
            self.failed,
            self.cache_hits,
            self.retries,
            self.duration
        );
    }

    /// Merge stats from another enrichment operation
    pub fn merge(&mut self, other: &Self) {
        self.components_total += other.components_total;
        self.queried += other.queried;
        self.enriched += other.enriched;
        self.unresolvable += other.unresolvable;
        self.not_found += other.not_found;
        self.failed += other.failed;
        self.cache_hits += other.cache_hits;
        self.retries += other.retries;
        self.duration += other.duration;
    }
}

/// Serde support for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
