//! Unified error types for sbom-enrich.
//!
//! Per-input failures (schema, structural, patch errors) are values the
//! pipeline records and reports; provider failures are recovered inside the
//! enrichment stage and never escalate past it.

use crate::enrichment::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sbom-enrich operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SbomEnrichError {
    /// Input could not be decoded into the declared or detected schema family
    #[error("Schema error: {context}")]
    Schema {
        context: String,
        #[source]
        source: SchemaErrorKind,
    },

    /// Input decoded but violates a document invariant
    #[error("Structural error: {context}")]
    Structural {
        context: String,
        #[source]
        source: StructuralErrorKind,
    },

    /// A patch names a field the subject does not have
    #[error("Unknown field '{field}' for {subject}")]
    UnknownField { subject: String, field: String },

    /// A patch value could not be interpreted for its field
    #[error("Invalid value for '{field}': {message}")]
    InvalidFieldValue { field: String, message: String },

    /// A patch targets the primary component of a document that has none
    #[error("Patch targets the primary component, but the document has none")]
    NoPrimaryComponent,

    /// Metadata provider failure
    #[error("Provider error: {context}")]
    Provider {
        context: String,
        #[source]
        source: ProviderError,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific schema error kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaErrorKind {
    #[error("Unknown SBOM format - expected CycloneDX or SPDX markers")]
    UnknownFormat,

    #[error("Content is not {expected}: {reason}")]
    FamilyMismatch { expected: String, reason: String },

    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Unsupported format version: {version} (supported: {supported})")]
    UnsupportedVersion { version: String, supported: String },
}

/// Specific structural error kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StructuralErrorKind {
    #[error("Missing required field: {field} in {context}")]
    MissingField { field: String, context: String },

    #[error("Relationship references unknown entity '{reference}'")]
    DanglingRelationship { reference: String },

    #[error("Duplicate component identity {name}@{version} ({component_type})")]
    DuplicateComponent {
        name: String,
        version: String,
        component_type: String,
    },

    #[error("Duplicate component reference '{0}'")]
    DuplicateReference(String),

    #[error("Primary component '{0}' is not present in the document")]
    UnknownPrimaryComponent(String),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for sbom-enrich operations
pub type Result<T> = std::result::Result<T, SbomEnrichError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl SbomEnrichError {
    /// Create a schema error with context
    pub fn schema(context: impl Into<String>, source: SchemaErrorKind) -> Self {
        Self::Schema {
            context: context.into(),
            source,
        }
    }

    /// Create a schema error for unknown format
    pub fn unknown_format(context: impl Into<String>) -> Self {
        Self::schema(context, SchemaErrorKind::UnknownFormat)
    }

    /// Create a structural error with context
    pub fn structural(context: impl Into<String>, source: StructuralErrorKind) -> Self {
        Self::Structural {
            context: context.into(),
            source,
        }
    }

    /// Create a structural error for a missing required field
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::structural(
            "missing required field",
            StructuralErrorKind::MissingField {
                field: field.into(),
                context: context.into(),
            },
        )
    }

    /// Create a structural error for a relationship endpoint that does not resolve
    pub fn dangling(reference: impl Into<String>) -> Self {
        Self::structural(
            "dangling relationship",
            StructuralErrorKind::DanglingRelationship {
                reference: reference.into(),
            },
        )
    }

    /// Create an unknown-field error
    pub fn unknown_field(subject: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            subject: subject.into(),
            field: field.into(),
        }
    }

    /// Create an invalid-value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a provider error
    pub fn provider(context: impl Into<String>, source: ProviderError) -> Self {
        Self::Provider {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for SbomEnrichError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SbomEnrichError {
    fn from(err: serde_json::Error) -> Self {
        Self::schema(
            "JSON deserialization",
            SchemaErrorKind::InvalidJson(err.to_string()),
        )
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// Contexts chain outermost first, so an error raised while reading a
/// component inside a file reads as "parsing sbom.json: component 3: ...".
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<SbomEnrichError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(err: SbomEnrichError, new_ctx: &str) -> SbomEnrichError {
    match err {
        SbomEnrichError::Schema {
            context: existing,
            source,
        } => SbomEnrichError::Schema {
            context: chain_context(new_ctx, &existing),
            source,
        },
        SbomEnrichError::Structural {
            context: existing,
            source,
        } => SbomEnrichError::Structural {
            context: chain_context(new_ctx, &existing),
            source,
        },
        SbomEnrichError::Provider {
            context: existing,
            source,
        } => SbomEnrichError::Provider {
            context: chain_context(new_ctx, &existing),
            source,
        },
        SbomEnrichError::Io {
            path,
            message,
            source,
        } => SbomEnrichError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        SbomEnrichError::Config(msg) => SbomEnrichError::Config(chain_context(new_ctx, &msg)),
        SbomEnrichError::Validation(msg) => {
            SbomEnrichError::Validation(chain_context(new_ctx, &msg))
        }
        other @ (SbomEnrichError::UnknownField { .. }
        | SbomEnrichError::InvalidFieldValue { .. }
        | SbomEnrichError::NoPrimaryComponent) => other,
    }
}

/// Chain two context strings together.
///
/// If the existing context is empty, returns just the new context.
/// Otherwise, returns "`new_context`: `existing_context`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}
