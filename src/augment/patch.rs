//! Metadata patch types and their textual form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a patch edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchSubject {
    /// Document-level metadata
    Document,
    /// The document's primary component
    PrimaryComponent,
}

impl fmt::Display for PatchSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::PrimaryComponent => write!(f, "primary component"),
        }
    }
}

/// How patch values combine with existing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyMode {
    /// Replace unconditionally; list fields become exactly the patch values
    Overwrite,
    /// Fill empty scalars, extend lists
    Append,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite => write!(f, "overwrite"),
            Self::Append => write!(f, "append"),
        }
    }
}

/// Ordered set of field edits against one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPatch {
    pub subject: PatchSubject,
    pub mode: ApplyMode,
    /// Field name to raw value, applied in order
    pub fields: Vec<(String, String)>,
}

impl MetadataPatch {
    #[must_use]
    pub const fn new(subject: PatchSubject, mode: ApplyMode) -> Self {
        Self {
            subject,
            mode,
            fields: Vec::new(),
        }
    }

    /// Empty overwrite patch
    #[must_use]
    pub const fn overwrite(subject: PatchSubject) -> Self {
        Self::new(subject, ApplyMode::Overwrite)
    }

    /// Empty append patch
    #[must_use]
    pub const fn append(subject: PatchSubject) -> Self {
        Self::new(subject, ApplyMode::Append)
    }

    /// Add a field edit
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((field.into(), value.into()));
        self
    }
}

impl fmt::Display for MetadataPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|(k, _)| k.as_str()).collect();
        write!(f, "{} {} [{}]", self.mode, self.subject, names.join(", "))
    }
}

impl From<PatchSpec> for MetadataPatch {
    fn from(spec: PatchSpec) -> Self {
        Self::new(spec.subject, spec.mode).with_field(spec.field, spec.value)
    }
}

/// One field edit in textual form.
///
/// `[document.|primary.]field=value` overwrites, `field+=value` appends.
/// Without a prefix the edit targets the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSpec {
    pub subject: PatchSubject,
    pub mode: ApplyMode,
    pub field: String,
    pub value: String,
}

/// Error parsing a [`PatchSpec`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchSpecError {
    #[error("patch '{0}' has no '=' separator")]
    MissingSeparator(String),
    #[error("patch '{0}' has an empty field name")]
    EmptyField(String),
}

impl FromStr for PatchSpec {
    type Err = PatchSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lhs, value) = s
            .split_once('=')
            .ok_or_else(|| PatchSpecError::MissingSeparator(s.to_string()))?;
        let (lhs, mode) = match lhs.strip_suffix('+') {
            Some(lhs) => (lhs, ApplyMode::Append),
            None => (lhs, ApplyMode::Overwrite),
        };
        let lhs = lhs.trim();
        let (subject, field) = if let Some(field) = lhs.strip_prefix("primary.") {
            (PatchSubject::PrimaryComponent, field)
        } else if let Some(field) = lhs.strip_prefix("document.") {
            (PatchSubject::Document, field)
        } else {
            (PatchSubject::Document, lhs)
        };
        if field.is_empty() {
            return Err(PatchSpecError::EmptyField(s.to_string()));
        }
        Ok(Self {
            subject,
            mode,
            field: field.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl fmt::Display for PatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.subject {
            PatchSubject::Document => "document.",
            PatchSubject::PrimaryComponent => "primary.",
        };
        let op = match self.mode {
            ApplyMode::Overwrite => "=",
            ApplyMode::Append => "+=",
        };
        write!(f, "{prefix}{}{op}{}", self.field, self.value)
    }
}

/// A patch the augmenter rejected; siblings still apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchFailure {
    /// Position of the patch in the applied sequence
    pub index: usize,
    /// Short description of the patch
    pub patch: String,
    /// Why it was rejected
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overwrite_and_append() {
        let spec: PatchSpec = "license=Apache-2.0".parse().unwrap();
        assert_eq!(spec.subject, PatchSubject::Document);
        assert_eq!(spec.mode, ApplyMode::Overwrite);
        assert_eq!(spec.field, "license");

        let spec: PatchSpec = "primary.author+=Jane Doe <jane@example.com>".parse().unwrap();
        assert_eq!(spec.subject, PatchSubject::PrimaryComponent);
        assert_eq!(spec.mode, ApplyMode::Append);
        assert_eq!(spec.value, "Jane Doe <jane@example.com>");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let spec: PatchSpec = "document.repository=https://x.test/?a=b".parse().unwrap();
        assert_eq!(spec.value, "https://x.test/?a=b");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "license".parse::<PatchSpec>(),
            Err(PatchSpecError::MissingSeparator(_))
        ));
        assert!(matches!(
            "primary.=x".parse::<PatchSpec>(),
            Err(PatchSpecError::EmptyField(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["document.tool+=syft@1.0", "primary.version=2.0.0"] {
            let spec: PatchSpec = text.parse().unwrap();
            assert_eq!(spec.to_string(), text);
        }
    }
}
