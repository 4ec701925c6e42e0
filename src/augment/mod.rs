//! Metadata augmentation.
//!
//! Applies caller-supplied [`MetadataPatch`]es to a document's metadata or to
//! its primary component. Every field of a patch is resolved before anything
//! is written, so a patch either applies completely or leaves the document
//! untouched.

mod patch;

pub use patch::{ApplyMode, MetadataPatch, PatchFailure, PatchSpec, PatchSpecError, PatchSubject};

use crate::error::{Result, SbomEnrichError};
use crate::model::{
    Author, Component, ComponentType, Document, DocumentMetadata, LicenseExpression, Lifecycle,
    Organization, Tool,
};
use chrono::{DateTime, Utc};
use packageurl::PackageUrl;
use std::collections::HashSet;
use std::str::FromStr;

/// A validated document metadata edit
#[derive(Debug, Clone)]
enum DocumentEdit {
    Author(Author),
    Tool(Tool),
    Supplier(Organization),
    License(LicenseExpression),
    Repository(String),
    Lifecycle(Lifecycle),
    Timestamp(DateTime<Utc>),
}

/// A validated primary component edit
#[derive(Debug, Clone)]
enum ComponentEdit {
    Author(String),
    Purl(String),
    Cpe(String),
    Name(String),
    Version(String),
    Type(ComponentType),
    Supplier(Organization),
    License(LicenseExpression),
    Description(String),
    Repository(String),
    Homepage(String),
}

/// Apply one patch.
///
/// On error the document is unchanged.
pub fn apply(document: &mut Document, patch: &MetadataPatch) -> Result<()> {
    match patch.subject {
        PatchSubject::Document => {
            let edits = patch
                .fields
                .iter()
                .map(|(field, value)| resolve_document_field(field, value))
                .collect::<Result<Vec<_>>>()?;
            let mut metadata = document.metadata.clone();
            apply_document_edits(&mut metadata, edits, patch.mode);
            document.metadata = metadata;
        }
        PatchSubject::PrimaryComponent => {
            let primary = document
                .primary_component()
                .ok_or(SbomEnrichError::NoPrimaryComponent)?;
            let edits = patch
                .fields
                .iter()
                .map(|(field, value)| resolve_component_field(field, value))
                .collect::<Result<Vec<_>>>()?;

            let mut updated = primary.clone();
            apply_component_edits(&mut updated, edits, patch.mode);
            if !document.key_is_free(&updated.id, &updated.key()) {
                return Err(SbomEnrichError::invalid_value(
                    "name",
                    format!("another component is already {}", updated.key()),
                ));
            }
            if let Some(target) = document.primary_component_mut() {
                *target = updated;
            }
        }
    }
    tracing::debug!("Applied patch: {}", patch);
    Ok(())
}

/// Apply patches in order, recording failures without aborting siblings.
pub fn apply_all(document: &mut Document, patches: &[MetadataPatch]) -> Vec<PatchFailure> {
    let mut failures = Vec::new();
    for (index, patch) in patches.iter().enumerate() {
        if let Err(e) = apply(document, patch) {
            tracing::warn!("Rejected patch #{} ({}): {}", index + 1, patch, e);
            failures.push(PatchFailure {
                index,
                patch: patch.to_string(),
                reason: e.to_string(),
            });
        }
    }
    failures
}

fn non_empty(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SbomEnrichError::invalid_value(field, "value must not be empty"));
    }
    Ok(value.to_string())
}

fn resolve_document_field(field: &str, value: &str) -> Result<DocumentEdit> {
    let name = field.trim().to_lowercase();
    let value = non_empty(&name, value)?;
    let edit = match name.as_str() {
        "author" | "authors" => DocumentEdit::Author(Author::parse(&value)),
        "tool" | "tools" => DocumentEdit::Tool(Tool::parse(&value)),
        "supplier" => DocumentEdit::Supplier(Organization::new(value)),
        "license" => DocumentEdit::License(LicenseExpression::new(value)),
        "repository" | "repository_url" => DocumentEdit::Repository(value),
        "lifecycle" => DocumentEdit::Lifecycle(Lifecycle::from_phase(&value)),
        "timestamp" => {
            let ts = DateTime::parse_from_rfc3339(&value)
                .map_err(|e| SbomEnrichError::invalid_value("timestamp", e.to_string()))?;
            DocumentEdit::Timestamp(ts.with_timezone(&Utc))
        }
        _ => return Err(SbomEnrichError::unknown_field("document", field)),
    };
    Ok(edit)
}

fn resolve_component_field(field: &str, value: &str) -> Result<ComponentEdit> {
    let name = field.trim().to_lowercase();
    let value = non_empty(&name, value)?;
    let edit = match name.as_str() {
        "author" | "authors" => ComponentEdit::Author(value),
        "purl" | "purls" => {
            PackageUrl::from_str(&value)
                .map_err(|e| SbomEnrichError::invalid_value("purl", e.to_string()))?;
            ComponentEdit::Purl(value)
        }
        "cpe" | "cpes" => {
            if !value.starts_with("cpe:") {
                return Err(SbomEnrichError::invalid_value(
                    "cpe",
                    "expected a cpe:2.3: or cpe:/ identifier",
                ));
            }
            ComponentEdit::Cpe(value)
        }
        "name" => ComponentEdit::Name(value),
        "version" => ComponentEdit::Version(value),
        "type" => ComponentEdit::Type(ComponentType::from_name(&value)),
        "supplier" => ComponentEdit::Supplier(Organization::new(value)),
        "license" => ComponentEdit::License(LicenseExpression::new(value)),
        "description" => ComponentEdit::Description(value),
        "repository" | "repository_url" => ComponentEdit::Repository(value),
        "homepage" => ComponentEdit::Homepage(value),
        _ => return Err(SbomEnrichError::unknown_field("primary component", field)),
    };
    Ok(edit)
}

/// Write a scalar: overwrite always, append only into an empty slot.
fn set_scalar<T>(slot: &mut Option<T>, value: T, mode: ApplyMode) {
    if mode == ApplyMode::Overwrite || slot.is_none() {
        *slot = Some(value);
    }
}

/// Push onto a list; the first overwrite of a list in one patch clears it.
fn push_list<T>(
    list: &mut Vec<T>,
    value: T,
    mode: ApplyMode,
    cleared: &mut HashSet<&'static str>,
    key: &'static str,
) {
    if mode == ApplyMode::Overwrite && cleared.insert(key) {
        list.clear();
    }
    list.push(value);
}

fn set_license(slot: &mut Option<LicenseExpression>, value: LicenseExpression, mode: ApplyMode) {
    let empty = slot.as_ref().map_or(true, LicenseExpression::is_unknown);
    if mode == ApplyMode::Overwrite || empty {
        *slot = Some(value);
    }
}

fn apply_document_edits(meta: &mut DocumentMetadata, edits: Vec<DocumentEdit>, mode: ApplyMode) {
    let mut cleared = HashSet::new();
    for edit in edits {
        match edit {
            DocumentEdit::Author(a) => push_list(&mut meta.authors, a, mode, &mut cleared, "author"),
            DocumentEdit::Tool(t) => push_list(&mut meta.tools, t, mode, &mut cleared, "tool"),
            DocumentEdit::Supplier(s) => set_scalar(&mut meta.supplier, s, mode),
            DocumentEdit::License(l) => set_license(&mut meta.license, l, mode),
            DocumentEdit::Repository(r) => set_scalar(&mut meta.repository_url, r, mode),
            DocumentEdit::Lifecycle(l) => set_scalar(&mut meta.lifecycle, l, mode),
            DocumentEdit::Timestamp(t) => set_scalar(&mut meta.timestamp, t, mode),
        }
    }
}

fn apply_component_edits(comp: &mut Component, edits: Vec<ComponentEdit>, mode: ApplyMode) {
    let mut cleared = HashSet::new();
    for edit in edits {
        match edit {
            ComponentEdit::Author(a) => push_list(&mut comp.authors, a, mode, &mut cleared, "author"),
            ComponentEdit::Purl(p) => {
                push_list(&mut comp.identifiers.purls, p, mode, &mut cleared, "purl");
            }
            ComponentEdit::Cpe(c) => {
                push_list(&mut comp.identifiers.cpes, c, mode, &mut cleared, "cpe");
            }
            ComponentEdit::Name(n) => {
                if mode == ApplyMode::Overwrite || comp.name.is_empty() {
                    comp.name = n;
                }
            }
            ComponentEdit::Version(v) => set_scalar(&mut comp.version, v, mode),
            ComponentEdit::Type(t) => {
                // The type slot is never empty, so append leaves it alone
                if mode == ApplyMode::Overwrite {
                    comp.component_type = t;
                }
            }
            ComponentEdit::Supplier(s) => set_scalar(&mut comp.supplier, s, mode),
            ComponentEdit::License(l) => set_license(&mut comp.license, l, mode),
            ComponentEdit::Description(d) => set_scalar(&mut comp.description, d, mode),
            ComponentEdit::Repository(r) => set_scalar(&mut comp.repository_url, r, mode),
            ComponentEdit::Homepage(h) => set_scalar(&mut comp.homepage, h, mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaFamily;

    fn doc_with_primary() -> Document {
        let mut doc = Document::new(SchemaFamily::CycloneDx, "1.6");
        doc.add_component(Component::new("app", "app").with_version("1.0.0"))
            .unwrap();
        doc.add_component(Component::new("lib", "lib").with_version("2.0.0"))
            .unwrap();
        doc.set_primary_component("app".into()).unwrap();
        doc
    }

    #[test]
    fn test_append_author_twice_gives_two_entries() {
        let mut doc = doc_with_primary();
        let patch = MetadataPatch::append(PatchSubject::PrimaryComponent).with_field("author", "Jane");
        apply(&mut doc, &patch).unwrap();
        apply(&mut doc, &patch).unwrap();
        assert_eq!(doc.primary_component().unwrap().authors, vec!["Jane", "Jane"]);
    }

    #[test]
    fn test_overwrite_license_twice_gives_one_value() {
        let mut doc = doc_with_primary();
        let patch =
            MetadataPatch::overwrite(PatchSubject::PrimaryComponent).with_field("license", "MIT");
        apply(&mut doc, &patch).unwrap();
        let once = doc.clone();
        apply(&mut doc, &patch).unwrap();
        assert_eq!(doc, once);
        assert_eq!(
            doc.primary_component().unwrap().license,
            Some(LicenseExpression::new("MIT"))
        );
    }

    #[test]
    fn test_append_fills_only_empty_scalars() {
        let mut doc = doc_with_primary();
        let patch = MetadataPatch::append(PatchSubject::PrimaryComponent)
            .with_field("version", "9.9.9")
            .with_field("description", "An app");
        apply(&mut doc, &patch).unwrap();
        let primary = doc.primary_component().unwrap();
        assert_eq!(primary.version.as_deref(), Some("1.0.0"));
        assert_eq!(primary.description.as_deref(), Some("An app"));
    }

    #[test]
    fn test_overwrite_list_replaces() {
        let mut doc = doc_with_primary();
        apply(
            &mut doc,
            &MetadataPatch::append(PatchSubject::Document)
                .with_field("author", "A")
                .with_field("author", "B"),
        )
        .unwrap();
        apply(
            &mut doc,
            &MetadataPatch::overwrite(PatchSubject::Document)
                .with_field("author", "C <c@example.com>")
                .with_field("author", "D"),
        )
        .unwrap();
        let names: Vec<_> = doc.metadata.authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["C", "D"]);
        assert_eq!(doc.metadata.authors[0].email.as_deref(), Some("c@example.com"));
    }

    #[test]
    fn test_unknown_field_leaves_document_untouched() {
        let mut doc = doc_with_primary();
        let before = doc.clone();
        let patch = MetadataPatch::overwrite(PatchSubject::Document)
            .with_field("license", "MIT")
            .with_field("colour", "blue");
        let err = apply(&mut doc, &patch).unwrap_err();
        assert!(matches!(err, SbomEnrichError::UnknownField { .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_no_primary_component() {
        let mut doc = Document::new(SchemaFamily::Spdx, "SPDX-2.3");
        let patch =
            MetadataPatch::overwrite(PatchSubject::PrimaryComponent).with_field("name", "x");
        assert!(matches!(
            apply(&mut doc, &patch),
            Err(SbomEnrichError::NoPrimaryComponent)
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut doc = doc_with_primary();
        for (field, value) in [("timestamp", "yesterday"), ("purl", "lodash"), ("cpe", "x")] {
            let subject = if field == "timestamp" {
                PatchSubject::Document
            } else {
                PatchSubject::PrimaryComponent
            };
            let patch = MetadataPatch::overwrite(subject).with_field(field, value);
            assert!(matches!(
                apply(&mut doc, &patch),
                Err(SbomEnrichError::InvalidFieldValue { .. })
            ));
        }
    }

    #[test]
    fn test_rename_into_existing_identity_rejected() {
        let mut doc = doc_with_primary();
        let patch = MetadataPatch::overwrite(PatchSubject::PrimaryComponent)
            .with_field("name", "lib")
            .with_field("version", "2.0.0");
        assert!(apply(&mut doc, &patch).is_err());
        assert_eq!(doc.primary_component().unwrap().name, "app");
    }

    #[test]
    fn test_apply_all_continues_after_failure() {
        let mut doc = doc_with_primary();
        let patches = vec![
            MetadataPatch::overwrite(PatchSubject::Document).with_field("bogus", "x"),
            MetadataPatch::overwrite(PatchSubject::Document).with_field("supplier", "Acme"),
        ];
        let failures = apply_all(&mut doc, &patches);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 0);
        assert_eq!(doc.metadata.supplier.as_ref().map(|s| s.name.as_str()), Some("Acme"));
    }
}
