//! SPDX 2.x JSON codec.

use super::traits::{extract_json_string, FormatConfidence, FormatDetection, SchemaParser};
use crate::error::{ErrorContext, Result, SbomEnrichError, SchemaErrorKind, StructuralErrorKind};
use crate::model::{
    Author, Component, ComponentId, ComponentType, Document, EntityRef, Hash, HashAlgorithm,
    LicenseExpression, Organization, Relationship, RelationshipKind, SchemaFamily, Tool,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const SUPPORTED_VERSIONS: &[&str] = &["SPDX-2.2", "SPDX-2.3"];
const DOCUMENT_ID: &str = "SPDXRef-DOCUMENT";
const NOASSERTION: &str = "NOASSERTION";

/// Package purposes SPDX 2.3 defines beyond the CycloneDX-style types
const EXTRA_PURPOSES: &[&str] = &["source", "archive", "install", "other"];

/// Codec for SPDX JSON documents
#[derive(Debug, Default, Clone, Copy)]
pub struct SpdxParser;

impl SpdxParser {
    /// Create a new SPDX parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Convert a decoded SPDX document into a document
    fn convert_to_document(&self, spdx: SpdxDocument) -> Result<Document> {
        let spdx_version = spdx
            .spdx_version
            .ok_or_else(|| SbomEnrichError::missing_field("spdxVersion", "SPDX document"))?;
        let doc_id = spdx
            .spdx_id
            .ok_or_else(|| SbomEnrichError::missing_field("SPDXID", "SPDX document"))?;
        if !spdx_version.starts_with("SPDX-2.") {
            return Err(SbomEnrichError::schema(
                "reading spdxVersion",
                SchemaErrorKind::UnsupportedVersion {
                    version: spdx_version,
                    supported: SUPPORTED_VERSIONS.join(", "),
                },
            ));
        }
        let packages = spdx
            .packages
            .ok_or_else(|| SbomEnrichError::missing_field("packages", "SPDX document"))?;

        let mut doc = Document::new(SchemaFamily::Spdx, spdx_version);
        doc.serial_number = spdx.document_namespace;
        doc.name = spdx.name;
        doc.metadata.license = LicenseExpression::from_declared(spdx.data_license.as_deref());

        if let Some(info) = spdx.creation_info {
            doc.metadata.timestamp = info.created.as_deref().and_then(parse_timestamp);
            for creator in info.creators.unwrap_or_default() {
                self.apply_creator(&mut doc, &creator);
            }
        }

        for (idx, pkg) in packages.into_iter().enumerate() {
            let comp = convert_package(pkg).with_context(|| format!("package {idx}"))?;
            doc.add_component(comp)
                .with_context(|| format!("package {idx}"))?;
        }

        let mut primary_set = false;
        for rel in spdx.relationships.unwrap_or_default() {
            if is_unset(&rel.related_spdx_element) {
                tracing::debug!(
                    "Skipping {} relationship to {}",
                    rel.relationship_type,
                    rel.related_spdx_element
                );
                continue;
            }
            let from_is_doc = rel.spdx_element_id == doc_id;
            let related_is_doc = rel.related_spdx_element == doc_id;

            if !primary_set {
                let described = match rel.relationship_type.as_str() {
                    "DESCRIBES" if from_is_doc => Some(&rel.related_spdx_element),
                    "DESCRIBED_BY" if related_is_doc => Some(&rel.spdx_element_id),
                    _ => None,
                };
                if let Some(described) = described {
                    doc.set_primary_component(ComponentId::new(described.clone()))
                        .context("DESCRIBES relationship")?;
                    primary_set = true;
                    continue;
                }
            }

            let (from, to, kind) = convert_relationship(rel);
            if to == doc_id {
                tracing::debug!("Relationship {} targets the document itself, dropping", kind);
                continue;
            }
            let from = if from == doc_id {
                EntityRef::Document
            } else {
                EntityRef::Component(ComponentId::new(from))
            };
            doc.add_relationship(Relationship {
                from,
                to: ComponentId::new(to),
                kind,
            })?;
        }

        if !primary_set {
            if let Some(first) = spdx.document_describes.and_then(|d| d.into_iter().next()) {
                doc.set_primary_component(ComponentId::new(first))
                    .context("documentDescribes")?;
            }
        }

        Ok(doc)
    }

    /// Interpret one `creationInfo.creators` entry
    fn apply_creator(&self, doc: &mut Document, creator: &str) {
        if let Some(person) = creator.strip_prefix("Person:") {
            let (name, email) = split_party(person);
            doc.metadata.authors.push(Author { name, email });
        } else if let Some(org) = creator.strip_prefix("Organization:") {
            let (name, _) = split_party(org);
            if doc.metadata.supplier.is_none() {
                doc.metadata.supplier = Some(Organization::new(name));
            } else {
                tracing::debug!("Additional organization creator '{}' ignored", name);
            }
        } else if let Some(tool) = creator.strip_prefix("Tool:") {
            doc.metadata.tools.push(split_tool(tool.trim()));
        } else {
            tracing::debug!("Unrecognized creator '{}'", creator);
        }
    }

    /// Convert a document into the SPDX wire structure
    fn convert_from_document(&self, doc: &Document) -> Result<SpdxDocument> {
        let spdx_version = if doc.schema == SchemaFamily::Spdx {
            doc.spec_version.clone()
        } else {
            SchemaFamily::Spdx.default_spec_version().to_string()
        };

        if doc.metadata.repository_url.is_some() {
            tracing::debug!("SPDX has no document repository, dropping it");
        }
        if let Some(lifecycle) = &doc.metadata.lifecycle {
            tracing::debug!("SPDX has no lifecycle, dropping '{}'", lifecycle);
        }

        let mut creators: Vec<String> = doc
            .metadata
            .authors
            .iter()
            .map(|a| match &a.email {
                Some(email) => format!("Person: {} ({email})", a.name),
                None => format!("Person: {}", a.name),
            })
            .collect();
        if let Some(supplier) = &doc.metadata.supplier {
            if !supplier.urls.is_empty() {
                tracing::debug!("SPDX creators carry no URLs, dropping supplier URLs");
            }
            creators.push(format!("Organization: {}", supplier.name));
        }
        creators.extend(doc.metadata.tools.iter().map(|t| match &t.version {
            Some(version) => format!("Tool: {}-{version}", t.name),
            None => format!("Tool: {}", t.name),
        }));

        let creation_info = (doc.metadata.timestamp.is_some() || !creators.is_empty()).then(|| {
            SpdxCreationInfo {
                created: doc
                    .metadata
                    .timestamp
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                creators: Some(creators),
            }
        });

        let mut seen = HashSet::new();
        let mut packages = Vec::with_capacity(doc.component_count());
        for comp in doc.components() {
            let spdx_id = comp.id.to_spdx_id();
            if !seen.insert(spdx_id.clone()) {
                return Err(SbomEnrichError::structural(
                    "deriving SPDX identifiers",
                    StructuralErrorKind::DuplicateReference(spdx_id),
                ));
            }
            packages.push(package_from_component(comp, spdx_id));
        }

        let mut relationships = Vec::new();
        if let Some(primary) = doc.primary_component_id() {
            relationships.push(SpdxRelationship {
                spdx_element_id: DOCUMENT_ID.to_string(),
                relationship_type: "DESCRIBES".to_string(),
                related_spdx_element: primary.to_spdx_id(),
            });
        }
        relationships.extend(doc.relationships().iter().map(relationship_to_spdx));

        Ok(SpdxDocument {
            spdx_version: Some(spdx_version),
            data_license: doc
                .metadata
                .license
                .as_ref()
                .filter(|l| !l.is_unknown())
                .map(|l| l.expression.clone()),
            spdx_id: Some(DOCUMENT_ID.to_string()),
            name: doc.name.clone(),
            document_namespace: doc.serial_number.clone(),
            creation_info,
            packages: Some(packages),
            relationships: (!relationships.is_empty()).then_some(relationships),
            document_describes: None,
        })
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Ignoring unparsable creation time '{}': {}", value, e);
            None
        }
    }
}

fn is_unset(value: &str) -> bool {
    value.trim().is_empty() || value == NOASSERTION || value == "NONE"
}

fn non_assertion(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_unset(v))
}

/// Split `Name (email)` into its parts.
fn split_party(value: &str) -> (String, Option<String>) {
    let value = value.trim();
    if let (Some(open), true) = (value.rfind('('), value.ends_with(')')) {
        let email = value[open + 1..value.len() - 1].trim();
        return (
            value[..open].trim().to_string(),
            (!email.is_empty()).then(|| email.to_string()),
        );
    }
    (value.to_string(), None)
}

/// Split `name-version` at the last hyphen followed by a digit.
fn split_tool(value: &str) -> Tool {
    let split = value
        .char_indices()
        .rev()
        .find(|&(i, c)| c == '-' && value[i + 1..].starts_with(|n: char| n.is_ascii_digit()));
    match split {
        Some((i, _)) if i > 0 => Tool {
            name: value[..i].to_string(),
            version: Some(value[i + 1..].to_string()),
        },
        _ => Tool {
            name: value.to_string(),
            version: None,
        },
    }
}

/// Supplier or originator value without its `Organization:`/`Person:` prefix.
fn party_name(value: &str) -> Option<String> {
    if is_unset(value) {
        return None;
    }
    let stripped = value
        .strip_prefix("Organization:")
        .or_else(|| value.strip_prefix("Person:"))
        .unwrap_or(value);
    let (name, _) = split_party(stripped);
    (!name.is_empty()).then_some(name)
}

fn convert_package(pkg: SpdxPackage) -> Result<Component> {
    let spdx_id = pkg
        .spdx_id
        .ok_or_else(|| SbomEnrichError::missing_field("SPDXID", "SPDX package"))?;
    let name = pkg
        .name
        .ok_or_else(|| SbomEnrichError::missing_field("name", "SPDX package"))?;

    let mut comp = Component::new(name, spdx_id);
    comp.version = pkg.version_info;
    comp.component_type = pkg
        .primary_package_purpose
        .as_deref()
        .map_or_else(ComponentType::default, ComponentType::from_name);

    for ext_ref in pkg.external_refs.unwrap_or_default() {
        let category = ext_ref.reference_category.replace('_', "-");
        match (category.as_str(), ext_ref.reference_type.as_str()) {
            ("PACKAGE-MANAGER", "purl") => comp.identifiers.purls.push(ext_ref.reference_locator),
            ("SECURITY", "cpe23Type" | "cpe22Type") => {
                comp.identifiers.cpes.push(ext_ref.reference_locator);
            }
            (category, ref_type) => {
                tracing::debug!("Ignoring external ref {}/{}", category, ref_type);
            }
        }
    }

    comp.license = LicenseExpression::from_declared(pkg.license_declared.as_deref());
    comp.supplier = pkg
        .supplier
        .as_deref()
        .and_then(party_name)
        .map(Organization::new);
    comp.authors = pkg.originator.as_deref().and_then(party_name).into_iter().collect();
    comp.description = pkg.description;
    comp.homepage = non_assertion(pkg.homepage);
    comp.repository_url = non_assertion(pkg.download_location);
    comp.hashes = pkg
        .checksums
        .unwrap_or_default()
        .into_iter()
        .map(|c| Hash::new(HashAlgorithm::parse(&c.algorithm), c.checksum_value))
        .collect();

    Ok(comp)
}

fn purpose_for(component_type: &ComponentType) -> String {
    match component_type {
        ComponentType::Other(name) if EXTRA_PURPOSES.contains(&name.as_str()) => {
            name.to_uppercase()
        }
        ComponentType::Other(name) => {
            tracing::debug!("SPDX has no purpose '{}', writing OTHER", name);
            "OTHER".to_string()
        }
        known => known.to_string().to_uppercase(),
    }
}

fn package_from_component(comp: &Component, spdx_id: String) -> SpdxPackage {
    if comp.authors.len() > 1 {
        tracing::debug!(
            "SPDX originator holds one party, dropping {} authors of '{}'",
            comp.authors.len() - 1,
            comp.id
        );
    }
    if comp.supplier.as_ref().is_some_and(|s| !s.urls.is_empty()) {
        tracing::debug!("SPDX supplier carries no URLs, dropping them for '{}'", comp.id);
    }

    let mut external_refs: Vec<SpdxExternalRef> = comp
        .identifiers
        .purls
        .iter()
        .map(|purl| SpdxExternalRef {
            reference_category: "PACKAGE-MANAGER".to_string(),
            reference_type: "purl".to_string(),
            reference_locator: purl.clone(),
        })
        .collect();
    external_refs.extend(comp.identifiers.cpes.iter().map(|cpe| SpdxExternalRef {
        reference_category: "SECURITY".to_string(),
        reference_type: if cpe.starts_with("cpe:2.3:") {
            "cpe23Type"
        } else {
            "cpe22Type"
        }
        .to_string(),
        reference_locator: cpe.clone(),
    }));

    SpdxPackage {
        spdx_id: Some(spdx_id),
        name: Some(comp.name.clone()),
        version_info: comp.version.clone(),
        primary_package_purpose: Some(purpose_for(&comp.component_type)),
        supplier: comp
            .supplier
            .as_ref()
            .map(|s| format!("Organization: {}", s.name)),
        originator: comp.authors.first().map(|a| format!("Person: {a}")),
        download_location: Some(
            comp.repository_url
                .clone()
                .unwrap_or_else(|| NOASSERTION.to_string()),
        ),
        files_analyzed: Some(false),
        license_declared: Some(
            comp.license
                .as_ref()
                .filter(|l| !l.is_unknown())
                .map_or_else(|| NOASSERTION.to_string(), |l| l.expression.clone()),
        ),
        license_concluded: Some(NOASSERTION.to_string()),
        description: comp.description.clone(),
        homepage: comp.homepage.clone(),
        checksums: (!comp.hashes.is_empty()).then(|| {
            comp.hashes
                .iter()
                .map(|h| SpdxChecksum {
                    algorithm: h.algorithm.spdx_name(),
                    checksum_value: h.value.clone(),
                })
                .collect()
        }),
        external_refs: (!external_refs.is_empty()).then_some(external_refs),
    }
}

/// Normalize an SPDX relationship into (from, to, kind).
fn convert_relationship(rel: SpdxRelationship) -> (String, String, RelationshipKind) {
    let SpdxRelationship {
        spdx_element_id: element,
        relationship_type,
        related_spdx_element: related,
    } = rel;
    match relationship_type.as_str() {
        "DEPENDS_ON" => (element, related, RelationshipKind::DependsOn),
        "DEPENDENCY_OF" => (related, element, RelationshipKind::DependsOn),
        "DEV_DEPENDENCY_OF" => (related, element, RelationshipKind::DevDependsOn),
        "CONTAINS" => (element, related, RelationshipKind::Contains),
        "CONTAINED_BY" => (related, element, RelationshipKind::Contains),
        "DESCRIBES" => (element, related, RelationshipKind::Describes),
        "DESCRIBED_BY" => (related, element, RelationshipKind::Describes),
        _ => (element, related, RelationshipKind::Other(relationship_type)),
    }
}

fn relationship_to_spdx(rel: &Relationship) -> SpdxRelationship {
    let from = match &rel.from {
        EntityRef::Document => DOCUMENT_ID.to_string(),
        EntityRef::Component(id) => id.to_spdx_id(),
    };
    let to = rel.to.to_spdx_id();
    let (element, relationship_type, related) = match &rel.kind {
        RelationshipKind::DependsOn => (from, "DEPENDS_ON".to_string(), to),
        RelationshipKind::DevDependsOn => (to, "DEV_DEPENDENCY_OF".to_string(), from),
        RelationshipKind::Contains => (from, "CONTAINS".to_string(), to),
        RelationshipKind::Describes => (from, "DESCRIBES".to_string(), to),
        RelationshipKind::Other(kind) => (from, kind.clone(), to),
    };
    SpdxRelationship {
        spdx_element_id: element,
        relationship_type,
        related_spdx_element: related,
    }
}

impl SchemaParser for SpdxParser {
    fn family(&self) -> SchemaFamily {
        SchemaFamily::Spdx
    }

    fn parse_str(&self, content: &str) -> Result<Document> {
        let spdx: SpdxDocument = serde_json::from_str(content).context("decoding SPDX")?;
        self.convert_to_document(spdx)
    }

    fn serialize(&self, document: &Document) -> Result<Vec<u8>> {
        document.validate().context("serializing SPDX")?;
        let spdx = self.convert_from_document(document)?;
        Ok(serde_json::to_vec_pretty(&spdx)?)
    }

    fn supported_versions(&self) -> &'static [&'static str] {
        SUPPORTED_VERSIONS
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let trimmed = content.trim();
        if !trimmed.starts_with('{') {
            return FormatDetection::no_match();
        }

        let has_spdx_version = content.contains("\"spdxVersion\"");
        let has_spdx_id = content.contains("\"SPDXID\"");
        let has_data_license = content.contains("\"dataLicense\"");
        let has_packages = content.contains("\"packages\"");
        let version = extract_json_string(content, "spdxVersion");

        if has_spdx_version && has_spdx_id {
            FormatDetection::with_confidence(FormatConfidence::CERTAIN).version(version)
        } else if has_spdx_version || (has_spdx_id && has_data_license) {
            FormatDetection::with_confidence(FormatConfidence::HIGH).version(version)
        } else if has_packages && has_data_license {
            FormatDetection::with_confidence(FormatConfidence::MEDIUM)
                .warning("Missing spdxVersion field")
        } else {
            FormatDetection::no_match()
        }
    }
}

// SPDX JSON structures, shared by decoding and encoding

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    spdx_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_license: Option<String>,
    #[serde(rename = "SPDXID", skip_serializing_if = "Option::is_none")]
    spdx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creation_info: Option<SpdxCreationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packages: Option<Vec<SpdxPackage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relationships: Option<Vec<SpdxRelationship>>,
    /// Pre-2.3 way of naming the described packages
    #[serde(skip_serializing_if = "Option::is_none")]
    document_describes: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxCreationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creators: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxPackage {
    #[serde(rename = "SPDXID", skip_serializing_if = "Option::is_none")]
    spdx_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_package_purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    originator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files_analyzed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license_declared: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license_concluded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksums: Option<Vec<SpdxChecksum>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_refs: Option<Vec<SpdxExternalRef>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxChecksum {
    algorithm: String,
    checksum_value: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxExternalRef {
    reference_category: String,
    reference_type: String,
    reference_locator: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpdxRelationship {
    spdx_element_id: String,
    relationship_type: String,
    related_spdx_element: String,
}
