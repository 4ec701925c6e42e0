//! CycloneDX JSON codec.
//!
//! Supports CycloneDX versions 1.4, 1.5, and 1.6. Fields the model holds but
//! CycloneDX cannot express are dropped on output with a debug log line.

use super::traits::{extract_json_string, FormatConfidence, FormatDetection, SchemaParser};
use crate::error::{ErrorContext, Result, SbomEnrichError, SchemaErrorKind};
use crate::model::{
    Author, Component, ComponentId, ComponentType, Document, DocumentMetadata, EntityRef, Hash,
    HashAlgorithm, LicenseExpression, Lifecycle, Organization, Relationship, RelationshipKind,
    SchemaFamily, Tool,
};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const SUPPORTED_VERSIONS: &[&str] = &["1.4", "1.5", "1.6"];

/// Codec for CycloneDX JSON documents
#[derive(Debug, Default, Clone, Copy)]
pub struct CycloneDxParser;

impl CycloneDxParser {
    /// Create a new CycloneDX parser
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Convert a decoded BOM into a document
    fn convert_to_document(&self, cdx: CycloneDxBom) -> Result<Document> {
        if let Some(format) = &cdx.bom_format {
            if format != "CycloneDX" {
                return Err(SbomEnrichError::schema(
                    "reading bomFormat",
                    SchemaErrorKind::FamilyMismatch {
                        expected: "CycloneDX".to_string(),
                        reason: format!("bomFormat is '{format}'"),
                    },
                ));
            }
        }
        let spec_version = cdx
            .spec_version
            .ok_or_else(|| SbomEnrichError::missing_field("specVersion", "CycloneDX document"))?;
        check_version(&spec_version)?;
        let components = cdx
            .components
            .ok_or_else(|| SbomEnrichError::missing_field("components", "CycloneDX document"))?;

        let mut doc = Document::new(SchemaFamily::CycloneDx, spec_version);
        doc.serial_number = cdx.serial_number;

        let mut primary = None;
        if let Some(meta) = cdx.metadata {
            let (metadata, meta_component) = convert_metadata(meta);
            doc.metadata = metadata;
            if let Some(meta_component) = meta_component {
                let comp = convert_component(meta_component).context("metadata.component")?;
                primary = Some(comp.id.clone());
                doc.add_component(comp).context("metadata.component")?;
            }
        }
        doc.metadata.repository_url = find_reference(cdx.external_references.as_deref(), "vcs");

        for (idx, cdx_comp) in components.into_iter().enumerate() {
            let comp = convert_component(cdx_comp).with_context(|| format!("component {idx}"))?;
            if primary.as_ref() == Some(&comp.id) {
                tracing::debug!("Component '{}' repeats metadata.component, skipping", comp.id);
                continue;
            }
            doc.add_component(comp)
                .with_context(|| format!("component {idx}"))?;
        }

        if let Some(primary) = primary {
            doc.set_primary_component(primary)?;
        }

        for dep in cdx.dependencies.unwrap_or_default() {
            let from = ComponentId::new(dep.ref_field);
            if doc.component(&from).is_none() {
                return Err(SbomEnrichError::dangling(from.value()));
            }
            for to in dep.depends_on.unwrap_or_default() {
                doc.add_relationship(Relationship::between(
                    from.clone(),
                    to.into(),
                    RelationshipKind::DependsOn,
                ))
                .with_context(|| format!("dependencies of '{from}'"))?;
            }
        }

        Ok(doc)
    }

    /// Convert a document into the CycloneDX wire structure
    fn convert_from_document(&self, doc: &Document) -> CycloneDxBom {
        let spec_version = if doc.schema == SchemaFamily::CycloneDx {
            doc.spec_version.clone()
        } else {
            SchemaFamily::CycloneDx.default_spec_version().to_string()
        };
        let minor = minor_version(&spec_version);

        if let Some(name) = &doc.name {
            tracing::debug!("CycloneDX has no document name, dropping '{}'", name);
        }

        let primary_id = doc.primary_component_id();
        let meta_component = doc
            .primary_component()
            .map(|c| component_to_cdx(c, minor));
        let metadata = metadata_to_cdx(&doc.metadata, meta_component, minor);

        let components = doc
            .components()
            .filter(|c| Some(&c.id) != primary_id)
            .map(|c| component_to_cdx(c, minor))
            .collect();

        CycloneDxBom {
            bom_format: Some("CycloneDX".to_string()),
            spec_version: Some(spec_version),
            serial_number: doc.serial_number.clone(),
            version: Some(1),
            metadata,
            components: Some(components),
            dependencies: dependencies_to_cdx(doc.relationships()),
            external_references: doc.metadata.repository_url.as_ref().map(|url| {
                vec![CdxExternalReference {
                    ref_type: "vcs".to_string(),
                    url: url.clone(),
                    comment: None,
                }]
            }),
        }
    }
}

/// Accept every 1.x version, warning on versions outside the tested set.
fn check_version(version: &str) -> Result<()> {
    if !version.starts_with("1.") {
        return Err(SbomEnrichError::schema(
            "reading specVersion",
            SchemaErrorKind::UnsupportedVersion {
                version: version.to_string(),
                supported: SUPPORTED_VERSIONS.join(", "),
            },
        ));
    }
    if !SUPPORTED_VERSIONS.contains(&version) {
        tracing::warn!("CycloneDX {} is untested, decoding as 1.x", version);
    }
    Ok(())
}

fn minor_version(version: &str) -> u32 {
    version
        .split('.')
        .nth(1)
        .and_then(|m| m.parse().ok())
        .unwrap_or(6)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Ignoring unparsable timestamp '{}': {}", value, e);
            None
        }
    }
}

fn find_reference(refs: Option<&[CdxExternalReference]>, ref_type: &str) -> Option<String> {
    refs?
        .iter()
        .find(|r| r.ref_type == ref_type)
        .map(|r| r.url.clone())
}

fn convert_metadata(meta: CdxMetadata) -> (DocumentMetadata, Option<CdxComponent>) {
    let tools = match meta.tools {
        Some(CdxTools::List(tools)) => tools,
        Some(CdxTools::Object(obj)) => obj
            .components
            .unwrap_or_default()
            .into_iter()
            .chain(obj.services.unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };

    let metadata = DocumentMetadata {
        authors: meta
            .authors
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| {
                a.name.map(|name| Author {
                    name,
                    email: a.email,
                })
            })
            .collect(),
        supplier: meta.supplier.and_then(convert_organization),
        license: meta.licenses.and_then(convert_licenses),
        repository_url: None,
        lifecycle: meta
            .lifecycles
            .and_then(|l| l.into_iter().next())
            .and_then(|l| match (l.phase, l.name) {
                (Some(phase), _) => Some(Lifecycle::from_phase(&phase)),
                (None, Some(name)) => Some(Lifecycle::Other(name)),
                (None, None) => None,
            }),
        timestamp: meta.timestamp.as_deref().and_then(parse_timestamp),
        tools: tools
            .into_iter()
            .filter_map(|t| {
                t.name.map(|name| Tool {
                    name,
                    version: t.version,
                })
            })
            .collect(),
    };
    (metadata, meta.component)
}

fn convert_organization(org: CdxOrganization) -> Option<Organization> {
    org.name.map(|name| Organization {
        name,
        urls: org.url.unwrap_or_default(),
    })
}

/// Fold license choices into one expression; several choices are conjoined.
fn convert_licenses(choices: Vec<CdxLicenseChoice>) -> Option<LicenseExpression> {
    let parts: Vec<String> = choices
        .into_iter()
        .filter_map(|c| {
            c.expression
                .or_else(|| c.license.and_then(|l| l.id.or(l.name)))
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    match parts.as_slice() {
        [] => None,
        [single] => LicenseExpression::from_declared(Some(single.as_str())),
        many => {
            let joined = many
                .iter()
                .map(|p| if p.contains(' ') { format!("({p})") } else { p.clone() })
                .collect::<Vec<_>>()
                .join(" AND ");
            LicenseExpression::from_declared(Some(joined.as_str()))
        }
    }
}

fn convert_component(cdx: CdxComponent) -> Result<Component> {
    let name = cdx
        .name
        .ok_or_else(|| SbomEnrichError::missing_field("name", "CycloneDX component"))?;
    let id = cdx
        .bom_ref
        .or_else(|| cdx.purl.clone())
        .unwrap_or_else(|| match &cdx.version {
            Some(v) => format!("{name}@{v}"),
            None => name.clone(),
        });

    let mut comp = Component::new(name, id);
    comp.version = cdx.version;
    comp.component_type = cdx
        .component_type
        .as_deref()
        .map_or_else(ComponentType::default, ComponentType::from_name);
    comp.identifiers.purls.extend(cdx.purl);
    comp.identifiers.cpes.extend(cdx.cpe);
    comp.license = cdx.licenses.and_then(convert_licenses);
    comp.supplier = cdx.supplier.and_then(convert_organization);
    comp.authors = match (cdx.authors, cdx.author) {
        (Some(authors), _) => authors.into_iter().filter_map(|a| a.name).collect(),
        (None, Some(legacy)) => legacy
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        (None, None) => Vec::new(),
    };
    comp.description = cdx.description;
    comp.homepage = find_reference(cdx.external_references.as_deref(), "website");
    comp.repository_url = find_reference(cdx.external_references.as_deref(), "vcs");
    comp.hashes = cdx
        .hashes
        .unwrap_or_default()
        .into_iter()
        .map(|h| Hash::new(HashAlgorithm::parse(&h.alg), h.content))
        .collect();

    Ok(comp)
}

fn metadata_to_cdx(
    meta: &DocumentMetadata,
    component: Option<CdxComponent>,
    minor: u32,
) -> Option<CdxMetadata> {
    let tools = if meta.tools.is_empty() {
        None
    } else {
        let tools: Vec<CdxTool> = meta
            .tools
            .iter()
            .map(|t| CdxTool {
                tool_type: (minor >= 5).then(|| "application".to_string()),
                name: Some(t.name.clone()),
                version: t.version.clone(),
            })
            .collect();
        if minor >= 5 {
            Some(CdxTools::Object(CdxToolsObject {
                components: Some(tools),
                services: None,
            }))
        } else {
            Some(CdxTools::List(tools))
        }
    };

    let lifecycles = match &meta.lifecycle {
        Some(lifecycle) if minor < 5 => {
            tracing::debug!("CycloneDX 1.{} has no lifecycles, dropping '{}'", minor, lifecycle);
            None
        }
        Some(lifecycle) => Some(vec![match lifecycle.phase() {
            Some(phase) => CdxLifecycle {
                phase: Some(phase.to_string()),
                name: None,
                description: None,
            },
            None => CdxLifecycle {
                phase: None,
                name: Some(lifecycle.to_string()),
                description: None,
            },
        }]),
        None => None,
    };

    let cdx = CdxMetadata {
        timestamp: meta
            .timestamp
            .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        tools,
        authors: (!meta.authors.is_empty()).then(|| {
            meta.authors
                .iter()
                .map(|a| CdxAuthor {
                    name: Some(a.name.clone()),
                    email: a.email.clone(),
                })
                .collect()
        }),
        component,
        supplier: meta.supplier.as_ref().map(organization_to_cdx),
        licenses: license_to_cdx(meta.license.as_ref()),
        lifecycles,
    };

    let empty = cdx.timestamp.is_none()
        && cdx.tools.is_none()
        && cdx.authors.is_none()
        && cdx.component.is_none()
        && cdx.supplier.is_none()
        && cdx.licenses.is_none()
        && cdx.lifecycles.is_none();
    (!empty).then_some(cdx)
}

fn organization_to_cdx(org: &Organization) -> CdxOrganization {
    CdxOrganization {
        name: Some(org.name.clone()),
        url: (!org.urls.is_empty()).then(|| org.urls.clone()),
    }
}

fn license_to_cdx(license: Option<&LicenseExpression>) -> Option<Vec<CdxLicenseChoice>> {
    let license = license.filter(|l| !l.is_unknown())?;
    Some(vec![CdxLicenseChoice {
        license: None,
        expression: Some(license.expression.clone()),
    }])
}

fn component_to_cdx(comp: &Component, minor: u32) -> CdxComponent {
    if comp.identifiers.purls.len() > 1 || comp.identifiers.cpes.len() > 1 {
        tracing::debug!(
            "CycloneDX holds one purl and one cpe, dropping extras on '{}'",
            comp.id
        );
    }

    let mut refs = Vec::new();
    if let Some(url) = &comp.homepage {
        refs.push(CdxExternalReference {
            ref_type: "website".to_string(),
            url: url.clone(),
            comment: None,
        });
    }
    if let Some(url) = &comp.repository_url {
        refs.push(CdxExternalReference {
            ref_type: "vcs".to_string(),
            url: url.clone(),
            comment: None,
        });
    }

    let (authors, author) = if comp.authors.is_empty() {
        (None, None)
    } else if minor >= 6 {
        let authors = comp
            .authors
            .iter()
            .map(|name| CdxAuthor {
                name: Some(name.clone()),
                email: None,
            })
            .collect();
        (Some(authors), None)
    } else {
        (None, Some(comp.authors.join(", ")))
    };

    CdxComponent {
        component_type: Some(comp.component_type.to_string()),
        bom_ref: Some(comp.id.value().to_string()),
        name: Some(comp.name.clone()),
        version: comp.version.clone(),
        purl: comp.identifiers.purls.first().cloned(),
        cpe: comp.identifiers.cpes.first().cloned(),
        description: comp.description.clone(),
        author,
        authors,
        licenses: license_to_cdx(comp.license.as_ref()),
        supplier: comp.supplier.as_ref().map(organization_to_cdx),
        hashes: (!comp.hashes.is_empty()).then(|| {
            comp.hashes
                .iter()
                .map(|h| CdxHash {
                    alg: h.algorithm.cyclonedx_name(),
                    content: h.value.clone(),
                })
                .collect()
        }),
        external_references: (!refs.is_empty()).then_some(refs),
    }
}

/// Group component-to-component dependency edges by their source, in first-seen order.
fn dependencies_to_cdx(relationships: &[Relationship]) -> Option<Vec<CdxDependency>> {
    let mut grouped: IndexMap<&str, Vec<String>> = IndexMap::new();
    for rel in relationships {
        match (&rel.from, &rel.kind) {
            (EntityRef::Component(from), RelationshipKind::DependsOn) => grouped
                .entry(from.value())
                .or_default()
                .push(rel.to.value().to_string()),
            (from, kind) => {
                tracing::debug!(
                    "CycloneDX dependencies hold component depends-on edges only, dropping {:?} {} {}",
                    from,
                    kind,
                    rel.to
                );
            }
        }
    }
    if grouped.is_empty() {
        return None;
    }
    Some(
        grouped
            .into_iter()
            .map(|(from, depends_on)| CdxDependency {
                ref_field: from.to_string(),
                depends_on: Some(depends_on),
            })
            .collect(),
    )
}

impl SchemaParser for CycloneDxParser {
    fn family(&self) -> SchemaFamily {
        SchemaFamily::CycloneDx
    }

    fn parse_str(&self, content: &str) -> Result<Document> {
        let cdx: CycloneDxBom = serde_json::from_str(content).context("decoding CycloneDX")?;
        self.convert_to_document(cdx)
    }

    fn serialize(&self, document: &Document) -> Result<Vec<u8>> {
        document.validate().context("serializing CycloneDX")?;
        let bom = self.convert_from_document(document);
        Ok(serde_json::to_vec_pretty(&bom)?)
    }

    fn supported_versions(&self) -> &'static [&'static str] {
        SUPPORTED_VERSIONS
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let trimmed = content.trim();
        if !trimmed.starts_with('{') {
            return FormatDetection::no_match();
        }

        let has_bom_format = content.contains("\"bomFormat\"");
        let has_cyclonedx = content.contains("CycloneDX") || content.contains("cyclonedx");
        let has_spec_version = content.contains("\"specVersion\"");
        let has_schema = content.contains("\"$schema\"") && content.contains("cyclonedx");
        let version = extract_json_string(content, "specVersion");

        if has_bom_format && has_cyclonedx {
            FormatDetection::with_confidence(FormatConfidence::CERTAIN).version(version)
        } else if has_bom_format || has_schema {
            FormatDetection::with_confidence(FormatConfidence::HIGH).version(version)
        } else if has_spec_version && content.contains("\"components\"") {
            FormatDetection::with_confidence(FormatConfidence::MEDIUM)
                .version(version)
                .warning("Missing bomFormat field - might not be CycloneDX")
        } else if has_spec_version {
            FormatDetection::with_confidence(FormatConfidence::LOW)
                .version(version)
                .warning("Only specVersion marker found")
        } else {
            FormatDetection::no_match()
        }
    }
}

// CycloneDX JSON structures, shared by decoding and encoding

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CycloneDxBom {
    #[serde(skip_serializing_if = "Option::is_none")]
    bom_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<CdxMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    components: Option<Vec<CdxComponent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<Vec<CdxDependency>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_references: Option<Vec<CdxExternalReference>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CdxMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    /// Array in 1.4, object with components/services from 1.5 on
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<CdxTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authors: Option<Vec<CdxAuthor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<CdxComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplier: Option<CdxOrganization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    licenses: Option<Vec<CdxLicenseChoice>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lifecycles: Option<Vec<CdxLifecycle>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CdxTools {
    List(Vec<CdxTool>),
    Object(CdxToolsObject),
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxToolsObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    components: Option<Vec<CdxTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<Vec<CdxTool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxTool {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    tool_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxLifecycle {
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxAuthor {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CdxComponent {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    component_type: Option<String>,
    #[serde(rename = "bom-ref", alias = "bomRef", skip_serializing_if = "Option::is_none")]
    bom_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpe: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Legacy free-text author (before 1.6)
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authors: Option<Vec<CdxAuthor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    licenses: Option<Vec<CdxLicenseChoice>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplier: Option<CdxOrganization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hashes: Option<Vec<CdxHash>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_references: Option<Vec<CdxExternalReference>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxLicenseChoice {
    #[serde(skip_serializing_if = "Option::is_none")]
    license: Option<CdxLicense>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxLicense {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxOrganization {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxHash {
    alg: String,
    content: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CdxExternalReference {
    #[serde(rename = "type")]
    ref_type: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CdxDependency {
    #[serde(rename = "ref")]
    ref_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    depends_on: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructuralErrorKind;

    const MINIMAL: &str = r#"{
        "bomFormat": "CycloneDX",
        "specVersion": "1.5",
        "serialNumber": "urn:uuid:3e671687-395b-41f5-a30f-a58921a69b79",
        "metadata": {
            "timestamp": "2024-03-01T12:00:00Z",
            "tools": [{"vendor": "acme", "name": "syft", "version": "1.0.0"}],
            "authors": [{"name": "Jane Doe", "email": "jane@example.com"}],
            "component": {"type": "application", "bom-ref": "app", "name": "my-app", "version": "2.0.0"},
            "lifecycles": [{"phase": "build"}]
        },
        "components": [
            {
                "type": "library",
                "bom-ref": "pkg:npm/lodash@4.17.21",
                "name": "lodash",
                "version": "4.17.21",
                "purl": "pkg:npm/lodash@4.17.21",
                "licenses": [{"license": {"id": "MIT"}}],
                "hashes": [{"alg": "SHA-256", "content": "abc123"}],
                "externalReferences": [
                    {"type": "website", "url": "https://lodash.com"},
                    {"type": "vcs", "url": "https://github.com/lodash/lodash"}
                ]
            }
        ],
        "dependencies": [{"ref": "app", "dependsOn": ["pkg:npm/lodash@4.17.21"]}]
    }"#;

    #[test]
    fn test_parse_minimal() {
        let doc = CycloneDxParser::new().parse_str(MINIMAL).expect("parses");
        assert_eq!(doc.schema, SchemaFamily::CycloneDx);
        assert_eq!(doc.spec_version, "1.5");
        assert_eq!(doc.component_count(), 2);
        assert_eq!(doc.primary_component().map(|c| c.name.as_str()), Some("my-app"));
        assert_eq!(doc.metadata.tools[0].name, "syft");
        assert_eq!(doc.metadata.authors[0].email.as_deref(), Some("jane@example.com"));
        assert_eq!(doc.metadata.lifecycle, Some(Lifecycle::Build));
        assert!(doc.metadata.timestamp.is_some());

        let lodash = doc
            .component(&"pkg:npm/lodash@4.17.21".into())
            .expect("lodash present");
        assert_eq!(lodash.license.as_ref().map(|l| l.expression.as_str()), Some("MIT"));
        assert_eq!(lodash.homepage.as_deref(), Some("https://lodash.com"));
        assert_eq!(lodash.hashes[0].algorithm, HashAlgorithm::Sha256);
        assert_eq!(doc.dependencies_of(&"app".into()).len(), 1);
    }

    #[test]
    fn test_tools_object_form() {
        let content = r#"{
            "bomFormat": "CycloneDX", "specVersion": "1.6",
            "metadata": {"tools": {"components": [{"type": "application", "name": "cdxgen", "version": "10.0"}],
                                   "services": [{"name": "scanner"}]}},
            "components": []
        }"#;
        let doc = CycloneDxParser::new().parse_str(content).expect("parses");
        let names: Vec<_> = doc.metadata.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["cdxgen", "scanner"]);
    }

    #[test]
    fn test_missing_spec_version_is_structural() {
        let content = r#"{"bomFormat": "CycloneDX", "components": []}"#;
        let err = CycloneDxParser::new().parse_str(content).unwrap_err();
        assert!(matches!(
            err,
            SbomEnrichError::Structural {
                source: StructuralErrorKind::MissingField { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_missing_components_is_structural() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5"}"#;
        let err = CycloneDxParser::new().parse_str(content).unwrap_err();
        assert!(matches!(err, SbomEnrichError::Structural { .. }));
    }

    #[test]
    fn test_dangling_dependency_rejected() {
        let content = r#"{
            "bomFormat": "CycloneDX", "specVersion": "1.5",
            "components": [{"type": "library", "bom-ref": "a", "name": "a"}],
            "dependencies": [{"ref": "a", "dependsOn": ["ghost"]}]
        }"#;
        let err = CycloneDxParser::new().parse_str(content).unwrap_err();
        assert!(matches!(
            err,
            SbomEnrichError::Structural {
                source: StructuralErrorKind::DanglingRelationship { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_json_is_schema_error() {
        let err = CycloneDxParser::new()
            .parse_str(r#"{"bomFormat": "CycloneDX", "#)
            .unwrap_err();
        assert!(matches!(err, SbomEnrichError::Schema { .. }));
    }

    #[test]
    fn test_legacy_tools_written_as_array() {
        let mut doc = Document::new(SchemaFamily::CycloneDx, "1.4");
        doc.metadata.tools.push(Tool::parse("sbom-enrich@0.1.0"));
        let bytes = CycloneDxParser::new().serialize(&doc).expect("serializes");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert!(value["metadata"]["tools"].is_array());

        doc.spec_version = "1.5".to_string();
        let bytes = CycloneDxParser::new().serialize(&doc).expect("serializes");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert!(value["metadata"]["tools"]["components"].is_array());
    }

    #[test]
    fn test_extra_identifiers_dropped() {
        let mut doc = Document::new(SchemaFamily::CycloneDx, "1.6");
        doc.add_component(
            Component::new("lib", "lib")
                .with_purl("pkg:cargo/lib@1.0.0")
                .with_purl("pkg:github/acme/lib@1.0.0"),
        )
        .expect("component");
        let parser = CycloneDxParser::new();
        let back = parser
            .parse_str(&String::from_utf8(parser.serialize(&doc).expect("serializes")).expect("utf8"))
            .expect("reparses");
        let lib = back.component(&"lib".into()).expect("lib");
        assert_eq!(lib.identifiers.purls, vec!["pkg:cargo/lib@1.0.0".to_string()]);
    }

    #[test]
    fn test_interleaved_dependencies_round_trip() {
        let mut doc = Document::new(SchemaFamily::CycloneDx, "1.6");
        for name in ["a", "b", "c", "d", "e"] {
            doc.add_component(Component::new(name, name)).expect("component");
        }
        for (from, to) in [("a", "b"), ("c", "d"), ("a", "e")] {
            doc.add_relationship(Relationship::between(
                from.into(),
                to.into(),
                RelationshipKind::DependsOn,
            ))
            .expect("edge");
        }
        let parser = CycloneDxParser::new();
        let bytes = parser.serialize(&doc).expect("serializes");
        let back = parser
            .parse_str(&String::from_utf8(bytes).expect("utf8"))
            .expect("reparses");
        assert_eq!(back, doc);
        assert_eq!(back.dependencies_of(&"a".into()).len(), 2);
    }

    #[test]
    fn test_legacy_author_string_split() {
        let content = r#"{
            "bomFormat": "CycloneDX", "specVersion": "1.4",
            "components": [{"type": "library", "name": "a", "author": "Ann, Bob"}]
        }"#;
        let doc = CycloneDxParser::new().parse_str(content).expect("parses");
        let a = doc.components().next().expect("component");
        assert_eq!(a.authors, vec!["Ann".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn test_multiple_licenses_conjoined() {
        let content = r#"{
            "bomFormat": "CycloneDX", "specVersion": "1.5",
            "components": [{"type": "library", "name": "a",
                "licenses": [{"license": {"id": "MIT"}}, {"expression": "Apache-2.0 OR BSD-3-Clause"}]}]
        }"#;
        let doc = CycloneDxParser::new().parse_str(content).expect("parses");
        let a = doc.components().next().expect("component");
        assert_eq!(
            a.license.as_ref().map(|l| l.expression.as_str()),
            Some("MIT AND (Apache-2.0 OR BSD-3-Clause)")
        );
    }

    #[test]
    fn test_detect_confidence_levels() {
        let parser = CycloneDxParser::new();
        assert_eq!(
            parser.detect(r#"{"bomFormat": "CycloneDX"}"#).confidence,
            FormatConfidence::CERTAIN
        );
        assert_eq!(
            parser.detect(r#"{"specVersion": "1.5", "components": []}"#).confidence,
            FormatConfidence::MEDIUM
        );
        assert_eq!(
            parser.detect(r#"{"spdxVersion": "SPDX-2.3"}"#).confidence,
            FormatConfidence::NONE
        );
    }
}
