//! SBOM quality scorer.
//!
//! Evaluates a document against the fixed [`RUBRIC`]. Per-component checks
//! run in parallel with rayon; results are collected in document order so a
//! report is byte-for-byte reproducible.

use super::rubric::{checks_in, Attribute, Category, Check, Scope, RUBRIC, RUBRIC_VERSION};
use crate::model::{Component, ComponentId, ComponentRef, Document, EntityRef};
use packageurl::PackageUrl;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Quality grade based on score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    /// Excellent: 0.9 and above
    A,
    /// Good: 0.8 to 0.9
    B,
    /// Fair: 0.7 to 0.8
    C,
    /// Poor: 0.6 to 0.7
    D,
    /// Failing: below 0.6
    F,
}

impl QualityGrade {
    /// Create grade from a score in `[0, 1]`
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Self::A
        } else if score >= 0.8 {
            Self::B
        } else if score >= 0.7 {
            Self::C
        } else if score >= 0.6 {
            Self::D
        } else {
            Self::F
        }
    }

    #[must_use]
    pub const fn letter(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::A => "Excellent",
            Self::B => "Good",
            Self::C => "Fair",
            Self::D => "Poor",
            Self::F => "Failing",
        }
    }
}

impl fmt::Display for QualityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Score for one rubric row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckScore {
    pub attribute: Attribute,
    pub weight: f64,
    /// Fraction satisfied, in `[0, 1]`
    pub score: f64,
}

/// Weighted subscore for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub score: f64,
    pub weight: f64,
    pub checks: Vec<CheckScore>,
}

/// What a finding is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingSubject {
    Component { name: String, version: Option<String> },
    Document,
}

impl fmt::Display for FindingSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component {
                name,
                version: Some(v),
            } => write!(f, "{name}@{v}"),
            Self::Component { name, version: None } => write!(f, "{name}"),
            Self::Document => write!(f, "document"),
        }
    }
}

impl From<ComponentRef> for FindingSubject {
    fn from(reference: ComponentRef) -> Self {
        Self::Component {
            name: reference.name,
            version: reference.version,
        }
    }
}

/// A missing attribute that cost points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub subject: FindingSubject,
    pub attribute: Attribute,
    pub category: Category,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: missing {} ({})",
            self.subject, self.attribute, self.category
        )
    }
}

/// Quality report for a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct ScoreReport {
    /// Overall score in `[0, 1]`
    pub overall: f64,
    pub grade: QualityGrade,
    pub categories: Vec<CategoryScore>,
    pub findings: Vec<Finding>,
    pub component_count: usize,
    pub rubric_version: String,
}

impl ScoreReport {
    /// Subscore for a category
    #[must_use]
    pub fn category(&self, category: Category) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Findings about a component name
    pub fn findings_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| {
            matches!(&f.subject, FindingSubject::Component { name: n, .. } if n == name)
        })
    }

    /// Whether a component name has a finding for an attribute
    #[must_use]
    pub fn has_finding(&self, name: &str, attribute: Attribute) -> bool {
        self.findings_for(name).any(|f| f.attribute == attribute)
    }
}

/// Per-component check results
#[derive(Debug, Clone, Copy)]
struct ComponentChecks {
    supplier: bool,
    name: bool,
    version: bool,
    unique_identifier: bool,
    license: bool,
    description: bool,
    /// Endpoint of some relationship, or the only component
    connected: bool,
    /// Distinct identifier schemes present, over two
    diversity: f64,
}

impl ComponentChecks {
    fn evaluate(component: &Component, connected: bool) -> Self {
        let valid_purl = component
            .identifiers
            .purls
            .iter()
            .any(|p| PackageUrl::from_str(p).is_ok());
        let valid_cpe = component.identifiers.cpes.iter().any(|c| is_valid_cpe(c));
        let schemes = [
            !component.identifiers.purls.is_empty(),
            !component.identifiers.cpes.is_empty(),
        ];

        Self {
            supplier: component
                .supplier
                .as_ref()
                .is_some_and(|s| !s.name.trim().is_empty()),
            name: !component.name.trim().is_empty(),
            version: component
                .version
                .as_deref()
                .is_some_and(|v| !v.trim().is_empty()),
            unique_identifier: valid_purl || valid_cpe,
            license: component.has_known_license(),
            description: component
                .description
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty()),
            connected,
            diversity: schemes.iter().filter(|s| **s).count() as f64 / 2.0,
        }
    }

    fn value(&self, attribute: Attribute) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match attribute {
            Attribute::Supplier => flag(self.supplier),
            Attribute::Name => flag(self.name),
            Attribute::Version => flag(self.version),
            Attribute::UniqueIdentifier => flag(self.unique_identifier),
            Attribute::License => flag(self.license),
            Attribute::Description => flag(self.description),
            Attribute::Connectivity => flag(self.connected),
            Attribute::IdentifierDiversity => self.diversity,
            Attribute::Relationships
            | Attribute::Author
            | Attribute::Timestamp
            | Attribute::PrimaryComponent => 0.0,
        }
    }
}

/// CPE 2.3 formatted string or CPE 2.2 URI
/// CPE 2.3 formatted string: part plus ten attribute fields
static CPE_23: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^cpe:2\.3:[aho*\-](?::(?:\\.|[^:\\])+){10}$").expect("static regex")
});

/// CPE 2.2 URI binding
static CPE_22: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^cpe:/[aho](?::[^:]*){0,6}$").expect("static regex"));

fn is_valid_cpe(cpe: &str) -> bool {
    CPE_23.is_match(cpe) || CPE_22.is_match(cpe)
}

/// Document-level check results
#[derive(Debug, Clone, Copy)]
struct DocumentChecks {
    relationships: bool,
    author: bool,
    timestamp: bool,
    primary: bool,
}

impl DocumentChecks {
    fn evaluate(document: &Document) -> Self {
        let relationships = !document.relationships().is_empty()
            && document.primary_component_id().map_or(true, |primary| {
                document.relationships().iter().any(|r| {
                    &r.to == primary || matches!(&r.from, EntityRef::Component(id) if id == primary)
                })
            });
        Self {
            relationships,
            author: !document.metadata.authors.is_empty(),
            timestamp: document.metadata.timestamp.is_some(),
            primary: document.primary_component().is_some(),
        }
    }

    const fn passed(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Relationships => self.relationships,
            Attribute::Author => self.author,
            Attribute::Timestamp => self.timestamp,
            Attribute::PrimaryComponent => self.primary,
            _ => false,
        }
    }
}

/// Score a document against the rubric.
///
/// Pure and deterministic: the same document always yields the same report.
pub fn score(document: &Document) -> ScoreReport {
    let components: Vec<&Component> = document.components().collect();
    let endpoints = relationship_endpoints(document);
    let single = components.len() == 1;
    let per_component: Vec<ComponentChecks> = components
        .par_iter()
        .map(|c| ComponentChecks::evaluate(c, single || endpoints.contains(&c.id)))
        .collect();
    let document_checks = DocumentChecks::evaluate(document);

    let check_score = |check: &Check| -> f64 {
        match check.scope {
            Scope::Components if per_component.is_empty() => 0.0,
            Scope::Components => {
                let total: f64 = per_component.iter().map(|c| c.value(check.attribute)).sum();
                total / per_component.len() as f64
            }
            Scope::Document => {
                if document_checks.passed(check.attribute) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    };

    let categories: Vec<CategoryScore> = Category::all()
        .iter()
        .map(|&category| {
            let checks: Vec<CheckScore> = checks_in(category)
                .map(|check| CheckScore {
                    attribute: check.attribute,
                    weight: check.weight,
                    score: check_score(check),
                })
                .collect();
            let weight_total: f64 = checks.iter().map(|c| c.weight).sum();
            let weighted: f64 = checks.iter().map(|c| c.score * c.weight).sum();
            CategoryScore {
                category,
                score: clamp_unit(weighted / weight_total),
                weight: category.weight(),
                checks,
            }
        })
        .collect();

    let weight_total: f64 = categories.iter().map(|c| c.weight).sum();
    let overall = clamp_unit(
        categories.iter().map(|c| c.score * c.weight).sum::<f64>() / weight_total,
    );

    let findings = collect_findings(&components, &per_component, &document_checks);

    tracing::debug!(
        "Scored {} components: {:.3} ({} findings)",
        components.len(),
        overall,
        findings.len()
    );

    ScoreReport {
        overall,
        grade: QualityGrade::from_score(overall),
        categories,
        findings,
        component_count: components.len(),
        rubric_version: RUBRIC_VERSION.to_string(),
    }
}

/// Components that appear on either end of a relationship
fn relationship_endpoints(document: &Document) -> HashSet<&ComponentId> {
    let mut endpoints = HashSet::new();
    for rel in document.relationships() {
        if let EntityRef::Component(from) = &rel.from {
            endpoints.insert(from);
        }
        endpoints.insert(&rel.to);
    }
    endpoints
}

/// Document findings first, then components in document order, each in rubric order.
fn collect_findings(
    components: &[&Component],
    per_component: &[ComponentChecks],
    document_checks: &DocumentChecks,
) -> Vec<Finding> {
    let mut findings: Vec<Finding> = RUBRIC
        .iter()
        .filter(|c| c.scope == Scope::Document && !document_checks.passed(c.attribute))
        .map(|c| Finding {
            subject: FindingSubject::Document,
            attribute: c.attribute,
            category: c.category,
        })
        .collect();

    for (component, checks) in components.iter().zip(per_component) {
        for check in RUBRIC.iter().filter(|c| c.scope == Scope::Components) {
            // Diversity is a ratio, not a missing attribute.
            if check.attribute == Attribute::IdentifierDiversity {
                continue;
            }
            if checks.value(check.attribute) < 1.0 {
                findings.push(Finding {
                    subject: ComponentRef::from_component(component).into(),
                    attribute: check.attribute,
                    category: check.category,
                });
            }
        }
    }

    findings
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
