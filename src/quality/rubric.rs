//! Fixed scoring rubric.
//!
//! Three categories: the NTIA minimum elements, structural completeness of
//! the dependency graph, and semantic richness. Category weights sum to 1.0 and so do the check weights inside each
//! category, so every subscore and the overall score stay in `[0, 1]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rubric version recorded in every report
pub const RUBRIC_VERSION: &str = "2.0";

/// Scoring category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// NTIA minimum elements
    NtiaMinimum,
    /// Primary component and dependency graph coverage
    Structural,
    /// Licensing, descriptions and identifier diversity
    SemanticRichness,
}

impl Category {
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::NtiaMinimum => 0.50,
            Self::Structural => 0.20,
            Self::SemanticRichness => 0.30,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NtiaMinimum => "NTIA minimum elements",
            Self::Structural => "Structural completeness",
            Self::SemanticRichness => "Semantic richness",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::NtiaMinimum, Self::Structural, Self::SemanticRichness]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An attribute a check looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Attribute {
    Supplier,
    Name,
    Version,
    UniqueIdentifier,
    Relationships,
    Author,
    Timestamp,
    PrimaryComponent,
    Connectivity,
    License,
    Description,
    IdentifierDiversity,
}

impl Attribute {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Supplier => "supplier",
            Self::Name => "component name",
            Self::Version => "version",
            Self::UniqueIdentifier => "unique identifier",
            Self::Relationships => "dependency relationships",
            Self::Author => "author of SBOM data",
            Self::Timestamp => "timestamp",
            Self::PrimaryComponent => "primary component",
            Self::Connectivity => "relationship to another component",
            Self::License => "license",
            Self::Description => "description",
            Self::IdentifierDiversity => "identifier diversity",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a check is evaluated over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Mean over components
    Components,
    /// Pass/fail for the whole document
    Document,
}

/// One rubric row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Check {
    pub category: Category,
    pub attribute: Attribute,
    pub weight: f64,
    pub scope: Scope,
}

const fn check(category: Category, attribute: Attribute, weight: f64, scope: Scope) -> Check {
    Check {
        category,
        attribute,
        weight,
        scope,
    }
}

/// The rubric, in report order
pub const RUBRIC: &[Check] = &[
    check(Category::NtiaMinimum, Attribute::Supplier, 0.15, Scope::Components),
    check(Category::NtiaMinimum, Attribute::Name, 0.15, Scope::Components),
    check(Category::NtiaMinimum, Attribute::Version, 0.15, Scope::Components),
    check(Category::NtiaMinimum, Attribute::UniqueIdentifier, 0.15, Scope::Components),
    check(Category::NtiaMinimum, Attribute::Relationships, 0.15, Scope::Document),
    check(Category::NtiaMinimum, Attribute::Author, 0.125, Scope::Document),
    check(Category::NtiaMinimum, Attribute::Timestamp, 0.125, Scope::Document),
    check(Category::Structural, Attribute::PrimaryComponent, 0.50, Scope::Document),
    check(Category::Structural, Attribute::Connectivity, 0.50, Scope::Components),
    check(Category::SemanticRichness, Attribute::License, 0.40, Scope::Components),
    check(Category::SemanticRichness, Attribute::Description, 0.30, Scope::Components),
    check(Category::SemanticRichness, Attribute::IdentifierDiversity, 0.30, Scope::Components),
];

/// Rubric rows belonging to a category
pub fn checks_in(category: Category) -> impl Iterator<Item = &'static Check> {
    RUBRIC.iter().filter(move |c| c.category == category)
}
