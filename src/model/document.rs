//! Core document, component, and relationship structures.

use super::{
    ComponentId, ComponentIdentifiers, ComponentType, DocumentMetadata, Hash, LicenseExpression,
    Organization, SchemaFamily,
};
use crate::error::{Result, SbomEnrichError, StructuralErrorKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// SBOM document - the schema-agnostic in-memory representation.
///
/// Components are kept in document order. Every mutation path goes through
/// methods that uphold the invariants: unique component identity, resolvable
/// relationship endpoints, and a primary component that exists.
///
/// Relationships form a set: equality ignores their order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Schema family the document was parsed from
    pub schema: SchemaFamily,
    /// Schema version string (e.g. "1.5", "SPDX-2.3")
    pub spec_version: String,
    /// Serial number or document namespace
    pub serial_number: Option<String>,
    /// Document name
    pub name: Option<String>,
    /// Document-level metadata
    pub metadata: DocumentMetadata,
    components: IndexMap<ComponentId, Component>,
    relationships: Vec<Relationship>,
    primary_component: Option<ComponentId>,
}

impl Document {
    /// Create a new empty document
    #[must_use]
    pub fn new(schema: SchemaFamily, spec_version: impl Into<String>) -> Self {
        Self {
            schema,
            spec_version: spec_version.into(),
            serial_number: None,
            name: None,
            metadata: DocumentMetadata::default(),
            components: IndexMap::new(),
            relationships: Vec::new(),
            primary_component: None,
        }
    }

    /// Add a component, rejecting duplicate references and duplicate
    /// (name, version, type) identities.
    pub fn add_component(&mut self, component: Component) -> Result<()> {
        if self.components.contains_key(&component.id) {
            return Err(SbomEnrichError::structural(
                "adding component",
                StructuralErrorKind::DuplicateReference(component.id.to_string()),
            ));
        }
        let key = component.key();
        if self.components.values().any(|c| c.key() == key) {
            return Err(duplicate_identity(&key));
        }
        self.components.insert(component.id.clone(), component);
        Ok(())
    }

    /// Add a relationship whose endpoints must already be present.
    ///
    /// An edge equal to one already held is ignored.
    pub fn add_relationship(&mut self, relationship: Relationship) -> Result<()> {
        if let EntityRef::Component(from) = &relationship.from {
            if !self.components.contains_key(from) {
                return Err(SbomEnrichError::dangling(from.value()));
            }
        }
        if !self.components.contains_key(&relationship.to) {
            return Err(SbomEnrichError::dangling(relationship.to.value()));
        }
        if !self.relationships.contains(&relationship) {
            self.relationships.push(relationship);
        }
        Ok(())
    }

    /// Designate the primary component.
    pub fn set_primary_component(&mut self, id: ComponentId) -> Result<()> {
        if !self.components.contains_key(&id) {
            return Err(SbomEnrichError::structural(
                "setting primary component",
                StructuralErrorKind::UnknownPrimaryComponent(id.to_string()),
            ));
        }
        self.primary_component = Some(id);
        Ok(())
    }

    /// Get the primary component reference
    #[must_use]
    pub const fn primary_component_id(&self) -> Option<&ComponentId> {
        self.primary_component.as_ref()
    }

    /// Get the primary component if set
    #[must_use]
    pub fn primary_component(&self) -> Option<&Component> {
        self.primary_component
            .as_ref()
            .and_then(|id| self.components.get(id))
    }

    /// Mutable access to the primary component; the identity rule of
    /// [`Document::component_mut`] applies.
    pub fn primary_component_mut(&mut self) -> Option<&mut Component> {
        let id = self.primary_component.clone()?;
        self.components.get_mut(&id)
    }

    /// Components in document order
    pub fn components(&self) -> impl ExactSizeIterator<Item = &Component> {
        self.components.values()
    }

    /// Get a component by reference
    #[must_use]
    pub fn component(&self, id: &ComponentId) -> Option<&Component> {
        self.components.get(id)
    }

    /// Mutable access to a component.
    ///
    /// Callers changing name, version, or type must check the identity
    /// invariant with [`Document::key_is_free`] first.
    pub fn component_mut(&mut self, id: &ComponentId) -> Option<&mut Component> {
        self.components.get_mut(id)
    }

    /// Whether `key` is free for the component `id` (unused by any other component).
    #[must_use]
    pub fn key_is_free(&self, id: &ComponentId, key: &ComponentKey) -> bool {
        !self
            .components
            .values()
            .any(|c| &c.id != id && &c.key() == key)
    }

    /// Find a component by its (name, version, type) identity
    #[must_use]
    pub fn component_by_key(&self, key: &ComponentKey) -> Option<&Component> {
        self.components.values().find(|c| &c.key() == key)
    }

    /// Component references in document order
    pub fn component_ids(&self) -> impl Iterator<Item = &ComponentId> {
        self.components.keys()
    }

    /// Get total component count
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Relationships in insertion order
    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Components that `id` depends on
    #[must_use]
    pub fn dependencies_of(&self, id: &ComponentId) -> Vec<&ComponentId> {
        self.relationships
            .iter()
            .filter(|r| r.kind.is_dependency() && r.from == EntityRef::Component(id.clone()))
            .map(|r| &r.to)
            .collect()
    }

    /// Re-check every document invariant.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for component in self.components.values() {
            if !seen.insert(component.key()) {
                return Err(duplicate_identity(&component.key()));
            }
        }
        for rel in &self.relationships {
            if let EntityRef::Component(from) = &rel.from {
                if !self.components.contains_key(from) {
                    return Err(SbomEnrichError::dangling(from.value()));
                }
            }
            if !self.components.contains_key(&rel.to) {
                return Err(SbomEnrichError::dangling(rel.to.value()));
            }
        }
        if let Some(primary) = &self.primary_component {
            if !self.components.contains_key(primary) {
                return Err(SbomEnrichError::structural(
                    "validating document",
                    StructuralErrorKind::UnknownPrimaryComponent(primary.to_string()),
                ));
            }
        }
        Ok(())
    }

    /// Content hash over the canonical JSON form
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        serde_json::to_vec(self).map_or(0, |bytes| xxh3_64(&bytes))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
            && self.spec_version == other.spec_version
            && self.serial_number == other.serial_number
            && self.name == other.name
            && self.metadata == other.metadata
            && self.components == other.components
            && self.primary_component == other.primary_component
            && same_relationships(&self.relationships, &other.relationships)
    }
}

impl Eq for Document {}

/// Multiset comparison of two relationship lists
fn same_relationships(a: &[Relationship], b: &[Relationship]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&Relationship, usize> = HashMap::with_capacity(a.len());
    for rel in a {
        *counts.entry(rel).or_default() += 1;
    }
    b.iter().all(|rel| match counts.get_mut(rel) {
        Some(count) if *count > 0 => {
            *count -= 1;
            true
        }
        _ => false,
    })
}

fn duplicate_identity(key: &ComponentKey) -> SbomEnrichError {
    SbomEnrichError::structural(
        "adding component",
        StructuralErrorKind::DuplicateComponent {
            name: key.name.clone(),
            version: key.version.clone().unwrap_or_default(),
            component_type: key.component_type.to_string(),
        },
    )
}

/// Identity of a component for merge purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    pub name: String,
    pub version: Option<String>,
    pub component_type: ComponentType,
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({})",
            self.name,
            self.version.as_deref().unwrap_or("-"),
            self.component_type
        )
    }
}

/// Software component (package/dependency)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Format-local reference
    pub id: ComponentId,
    /// Component name
    pub name: String,
    /// Component version
    pub version: Option<String>,
    /// Component type
    pub component_type: ComponentType,
    /// PURLs and CPEs
    pub identifiers: ComponentIdentifiers,
    /// Declared license
    pub license: Option<LicenseExpression>,
    /// Supplier
    pub supplier: Option<Organization>,
    /// Authors
    pub authors: Vec<String>,
    /// Description
    pub description: Option<String>,
    /// Project homepage
    pub homepage: Option<String>,
    /// Source repository
    pub repository_url: Option<String>,
    /// Checksums
    pub hashes: Vec<Hash>,
}

impl Component {
    /// Create a new component
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: None,
            component_type: ComponentType::default(),
            identifiers: ComponentIdentifiers::default(),
            license: None,
            supplier: None,
            authors: Vec::new(),
            description: None,
            homepage: None,
            repository_url: None,
            hashes: Vec::new(),
        }
    }

    /// Set the version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Add a PURL
    #[must_use]
    pub fn with_purl(mut self, purl: impl Into<String>) -> Self {
        self.identifiers.purls.push(purl.into());
        self
    }

    /// Set the component type
    #[must_use]
    pub fn with_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = component_type;
        self
    }

    /// Set the license
    #[must_use]
    pub fn with_license(mut self, expression: impl Into<String>) -> Self {
        self.license = Some(LicenseExpression::new(expression));
        self
    }

    /// Identity of this component for merge purposes
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        ComponentKey {
            name: self.name.clone(),
            version: self.version.clone(),
            component_type: self.component_type.clone(),
        }
    }

    /// Whether the declared license carries information
    #[must_use]
    pub fn has_known_license(&self) -> bool {
        self.license.as_ref().is_some_and(|l| !l.is_unknown())
    }
}

/// One endpoint of a relationship
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// The document itself
    Document,
    /// A component of the document
    Component(ComponentId),
}

/// Directed edge between the document or a component and a component
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub from: EntityRef,
    pub to: ComponentId,
    pub kind: RelationshipKind,
}

impl Relationship {
    /// Create a component-to-component relationship
    #[must_use]
    pub const fn between(from: ComponentId, to: ComponentId, kind: RelationshipKind) -> Self {
        Self {
            from: EntityRef::Component(from),
            to,
            kind,
        }
    }
}

/// Relationship kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    DependsOn,
    DevDependsOn,
    Contains,
    Describes,
    Other(String),
}

impl RelationshipKind {
    /// Whether this kind expresses a dependency
    #[must_use]
    pub const fn is_dependency(&self) -> bool {
        matches!(self, Self::DependsOn | Self::DevDependsOn)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependsOn => write!(f, "depends-on"),
            Self::DevDependsOn => write!(f, "dev-depends-on"),
            Self::Contains => write!(f, "contains"),
            Self::Describes => write!(f, "describes"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}
