//! # Conceptual Model
//!
//! Technology-agnostic classes (concepts) and their properties.
//!
//! Properties live in one flat list, each pointing at its owning concept,
//! which is also the shape of the tabular form. Concepts may implement
//! (inherit from) other concepts.

use crate::entity::notation::Defaults;
use crate::entity::{ConceptEntity, DataModelEntity, Prefix, ViewEntity};
use crate::physical::PhysicalPropertyId;
use crate::types::DataType;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// METADATA
// =============================================================================

/// Identity of a conceptual model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptualMetadata {
    /// Default prefix for every concept in the model.
    pub prefix: String,
    /// Namespace URI bound to `prefix`.
    pub namespace: Option<String>,
    pub external_id: String,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub creator: Vec<String>,
}

impl ConceptualMetadata {
    #[must_use]
    pub fn new(
        prefix: impl Into<String>,
        external_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            namespace: None,
            external_id: external_id.into(),
            version: version.into(),
            name: None,
            description: None,
            creator: Vec::new(),
        }
    }

    /// Notation defaults for entities of this model. Concepts carry no
    /// version, so only the prefix is defaulted.
    #[must_use]
    pub fn defaults(&self) -> Defaults {
        Defaults::none().with("prefix", &self.prefix)
    }

    #[must_use]
    pub fn entity(&self) -> DataModelEntity {
        DataModelEntity {
            prefix: Prefix::named(&self.prefix),
            suffix: self.external_id.clone(),
            version: Some(self.version.clone()),
        }
    }
}

// =============================================================================
// VALUE TYPES
// =============================================================================

/// What a conceptual property holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConceptualValueType {
    Data(DataType),
    Concept(ConceptEntity),
    /// Any of the listed types.
    Union(Vec<ConceptualValueType>),
    Unknown,
}

impl ConceptualValueType {
    /// The referenced concept, for concept-valued properties.
    #[must_use]
    pub fn concept(&self) -> Option<&ConceptEntity> {
        match self {
            ConceptualValueType::Concept(concept) => Some(concept),
            _ => None,
        }
    }
}

impl fmt::Display for ConceptualValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConceptualValueType::Data(data_type) => write!(f, "{}", data_type),
            ConceptualValueType::Concept(concept) => write!(f, "{}", concept),
            ConceptualValueType::Union(branches) => {
                let rendered: Vec<String> = branches.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join(" | "))
            }
            ConceptualValueType::Unknown => f.write_str(crate::entity::UNKNOWN_TOKEN),
        }
    }
}

// =============================================================================
// CONCEPTS & PROPERTIES
// =============================================================================

/// Identifier of a conceptual property: owning concept plus property id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConceptualPropertyId {
    pub concept: ConceptEntity,
    pub property: String,
}

impl fmt::Display for ConceptualPropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.concept, self.property)
    }
}

/// A conceptual class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub concept: ConceptEntity,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Parents, in declaration order.
    pub implements: Vec<ConceptEntity>,
    /// Where instances of this concept come from (e.g. an RDF type URI).
    pub instance_source: Option<String>,
    /// The view this concept was lowered to, stamped by sync-linking.
    pub physical: Option<ViewEntity>,
}

impl Concept {
    #[must_use]
    pub fn new(concept: ConceptEntity) -> Self {
        Self {
            concept,
            name: None,
            description: None,
            implements: Vec::new(),
            instance_source: None,
            physical: None,
        }
    }

    #[must_use]
    pub fn implementing(mut self, parents: impl IntoIterator<Item = ConceptEntity>) -> Self {
        self.implements = parents.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_instance_source(mut self, source: impl Into<String>) -> Self {
        self.instance_source = Some(source.into());
        self
    }
}

/// A property of a concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptualProperty {
    pub concept: ConceptEntity,
    pub property: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub value_type: ConceptualValueType,
    /// `None` reads as 0.
    pub min_count: Option<u64>,
    /// `None` is unbounded.
    pub max_count: Option<u64>,
    pub default: Option<String>,
    pub instance_source: Option<String>,
    /// The physical property this was lowered to, stamped by sync-linking.
    pub physical: Option<PhysicalPropertyId>,
}

impl ConceptualProperty {
    #[must_use]
    pub fn new(
        concept: ConceptEntity,
        property: impl Into<String>,
        value_type: ConceptualValueType,
    ) -> Self {
        Self {
            concept,
            property: property.into(),
            name: None,
            description: None,
            value_type,
            min_count: Some(0),
            max_count: Some(1),
            default: None,
            instance_source: None,
            physical: None,
        }
    }

    #[must_use]
    pub fn with_cardinality(mut self, min_count: Option<u64>, max_count: Option<u64>) -> Self {
        self.min_count = min_count;
        self.max_count = max_count;
        self
    }

    #[must_use]
    pub fn id(&self) -> ConceptualPropertyId {
        ConceptualPropertyId {
            concept: self.concept.clone(),
            property: self.property.clone(),
        }
    }

    /// More than one value allowed (unbounded counts as many).
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.max_count.is_none_or(|max| max > 1)
    }

    /// At least one value required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.min_count.is_some_and(|min| min > 0)
    }
}

// =============================================================================
// MODEL
// =============================================================================

/// A complete conceptual model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptualModel {
    pub metadata: ConceptualMetadata,
    /// Prefix → namespace bindings.
    pub prefixes: BTreeMap<String, String>,
    pub concepts: Vec<Concept>,
    pub properties: Vec<ConceptualProperty>,
}

impl ConceptualModel {
    #[must_use]
    pub fn new(metadata: ConceptualMetadata) -> Self {
        Self {
            metadata,
            prefixes: BTreeMap::new(),
            concepts: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// A concept entity in this model's prefix.
    #[must_use]
    pub fn concept_entity(&self, suffix: impl Into<String>) -> ConceptEntity {
        ConceptEntity::new(&self.metadata.prefix, suffix)
    }

    pub fn add_concept(&mut self, concept: Concept) -> &mut Self {
        self.concepts.push(concept);
        self
    }

    pub fn add_property(&mut self, property: ConceptualProperty) -> &mut Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn concept(&self, entity: &ConceptEntity) -> Option<&Concept> {
        self.concepts.iter().find(|c| &c.concept == entity)
    }

    pub fn properties_of<'a>(
        &'a self,
        entity: &'a ConceptEntity,
    ) -> impl Iterator<Item = &'a ConceptualProperty> + 'a {
        self.properties.iter().filter(move |p| &p.concept == entity)
    }

    #[must_use]
    pub fn property(&self, id: &ConceptualPropertyId) -> Option<&ConceptualProperty> {
        self.properties
            .iter()
            .find(|p| p.concept == id.concept && p.property == id.property)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_valued_follows_max_count() {
        let concept = ConceptEntity::new("sp", "Asset");
        let single = ConceptualProperty::new(
            concept.clone(),
            "name",
            ConceptualValueType::Data(DataType::String),
        );
        let unbounded = single.clone().with_cardinality(Some(1), None);
        let bounded = single.clone().with_cardinality(None, Some(4));

        assert!(!single.is_multi_valued());
        assert!(unbounded.is_multi_valued());
        assert!(unbounded.is_required());
        assert!(bounded.is_multi_valued());
        assert!(!bounded.is_required());
    }

    #[test]
    fn union_display_uses_pipes() {
        let union = ConceptualValueType::Union(vec![
            ConceptualValueType::Data(DataType::Integer),
            ConceptualValueType::Data(DataType::Boolean),
        ]);
        assert_eq!(union.to_string(), "integer | boolean");
    }

    #[test]
    fn lookups_by_entity() {
        let mut model = ConceptualModel::new(ConceptualMetadata::new("sp", "plant", "1"));
        let asset = model.concept_entity("Asset");
        model
            .add_concept(Concept::new(asset.clone()))
            .add_property(ConceptualProperty::new(
                asset.clone(),
                "name",
                ConceptualValueType::Data(DataType::String),
            ));

        assert!(model.concept(&asset).is_some());
        assert_eq!(model.properties_of(&asset).count(), 1);
        let id = ConceptualPropertyId {
            concept: asset,
            property: "name".to_string(),
        };
        assert!(model.property(&id).is_some());
        assert_eq!(id.to_string(), "sp:Asset.name");
    }
}
