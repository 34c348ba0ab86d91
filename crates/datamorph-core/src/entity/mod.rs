//! # Entities
//!
//! Typed reference values used everywhere a model points at something:
//! concepts, views, containers, edges, indexes, constraints and friends.
//!
//! Entities are immutable value types. Equality, ordering and hashing are
//! defined over the canonical notation string (see [`notation`]), so two
//! entities built in different ways but rendering identically are the same
//! entity.
//!
//! `Entity` is a closed tagged union; every consumer matches exhaustively.

pub mod notation;

use notation::Defaults;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The notation token for an unknown reference.
pub const UNKNOWN_TOKEN: &str = "#N/A";

static UNDEFINED: Prefix = Prefix::Undefined;

// =============================================================================
// SHARED SHAPE
// =============================================================================

/// Namespace-like part of an entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Prefix {
    /// No prefix was given; callers usually fill it from defaults.
    #[default]
    Undefined,
    Named(String),
}

impl Prefix {
    /// Build a named prefix.
    #[must_use]
    pub fn named(value: impl Into<String>) -> Self {
        Prefix::Named(value.into())
    }

    /// The prefix as a string slice, if defined.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Prefix::Undefined => None,
            Prefix::Named(value) => Some(value),
        }
    }

    /// Replace an undefined prefix with `fallback`.
    #[must_use]
    pub fn or_named(&self, fallback: &str) -> Prefix {
        match self {
            Prefix::Undefined => Prefix::named(fallback),
            named => named.clone(),
        }
    }
}

/// Direction of an edge connection, seen from the owning view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Direction {
    #[default]
    Outwards,
    Inwards,
}

impl Direction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outwards => "outwards",
            Direction::Inwards => "inwards",
        }
    }
}

/// Discriminant of [`Entity`], used to select a grammar when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Concept,
    View,
    Container,
    Unit,
    Edge,
    ReverseConnection,
    ContainerIndex,
    ContainerConstraint,
    DataModel,
    Node,
    Asset,
    Relationship,
    NamedIndividual,
    Reference,
    Unknown,
}

impl EntityKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Concept => "concept",
            EntityKind::View => "view",
            EntityKind::Container => "container",
            EntityKind::Unit => "unit",
            EntityKind::Edge => "edge",
            EntityKind::ReverseConnection => "reverse connection",
            EntityKind::ContainerIndex => "container index",
            EntityKind::ContainerConstraint => "container constraint",
            EntityKind::DataModel => "data model",
            EntityKind::Node => "node",
            EntityKind::Asset => "asset",
            EntityKind::Relationship => "relationship",
            EntityKind::NamedIndividual => "named individual",
            EntityKind::Reference => "reference",
            EntityKind::Unknown => "unknown",
        }
    }

    /// Field keys that may be omitted from the notation when they match a default.
    #[must_use]
    pub fn defaultable_keys(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Concept
            | EntityKind::View
            | EntityKind::DataModel
            | EntityKind::Reference => &["prefix", "version"],
            EntityKind::Container
            | EntityKind::Node
            | EntityKind::Unit
            | EntityKind::NamedIndividual => &["prefix"],
            EntityKind::Edge => &["type", "properties", "direction"],
            EntityKind::ContainerIndex => &["order", "cursorable", "bySpace"],
            EntityKind::ReverseConnection
            | EntityKind::ContainerConstraint
            | EntityKind::Asset
            | EntityKind::Relationship
            | EntityKind::Unknown => &[],
        }
    }

    /// Edges and indexes drop each matching default on its own; every other
    /// kind drops its defaults only when all of them match.
    #[must_use]
    pub fn strips_defaults_individually(&self) -> bool {
        matches!(self, EntityKind::Edge | EntityKind::ContainerIndex)
    }

    /// Kinds whose suffix is a fixed keyword rather than a name.
    #[must_use]
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            EntityKind::Edge => Some("edge"),
            EntityKind::ReverseConnection => Some("reverse"),
            EntityKind::Asset => Some("Asset"),
            EntityKind::Relationship => Some("Relationship"),
            _ => None,
        }
    }

    /// Whether an unknown value of this kind is a physical unknown.
    #[must_use]
    pub fn is_physical(&self) -> bool {
        matches!(
            self,
            EntityKind::View
                | EntityKind::Container
                | EntityKind::Edge
                | EntityKind::ReverseConnection
                | EntityKind::ContainerIndex
                | EntityKind::ContainerConstraint
                | EntityKind::DataModel
                | EntityKind::Node
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Common read access to every entity, used by the serializer.
pub trait Notated {
    fn kind(&self) -> EntityKind;

    fn prefix(&self) -> &Prefix;

    /// Local name. `None` is the Unknown sentinel.
    fn suffix(&self) -> Option<&str>;

    /// Content fields in notation order. Nested entities are rendered with `defaults`.
    fn content(&self, defaults: &Defaults) -> Vec<(&'static str, String)>;
}

// =============================================================================
// VARIANTS
// =============================================================================

/// A conceptual class.
#[derive(Debug, Clone)]
pub struct ConceptEntity {
    pub prefix: Prefix,
    pub suffix: String,
    pub version: Option<String>,
}

impl ConceptEntity {
    #[must_use]
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: Prefix::named(prefix),
            suffix: suffix.into(),
            version: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// The same concept without a version. Concepts are compared unversioned
    /// when they are derived from versioned physical views.
    #[must_use]
    pub fn unversioned(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            version: None,
        }
    }
}

/// A physical view.
#[derive(Debug, Clone)]
pub struct ViewEntity {
    pub prefix: Prefix,
    pub suffix: String,
    pub version: Option<String>,
}

impl ViewEntity {
    #[must_use]
    pub fn new(space: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            prefix: Prefix::named(space),
            suffix: external_id.into(),
            version: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// A physical container.
#[derive(Debug, Clone)]
pub struct ContainerEntity {
    pub prefix: Prefix,
    pub suffix: String,
}

impl ContainerEntity {
    #[must_use]
    pub fn new(space: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            prefix: Prefix::named(space),
            suffix: external_id.into(),
        }
    }
}

/// A unit of measure.
#[derive(Debug, Clone)]
pub struct UnitEntity {
    pub prefix: Prefix,
    pub suffix: String,
}

/// A node instance, used as an edge type or a node type.
#[derive(Debug, Clone)]
pub struct NodeEntity {
    pub prefix: Prefix,
    pub suffix: String,
}

impl NodeEntity {
    #[must_use]
    pub fn new(space: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            prefix: Prefix::named(space),
            suffix: external_id.into(),
        }
    }
}

/// An edge connection: `edge(properties=..,type=..,direction=..)`.
#[derive(Debug, Clone, Default)]
pub struct EdgeEntity {
    pub edge_type: Option<NodeEntity>,
    /// View holding the properties stored on the edge itself.
    pub properties: Option<ViewEntity>,
    pub direction: Direction,
}

/// A reverse connection through a property on the far view: `reverse(property=..)`.
#[derive(Debug, Clone)]
pub struct ReverseConnectionEntity {
    pub property: String,
}

/// A container index: `btree:name(order=..,cursorable=..,bySpace=..)`.
#[derive(Debug, Clone)]
pub struct ContainerIndexEntity {
    /// Index kind (`btree` or `inverted`).
    pub prefix: Prefix,
    pub suffix: String,
    pub order: Option<u32>,
    pub cursorable: Option<bool>,
    pub by_space: Option<bool>,
}

/// A container constraint: `requires:name(require=space:Container)`.
#[derive(Debug, Clone)]
pub struct ContainerConstraintEntity {
    /// Constraint kind (`requires` or `uniqueness`).
    pub prefix: Prefix,
    pub suffix: String,
    pub require: Option<ContainerEntity>,
}

/// A data model identifier.
#[derive(Debug, Clone)]
pub struct DataModelEntity {
    pub prefix: Prefix,
    pub suffix: String,
    pub version: Option<String>,
}

/// A classic asset-hierarchy target: `Asset(property=..)`.
#[derive(Debug, Clone)]
pub struct AssetEntity {
    pub property: String,
}

/// A classic relationship target: `Relationship(label=..)`.
#[derive(Debug, Clone, Default)]
pub struct RelationshipEntity {
    pub label: Option<String>,
}

/// A named individual of an enumeration-like concept.
#[derive(Debug, Clone)]
pub struct NamedIndividualEntity {
    pub prefix: Prefix,
    pub suffix: String,
}

/// A reference to an element of another model.
#[derive(Debug, Clone)]
pub struct ReferenceEntity {
    pub prefix: Prefix,
    pub suffix: String,
    pub version: Option<String>,
    pub property: Option<String>,
}

/// The `#N/A` value. Never carries extra fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnknownEntity {
    /// Physical unknowns stand in for views, conceptual ones for concepts.
    pub physical: bool,
}

impl fmt::Display for UnknownEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(UNKNOWN_TOKEN)
    }
}

// =============================================================================
// NOTATED IMPLEMENTATIONS
// =============================================================================

fn version_field(version: &Option<String>) -> Vec<(&'static str, String)> {
    version.iter().map(|v| ("version", v.clone())).collect()
}

impl Notated for ConceptEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Concept
    }
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
    fn suffix(&self) -> Option<&str> {
        Some(&self.suffix)
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        version_field(&self.version)
    }
}

impl Notated for ViewEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::View
    }
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
    fn suffix(&self) -> Option<&str> {
        Some(&self.suffix)
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        version_field(&self.version)
    }
}

impl Notated for DataModelEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::DataModel
    }
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
    fn suffix(&self) -> Option<&str> {
        Some(&self.suffix)
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        version_field(&self.version)
    }
}

impl Notated for ReferenceEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Reference
    }
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
    fn suffix(&self) -> Option<&str> {
        Some(&self.suffix)
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        let mut fields = version_field(&self.version);
        if let Some(property) = &self.property {
            fields.push(("property", property.clone()));
        }
        fields
    }
}

macro_rules! plain_notated {
    ($($ty:ty => $kind:expr),+ $(,)?) => {$(
        impl Notated for $ty {
            fn kind(&self) -> EntityKind {
                $kind
            }
            fn prefix(&self) -> &Prefix {
                &self.prefix
            }
            fn suffix(&self) -> Option<&str> {
                Some(&self.suffix)
            }
            fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
                Vec::new()
            }
        }
    )+};
}

plain_notated!(
    ContainerEntity => EntityKind::Container,
    UnitEntity => EntityKind::Unit,
    NodeEntity => EntityKind::Node,
    NamedIndividualEntity => EntityKind::NamedIndividual,
);

impl Notated for EdgeEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Edge
    }
    fn prefix(&self) -> &Prefix {
        &UNDEFINED
    }
    fn suffix(&self) -> Option<&str> {
        Some("edge")
    }
    fn content(&self, defaults: &Defaults) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(view) = &self.properties {
            fields.push(("properties", notation::serialize(view, defaults)));
        }
        if let Some(edge_type) = &self.edge_type {
            fields.push(("type", notation::serialize(edge_type, defaults)));
        }
        // Outwards is implied unless the caller supplies its own direction default.
        if self.direction == Direction::Inwards || defaults.get("direction").is_some() {
            fields.push(("direction", self.direction.as_str().to_string()));
        }
        fields
    }
}

impl Notated for ReverseConnectionEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::ReverseConnection
    }
    fn prefix(&self) -> &Prefix {
        &UNDEFINED
    }
    fn suffix(&self) -> Option<&str> {
        Some("reverse")
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        vec![("property", self.property.clone())]
    }
}

impl Notated for ContainerIndexEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::ContainerIndex
    }
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
    fn suffix(&self) -> Option<&str> {
        Some(&self.suffix)
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(order) = self.order {
            fields.push(("order", order.to_string()));
        }
        if let Some(cursorable) = self.cursorable {
            fields.push(("cursorable", cursorable.to_string()));
        }
        if let Some(by_space) = self.by_space {
            fields.push(("bySpace", by_space.to_string()));
        }
        fields
    }
}

impl Notated for ContainerConstraintEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::ContainerConstraint
    }
    fn prefix(&self) -> &Prefix {
        &self.prefix
    }
    fn suffix(&self) -> Option<&str> {
        Some(&self.suffix)
    }
    fn content(&self, defaults: &Defaults) -> Vec<(&'static str, String)> {
        self.require
            .iter()
            .map(|container| ("require", notation::serialize(container, defaults)))
            .collect()
    }
}

impl Notated for AssetEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Asset
    }
    fn prefix(&self) -> &Prefix {
        &UNDEFINED
    }
    fn suffix(&self) -> Option<&str> {
        Some("Asset")
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        vec![("property", self.property.clone())]
    }
}

impl Notated for RelationshipEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Relationship
    }
    fn prefix(&self) -> &Prefix {
        &UNDEFINED
    }
    fn suffix(&self) -> Option<&str> {
        Some("Relationship")
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        self.label.iter().map(|l| ("label", l.clone())).collect()
    }
}

impl Notated for UnknownEntity {
    fn kind(&self) -> EntityKind {
        EntityKind::Unknown
    }
    fn prefix(&self) -> &Prefix {
        &UNDEFINED
    }
    fn suffix(&self) -> Option<&str> {
        None
    }
    fn content(&self, _defaults: &Defaults) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

// =============================================================================
// CANONICAL IDENTITY
// =============================================================================

macro_rules! canonical_identity {
    ($($ty:ty),+ $(,)?) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&notation::serialize(self, &Defaults::none()))
            }
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.to_string() == other.to_string()
            }
        }

        impl Eq for $ty {}

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                self.to_string().cmp(&other.to_string())
            }
        }

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.to_string().hash(state);
            }
        }
    )+};
}

canonical_identity!(
    ConceptEntity,
    ViewEntity,
    ContainerEntity,
    UnitEntity,
    NodeEntity,
    EdgeEntity,
    ReverseConnectionEntity,
    ContainerIndexEntity,
    ContainerConstraintEntity,
    DataModelEntity,
    AssetEntity,
    RelationshipEntity,
    NamedIndividualEntity,
    ReferenceEntity,
);

// =============================================================================
// ENTITY (TAGGED UNION)
// =============================================================================

/// Any entity value.
#[derive(Debug, Clone)]
pub enum Entity {
    Concept(ConceptEntity),
    View(ViewEntity),
    Container(ContainerEntity),
    Unit(UnitEntity),
    Edge(EdgeEntity),
    ReverseConnection(ReverseConnectionEntity),
    ContainerIndex(ContainerIndexEntity),
    ContainerConstraint(ContainerConstraintEntity),
    DataModel(DataModelEntity),
    Node(NodeEntity),
    Asset(AssetEntity),
    Relationship(RelationshipEntity),
    NamedIndividual(NamedIndividualEntity),
    Reference(ReferenceEntity),
    Unknown(UnknownEntity),
}

impl Entity {
    fn as_notated(&self) -> &dyn Notated {
        match self {
            Entity::Concept(e) => e,
            Entity::View(e) => e,
            Entity::Container(e) => e,
            Entity::Unit(e) => e,
            Entity::Edge(e) => e,
            Entity::ReverseConnection(e) => e,
            Entity::ContainerIndex(e) => e,
            Entity::ContainerConstraint(e) => e,
            Entity::DataModel(e) => e,
            Entity::Node(e) => e,
            Entity::Asset(e) => e,
            Entity::Relationship(e) => e,
            Entity::NamedIndividual(e) => e,
            Entity::Reference(e) => e,
            Entity::Unknown(e) => e,
        }
    }

    /// Whether this is the `#N/A` value.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Entity::Unknown(_))
    }

    fn identity(&self) -> (EntityKind, bool, String) {
        let physical_unknown = matches!(self, Entity::Unknown(UnknownEntity { physical: true }));
        (self.kind(), physical_unknown, self.to_string())
    }
}

impl Notated for Entity {
    fn kind(&self) -> EntityKind {
        self.as_notated().kind()
    }
    fn prefix(&self) -> &Prefix {
        self.as_notated().prefix()
    }
    fn suffix(&self) -> Option<&str> {
        self.as_notated().suffix()
    }
    fn content(&self, defaults: &Defaults) -> Vec<(&'static str, String)> {
        self.as_notated().content(defaults)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&notation::serialize(self, &Defaults::none()))
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Entity {}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Typed extraction from the tagged union.
pub trait FromEntity: Sized {
    const KIND: EntityKind;

    fn from_entity(entity: Entity) -> Option<Self>;
}

macro_rules! entity_variants {
    ($($variant:ident($ty:ty)),+ $(,)?) => {$(
        impl From<$ty> for Entity {
            fn from(value: $ty) -> Self {
                Entity::$variant(value)
            }
        }

        impl FromEntity for $ty {
            const KIND: EntityKind = EntityKind::$variant;

            fn from_entity(entity: Entity) -> Option<Self> {
                match entity {
                    Entity::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    )+};
}

entity_variants!(
    Concept(ConceptEntity),
    View(ViewEntity),
    Container(ContainerEntity),
    Unit(UnitEntity),
    Edge(EdgeEntity),
    ReverseConnection(ReverseConnectionEntity),
    ContainerIndex(ContainerIndexEntity),
    ContainerConstraint(ContainerConstraintEntity),
    DataModel(DataModelEntity),
    Node(NodeEntity),
    Asset(AssetEntity),
    Relationship(RelationshipEntity),
    NamedIndividual(NamedIndividualEntity),
    Reference(ReferenceEntity),
    Unknown(UnknownEntity),
);

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn equality_follows_canonical_form() {
        let built = ConceptEntity::new("power", "Generator").with_version("1");
        let literal = ConceptEntity {
            prefix: Prefix::Named("power".to_string()),
            suffix: "Generator".to_string(),
            version: Some("1".to_string()),
        };
        assert_eq!(built, literal);
        assert_eq!(built.to_string(), "power:Generator(version=1)");
    }

    #[test]
    fn ordering_is_by_canonical_string() {
        let set: BTreeSet<ViewEntity> = [
            ViewEntity::new("sp", "Pump"),
            ViewEntity::new("sp", "Asset"),
            ViewEntity::new("abc", "Zeta"),
        ]
        .into_iter()
        .collect();
        let rendered: Vec<String> = set.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["abc:Zeta", "sp:Asset", "sp:Pump"]);
    }

    #[test]
    fn kinds_are_distinct_in_the_union() {
        let concept = Entity::from(ConceptEntity::new("sp", "A"));
        let view = Entity::from(ViewEntity::new("sp", "A"));
        assert_eq!(concept.to_string(), view.to_string());
        assert_ne!(concept, view);
    }

    #[test]
    fn unknown_flavours_are_distinct() {
        let conceptual = Entity::Unknown(UnknownEntity { physical: false });
        let physical = Entity::Unknown(UnknownEntity { physical: true });
        assert_eq!(conceptual.to_string(), UNKNOWN_TOKEN);
        assert_ne!(conceptual, physical);
        assert_eq!(conceptual.suffix(), None);
        assert!(conceptual.content(&Defaults::none()).is_empty());
    }

    #[test]
    fn edge_has_keyword_suffix_and_no_prefix() {
        let edge = EdgeEntity::default();
        assert_eq!(edge.suffix(), Some("edge"));
        assert_eq!(edge.prefix(), &Prefix::Undefined);
        assert_eq!(edge.to_string(), "edge");
    }

    #[test]
    fn typed_extraction() {
        let entity = Entity::from(NodeEntity::new("sp", "type"));
        assert!(ViewEntity::from_entity(entity.clone()).is_none());
        assert!(NodeEntity::from_entity(entity).is_some());
    }
}
