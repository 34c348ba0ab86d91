//! # Physical Model
//!
//! Storage-oriented counterpart of the conceptual model: views expose
//! properties, containers store them.
//!
//! ## Storage Invariant
//!
//! A property is either stored (both `container` and `container_property`
//! set, connection `None` or direct) or connected (an edge or reverse
//! connection, nothing stored). [`PhysicalProperty::storage`] enforces it.

use crate::DataModelError;
use crate::conceptual::ConceptualPropertyId;
use crate::entity::notation::Defaults;
use crate::entity::{
    ConceptEntity, ContainerConstraintEntity, ContainerEntity, ContainerIndexEntity,
    DataModelEntity, EdgeEntity, NodeEntity, Prefix, ReverseConnectionEntity, ViewEntity,
};
use crate::types::PhysicalDataType;
use std::fmt;

// =============================================================================
// METADATA
// =============================================================================

/// Identity of a physical model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalMetadata {
    /// Default space for views, containers and node types.
    pub space: String,
    pub external_id: String,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub creator: Vec<String>,
}

impl PhysicalMetadata {
    #[must_use]
    pub fn new(
        space: impl Into<String>,
        external_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            space: space.into(),
            external_id: external_id.into(),
            version: version.into(),
            name: None,
            description: None,
            creator: Vec::new(),
        }
    }

    #[must_use]
    pub fn defaults(&self) -> Defaults {
        Defaults::prefix_version(&self.space, &self.version)
    }

    #[must_use]
    pub fn entity(&self) -> DataModelEntity {
        DataModelEntity {
            prefix: Prefix::named(&self.space),
            suffix: self.external_id.clone(),
            version: Some(self.version.clone()),
        }
    }
}

// =============================================================================
// VALUE TYPES & CONNECTIONS
// =============================================================================

/// What a physical property holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhysicalValueType {
    Data(PhysicalDataType),
    /// Points at another view (direct relations and connections).
    View(ViewEntity),
    Unknown,
}

impl PhysicalValueType {
    #[must_use]
    pub fn view(&self) -> Option<&ViewEntity> {
        match self {
            PhysicalValueType::View(view) => Some(view),
            _ => None,
        }
    }
}

impl fmt::Display for PhysicalValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalValueType::Data(data_type) => write!(f, "{}", data_type),
            PhysicalValueType::View(view) => write!(f, "{}", view),
            PhysicalValueType::Unknown => f.write_str(crate::entity::UNKNOWN_TOKEN),
        }
    }
}

/// How a relation-valued property reaches its target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Connection {
    /// Stored in the container as a node reference.
    Direct,
    Edge(EdgeEntity),
    Reverse(ReverseConnectionEntity),
}

impl Connection {
    /// Edges and reverse connections are not stored in a container.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        matches!(self, Connection::Direct)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Direct => f.write_str("direct"),
            Connection::Edge(edge) => write!(f, "{}", edge),
            Connection::Reverse(reverse) => write!(f, "{}", reverse),
        }
    }
}

/// Classification of a property by how its values are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionKind {
    Primitive,
    DirectRelation,
    EdgeConnection,
    ReverseConnection,
}

/// Where a property's values live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage<'a> {
    Stored {
        container: &'a ContainerEntity,
        container_property: &'a str,
    },
    Connected,
}

// =============================================================================
// VIEWS, CONTAINERS, PROPERTIES
// =============================================================================

/// Identifier of a physical property: owning view plus property id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalPropertyId {
    pub view: ViewEntity,
    pub property: String,
}

impl fmt::Display for PhysicalPropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.view, self.property)
    }
}

/// A view: the query surface over one or more containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub view: ViewEntity,
    pub name: Option<String>,
    pub description: Option<String>,
    pub implements: Vec<ViewEntity>,
    /// Node type filter for edge-less views, if any.
    pub filter: Option<NodeEntity>,
    /// The concept this view came from, stamped by sync-linking.
    pub conceptual: Option<ConceptEntity>,
}

impl View {
    #[must_use]
    pub fn new(view: ViewEntity) -> Self {
        Self {
            view,
            name: None,
            description: None,
            implements: Vec::new(),
            filter: None,
            conceptual: None,
        }
    }

    #[must_use]
    pub fn implementing(mut self, parents: impl IntoIterator<Item = ViewEntity>) -> Self {
        self.implements = parents.into_iter().collect();
        self
    }
}

/// What kind of instance a container stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum UsedFor {
    #[default]
    Node,
    Edge,
    All,
}

impl UsedFor {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UsedFor::Node => "node",
            UsedFor::Edge => "edge",
            UsedFor::All => "all",
        }
    }
}

impl std::str::FromStr for UsedFor {
    type Err = crate::NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "node" => Ok(UsedFor::Node),
            "edge" => Ok(UsedFor::Edge),
            "all" => Ok(UsedFor::All),
            _ => Err(crate::NotationError::InvalidValue {
                field: "used_for".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// A container: the physical table behind one or more views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub container: ContainerEntity,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Container-level constraints, ordered by canonical form.
    pub constraints: Vec<ContainerConstraintEntity>,
    pub used_for: UsedFor,
}

impl Container {
    #[must_use]
    pub fn new(container: ContainerEntity) -> Self {
        Self {
            container,
            name: None,
            description: None,
            constraints: Vec::new(),
            used_for: UsedFor::Node,
        }
    }

    /// Add a constraint unless one with the same canonical form exists.
    pub fn add_constraint(&mut self, constraint: ContainerConstraintEntity) {
        if let Err(at) = self.constraints.binary_search(&constraint) {
            self.constraints.insert(at, constraint);
        }
    }
}

/// A property exposed by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalProperty {
    pub view: ViewEntity,
    pub view_property: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub value_type: PhysicalValueType,
    pub connection: Option<Connection>,
    pub nullable: bool,
    pub immutable: bool,
    pub is_list: bool,
    pub default: Option<String>,
    pub container: Option<ContainerEntity>,
    pub container_property: Option<String>,
    pub index: Vec<ContainerIndexEntity>,
    pub constraint: Vec<ContainerConstraintEntity>,
    /// The conceptual property this came from, stamped by sync-linking.
    pub conceptual: Option<ConceptualPropertyId>,
}

impl PhysicalProperty {
    /// A nullable, single-valued property with no storage yet.
    #[must_use]
    pub fn new(
        view: ViewEntity,
        view_property: impl Into<String>,
        value_type: PhysicalValueType,
    ) -> Self {
        Self {
            view,
            view_property: view_property.into(),
            name: None,
            description: None,
            value_type,
            connection: None,
            nullable: true,
            immutable: false,
            is_list: false,
            default: None,
            container: None,
            container_property: None,
            index: Vec::new(),
            constraint: Vec::new(),
            conceptual: None,
        }
    }

    #[must_use]
    pub fn stored_in(
        mut self,
        container: ContainerEntity,
        container_property: impl Into<String>,
    ) -> Self {
        self.container = Some(container);
        self.container_property = Some(container_property.into());
        self
    }

    #[must_use]
    pub fn connected_by(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    #[must_use]
    pub fn id(&self) -> PhysicalPropertyId {
        PhysicalPropertyId {
            view: self.view.clone(),
            property: self.view_property.clone(),
        }
    }

    /// Classify storage, rejecting properties that are half stored or both
    /// stored and connected.
    pub fn storage(&self) -> Result<Storage<'_>, DataModelError> {
        let stored_connection = self.connection.as_ref().is_none_or(Connection::is_stored);
        match (&self.container, &self.container_property) {
            (Some(container), Some(container_property)) if stored_connection => {
                Ok(Storage::Stored {
                    container,
                    container_property,
                })
            }
            (None, None) if !stored_connection => Ok(Storage::Connected),
            _ => Err(DataModelError::HalfStoredProperty {
                property: self.id().to_string(),
            }),
        }
    }

    /// Whether this property stores a node reference rather than a primitive.
    #[must_use]
    pub fn is_direct_relation(&self) -> bool {
        matches!(self.connection, Some(Connection::Direct))
            || matches!(
                self.value_type,
                PhysicalValueType::Data(PhysicalDataType::DirectRelation)
            )
    }

    #[must_use]
    pub fn connection_kind(&self) -> ConnectionKind {
        match &self.connection {
            Some(Connection::Edge(_)) => ConnectionKind::EdgeConnection,
            Some(Connection::Reverse(_)) => ConnectionKind::ReverseConnection,
            Some(Connection::Direct) => ConnectionKind::DirectRelation,
            None if self.is_direct_relation() => ConnectionKind::DirectRelation,
            None => ConnectionKind::Primitive,
        }
    }

    /// The primitive type written to the container column, for stored properties.
    #[must_use]
    pub fn container_type(&self) -> Option<PhysicalDataType> {
        if self.is_direct_relation() {
            return Some(PhysicalDataType::DirectRelation);
        }
        match &self.value_type {
            PhysicalValueType::Data(data_type) => Some(data_type.clone()),
            PhysicalValueType::View(_) | PhysicalValueType::Unknown => None,
        }
    }
}

/// One value of an enumeration collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub collection: String,
    pub value: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A node type declared by the model (edge types included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeType {
    pub node: NodeEntity,
    pub name: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// MODEL
// =============================================================================

/// A complete physical model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalModel {
    pub metadata: PhysicalMetadata,
    pub views: Vec<View>,
    pub containers: Vec<Container>,
    pub properties: Vec<PhysicalProperty>,
    pub enums: Vec<EnumValue>,
    pub nodes: Vec<NodeType>,
}

impl PhysicalModel {
    #[must_use]
    pub fn new(metadata: PhysicalMetadata) -> Self {
        Self {
            metadata,
            views: Vec::new(),
            containers: Vec::new(),
            properties: Vec::new(),
            enums: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// A view entity in this model's space and version.
    #[must_use]
    pub fn view_entity(&self, suffix: impl Into<String>) -> ViewEntity {
        ViewEntity::new(&self.metadata.space, suffix).with_version(&self.metadata.version)
    }

    #[must_use]
    pub fn view(&self, entity: &ViewEntity) -> Option<&View> {
        self.views.iter().find(|v| &v.view == entity)
    }

    #[must_use]
    pub fn container(&self, entity: &ContainerEntity) -> Option<&Container> {
        self.containers.iter().find(|c| &c.container == entity)
    }

    pub fn properties_of<'a>(
        &'a self,
        entity: &'a ViewEntity,
    ) -> impl Iterator<Item = &'a PhysicalProperty> + 'a {
        self.properties.iter().filter(move |p| &p.view == entity)
    }

    #[must_use]
    pub fn property(&self, id: &PhysicalPropertyId) -> Option<&PhysicalProperty> {
        self.properties
            .iter()
            .find(|p| p.view == id.view && p.view_property == id.property)
    }

    /// Stored properties writing to `container`.
    pub fn container_properties<'a>(
        &'a self,
        container: &'a ContainerEntity,
    ) -> impl Iterator<Item = &'a PhysicalProperty> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.container.as_ref() == Some(container))
    }
}

// =============================================================================
// TESTS
// =============================================================================
