//! # Tabular Form
//!
//! The flat, string-typed shape of both models: one row per concept, view,
//! container or property, every entity cell in notation form. This is what
//! spreadsheet readers produce and what the CLI reads and writes as JSON.
//!
//! Reading is best effort. A cell that fails to parse is reported as a
//! `MalformedNotation` error and its row is skipped; the rest of the table
//! is still read.
//!
//! Cells are written against the model's defaults so unchanged rows stay
//! compact (`Pump` rather than `sp:Pump(version=v1)`).

use crate::conceptual::{
    Concept, ConceptualMetadata, ConceptualModel, ConceptualProperty, ConceptualPropertyId,
    ConceptualValueType,
};
use crate::entity::notation::{self, Defaults, NotationParser, split_top_level};
use crate::entity::{
    ConceptEntity, ContainerConstraintEntity, ContainerEntity, ContainerIndexEntity,
    EdgeEntity, FromEntity, NodeEntity, Notated, ReverseConnectionEntity, UNKNOWN_TOKEN,
    ViewEntity,
};
use crate::issues::{Issue, IssueCode, IssueSink};
use crate::physical::{
    Connection, Container, EnumValue, NodeType, PhysicalMetadata, PhysicalModel,
    PhysicalProperty, PhysicalPropertyId, PhysicalValueType, UsedFor, View,
};
use crate::types::{DataType, PhysicalDataType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between union branches in a value type cell.
pub const UNION_SEPARATOR: char = '|';

/// Separator between owner and property in a link cell.
pub const LINK_SEPARATOR: char = '.';

// =============================================================================
// CONCEPTUAL ROWS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptualMetadataRow {
    pub prefix: String,
    pub namespace: Option<String>,
    pub external_id: String,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub creator: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptRow {
    pub concept: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Comma separated parents.
    pub implements: String,
    pub instance_source: Option<String>,
    pub physical: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptualPropertyRow {
    pub concept: String,
    pub property: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// A data type, a concept, or branches joined by `|`.
    pub value_type: String,
    pub min_count: Option<u64>,
    /// Empty means unbounded.
    pub max_count: Option<u64>,
    pub default: Option<String>,
    pub instance_source: Option<String>,
    /// `view.property` of the linked physical property.
    pub physical: Option<String>,
}

/// A conceptual model in tabular form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptualTable {
    pub metadata: ConceptualMetadataRow,
    pub prefixes: BTreeMap<String, String>,
    pub concepts: Vec<ConceptRow>,
    pub properties: Vec<ConceptualPropertyRow>,
}

impl ConceptualTable {
    /// Build the model. Rows with malformed cells are reported and skipped.
    pub fn read(&self, parser: &NotationParser, issues: &mut impl IssueSink) -> ConceptualModel {
        let row = &self.metadata;
        let mut metadata = ConceptualMetadata::new(&row.prefix, &row.external_id, &row.version);
        metadata.namespace = row.namespace.clone();
        metadata.name = row.name.clone();
        metadata.description = row.description.clone();
        metadata.creator = row.creator.clone();

        let mut cells = Cells::new(parser, metadata.defaults(), issues);
        let mut model = ConceptualModel::new(metadata);
        model.prefixes = self.prefixes.clone();

        for row in &self.concepts {
            if let Some(concept) = cells.concept(row) {
                model.add_concept(concept);
            }
        }
        for row in &self.properties {
            if let Some(property) = cells.conceptual_property(row) {
                model.add_property(property);
            }
        }
        tracing::debug!(
            concepts = model.concepts.len(),
            properties = model.properties.len(),
            "conceptual table read"
        );
        model
    }

    #[must_use]
    pub fn from_model(model: &ConceptualModel) -> Self {
        let defaults = model.metadata.defaults();
        let metadata = &model.metadata;
        Self {
            metadata: ConceptualMetadataRow {
                prefix: metadata.prefix.clone(),
                namespace: metadata.namespace.clone(),
                external_id: metadata.external_id.clone(),
                version: metadata.version.clone(),
                name: metadata.name.clone(),
                description: metadata.description.clone(),
                creator: metadata.creator.clone(),
            },
            prefixes: model.prefixes.clone(),
            concepts: model
                .concepts
                .iter()
                .map(|concept| ConceptRow {
                    concept: write_concept(&concept.concept, &defaults),
                    name: concept.name.clone(),
                    description: concept.description.clone(),
                    implements: write_list(&concept.implements, &defaults),
                    instance_source: concept.instance_source.clone(),
                    physical: concept.physical.as_ref().map(|v| write(v, &Defaults::none())),
                })
                .collect(),
            properties: model
                .properties
                .iter()
                .map(|property| ConceptualPropertyRow {
                    concept: write_concept(&property.concept, &defaults),
                    property: property.property.clone(),
                    name: property.name.clone(),
                    description: property.description.clone(),
                    value_type: write_conceptual_value_type(&property.value_type, &defaults),
                    min_count: property.min_count,
                    max_count: property.max_count,
                    default: property.default.clone(),
                    instance_source: property.instance_source.clone(),
                    physical: property.physical.as_ref().map(|id| {
                        write_link(&id.view, &id.property, &Defaults::none())
                    }),
                })
                .collect(),
        }
    }
}

// =============================================================================
// PHYSICAL ROWS
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalMetadataRow {
    pub space: String,
    pub external_id: String,
    pub version: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub creator: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewRow {
    pub view: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub implements: String,
    pub filter: Option<String>,
    pub conceptual: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerRow {
    pub container: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Comma separated constraints.
    pub constraint: String,
    /// `node`, `edge` or `all`; empty reads as `node`.
    pub used_for: String,
}

fn nullable_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalPropertyRow {
    pub view: String,
    pub view_property: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// A physical data type, a view, or `#N/A`.
    pub value_type: String,
    /// Empty, `direct`, `edge(...)` or `reverse(...)`.
    pub connection: String,
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    pub immutable: bool,
    pub is_list: bool,
    pub default: Option<String>,
    pub container: Option<String>,
    pub container_property: Option<String>,
    pub index: String,
    pub constraint: String,
    /// `concept.property` of the linked conceptual property.
    pub conceptual: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumRow {
    pub collection: String,
    pub value: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRow {
    pub node: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A physical model in tabular form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalTable {
    pub metadata: PhysicalMetadataRow,
    pub views: Vec<ViewRow>,
    pub containers: Vec<ContainerRow>,
    pub properties: Vec<PhysicalPropertyRow>,
    pub enums: Vec<EnumRow>,
    pub nodes: Vec<NodeRow>,
}

impl PhysicalTable {
    /// Build the model. Rows with malformed cells are reported and skipped.
    pub fn read(&self, parser: &NotationParser, issues: &mut impl IssueSink) -> PhysicalModel {
        let row = &self.metadata;
        let mut metadata = PhysicalMetadata::new(&row.space, &row.external_id, &row.version);
        metadata.name = row.name.clone();
        metadata.description = row.description.clone();
        metadata.creator = row.creator.clone();

        let mut cells = Cells::new(parser, metadata.defaults(), issues);
        let mut model = PhysicalModel::new(metadata);

        model.views = self.views.iter().filter_map(|row| cells.view(row)).collect();
        model.containers = self
            .containers
            .iter()
            .filter_map(|row| cells.container(row))
            .collect();
        model.properties = self
            .properties
            .iter()
            .filter_map(|row| cells.physical_property(row))
            .collect();
        model.enums = self
            .enums
            .iter()
            .map(|row| EnumValue {
                collection: row.collection.clone(),
                value: row.value.clone(),
                name: row.name.clone(),
                description: row.description.clone(),
            })
            .collect();
        model.nodes = self.nodes.iter().filter_map(|row| cells.node(row)).collect();

        tracing::debug!(
            views = model.views.len(),
            containers = model.containers.len(),
            properties = model.properties.len(),
            "physical table read"
        );
        model
    }

    #[must_use]
    pub fn from_model(model: &PhysicalModel) -> Self {
        let defaults = model.metadata.defaults();
        let metadata = &model.metadata;
        let concept_defaults = Defaults::none();
        Self {
            metadata: PhysicalMetadataRow {
                space: metadata.space.clone(),
                external_id: metadata.external_id.clone(),
                version: metadata.version.clone(),
                name: metadata.name.clone(),
                description: metadata.description.clone(),
                creator: metadata.creator.clone(),
            },
            views: model
                .views
                .iter()
                .map(|view| ViewRow {
                    view: write(&view.view, &defaults),
                    name: view.name.clone(),
                    description: view.description.clone(),
                    implements: write_list(&view.implements, &defaults),
                    filter: view.filter.as_ref().map(|node| write(node, &defaults)),
                    conceptual: view.conceptual.as_ref().map(|c| write(c, &concept_defaults)),
                })
                .collect(),
            containers: model
                .containers
                .iter()
                .map(|container| ContainerRow {
                    container: write(&container.container, &defaults),
                    name: container.name.clone(),
                    description: container.description.clone(),
                    constraint: write_list(&container.constraints, &defaults),
                    used_for: container.used_for.as_str().to_string(),
                })
                .collect(),
            properties: model
                .properties
                .iter()
                .map(|property| PhysicalPropertyRow {
                    view: write(&property.view, &defaults),
                    view_property: property.view_property.clone(),
                    name: property.name.clone(),
                    description: property.description.clone(),
                    value_type: write_physical_value_type(&property.value_type, &defaults),
                    connection: property
                        .connection
                        .as_ref()
                        .map(|c| write_connection(c, &defaults))
                        .unwrap_or_default(),
                    nullable: property.nullable,
                    immutable: property.immutable,
                    is_list: property.is_list,
                    default: property.default.clone(),
                    container: property.container.as_ref().map(|c| write(c, &defaults)),
                    container_property: property.container_property.clone(),
                    index: write_list(&property.index, &defaults),
                    constraint: write_list(&property.constraint, &defaults),
                    conceptual: property.conceptual.as_ref().map(|id| {
                        write_link(&id.concept, &id.property, &concept_defaults)
                    }),
                })
                .collect(),
            enums: model
                .enums
                .iter()
                .map(|value| EnumRow {
                    collection: value.collection.clone(),
                    value: value.value.clone(),
                    name: value.name.clone(),
                    description: value.description.clone(),
                })
                .collect(),
            nodes: model
                .nodes
                .iter()
                .map(|node| NodeRow {
                    node: write(&node.node, &defaults),
                    name: node.name.clone(),
                    description: node.description.clone(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// READING CELLS
// =============================================================================

/// Cell parser for one table. Every `None` it returns has been reported.
struct Cells<'a, S> {
    parser: &'a NotationParser,
    defaults: Defaults,
    issues: &'a mut S,
}

impl<'a, S: IssueSink> Cells<'a, S> {
    fn new(parser: &'a NotationParser, defaults: Defaults, issues: &'a mut S) -> Self {
        Self {
            parser,
            defaults,
            issues,
        }
    }

    fn malformed(&mut self, raw: &str, expected: &str) {
        self.issues.report(
            Issue::error(IssueCode::MalformedNotation, format!("expected {}", expected))
                .about(raw),
        );
    }

    fn entity<T: FromEntity>(&mut self, text: &str) -> Option<T> {
        let parsed = parse_cell::<T>(self.parser, text, &self.defaults);
        self.reported(text, parsed)
    }

    fn entity_with<T: FromEntity>(&mut self, text: &str, defaults: &Defaults) -> Option<T> {
        let parsed = parse_cell::<T>(self.parser, text, defaults);
        self.reported(text, parsed)
    }

    fn reported<T: FromEntity>(&mut self, text: &str, parsed: Option<T>) -> Option<T> {
        if parsed.is_none() {
            self.malformed(text, T::KIND.name());
        }
        parsed
    }

    /// Blank cells are absent, not malformed.
    fn optional<T: FromEntity>(&mut self, text: Option<&str>) -> Option<Option<T>> {
        match text.map(str::trim).filter(|t| !t.is_empty()) {
            None => Some(None),
            Some(text) => self.entity(text).map(Some),
        }
    }

    fn list<T: FromEntity>(&mut self, text: &str) -> Option<Vec<T>> {
        split_top_level(text, ',')
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| self.entity(item))
            .collect()
    }

    /// `owner.property`, split at the last separator.
    fn link<T: FromEntity>(
        &mut self,
        text: Option<&str>,
        defaults: &Defaults,
    ) -> Option<Option<(T, String)>> {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Some(None);
        };
        let Some((owner, property)) = text.rsplit_once(LINK_SEPARATOR) else {
            self.malformed(text, "owner.property");
            return None;
        };
        let owner = self.entity_with::<T>(owner, defaults)?;
        Some(Some((owner, property.to_string())))
    }

    // -------------------------------------------------------------------------
    // Conceptual
    // -------------------------------------------------------------------------

    fn concept(&mut self, row: &ConceptRow) -> Option<Concept> {
        let mut concept = Concept::new(self.entity(&row.concept)?)
            .implementing(self.list::<ConceptEntity>(&row.implements)?);
        concept.name = row.name.clone();
        concept.description = row.description.clone();
        concept.instance_source = row.instance_source.clone();
        concept.physical = match row.physical.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                Some(self.entity_with::<ViewEntity>(text, &Defaults::none())?)
            }
            _ => None,
        };
        Some(concept)
    }

    fn conceptual_value_type(&mut self, text: &str) -> Option<ConceptualValueType> {
        let mut branches = Vec::new();
        for branch in split_top_level(text, UNION_SEPARATOR) {
            let branch = branch.trim();
            let value_type = if branch == UNKNOWN_TOKEN {
                ConceptualValueType::Unknown
            } else if let Ok(data_type) = branch.parse::<DataType>() {
                ConceptualValueType::Data(data_type)
            } else {
                ConceptualValueType::Concept(self.entity(branch)?)
            };
            branches.push(value_type);
        }
        match branches.len() {
            1 => branches.pop(),
            _ => Some(ConceptualValueType::Union(branches)),
        }
    }

    fn conceptual_property(&mut self, row: &ConceptualPropertyRow) -> Option<ConceptualProperty> {
        let value_type = self.conceptual_value_type(&row.value_type)?;
        let physical = self
            .link::<ViewEntity>(row.physical.as_deref(), &Defaults::none())?
            .map(|(view, property)| PhysicalPropertyId { view, property });
        let concept = self.entity(&row.concept)?;
        let mut property = ConceptualProperty::new(concept, &row.property, value_type)
            .with_cardinality(row.min_count, row.max_count);
        property.name = row.name.clone();
        property.description = row.description.clone();
        property.default = row.default.clone();
        property.instance_source = row.instance_source.clone();
        property.physical = physical;
        Some(property)
    }

    // -------------------------------------------------------------------------
    // Physical
    // -------------------------------------------------------------------------

    fn view(&mut self, row: &ViewRow) -> Option<View> {
        let mut view = View::new(self.entity(&row.view)?)
            .implementing(self.list::<ViewEntity>(&row.implements)?);
        view.name = row.name.clone();
        view.description = row.description.clone();
        view.filter = self.optional::<NodeEntity>(row.filter.as_deref())?;
        view.conceptual = match row.conceptual.as_deref() {
            Some(text) if !text.trim().is_empty() => {
                Some(self.entity_with::<ConceptEntity>(text, &Defaults::none())?)
            }
            _ => None,
        };
        Some(view)
    }

    fn container(&mut self, row: &ContainerRow) -> Option<Container> {
        let mut container = Container::new(self.entity(&row.container)?);
        container.name = row.name.clone();
        container.description = row.description.clone();
        for constraint in self.list::<ContainerConstraintEntity>(&row.constraint)? {
            container.add_constraint(constraint);
        }
        container.used_for = match row.used_for.parse::<UsedFor>() {
            Ok(used_for) => used_for,
            Err(_) => {
                self.malformed(&row.used_for, "node, edge or all");
                return None;
            }
        };
        Some(container)
    }

    fn physical_value_type(&mut self, text: &str) -> Option<PhysicalValueType> {
        let text = text.trim();
        if text == UNKNOWN_TOKEN {
            return Some(PhysicalValueType::Unknown);
        }
        if let Ok(data_type) = text.parse::<PhysicalDataType>() {
            return Some(PhysicalValueType::Data(data_type));
        }
        self.entity(text).map(PhysicalValueType::View)
    }

    fn connection(&mut self, text: &str) -> Option<Option<Connection>> {
        let text = text.trim();
        if text.is_empty() {
            return Some(None);
        }
        if text.eq_ignore_ascii_case("direct") {
            return Some(Some(Connection::Direct));
        }
        if text.starts_with("reverse") {
            return self
                .entity::<ReverseConnectionEntity>(text)
                .map(|reverse| Some(Connection::Reverse(reverse)));
        }
        self.entity::<EdgeEntity>(text)
            .map(|edge| Some(Connection::Edge(edge)))
    }

    fn physical_property(&mut self, row: &PhysicalPropertyRow) -> Option<PhysicalProperty> {
        let view = self.entity(&row.view)?;
        let value_type = self.physical_value_type(&row.value_type)?;
        let mut property = PhysicalProperty::new(view, &row.view_property, value_type);
        property.name = row.name.clone();
        property.description = row.description.clone();
        property.connection = self.connection(&row.connection)?;
        property.nullable = row.nullable;
        property.immutable = row.immutable;
        property.is_list = row.is_list;
        property.default = row.default.clone();
        property.container = self.optional::<ContainerEntity>(row.container.as_deref())?;
        property.container_property = row
            .container_property
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        property.index = self.list::<ContainerIndexEntity>(&row.index)?;
        property.constraint = self.list::<ContainerConstraintEntity>(&row.constraint)?;
        property.conceptual = self
            .link::<ConceptEntity>(row.conceptual.as_deref(), &Defaults::none())?
            .map(|(concept, property)| ConceptualPropertyId { concept, property });
        Some(property)
    }

    fn node(&mut self, row: &NodeRow) -> Option<NodeType> {
        Some(NodeType {
            node: self.entity(&row.node)?,
            name: row.name.clone(),
            description: row.description.clone(),
        })
    }
}

fn parse_cell<T: FromEntity>(
    parser: &NotationParser,
    text: &str,
    defaults: &Defaults,
) -> Option<T> {
    parser
        .parse_or_raw(T::KIND, text, defaults)
        .ok()
        .and_then(T::from_entity)
}

// =============================================================================
// WRITING CELLS
// =============================================================================

fn write<T: Notated + ?Sized>(entity: &T, defaults: &Defaults) -> String {
    notation::serialize(entity, defaults)
}

fn write_list<T: Notated>(entities: &[T], defaults: &Defaults) -> String {
    entities
        .iter()
        .map(|e| write(e, defaults))
        .collect::<Vec<_>>()
        .join(",")
}

fn write_link<T: Notated>(owner: &T, property: &str, defaults: &Defaults) -> String {
    format!("{}{}{}", write(owner, defaults), LINK_SEPARATOR, property)
}

/// A compact concept that reads back as a data type is written in full.
fn write_concept(concept: &ConceptEntity, defaults: &Defaults) -> String {
    let compact = write(concept, defaults);
    if compact.parse::<DataType>().is_ok() || compact == UNKNOWN_TOKEN {
        write(concept, &Defaults::none())
    } else {
        compact
    }
}

fn write_conceptual_value_type(value_type: &ConceptualValueType, defaults: &Defaults) -> String {
    match value_type {
        ConceptualValueType::Data(data_type) => data_type.to_string(),
        ConceptualValueType::Concept(concept) => write_concept(concept, defaults),
        ConceptualValueType::Union(branches) => {
            let separator = format!(" {} ", UNION_SEPARATOR);
            branches
                .iter()
                .map(|branch| write_conceptual_value_type(branch, defaults))
                .collect::<Vec<_>>()
                .join(separator.as_str())
        }
        ConceptualValueType::Unknown => UNKNOWN_TOKEN.to_string(),
    }
}

fn write_physical_value_type(value_type: &PhysicalValueType, defaults: &Defaults) -> String {
    match value_type {
        PhysicalValueType::Data(data_type) => data_type.to_string(),
        PhysicalValueType::View(view) => {
            let compact = write(view, defaults);
            if compact.parse::<PhysicalDataType>().is_ok() {
                write(view, &Defaults::none())
            } else {
                compact
            }
        }
        PhysicalValueType::Unknown => UNKNOWN_TOKEN.to_string(),
    }
}

fn write_connection(connection: &Connection, defaults: &Defaults) -> String {
    match connection {
        Connection::Direct => "direct".to_string(),
        Connection::Edge(edge) => write(edge, defaults),
        Connection::Reverse(reverse) => write(reverse, defaults),
    }
}

// =============================================================================
// TESTS
// =============================================================================
