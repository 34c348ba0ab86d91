//! # Data Model Analysis
//!
//! Read-only queries over the two graphs of a model:
//!
//! - the **inheritance graph** (node → implemented parents)
//! - the **linkage graph** (node → node, through properties whose value
//!   type is itself a node reference)
//!
//! The same queries serve conceptual models (nodes are concepts) and
//! physical models (nodes are views) through [`SchemaGraph`].
//!
//! The ancestor closure is computed once per [`Analysis`]. A cyclic model
//! still builds an analysis; every closure-based query then returns the
//! cycle error.

use crate::DataModelError;
use crate::conceptual::{
    ConceptualModel, ConceptualProperty, ConceptualPropertyId, ConceptualValueType,
};
use crate::entity::{ConceptEntity, ViewEntity};
use crate::graph::InheritanceGraph;
use crate::physical::{Connection, PhysicalModel, PhysicalProperty};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// SCHEMA GRAPH TRAIT
// =============================================================================

/// A model seen as nodes with parents and properties.
pub trait SchemaGraph {
    type Node: Ord + Clone + fmt::Display;
    type Property;

    /// Declared nodes with their direct parents.
    fn nodes(&self) -> Vec<(&Self::Node, &[Self::Node])>;

    fn properties(&self) -> &[Self::Property];

    fn owner(property: &Self::Property) -> &Self::Node;

    fn property_id(property: &Self::Property) -> &str;

    /// The node a property points at, when its value type is a node reference.
    fn link_target(property: &Self::Property) -> Option<&Self::Node>;

    /// Upper bound on values; `None` is unbounded.
    fn max_count(property: &Self::Property) -> Option<u64>;
}

impl SchemaGraph for ConceptualModel {
    type Node = ConceptEntity;
    type Property = ConceptualProperty;

    fn nodes(&self) -> Vec<(&ConceptEntity, &[ConceptEntity])> {
        self.concepts
            .iter()
            .map(|c| (&c.concept, c.implements.as_slice()))
            .collect()
    }

    fn properties(&self) -> &[ConceptualProperty] {
        &self.properties
    }

    fn owner(property: &ConceptualProperty) -> &ConceptEntity {
        &property.concept
    }

    fn property_id(property: &ConceptualProperty) -> &str {
        &property.property
    }

    fn link_target(property: &ConceptualProperty) -> Option<&ConceptEntity> {
        property.value_type.concept()
    }

    fn max_count(property: &ConceptualProperty) -> Option<u64> {
        property.max_count
    }
}

impl SchemaGraph for PhysicalModel {
    type Node = ViewEntity;
    type Property = PhysicalProperty;

    fn nodes(&self) -> Vec<(&ViewEntity, &[ViewEntity])> {
        self.views
            .iter()
            .map(|v| (&v.view, v.implements.as_slice()))
            .collect()
    }

    fn properties(&self) -> &[PhysicalProperty] {
        &self.properties
    }

    fn owner(property: &PhysicalProperty) -> &ViewEntity {
        &property.view
    }

    fn property_id(property: &PhysicalProperty) -> &str {
        &property.view_property
    }

    fn link_target(property: &PhysicalProperty) -> Option<&ViewEntity> {
        property.value_type.view()
    }

    fn max_count(property: &PhysicalProperty) -> Option<u64> {
        let connected = matches!(
            property.connection,
            Some(Connection::Edge(_) | Connection::Reverse(_))
        );
        if property.is_list || connected {
            None
        } else {
            Some(1)
        }
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// One edge of the linkage graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Linkage<N> {
    pub source: N,
    pub property: String,
    pub target: N,
    pub max_count: Option<u64>,
}

/// Endpoints of an edge class: the value types of its start and end
/// properties. `None` when the endpoint is not a node reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeClass<N> {
    pub start: Option<N>,
    pub end: Option<N>,
}

// =============================================================================
// ANALYSIS
// =============================================================================

/// Graph queries over one model.
pub struct Analysis<'a, M: SchemaGraph> {
    model: &'a M,
    graph: InheritanceGraph<M::Node>,
    declared: BTreeSet<M::Node>,
    closure: Result<BTreeMap<M::Node, Vec<M::Node>>, DataModelError>,
}

impl<'a, M: SchemaGraph> Analysis<'a, M> {
    #[must_use]
    pub fn new(model: &'a M) -> Self {
        let mut graph = InheritanceGraph::new();
        let mut declared = BTreeSet::new();
        for (node, parents) in model.nodes() {
            declared.insert(node.clone());
            graph.add_node(node.clone(), parents.iter().cloned());
        }
        // Owners of orphan properties are nodes too.
        for property in model.properties() {
            graph.add_node(M::owner(property).clone(), []);
        }
        let closure = graph.ancestor_closure();
        tracing::debug!(
            nodes = declared.len(),
            acyclic = closure.is_ok(),
            "analysis built"
        );
        Self {
            model,
            graph,
            declared,
            closure,
        }
    }

    #[must_use]
    pub fn model(&self) -> &'a M {
        self.model
    }

    #[must_use]
    pub fn graph(&self) -> &InheritanceGraph<M::Node> {
        &self.graph
    }

    /// Whether `node` is declared by the model (not merely referenced).
    #[must_use]
    pub fn is_declared(&self, node: &M::Node) -> bool {
        self.declared.contains(node)
    }

    // -------------------------------------------------------------------------
    // Inheritance
    // -------------------------------------------------------------------------

    /// Every node's ancestors, nearest first.
    pub fn ancestors_by_node(
        &self,
    ) -> Result<&BTreeMap<M::Node, Vec<M::Node>>, DataModelError> {
        self.closure.as_ref().map_err(Clone::clone)
    }

    /// Ancestors of `node`, nearest first.
    pub fn ancestors_of(&self, node: &M::Node) -> Result<&[M::Node], DataModelError> {
        Ok(self
            .ancestors_by_node()?
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// Whether `node` is `ancestor` or inherits from it.
    pub fn is_a(&self, node: &M::Node, ancestor: &M::Node) -> Result<bool, DataModelError> {
        Ok(node == ancestor || self.ancestors_of(node)?.contains(ancestor))
    }

    /// Parents referenced but never declared, as (child, parent) pairs.
    #[must_use]
    pub fn undefined_parents(&self) -> BTreeSet<(M::Node, M::Node)> {
        self.model
            .nodes()
            .into_iter()
            .flat_map(|(node, parents)| {
                parents
                    .iter()
                    .filter(|parent| !self.declared.contains(*parent))
                    .map(move |parent| (node.clone(), parent.clone()))
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    /// Own properties, then (when asked) inherited ones whose id is not yet
    /// present, visiting ancestors nearest first so the closest definition
    /// wins.
    pub fn properties_by(
        &self,
        node: &M::Node,
        include_ancestors: bool,
    ) -> Result<Vec<&'a M::Property>, DataModelError> {
        let model = self.model;
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut result = Vec::new();

        let mut visit = |owner: &M::Node| {
            for property in model.properties().iter().filter(|p| M::owner(p) == owner) {
                if seen.insert(M::property_id(property)) {
                    result.push(property);
                }
            }
        };

        visit(node);
        if include_ancestors {
            for ancestor in self.ancestors_of(node)? {
                visit(ancestor);
            }
        }
        Ok(result)
    }

    /// `properties_by` for every node in the graph.
    pub fn properties_by_node(
        &self,
        include_ancestors: bool,
    ) -> Result<BTreeMap<M::Node, Vec<&'a M::Property>>, DataModelError> {
        let mut by_node = BTreeMap::new();
        for node in self.graph.nodes() {
            by_node.insert(node.clone(), self.properties_by(node, include_ancestors)?);
        }
        Ok(by_node)
    }

    // -------------------------------------------------------------------------
    // Linkage
    // -------------------------------------------------------------------------

    /// Every node-valued property as a `(source, property, target, max)` tuple.
    /// With ancestors, inherited links are repeated on each inheriting node.
    pub fn linkage(
        &self,
        include_ancestors: bool,
    ) -> Result<BTreeSet<Linkage<M::Node>>, DataModelError> {
        let mut links = BTreeSet::new();
        if !include_ancestors {
            for property in self.model.properties() {
                if let Some(target) = M::link_target(property) {
                    links.insert(Linkage {
                        source: M::owner(property).clone(),
                        property: M::property_id(property).to_string(),
                        target: target.clone(),
                        max_count: M::max_count(property),
                    });
                }
            }
            return Ok(links);
        }

        for (node, properties) in self.properties_by_node(true)? {
            for property in properties {
                if let Some(target) = M::link_target(property) {
                    links.insert(Linkage {
                        source: node.clone(),
                        property: M::property_id(property).to_string(),
                        target: target.clone(),
                        max_count: M::max_count(property),
                    });
                }
            }
        }
        Ok(links)
    }

    /// Node pairs linked in both directions by different properties,
    /// normalized so the smaller node comes first. A node links to itself
    /// symmetrically only through two distinct properties.
    pub fn symmetric_pairs(&self) -> Result<BTreeSet<(M::Node, M::Node)>, DataModelError> {
        let mut by_direction: BTreeMap<(M::Node, M::Node), BTreeSet<String>> = BTreeMap::new();
        for link in self.linkage(false)? {
            by_direction
                .entry((link.source, link.target))
                .or_default()
                .insert(link.property);
        }

        let mut pairs = BTreeSet::new();
        for ((source, target), properties) in &by_direction {
            if source == target {
                if properties.len() > 1 {
                    pairs.insert((source.clone(), target.clone()));
                }
                continue;
            }
            if by_direction.contains_key(&(target.clone(), source.clone())) {
                let pair = if source < target {
                    (source.clone(), target.clone())
                } else {
                    (target.clone(), source.clone())
                };
                pairs.insert(pair);
            }
        }
        Ok(pairs)
    }

    /// Nodes whose own properties include both the start and end markers.
    #[must_use]
    pub fn edge_classes(&self, start: &str, end: &str) -> BTreeMap<M::Node, EdgeClass<M::Node>> {
        let mut found: BTreeMap<M::Node, (Option<&M::Property>, Option<&M::Property>)> =
            BTreeMap::new();
        for property in self.model.properties() {
            let id = M::property_id(property);
            if id == start {
                found.entry(M::owner(property).clone()).or_default().0 = Some(property);
            } else if id == end {
                found.entry(M::owner(property).clone()).or_default().1 = Some(property);
            }
        }

        found
            .into_iter()
            .filter_map(|(node, markers)| match markers {
                (Some(start), Some(end)) => Some((
                    node,
                    EdgeClass {
                        start: M::link_target(start).cloned(),
                        end: M::link_target(end).cloned(),
                    },
                )),
                _ => None,
            })
            .collect()
    }

    /// Link targets that are not declared nodes, as (property owner, target).
    #[must_use]
    pub fn undefined_targets(&self) -> BTreeSet<(M::Node, M::Node)> {
        self.model
            .properties()
            .iter()
            .filter_map(|p| {
                M::link_target(p)
                    .filter(|target| !self.declared.contains(*target))
                    .map(|target| (M::owner(p).clone(), target.clone()))
            })
            .collect()
    }
}

// =============================================================================
// VIEW QUERIES (PHYSICAL ONLY)
// =============================================================================

/// Traceability of one view property back to the conceptual model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyQuery {
    pub conceptual: ConceptualPropertyId,
    pub value_type: ConceptualValueType,
    pub instance_source: Option<String>,
}

/// Traceability of one view: the concept it came from, where that concept's
/// instances come from, and the origin of every property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub view: ViewEntity,
    pub concept: ConceptEntity,
    pub instance_source: String,
    /// Keyed by view property id.
    pub properties: BTreeMap<String, PropertyQuery>,
}

impl<'a> Analysis<'a, PhysicalModel> {
    /// Per-view reconstruction of the conceptual origin, chaining the
    /// view → concept, concept → instance source and property → conceptual
    /// property links. A view with any missing link is left out entirely.
    pub fn view_query_by_id(
        &self,
        conceptual: &ConceptualModel,
    ) -> Result<BTreeMap<ViewEntity, ViewQuery>, DataModelError> {
        let mut queries = BTreeMap::new();

        'views: for view in &self.model.views {
            let Some(concept) = view
                .conceptual
                .as_ref()
                .and_then(|entity| conceptual.concept(entity))
            else {
                continue;
            };
            let Some(instance_source) = concept.instance_source.clone() else {
                continue;
            };

            let mut properties = BTreeMap::new();
            for property in self.properties_by(&view.view, true)? {
                let Some(origin) = property
                    .conceptual
                    .as_ref()
                    .and_then(|id| conceptual.property(id))
                else {
                    tracing::debug!(
                        view = %view.view,
                        property = %property.view_property,
                        "unlinked property, view skipped"
                    );
                    continue 'views;
                };
                properties.insert(
                    property.view_property.clone(),
                    PropertyQuery {
                        conceptual: origin.id(),
                        value_type: origin.value_type.clone(),
                        instance_source: origin.instance_source.clone(),
                    },
                );
            }

            queries.insert(
                view.view.clone(),
                ViewQuery {
                    view: view.view.clone(),
                    concept: concept.concept.clone(),
                    instance_source,
                    properties,
                },
            );
        }
        Ok(queries)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conceptual::{Concept, ConceptualMetadata};
    use crate::types::DataType;

    fn string() -> ConceptualValueType {
        ConceptualValueType::Data(DataType::String)
    }

    fn model() -> ConceptualModel {
        let mut model = ConceptualModel::new(ConceptualMetadata::new("sp", "plant", "1"));
        let thing = model.concept_entity("Thing");
        let asset = model.concept_entity("Asset");
        let pump = model.concept_entity("Pump");
        let sensor = model.concept_entity("Sensor");
        model
            .add_concept(Concept::new(thing.clone()))
            .add_concept(Concept::new(asset.clone()).implementing([thing.clone()]))
            .add_concept(Concept::new(pump.clone()).implementing([asset.clone()]))
            .add_concept(Concept::new(sensor.clone()))
            .add_property(ConceptualProperty::new(thing.clone(), "name", string()))
            .add_property(ConceptualProperty::new(asset.clone(), "name", string()))
            .add_property(ConceptualProperty::new(thing, "label", string()))
            .add_property(
                ConceptualProperty::new(
                    asset.clone(),
                    "sensors",
                    ConceptualValueType::Concept(sensor.clone()),
                )
                .with_cardinality(Some(0), None),
            )
            .add_property(ConceptualProperty::new(
                sensor,
                "asset",
                ConceptualValueType::Concept(asset),
            ))
            .add_property(ConceptualProperty::new(pump, "flow", string()));
        model
    }

    #[test]
    fn ancestors_nearest_first() {
        let model = model();
        let analysis = Analysis::new(&model);
        let pump = model.concept_entity("Pump");
        let ancestors = analysis.ancestors_of(&pump).expect("acyclic");
        assert_eq!(
            ancestors,
            &[model.concept_entity("Asset"), model.concept_entity("Thing")]
        );
        assert!(analysis.is_a(&pump, &model.concept_entity("Thing")).expect("acyclic"));
    }

    #[test]
    fn nearest_definition_wins() {
        let model = model();
        let analysis = Analysis::new(&model);
        let pump = model.concept_entity("Pump");

        let own = analysis.properties_by(&pump, false).expect("acyclic");
        assert_eq!(own.len(), 1);

        let all = analysis.properties_by(&pump, true).expect("acyclic");
        let ids: Vec<&str> = all.iter().map(|p| p.property.as_str()).collect();
        assert_eq!(ids, vec!["flow", "name", "sensors", "label"]);
        let name = all.iter().find(|p| p.property == "name").expect("name");
        assert_eq!(name.concept, model.concept_entity("Asset"));
    }

    #[test]
    fn linkage_with_and_without_ancestors() {
        let model = model();
        let analysis = Analysis::new(&model);
        let direct = analysis.linkage(false).expect("acyclic");
        assert_eq!(direct.len(), 2);

        let inherited = analysis.linkage(true).expect("acyclic");
        assert!(inherited.iter().any(|l| l.source == model.concept_entity("Pump")
            && l.property == "sensors"
            && l.max_count.is_none()));
    }

    #[test]
    fn symmetric_pairs_are_normalized() {
        let model = model();
        let analysis = Analysis::new(&model);
        let pairs = analysis.symmetric_pairs().expect("acyclic");
        assert_eq!(pairs.len(), 1);
        let (a, b) = pairs.iter().next().expect("pair");
        assert_eq!(a, &model.concept_entity("Asset"));
        assert_eq!(b, &model.concept_entity("Sensor"));
    }

    #[test]
    fn self_link_needs_two_properties() {
        let mut model = model();
        let thing = model.concept_entity("Thing");
        model.add_property(ConceptualProperty::new(
            thing.clone(),
            "parent",
            ConceptualValueType::Concept(thing.clone()),
        ));
        assert!(Analysis::new(&model).symmetric_pairs().expect("acyclic").is_empty());

        model.add_property(ConceptualProperty::new(
            thing.clone(),
            "children",
            ConceptualValueType::Concept(thing.clone()),
        ));
        let pairs = Analysis::new(&model).symmetric_pairs().expect("acyclic");
        assert!(pairs.contains(&(thing.clone(), thing)));
    }

    #[test]
    fn edge_class_detection() {
        let mut model = model();
        let flow = model.concept_entity("Flow");
        let asset = model.concept_entity("Asset");
        model
            .add_concept(Concept::new(flow.clone()))
            .add_property(ConceptualProperty::new(
                flow.clone(),
                "startNode",
                ConceptualValueType::Concept(asset.clone()),
            ))
            .add_property(ConceptualProperty::new(
                flow.clone(),
                "endNode",
                ConceptualValueType::Concept(asset.clone()),
            ));
        let classes = Analysis::new(&model).edge_classes("startNode", "endNode");
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[&flow].start.as_ref(), Some(&asset));
    }

    #[test]
    fn cycle_surfaces_on_queries() {
        let mut model = model();
        let thing = model.concept_entity("Thing");
        let pump = model.concept_entity("Pump");
        if let Some(concept) = model.concepts.iter_mut().find(|c| c.concept == thing) {
            concept.implements.push(pump.clone());
        }
        let analysis = Analysis::new(&model);
        assert!(matches!(
            analysis.ancestors_of(&pump),
            Err(DataModelError::InheritanceCycle { .. })
        ));
        assert!(analysis.properties_by(&pump, true).is_err());
        assert!(analysis.properties_by(&pump, false).is_ok());
    }

    #[test]
    fn undefined_references() {
        let mut model = model();
        let pump = model.concept_entity("Pump");
        model.add_property(ConceptualProperty::new(
            pump.clone(),
            "motor",
            ConceptualValueType::Concept(ConceptEntity::new("sp", "Motor")),
        ));
        if let Some(concept) = model.concepts.iter_mut().find(|c| c.concept == pump) {
            concept.implements.push(ConceptEntity::new("cdf", "Describable"));
        }
        let analysis = Analysis::new(&model);
        assert_eq!(analysis.undefined_targets().len(), 1);
        assert_eq!(analysis.undefined_parents().len(), 1);
    }

    #[test]
    fn view_queries_follow_links_back() {
        let mut model = model();
        for concept in &mut model.concepts {
            if concept.concept.suffix != "Sensor" {
                concept.instance_source = Some(format!("plant:{}", concept.concept.suffix));
            }
        }
        let mut issues = crate::issues::IssueList::new();
        let output = crate::lowering::ConceptualToPhysical::default()
            .convert(&model, &mut issues)
            .expect("lowering");

        let queries = Analysis::new(&output.physical)
            .view_query_by_id(&output.conceptual)
            .expect("acyclic");
        let pump = queries
            .values()
            .find(|q| q.view.suffix == "Pump")
            .expect("pump query");
        assert_eq!(pump.instance_source, "plant:Pump");
        assert_eq!(pump.concept, model.concept_entity("Pump"));
        assert_eq!(pump.properties.len(), 4);
        assert_eq!(
            pump.properties["name"].conceptual.concept,
            model.concept_entity("Asset")
        );
        assert!(queries.values().all(|q| q.view.suffix != "Sensor"));
    }
}
