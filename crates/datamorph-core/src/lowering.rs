//! # Conceptual → Physical Lowering
//!
//! The schema compiler proper. Every property moves through
//!
//! ```text
//! Unclassified -> { Primitive | DirectRelation | EdgeConnection | ReverseConnection } -> Finalized
//! ```
//!
//! Passes, in order:
//! 1. classification (rules below, first match wins)
//! 2. symmetric-pair resolution (one relation defined from both ends)
//! 3. platform-base extension (copy properties the platform already stores)
//! 4. container assignment with capacity bumping
//! 5. `requires` constraint generation
//! 6. assembly and link stamping
//!
//! Classification rules:
//! 1. Unknown value type: direct relation with an unresolved target
//! 2. Edge class value type: edge connection through the edge class
//! 3. Concept value type, more than one value: edge connection
//! 4. Concept value type, at most one value: direct relation
//! 5. Otherwise: primitive
//!
//! All mutable state (container counters, used names) lives in one
//! [`ConceptualToPhysical::convert`] call; concurrent calls share nothing.
//! Output is a function of the input alone.

use crate::DataModelError;
use crate::analysis::{Analysis, EdgeClass};
use crate::conceptual::{
    Concept, ConceptualModel, ConceptualProperty, ConceptualPropertyId, ConceptualValueType,
};
use crate::config::ConversionConfig;
use crate::entity::{
    ConceptEntity, ContainerConstraintEntity, ContainerEntity, Direction, EdgeEntity, NodeEntity,
    Prefix, ReverseConnectionEntity, ViewEntity,
};
use crate::issues::{Issue, IssueCode, IssueSink};
use crate::linking::{ConversionOutput, LinkTable};
use crate::physical::{
    Connection, Container, NodeType, PhysicalMetadata, PhysicalModel, PhysicalProperty,
    PhysicalValueType, UsedFor, View,
};
use crate::primitives::{
    DEFAULT_VERSION, EDGE_TYPE_SEPARATOR, FIRST_BUMP_SUFFIX, REQUIRES_CONSTRAINT,
};
use crate::types::{DataType, PhysicalDataType};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// PLATFORM SCHEMA
// =============================================================================

/// The platform's own physical schema. Concepts matching one of its views
/// (same space and external id) are platform-provided: referenced, never
/// lowered.
#[derive(Debug, Clone)]
pub struct PlatformSchema {
    model: PhysicalModel,
}

impl PlatformSchema {
    #[must_use]
    pub fn new(model: PhysicalModel) -> Self {
        Self { model }
    }

    #[must_use]
    pub fn model(&self) -> &PhysicalModel {
        &self.model
    }

    /// The platform view standing for `concept`.
    #[must_use]
    pub fn view_for(&self, concept: &ConceptEntity) -> Option<&View> {
        self.model
            .views
            .iter()
            .find(|v| v.view.prefix == concept.prefix && v.view.suffix == concept.suffix)
    }

    /// Containers holding the view's own stored properties.
    fn containers_of(&self, view: &ViewEntity) -> BTreeSet<ContainerEntity> {
        self.model
            .properties_of(view)
            .filter_map(|p| p.container.clone())
            .collect()
    }
}

// =============================================================================
// CONVERTER
// =============================================================================

/// Lowers a conceptual model into a physical one.
#[derive(Debug, Clone, Default)]
pub struct ConceptualToPhysical<'p> {
    config: ConversionConfig,
    platform: Option<&'p PlatformSchema>,
}

impl<'p> ConceptualToPhysical<'p> {
    #[must_use]
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            platform: None,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: &'p PlatformSchema) -> Self {
        self.platform = Some(platform);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Lower `conceptual`. Recoverable problems go to `issues`; cyclic
    /// inheritance, an invalid configuration and dangling links abort.
    pub fn convert(
        &self,
        conceptual: &ConceptualModel,
        issues: &mut impl IssueSink,
    ) -> Result<ConversionOutput, DataModelError> {
        self.config.validate()?;
        let lowering = Lowering::new(&self.config, conceptual, self.platform)?;

        let concepts = lowering.concepts_to_lower(issues);
        let mut planned = lowering.classify_all(&concepts, issues)?;
        lowering.resolve_symmetric(&mut planned, issues)?;
        lowering.attach_platform(&mut planned)?;
        let mut layout = lowering.assign_containers(&concepts, &planned, issues);
        lowering.add_requires_constraints(&concepts, &mut layout);

        let mut physical = PhysicalModel::new(lowering.metadata());
        let mut links = LinkTable::new();

        for concept in &concepts {
            let view = lowering.view_of(&concept.concept);
            let mut built = View::new(view.clone())
                .implementing(concept.implements.iter().map(|p| lowering.view_of(p)));
            built.name = concept.name.clone();
            built.description = concept.description.clone();
            physical.views.push(built);
            links.link_concept(concept.concept.clone(), view);
        }

        let mut edge_types = BTreeSet::new();
        for plan in &planned {
            let built = lowering.build_property(plan, &layout, issues)?;
            if let Some(Connection::Edge(EdgeEntity {
                edge_type: Some(edge_type),
                ..
            })) = &built.connection
            {
                edge_types.insert(edge_type.clone());
            }
            links.link_property(plan.property.id(), built.id());
            physical.properties.push(built);
        }

        physical.containers = layout.containers;
        physical.nodes = edge_types
            .into_iter()
            .map(|node| NodeType {
                node,
                name: None,
                description: None,
            })
            .collect();

        let mut conceptual = conceptual.clone();
        links.stamp(&mut conceptual, &mut physical)?;

        tracing::debug!(
            views = physical.views.len(),
            containers = physical.containers.len(),
            properties = physical.properties.len(),
            "lowering complete"
        );
        Ok(ConversionOutput {
            conceptual,
            physical,
            links,
        })
    }
}

// =============================================================================
// PER-CALL STATE
// =============================================================================

/// How a property will be materialised.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Lowered {
    Primitive(PhysicalDataType),
    /// `None` target: unresolved, the caller may bind it later.
    Direct(Option<ViewEntity>),
    Edge {
        target: Option<ViewEntity>,
        edge: EdgeEntity,
    },
    Reverse {
        target: ViewEntity,
        through: String,
    },
}

impl Lowered {
    fn is_stored(&self) -> bool {
        matches!(self, Lowered::Primitive(_) | Lowered::Direct(_))
    }

    fn value_type(&self) -> PhysicalValueType {
        match self {
            Lowered::Primitive(data_type) => PhysicalValueType::Data(data_type.clone()),
            Lowered::Direct(target) | Lowered::Edge { target, .. } => target
                .clone()
                .map(PhysicalValueType::View)
                .unwrap_or(PhysicalValueType::Unknown),
            Lowered::Reverse { target, .. } => PhysicalValueType::View(target.clone()),
        }
    }

    /// Outwards edges without an edge-properties view.
    fn is_plain_outwards_edge(&self) -> bool {
        matches!(
            self,
            Lowered::Edge {
                edge: EdgeEntity {
                    properties: None,
                    direction: Direction::Outwards,
                    ..
                },
                ..
            }
        )
    }
}

struct Planned<'a> {
    property: &'a ConceptualProperty,
    lowered: Lowered,
    /// Platform property this one is copied from.
    platform: Option<&'a PhysicalProperty>,
}

impl Planned<'_> {
    fn target(&self) -> Option<&ConceptEntity> {
        self.property.value_type.concept()
    }
}

/// Container naming outcome.
struct Layout {
    containers: Vec<Container>,
    by_concept: BTreeMap<ConceptEntity, Vec<ContainerEntity>>,
    assignment: BTreeMap<ConceptualPropertyId, ContainerEntity>,
}

struct Lowering<'a> {
    config: &'a ConversionConfig,
    model: &'a ConceptualModel,
    analysis: Analysis<'a, ConceptualModel>,
    platform: Option<&'a PlatformSchema>,
    platform_analysis: Option<Analysis<'a, PhysicalModel>>,
    edge_classes: BTreeMap<ConceptEntity, EdgeClass<ConceptEntity>>,
}

impl<'a> Lowering<'a> {
    fn new(
        config: &'a ConversionConfig,
        model: &'a ConceptualModel,
        platform: Option<&'a PlatformSchema>,
    ) -> Result<Self, DataModelError> {
        let analysis = Analysis::new(model);
        analysis.ancestors_by_node()?;
        let edge_classes =
            analysis.edge_classes(&config.start_node_property, &config.end_node_property);
        let platform_analysis = platform.map(|p| Analysis::new(p.model()));
        tracing::debug!(edge_classes = edge_classes.len(), "lowering started");
        Ok(Self {
            config,
            model,
            analysis,
            platform,
            platform_analysis,
            edge_classes,
        })
    }

    fn metadata(&self) -> PhysicalMetadata {
        let source = &self.model.metadata;
        let mut metadata =
            PhysicalMetadata::new(&source.prefix, &source.external_id, self.model_version());
        metadata.name = source.name.clone();
        metadata.description = source.description.clone();
        metadata.creator = source.creator.clone();
        metadata
    }

    fn model_version(&self) -> &str {
        match self.model.metadata.version.as_str() {
            "" => DEFAULT_VERSION,
            version => version,
        }
    }

    fn space(&self) -> &str {
        &self.model.metadata.prefix
    }

    fn is_platform(&self, concept: &ConceptEntity) -> bool {
        self.platform.is_some_and(|p| p.view_for(concept).is_some())
    }

    /// The view a concept lowers to (or, for platform concepts, already is).
    fn view_of(&self, concept: &ConceptEntity) -> ViewEntity {
        if let Some(view) = self.platform.and_then(|p| p.view_for(concept)) {
            return view.view.clone();
        }
        ViewEntity {
            prefix: concept.prefix.or_named(self.space()),
            suffix: concept.suffix.clone(),
            version: Some(
                concept
                    .version
                    .clone()
                    .unwrap_or_else(|| self.model_version().to_string()),
            ),
        }
    }

    fn node_of(&self, prefix: &Prefix, suffix: String) -> NodeEntity {
        NodeEntity {
            prefix: prefix.or_named(self.space()),
            suffix,
        }
    }

    // -------------------------------------------------------------------------
    // Pass 1: classification
    // -------------------------------------------------------------------------

    /// Declared, non-platform concepts in model order, first definition wins.
    fn concepts_to_lower(&self, issues: &mut impl IssueSink) -> Vec<&'a Concept> {
        let mut seen = BTreeSet::new();
        let mut concepts = Vec::new();
        for concept in &self.model.concepts {
            if self.is_platform(&concept.concept) {
                tracing::debug!(concept = %concept.concept, "platform concept referenced");
                continue;
            }
            if !seen.insert(&concept.concept) {
                issues.report(
                    Issue::warning(
                        IssueCode::DuplicateDefinition,
                        "concept defined twice, first kept",
                    )
                    .about(&concept.concept),
                );
                continue;
            }
            concepts.push(concept);
        }
        concepts
    }

    fn classify_all(
        &self,
        concepts: &[&'a Concept],
        issues: &mut impl IssueSink,
    ) -> Result<Vec<Planned<'a>>, DataModelError> {
        let lowered: BTreeSet<&ConceptEntity> = concepts.iter().map(|c| &c.concept).collect();
        let mut seen = BTreeSet::new();
        let mut planned = Vec::new();

        for property in &self.model.properties {
            if !lowered.contains(&property.concept) {
                if !self.is_platform(&property.concept) {
                    issues.report(
                        Issue::warning(
                            IssueCode::UndefinedReference,
                            "property of an undefined concept, skipped",
                        )
                        .about(property.id()),
                    );
                }
                continue;
            }
            if !seen.insert(property.id()) {
                issues.report(
                    Issue::warning(
                        IssueCode::DuplicateDefinition,
                        "property defined twice, first kept",
                    )
                    .about(property.id()),
                );
                continue;
            }
            if self.is_edge_marker(property) {
                continue;
            }
            let lowered = self.classify(property, issues)?;
            tracing::debug!(property = %property.id(), kind = ?lowered, "classified");
            planned.push(Planned {
                property,
                lowered,
                platform: None,
            });
        }
        Ok(planned)
    }

    /// Start and end properties of an edge class become the edge itself.
    fn is_edge_marker(&self, property: &ConceptualProperty) -> bool {
        self.edge_classes.contains_key(&property.concept)
            && (property.property == self.config.start_node_property
                || property.property == self.config.end_node_property)
    }

    fn classify(
        &self,
        property: &ConceptualProperty,
        issues: &mut impl IssueSink,
    ) -> Result<Lowered, DataModelError> {
        match &property.value_type {
            ConceptualValueType::Unknown => Ok(Lowered::Direct(None)),
            ConceptualValueType::Concept(target) => {
                if let Some(edge_class) = self.edge_classes.get(target) {
                    return self.classify_edge_class(property, target, edge_class, issues);
                }
                let view = self.view_of(target);
                if property.is_multi_valued() {
                    let owner = self.view_of(&property.concept);
                    let edge_type = self.node_of(
                        &owner.prefix,
                        format!("{}{}{}", owner.suffix, EDGE_TYPE_SEPARATOR, property.property),
                    );
                    Ok(Lowered::Edge {
                        target: Some(view),
                        edge: EdgeEntity {
                            edge_type: Some(edge_type),
                            properties: None,
                            direction: Direction::Outwards,
                        },
                    })
                } else {
                    Ok(Lowered::Direct(Some(view)))
                }
            }
            ConceptualValueType::Union(branches) => {
                Ok(self.classify_union(property, branches, issues))
            }
            ConceptualValueType::Data(data_type) => Ok(Lowered::Primitive(data_type.to_physical())),
        }
    }

    fn classify_edge_class(
        &self,
        property: &ConceptualProperty,
        edge_class: &ConceptEntity,
        endpoints: &EdgeClass<ConceptEntity>,
        issues: &mut impl IssueSink,
    ) -> Result<Lowered, DataModelError> {
        let owner = &property.concept;
        let plays = |endpoint: &Option<ConceptEntity>| -> Result<bool, DataModelError> {
            match endpoint {
                Some(endpoint) => self.analysis.is_a(owner, endpoint),
                None => Ok(false),
            }
        };
        let far = |endpoint: &Option<ConceptEntity>| endpoint.as_ref().map(|c| self.view_of(c));

        let (direction, target) = if plays(&endpoints.start)? {
            (Direction::Outwards, far(&endpoints.end))
        } else if plays(&endpoints.end)? {
            (Direction::Inwards, far(&endpoints.start))
        } else {
            issues.report(
                Issue::warning(
                    IssueCode::EdgeClassNotParticipating,
                    format!("owner is neither start nor end of {}, lowered outwards", edge_class),
                )
                .about(property.id()),
            );
            (Direction::Outwards, far(&endpoints.end))
        };

        Ok(Lowered::Edge {
            target,
            edge: EdgeEntity {
                edge_type: Some(self.node_of(&edge_class.prefix, edge_class.suffix.clone())),
                properties: Some(self.view_of(edge_class)),
                direction,
            },
        })
    }

    fn classify_union(
        &self,
        property: &ConceptualProperty,
        branches: &[ConceptualValueType],
        issues: &mut impl IssueSink,
    ) -> Lowered {
        let mut data = Vec::new();
        let mut references = 0usize;
        flatten_union(branches, &mut data, &mut references);

        if references == 0 {
            return Lowered::Primitive(DataType::resolve_union(&data).to_physical());
        }
        if data.is_empty() {
            issues.report(
                Issue::warning(
                    IssueCode::AmbiguousValueType,
                    "union of concepts lowered to an unresolved direct relation",
                )
                .about(property.id()),
            );
            return Lowered::Direct(None);
        }
        issues.report(
            Issue::warning(
                IssueCode::AmbiguousValueType,
                "union mixes concepts and data types, lowered to text",
            )
            .about(property.id()),
        );
        Lowered::Primitive(PhysicalDataType::Text)
    }

    // -------------------------------------------------------------------------
    // Pass 2: symmetric pairs
    // -------------------------------------------------------------------------

    /// A relation defined from both ends must be materialised once.
    ///
    /// A direct relation on one side turns the other side's edges into
    /// reverse connections through it. When both sides are edges, the
    /// second concept's edges become inwards edges sharing the first
    /// concept's edge type.
    fn resolve_symmetric(
        &self,
        planned: &mut [Planned<'a>],
        issues: &mut impl IssueSink,
    ) -> Result<(), DataModelError> {
        if !self.config.infer_inverse_connections {
            return Ok(());
        }
        for (a, b) in self.analysis.symmetric_pairs()? {
            if a == b || self.edge_classes.contains_key(&a) || self.edge_classes.contains_key(&b) {
                continue;
            }
            let through_a = self.reverse_through(planned, &a, &b, issues);
            let through_b = self.reverse_through(planned, &b, &a, issues);
            if !through_a && !through_b {
                self.share_edge_type(planned, &a, &b, issues);
            }
        }
        Ok(())
    }

    /// Sorted property ids of `owner`'s relations to `target` matching `filter`.
    fn candidates(
        planned: &[Planned<'a>],
        owner: &ConceptEntity,
        target: &ConceptEntity,
        filter: impl Fn(&Lowered) -> bool,
    ) -> Vec<(String, Lowered)> {
        let mut found: Vec<(String, Lowered)> = planned
            .iter()
            .filter(|p| &p.property.concept == owner && p.target() == Some(target))
            .filter(|p| filter(&p.lowered))
            .map(|p| (p.property.property.clone(), p.lowered.clone()))
            .collect();
        found.sort_by(|x, y| x.0.cmp(&y.0));
        found
    }

    /// Plain edges from `b` to `a` become reverse connections through `a`'s
    /// direct relation to `b`. Returns whether such a direct relation exists.
    fn reverse_through(
        &self,
        planned: &mut [Planned<'a>],
        a: &ConceptEntity,
        b: &ConceptEntity,
        issues: &mut impl IssueSink,
    ) -> bool {
        let candidates =
            Self::candidates(planned, a, b, |l| matches!(l, Lowered::Direct(Some(_))));
        let Some((through, _)) = candidates.first() else {
            return false;
        };
        if candidates.len() > 1 {
            issues.report(
                Issue::warning(
                    IssueCode::AmbiguousReverseThrough,
                    format!(
                        "{} direct relations to {}, reversing through '{}'",
                        candidates.len(),
                        b,
                        through
                    ),
                )
                .about(a),
            );
        }

        let target = self.view_of(a);
        for plan in planned.iter_mut() {
            if &plan.property.concept == b
                && plan.target() == Some(a)
                && plan.lowered.is_plain_outwards_edge()
            {
                tracing::debug!(
                    property = %plan.property.id(),
                    through = %through,
                    "reverse connection"
                );
                plan.lowered = Lowered::Reverse {
                    target: target.clone(),
                    through: through.clone(),
                };
            }
        }
        true
    }

    /// Plain edges from `b` to `a` become inwards edges typed after `a`'s
    /// outwards edge to `b`.
    fn share_edge_type(
        &self,
        planned: &mut [Planned<'a>],
        a: &ConceptEntity,
        b: &ConceptEntity,
        issues: &mut impl IssueSink,
    ) {
        let candidates = Self::candidates(planned, a, b, Lowered::is_plain_outwards_edge);
        let Some((chosen, Lowered::Edge { edge, .. })) = candidates.first() else {
            return;
        };
        if candidates.len() > 1 {
            issues.report(
                Issue::warning(
                    IssueCode::AmbiguousEdgeType,
                    format!(
                        "{} outwards edges to {}, inwards edge type taken from '{}'",
                        candidates.len(),
                        b,
                        chosen
                    ),
                )
                .about(a),
            );
        }

        for plan in planned.iter_mut() {
            if &plan.property.concept != b || plan.target() != Some(a) {
                continue;
            }
            if let Lowered::Edge {
                edge: inwards @ EdgeEntity { properties: None, .. },
                ..
            } = &mut plan.lowered
            {
                inwards.edge_type = edge.edge_type.clone();
                inwards.direction = Direction::Inwards;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Pass 3: platform-base extension
    // -------------------------------------------------------------------------

    fn attach_platform(&self, planned: &mut [Planned<'a>]) -> Result<(), DataModelError> {
        let (Some(platform), Some(platform_analysis)) = (self.platform, &self.platform_analysis)
        else {
            return Ok(());
        };
        for plan in planned.iter_mut() {
            for ancestor in self.analysis.ancestors_of(&plan.property.concept)? {
                let Some(view) = platform.view_for(ancestor) else {
                    continue;
                };
                let inherited = platform_analysis
                    .properties_by(&view.view, true)?
                    .into_iter()
                    .find(|p| p.view_property == plan.property.property);
                if inherited.is_some() {
                    plan.platform = inherited;
                    break;
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Pass 4: containers
    // -------------------------------------------------------------------------

    fn assign_containers(
        &self,
        concepts: &[&'a Concept],
        planned: &[Planned<'a>],
        issues: &mut impl IssueSink,
    ) -> Layout {
        let limit = self.config.max_properties_per_container;
        let reserved: BTreeSet<String> =
            concepts.iter().map(|c| c.concept.suffix.clone()).collect();
        let mut used: BTreeSet<String> = BTreeSet::new();
        let mut layout = Layout {
            containers: Vec::new(),
            by_concept: BTreeMap::new(),
            assignment: BTreeMap::new(),
        };

        for concept in concepts {
            let stored: Vec<&Planned<'a>> = planned
                .iter()
                .filter(|p| p.property.concept == concept.concept)
                .filter(|p| p.platform.is_none() && p.lowered.is_stored())
                .collect();
            if stored.is_empty() {
                continue;
            }

            let used_for = if self.edge_classes.contains_key(&concept.concept) {
                UsedFor::Edge
            } else {
                UsedFor::Node
            };
            let mut name = concept.concept.suffix.clone();
            if used.contains(&name) {
                name = next_free_name(&name, &reserved, &used);
            }
            let mut count = 0usize;
            let mut current = self.open_container(&name, used_for, &mut used, &mut layout, concept);

            for plan in stored {
                if count == limit {
                    let bumped = next_free_name(&name, &reserved, &used);
                    issues.report(
                        Issue::warning(
                            IssueCode::ContainerLimit,
                            format!("{} is full, continuing in {}", name, bumped),
                        )
                        .about(&concept.concept),
                    );
                    name = bumped;
                    count = 0;
                    current = self.open_container(&name, used_for, &mut used, &mut layout, concept);
                }
                layout.assignment.insert(plan.property.id(), current.clone());
                count = count.saturating_add(1);
            }
        }

        tracing::debug!(containers = layout.containers.len(), "containers assigned");
        layout
    }

    fn open_container(
        &self,
        name: &str,
        used_for: UsedFor,
        used: &mut BTreeSet<String>,
        layout: &mut Layout,
        concept: &Concept,
    ) -> ContainerEntity {
        used.insert(name.to_string());
        let entity = ContainerEntity::new(self.space(), name);
        let mut container = Container::new(entity.clone());
        container.used_for = used_for;
        layout.containers.push(container);
        layout
            .by_concept
            .entry(concept.concept.clone())
            .or_default()
            .push(entity.clone());
        entity
    }

    // -------------------------------------------------------------------------
    // Pass 5: constraints
    // -------------------------------------------------------------------------

    /// Every container of a concept requires the base container of each
    /// parent that has one (platform parents: the containers of the
    /// platform view's own properties).
    fn add_requires_constraints(&self, concepts: &[&'a Concept], layout: &mut Layout) {
        let mut generated = 0usize;
        for concept in concepts {
            let Some(children) = layout.by_concept.get(&concept.concept).cloned() else {
                continue;
            };
            let mut required: Vec<ContainerEntity> = Vec::new();
            for parent in &concept.implements {
                if let Some(base) = layout.by_concept.get(parent).and_then(|c| c.first()) {
                    required.push(base.clone());
                } else if let Some((platform, view)) = self
                    .platform
                    .and_then(|p| p.view_for(parent).map(|view| (p, view)))
                {
                    required.extend(platform.containers_of(&view.view));
                }
            }

            for child in &children {
                let Some(container) = layout.containers.iter_mut().find(|c| &c.container == child)
                else {
                    continue;
                };
                for parent in required.iter().filter(|p| *p != child) {
                    container.add_constraint(ContainerConstraintEntity {
                        prefix: Prefix::named(REQUIRES_CONSTRAINT),
                        suffix: constraint_name(child, parent, self.config.max_identifier_length),
                        require: Some(parent.clone()),
                    });
                    generated = generated.saturating_add(1);
                }
            }
        }
        tracing::debug!(constraints = generated, "requires constraints generated");
    }

    // -------------------------------------------------------------------------
    // Pass 6: assembly
    // -------------------------------------------------------------------------

    fn build_property(
        &self,
        plan: &Planned<'a>,
        layout: &Layout,
        issues: &mut impl IssueSink,
    ) -> Result<PhysicalProperty, DataModelError> {
        let property = plan.property;
        let view = self.view_of(&property.concept);

        if let Some(base) = plan.platform {
            let mut copy = base.clone();
            let wanted = plan.lowered.value_type();
            if wanted != base.value_type {
                issues.report(
                    Issue::warning(
                        IssueCode::PlatformValueTypeOverridden,
                        format!("platform type {} kept over {}", base.value_type, wanted),
                    )
                    .about(property.id()),
                );
            }
            copy.view = view;
            copy.conceptual = None;
            if property.name.is_some() {
                copy.name = property.name.clone();
            }
            if property.description.is_some() {
                copy.description = property.description.clone();
            }
            return Ok(copy);
        }

        let mut built = PhysicalProperty::new(view, &property.property, plan.lowered.value_type());
        built.name = property.name.clone();
        built.description = property.description.clone();
        built.default = property.default.clone();
        built.nullable = !property.is_required();
        built.is_list = property.is_multi_valued();

        match &plan.lowered {
            Lowered::Primitive(_) | Lowered::Direct(_) => {
                let container = layout.assignment.get(&property.id()).ok_or_else(|| {
                    DataModelError::MissingLink {
                        element: format!("container for {}", property.id()),
                    }
                })?;
                built = built.stored_in(container.clone(), &property.property);
                if matches!(plan.lowered, Lowered::Direct(_)) {
                    built.connection = Some(Connection::Direct);
                }
            }
            Lowered::Edge { edge, .. } => {
                built.connection = Some(Connection::Edge(edge.clone()));
            }
            Lowered::Reverse { through, .. } => {
                built.connection = Some(Connection::Reverse(ReverseConnectionEntity {
                    property: through.clone(),
                }));
            }
        }
        Ok(built)
    }
}

// =============================================================================
// NAMING
// =============================================================================

fn flatten_union(
    branches: &[ConceptualValueType],
    data: &mut Vec<DataType>,
    references: &mut usize,
) {
    for branch in branches {
        match branch {
            ConceptualValueType::Data(data_type) => data.push(*data_type),
            ConceptualValueType::Union(nested) => flatten_union(nested, data, references),
            ConceptualValueType::Concept(_) | ConceptualValueType::Unknown => {
                *references = references.saturating_add(1);
            }
        }
    }
}

/// Increment a trailing number, or append the first bump suffix.
fn bump(name: &str) -> String {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[stem.len()..];
    match digits.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
        Some(next) if !digits.is_empty() => format!("{}{}", stem, next),
        _ => format!("{}{}", name, FIRST_BUMP_SUFFIX),
    }
}

/// Bump `name` until it collides with neither a reserved base name nor a
/// container already created.
fn next_free_name(name: &str, reserved: &BTreeSet<String>, used: &BTreeSet<String>) -> String {
    let mut candidate = bump(name);
    while reserved.contains(&candidate) || used.contains(&candidate) {
        candidate = bump(&candidate);
    }
    candidate
}

fn constraint_name(child: &ContainerEntity, parent: &ContainerEntity, max_length: usize) -> String {
    format!("{}_{}", child.suffix, parent.suffix)
        .chars()
        .take(max_length)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
