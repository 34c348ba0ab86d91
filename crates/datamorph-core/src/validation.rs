//! # Validation Pipeline
//!
//! Structural checks run before a conversion. Each check is a
//! [`ValidationPass`]; a [`Validator`] runs its passes in order and pushes
//! every finding into an [`IssueSink`]. Passes never fail: a cyclic model
//! yields a `CyclicInheritance` issue, not an `Err`.

use crate::DataModelError;
use crate::analysis::Analysis;
use crate::conceptual::{ConceptualModel, ConceptualValueType};
use crate::entity::ConceptEntity;
use crate::issues::{Issue, IssueCode, IssueSink};
use crate::physical::{PhysicalModel, PhysicalValueType};
use crate::types::PhysicalDataType;
use std::collections::{BTreeMap, BTreeSet};

/// One structural check over a model of type `M`.
///
/// Passes are stateless and pure; they only read the model.
pub trait ValidationPass<M>: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    fn validate(&self, model: &M) -> Vec<Issue>;
}

/// An ordered list of passes.
pub struct Validator<M> {
    passes: Vec<Box<dyn ValidationPass<M>>>,
}

impl<M> Default for Validator<M> {
    fn default() -> Self {
        Self { passes: Vec::new() }
    }
}

impl<M> Validator<M> {
    /// A validator with no passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pass(mut self, pass: impl ValidationPass<M> + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass. Returns the number of issues reported.
    pub fn run(&self, model: &M, issues: &mut impl IssueSink) -> usize {
        let mut reported = 0usize;
        for pass in &self.passes {
            let found = pass.validate(model);
            tracing::debug!(pass = pass.name(), issues = found.len(), "validation pass");
            reported = reported.saturating_add(found.len());
            for issue in found {
                issues.report(issue);
            }
        }
        reported
    }
}

impl Validator<ConceptualModel> {
    /// Every conceptual pass.
    #[must_use]
    pub fn conceptual_default() -> Self {
        Self::new()
            .with_pass(DuplicateConcepts)
            .with_pass(DuplicateConceptualProperties)
            .with_pass(UndefinedParents)
            .with_pass(UndefinedValueTypes)
            .with_pass(CyclicInheritance)
            .with_pass(CardinalityBounds)
    }
}

impl Validator<PhysicalModel> {
    /// Every physical pass.
    #[must_use]
    pub fn physical_default() -> Self {
        Self::new()
            .with_pass(DuplicateViews)
            .with_pass(StorageInvariant)
            .with_pass(UndefinedViewReferences)
            .with_pass(ContainerTypeConflicts)
    }
}

// =============================================================================
// CONCEPTUAL PASSES
// =============================================================================

/// A concept declared more than once.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateConcepts;

impl ValidationPass<ConceptualModel> for DuplicateConcepts {
    fn name(&self) -> &'static str {
        "duplicate-concepts"
    }

    fn validate(&self, model: &ConceptualModel) -> Vec<Issue> {
        let mut seen = BTreeSet::new();
        model
            .concepts
            .iter()
            .filter(|c| !seen.insert(&c.concept))
            .map(|c| {
                Issue::error(IssueCode::DuplicateDefinition, "concept declared more than once")
                    .about(&c.concept)
            })
            .collect()
    }
}

/// The same (concept, property) pair declared more than once.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateConceptualProperties;

impl ValidationPass<ConceptualModel> for DuplicateConceptualProperties {
    fn name(&self) -> &'static str {
        "duplicate-properties"
    }

    fn validate(&self, model: &ConceptualModel) -> Vec<Issue> {
        let mut seen = BTreeSet::new();
        model
            .properties
            .iter()
            .map(|p| p.id())
            .filter(|id| !seen.insert(id.clone()))
            .map(|id| {
                Issue::error(IssueCode::DuplicateDefinition, "property declared more than once")
                    .about(id)
            })
            .collect()
    }
}

/// Parents that are never declared. Platform concepts are a common cause,
/// so this is a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct UndefinedParents;

impl ValidationPass<ConceptualModel> for UndefinedParents {
    fn name(&self) -> &'static str {
        "undefined-parents"
    }

    fn validate(&self, model: &ConceptualModel) -> Vec<Issue> {
        Analysis::new(model)
            .undefined_parents()
            .into_iter()
            .map(|(child, parent)| {
                Issue::warning(
                    IssueCode::UndefinedReference,
                    format!("implements undefined concept {}", parent),
                )
                .about(child)
            })
            .collect()
    }
}

/// Value types naming a concept that is never declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct UndefinedValueTypes;

impl ValidationPass<ConceptualModel> for UndefinedValueTypes {
    fn name(&self) -> &'static str {
        "undefined-value-types"
    }

    fn validate(&self, model: &ConceptualModel) -> Vec<Issue> {
        let declared: BTreeSet<_> = model.concepts.iter().map(|c| &c.concept).collect();
        let mut issues = Vec::new();
        for property in &model.properties {
            let mut referenced = Vec::new();
            referenced_concepts(&property.value_type, &mut referenced);
            for concept in referenced {
                if !declared.contains(concept) {
                    issues.push(
                        Issue::warning(
                            IssueCode::UndefinedReference,
                            format!("value type {} is not declared", concept),
                        )
                        .about(property.id()),
                    );
                }
            }
            if property.value_type == ConceptualValueType::Unknown {
                issues.push(
                    Issue::warning(IssueCode::UndefinedReference, "value type is unknown")
                        .about(property.id()),
                );
            }
        }
        issues
    }
}

fn referenced_concepts<'a>(
    value_type: &'a ConceptualValueType,
    into: &mut Vec<&'a ConceptEntity>,
) {
    match value_type {
        ConceptualValueType::Concept(concept) => into.push(concept),
        ConceptualValueType::Union(branches) => {
            for branch in branches {
                referenced_concepts(branch, into);
            }
        }
        ConceptualValueType::Data(_) | ConceptualValueType::Unknown => {}
    }
}

/// The implements graph must be acyclic.
#[derive(Debug, Clone, Copy, Default)]
pub struct CyclicInheritance;

impl ValidationPass<ConceptualModel> for CyclicInheritance {
    fn name(&self) -> &'static str {
        "cyclic-inheritance"
    }

    fn validate(&self, model: &ConceptualModel) -> Vec<Issue> {
        match Analysis::new(model).ancestors_by_node() {
            Ok(_) => Vec::new(),
            Err(DataModelError::InheritanceCycle { members }) => vec![Issue::error(
                IssueCode::CyclicInheritance,
                format!("inheritance cycle through {}", members.join(", ")),
            )],
            Err(other) => vec![Issue::error(IssueCode::CyclicInheritance, other.to_string())],
        }
    }
}

/// `min_count` must not exceed `max_count`, and `max_count` must be positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct CardinalityBounds;

impl ValidationPass<ConceptualModel> for CardinalityBounds {
    fn name(&self) -> &'static str {
        "cardinality-bounds"
    }

    fn validate(&self, model: &ConceptualModel) -> Vec<Issue> {
        let mut issues = Vec::new();
        for property in &model.properties {
            let Some(max) = property.max_count else {
                continue;
            };
            if max == 0 {
                issues.push(
                    Issue::error(IssueCode::InvalidCardinality, "max_count must be at least 1")
                        .about(property.id()),
                );
            } else if property.min_count.is_some_and(|min| min > max) {
                issues.push(
                    Issue::error(IssueCode::InvalidCardinality, "min_count exceeds max_count")
                        .about(property.id()),
                );
            }
        }
        issues
    }
}

// =============================================================================
// PHYSICAL PASSES
// =============================================================================

/// A view declared more than once.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateViews;

impl ValidationPass<PhysicalModel> for DuplicateViews {
    fn name(&self) -> &'static str {
        "duplicate-views"
    }

    fn validate(&self, model: &PhysicalModel) -> Vec<Issue> {
        let mut seen = BTreeSet::new();
        let mut issues: Vec<Issue> = model
            .views
            .iter()
            .filter(|v| !seen.insert(&v.view))
            .map(|v| {
                Issue::error(IssueCode::DuplicateDefinition, "view declared more than once")
                    .about(&v.view)
            })
            .collect();

        let mut properties = BTreeSet::new();
        for property in &model.properties {
            let id = property.id();
            if !properties.insert(id.clone()) {
                issues.push(
                    Issue::error(IssueCode::DuplicateDefinition, "property declared more than once")
                        .about(id),
                );
            }
        }
        issues
    }
}

/// Container and container property are set together, and only for
/// stored connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageInvariant;

impl ValidationPass<PhysicalModel> for StorageInvariant {
    fn name(&self) -> &'static str {
        "storage-invariant"
    }

    fn validate(&self, model: &PhysicalModel) -> Vec<Issue> {
        model
            .properties
            .iter()
            .filter_map(|p| p.storage().err().map(|err| (p, err)))
            .map(|(p, err)| {
                Issue::error(IssueCode::StorageConflict, err.to_string()).about(p.id())
            })
            .collect()
    }
}

/// Views referenced as parents or value types but never declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct UndefinedViewReferences;

impl ValidationPass<PhysicalModel> for UndefinedViewReferences {
    fn name(&self) -> &'static str {
        "undefined-view-references"
    }

    fn validate(&self, model: &PhysicalModel) -> Vec<Issue> {
        let analysis = Analysis::new(model);
        let parents = analysis.undefined_parents().into_iter().map(|(view, parent)| {
            Issue::warning(
                IssueCode::UndefinedReference,
                format!("implements undefined view {}", parent),
            )
            .about(view)
        });
        let targets = analysis.undefined_targets().into_iter().map(|(view, target)| {
            Issue::warning(
                IssueCode::UndefinedReference,
                format!("references undefined view {}", target),
            )
            .about(view)
        });
        let orphans = model
            .properties
            .iter()
            .filter(|p| model.view(&p.view).is_none())
            .map(|p| {
                Issue::warning(IssueCode::UndefinedReference, "property of an undefined view")
                    .about(p.id())
            });
        parents.chain(targets).chain(orphans).collect()
    }
}

/// Properties writing the same container column must agree on its type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerTypeConflicts;

impl ValidationPass<PhysicalModel> for ContainerTypeConflicts {
    fn name(&self) -> &'static str {
        "container-type-conflicts"
    }

    fn validate(&self, model: &PhysicalModel) -> Vec<Issue> {
        let mut columns: BTreeMap<String, BTreeSet<PhysicalDataType>> = BTreeMap::new();
        for property in &model.properties {
            let (Some(container), Some(column)) =
                (&property.container, &property.container_property)
            else {
                continue;
            };
            let Some(data_type) = property.container_type() else {
                continue;
            };
            columns
                .entry(format!("{}.{}", container, column))
                .or_default()
                .insert(data_type);
        }

        let unknown = model
            .properties
            .iter()
            .filter(|p| p.value_type == PhysicalValueType::Unknown && p.container.is_some())
            .map(|p| {
                Issue::warning(IssueCode::StorageConflict, "stored property has no value type")
                    .about(p.id())
            });

        columns
            .into_iter()
            .filter(|(_, types)| types.len() > 1)
            .map(|(column, types)| {
                let names: Vec<String> = types.iter().map(ToString::to_string).collect();
                Issue::error(
                    IssueCode::StorageConflict,
                    format!("conflicting types {}", names.join(", ")),
                )
                .about(column)
            })
            .chain(unknown)
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conceptual::{Concept, ConceptualMetadata, ConceptualProperty};
    use crate::entity::ContainerEntity;
    use crate::issues::IssueList;
    use crate::physical::{PhysicalMetadata, PhysicalProperty, View};
    use crate::types::DataType;

    fn conceptual() -> ConceptualModel {
        let mut model = ConceptualModel::new(ConceptualMetadata::new("sp", "plant", "v1"));
        let pump = model.concept_entity("Pump");
        model.add_concept(Concept::new(pump.clone())).add_property(ConceptualProperty::new(
            pump,
            "flow",
            ConceptualValueType::Data(DataType::Double),
        ));
        model
    }

    #[test]
    fn clean_model_has_no_issues() {
        let mut issues = IssueList::new();
        let reported = Validator::conceptual_default().run(&conceptual(), &mut issues);
        assert_eq!(reported, 0);
        assert!(issues.is_empty());
    }

    #[test]
    fn duplicates_are_errors() {
        let mut model = conceptual();
        let pump = model.concept_entity("Pump");
        model.add_concept(Concept::new(pump.clone())).add_property(ConceptualProperty::new(
            pump,
            "flow",
            ConceptualValueType::Data(DataType::Float),
        ));
        let mut issues = IssueList::new();
        Validator::conceptual_default().run(&model, &mut issues);
        assert_eq!(issues.errors().count(), 2);
        assert!(issues.contains(IssueCode::DuplicateDefinition));
    }

    #[test]
    fn undefined_references_are_warnings() {
        let mut model = conceptual();
        let valve = model.concept_entity("Valve");
        model
            .add_concept(
                Concept::new(valve.clone()).implementing([ConceptEntity::new("cdf", "Asset")]),
            )
            .add_property(ConceptualProperty::new(
                valve,
                "pump",
                ConceptualValueType::Concept(ConceptEntity::new("sp", "Missing")),
            ));
        let mut issues = IssueList::new();
        Validator::conceptual_default().run(&model, &mut issues);
        assert_eq!(issues.warnings().count(), 2);
        assert!(!issues.has_errors());
    }

    #[test]
    fn cycle_is_reported_not_raised() {
        let mut model = conceptual();
        let a = model.concept_entity("A");
        let b = model.concept_entity("B");
        model
            .add_concept(Concept::new(a.clone()).implementing([b.clone()]))
            .add_concept(Concept::new(b).implementing([a]));
        let mut issues = IssueList::new();
        Validator::new().with_pass(CyclicInheritance).run(&model, &mut issues);
        assert!(issues.contains(IssueCode::CyclicInheritance));
    }

    #[test]
    fn inverted_cardinality_is_an_error() {
        let mut model = conceptual();
        if let Some(property) = model.properties.first_mut() {
            property.min_count = Some(3);
            property.max_count = Some(2);
        }
        let found = CardinalityBounds.validate(&model);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, IssueCode::InvalidCardinality);
    }

    fn physical() -> PhysicalModel {
        let mut model = PhysicalModel::new(PhysicalMetadata::new("sp", "plant", "v1"));
        let pump = model.view_entity("Pump");
        let valve = model.view_entity("Valve");
        let container = ContainerEntity::new("sp", "Equipment");
        model.views.push(View::new(pump.clone()));
        model.views.push(View::new(valve.clone()));
        model.properties.push(
            PhysicalProperty::new(
                pump,
                "tag",
                PhysicalValueType::Data(PhysicalDataType::Text),
            )
            .stored_in(container.clone(), "tag"),
        );
        model.properties.push(
            PhysicalProperty::new(
                valve,
                "tag",
                PhysicalValueType::Data(PhysicalDataType::Int64),
            )
            .stored_in(container, "tag"),
        );
        model
    }

    #[test]
    fn shared_column_with_two_types_conflicts() {
        let found = ContainerTypeConflicts.validate(&physical());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject.as_deref(), Some("sp:Equipment.tag"));
    }

    #[test]
    fn half_stored_property_conflicts() {
        let mut model = physical();
        if let Some(property) = model.properties.first_mut() {
            property.container = None;
        }
        let mut issues = IssueList::new();
        Validator::physical_default().run(&model, &mut issues);
        assert!(issues.contains(IssueCode::StorageConflict));
    }

    #[test]
    fn default_validators_carry_every_pass() {
        assert_eq!(Validator::conceptual_default().len(), 6);
        assert_eq!(Validator::physical_default().len(), 4);
        assert!(Validator::<PhysicalModel>::new().is_empty());
    }
}
