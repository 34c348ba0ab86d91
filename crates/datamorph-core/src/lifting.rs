//! # Physical → Conceptual Lifting
//!
//! The approximate inverse of lowering. Views become unversioned concepts;
//! every property becomes a conceptual property typed by its primitive or
//! by the concept of the referenced view. Whether a relation was a direct
//! relation, an edge or a reverse connection is storage detail and is
//! dropped.

use crate::DataModelError;
use crate::conceptual::{
    Concept, ConceptualMetadata, ConceptualModel, ConceptualProperty, ConceptualValueType,
};
use crate::entity::{ConceptEntity, ViewEntity};
use crate::issues::{Issue, IssueCode, IssueSink};
use crate::linking::{ConversionOutput, LinkTable};
use crate::physical::{PhysicalModel, PhysicalProperty, PhysicalValueType, Storage};
use std::collections::BTreeSet;

/// Lifts a physical model into a conceptual one.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalToConceptual;

impl PhysicalToConceptual {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Lift `physical`. Properties violating the storage invariant abort.
    pub fn convert(
        &self,
        physical: &PhysicalModel,
        issues: &mut impl IssueSink,
    ) -> Result<ConversionOutput, DataModelError> {
        let mut conceptual = ConceptualModel::new(metadata(physical));
        let mut links = LinkTable::new();
        let mut lifted = BTreeSet::new();

        for view in &physical.views {
            let concept = concept_of(&view.view);
            if !lifted.insert(concept.clone()) {
                issues.report(
                    Issue::warning(
                        IssueCode::DuplicateDefinition,
                        "several views lift to the same concept, first kept",
                    )
                    .about(&view.view),
                );
                continue;
            }
            let mut lifted_concept =
                Concept::new(concept.clone()).implementing(view.implements.iter().map(concept_of));
            lifted_concept.name = view.name.clone();
            lifted_concept.description = view.description.clone();
            conceptual.add_concept(lifted_concept);
            links.link_concept(concept, view.view.clone());
        }

        for property in &physical.properties {
            let stored = matches!(property.storage()?, Storage::Stored { .. });
            let lifted_property = lift_property(property, stored);
            let id = lifted_property.id();
            let Some(linked) = links.view_for(&id.concept) else {
                issues.report(
                    Issue::warning(IssueCode::UndefinedReference, "property of an undefined view")
                        .about(property.id()),
                );
                continue;
            };
            // Other versions of a kept view collapse onto its concept.
            if *linked != property.view || links.physical_for(&id).is_some() {
                continue;
            }
            links.link_property(id, property.id());
            conceptual.add_property(lifted_property);
        }

        let mut physical = physical.clone();
        links.stamp(&mut conceptual, &mut physical)?;

        tracing::debug!(
            concepts = conceptual.concepts.len(),
            properties = conceptual.properties.len(),
            "lifting complete"
        );
        Ok(ConversionOutput {
            conceptual,
            physical,
            links,
        })
    }
}

fn metadata(physical: &PhysicalModel) -> ConceptualMetadata {
    let source = &physical.metadata;
    let mut metadata =
        ConceptualMetadata::new(&source.space, &source.external_id, &source.version);
    metadata.name = source.name.clone();
    metadata.description = source.description.clone();
    metadata.creator = source.creator.clone();
    metadata
}

/// Concepts are unversioned.
fn concept_of(view: &ViewEntity) -> ConceptEntity {
    ConceptEntity {
        prefix: view.prefix.clone(),
        suffix: view.suffix.clone(),
        version: None,
    }
}

fn lift_property(property: &PhysicalProperty, stored: bool) -> ConceptualProperty {
    let value_type = match &property.value_type {
        PhysicalValueType::View(view) => ConceptualValueType::Concept(concept_of(view)),
        PhysicalValueType::Data(data_type) => data_type
            .to_conceptual()
            .map(ConceptualValueType::Data)
            .unwrap_or(ConceptualValueType::Unknown),
        PhysicalValueType::Unknown => ConceptualValueType::Unknown,
    };
    let min_count = if stored && !property.nullable { 1 } else { 0 };
    let max_count = if property.is_list { None } else { Some(1) };

    let mut lifted = ConceptualProperty::new(
        concept_of(&property.view),
        &property.view_property,
        value_type,
    )
    .with_cardinality(Some(min_count), max_count);
    lifted.name = property.name.clone();
    lifted.description = property.description.clone();
    lifted.default = property.default.clone();
    lifted
}

// =============================================================================
// TESTS
// =============================================================================
