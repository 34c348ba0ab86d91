//! # Sync-Linking
//!
//! The bidirectional id table between a conceptual and a physical model,
//! and the finalization step that stamps it onto both models.
//!
//! Stamping checks every link before touching either model, so a caller
//! never observes a partially stamped pair.

use crate::DataModelError;
use crate::conceptual::{ConceptualModel, ConceptualPropertyId};
use crate::entity::{ConceptEntity, ViewEntity};
use crate::physical::{PhysicalModel, PhysicalPropertyId};
use std::collections::{BTreeMap, BTreeSet};

/// Conceptual id ↔ physical id for every converted element.
///
/// Links are one-to-one: relinking either side drops the pair it replaces,
/// so both directions always agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTable {
    concepts: BTreeMap<ConceptEntity, ViewEntity>,
    views: BTreeMap<ViewEntity, ConceptEntity>,
    properties: BTreeMap<ConceptualPropertyId, PhysicalPropertyId>,
    conceptual_properties: BTreeMap<PhysicalPropertyId, ConceptualPropertyId>,
}

impl LinkTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link_concept(&mut self, concept: ConceptEntity, view: ViewEntity) {
        if let Some(stale) = self.concepts.insert(concept.clone(), view.clone()) {
            self.views.remove(&stale);
        }
        if let Some(stale) = self.views.insert(view.clone(), concept.clone()) {
            if stale != concept {
                self.concepts.remove(&stale);
            }
        }
    }

    pub fn link_property(
        &mut self,
        conceptual: ConceptualPropertyId,
        physical: PhysicalPropertyId,
    ) {
        if let Some(stale) = self.properties.insert(conceptual.clone(), physical.clone()) {
            self.conceptual_properties.remove(&stale);
        }
        if let Some(stale) = self
            .conceptual_properties
            .insert(physical.clone(), conceptual.clone())
        {
            if stale != conceptual {
                self.properties.remove(&stale);
            }
        }
    }

    #[must_use]
    pub fn view_for(&self, concept: &ConceptEntity) -> Option<&ViewEntity> {
        self.concepts.get(concept)
    }

    #[must_use]
    pub fn concept_for(&self, view: &ViewEntity) -> Option<&ConceptEntity> {
        self.views.get(view)
    }

    #[must_use]
    pub fn physical_for(&self, id: &ConceptualPropertyId) -> Option<&PhysicalPropertyId> {
        self.properties.get(id)
    }

    #[must_use]
    pub fn conceptual_for(&self, id: &PhysicalPropertyId) -> Option<&ConceptualPropertyId> {
        self.conceptual_properties.get(id)
    }

    pub fn concept_links(&self) -> impl Iterator<Item = (&ConceptEntity, &ViewEntity)> {
        self.concepts.iter()
    }

    pub fn property_links(
        &self,
    ) -> impl Iterator<Item = (&ConceptualPropertyId, &PhysicalPropertyId)> {
        self.properties.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len() + self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.properties.is_empty()
    }

    /// Stamp both models. Every link must resolve on both sides; otherwise
    /// nothing is stamped and the first dangling element is reported.
    pub fn stamp(
        &self,
        conceptual: &mut ConceptualModel,
        physical: &mut PhysicalModel,
    ) -> Result<(), DataModelError> {
        let concepts: BTreeSet<&ConceptEntity> =
            conceptual.concepts.iter().map(|c| &c.concept).collect();
        let views: BTreeSet<&ViewEntity> = physical.views.iter().map(|v| &v.view).collect();
        for (concept, view) in &self.concepts {
            if !concepts.contains(concept) {
                return Err(missing(concept));
            }
            if !views.contains(view) {
                return Err(missing(view));
            }
        }
        let conceptual_ids: BTreeSet<ConceptualPropertyId> =
            conceptual.properties.iter().map(|p| p.id()).collect();
        let physical_ids: BTreeSet<PhysicalPropertyId> =
            physical.properties.iter().map(|p| p.id()).collect();
        for (conceptual_id, physical_id) in &self.properties {
            if !conceptual_ids.contains(conceptual_id) {
                return Err(missing(conceptual_id));
            }
            if !physical_ids.contains(physical_id) {
                return Err(missing(physical_id));
            }
        }

        for concept in &mut conceptual.concepts {
            if let Some(view) = self.concepts.get(&concept.concept) {
                concept.physical = Some(view.clone());
            }
        }
        for view in &mut physical.views {
            if let Some(concept) = self.views.get(&view.view) {
                view.conceptual = Some(concept.clone());
            }
        }
        for property in &mut conceptual.properties {
            if let Some(physical_id) = self.properties.get(&property.id()) {
                property.physical = Some(physical_id.clone());
            }
        }
        for property in &mut physical.properties {
            if let Some(conceptual_id) = self.conceptual_properties.get(&property.id()) {
                property.conceptual = Some(conceptual_id.clone());
            }
        }

        tracing::debug!(
            concepts = self.concepts.len(),
            properties = self.properties.len(),
            "links stamped"
        );
        Ok(())
    }
}

fn missing(element: impl std::fmt::Display) -> DataModelError {
    DataModelError::MissingLink {
        element: element.to_string(),
    }
}

/// Re-derive the link table from the back-links already present on a
/// physical model and stamp the conceptual side.
pub fn sync(
    conceptual: &mut ConceptualModel,
    physical: &mut PhysicalModel,
) -> Result<LinkTable, DataModelError> {
    let mut links = LinkTable::new();
    for view in &physical.views {
        if let Some(concept) = &view.conceptual {
            links.link_concept(concept.clone(), view.view.clone());
        }
    }
    for property in &physical.properties {
        if let Some(conceptual_id) = &property.conceptual {
            links.link_property(conceptual_id.clone(), property.id());
        }
    }
    links.stamp(conceptual, physical)?;
    Ok(links)
}

/// Result of a conversion in either direction. Both models are stamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub conceptual: ConceptualModel,
    pub physical: PhysicalModel,
    pub links: LinkTable,
}

// =============================================================================
// TESTS
// =============================================================================
