//! # Conversion Tier Tests (T0-T4)
//!
//! If ANY tier fails, the compiler output cannot be trusted.
//!
//! ## Tiers
//! - T0: Notation Integrity
//! - T1: Inheritance Closure
//! - T2: Container Layout
//! - T3: Connection Classification
//! - T4: Linking

use datamorph_core::entity::{Notated, ReferenceEntity};
use datamorph_core::entity::notation::serialize;
use datamorph_core::{
    Analysis, Concept, ConceptEntity, ConceptualMetadata, ConceptualModel, ConceptualProperty,
    ConceptualToPhysical, ConceptualValueType, ContainerEntity, ConversionConfig,
    ConversionOutput, DataModelEntity, DataModelError, DataType, Defaults, Direction,
    EdgeEntity, Entity, IssueCode, IssueList, NodeEntity, NotationParser, PhysicalProperty,
    Prefix, ViewEntity,
};

fn model() -> ConceptualModel {
    ConceptualModel::new(ConceptualMetadata::new("sp", "plant", "v1"))
}

fn text(data_type: DataType) -> ConceptualValueType {
    ConceptualValueType::Data(data_type)
}

fn lower(model: &ConceptualModel) -> ConversionOutput {
    let mut issues = IssueList::new();
    ConceptualToPhysical::default()
        .convert(model, &mut issues)
        .expect("lowering")
}

fn physical<'m>(output: &'m ConversionOutput, view: &str, id: &str) -> &'m PhysicalProperty {
    output
        .physical
        .properties
        .iter()
        .find(|p| p.view.suffix == view && p.view_property == id)
        .expect("property lowered")
}

// =============================================================================
// TIER T0: NOTATION INTEGRITY
// =============================================================================

mod t0_notation_integrity {
    use super::*;

    fn round_trip(entity: Entity, defaults: &Defaults) -> String {
        let parser = NotationParser::new().expect("grammar compiles");
        let text = serialize(&entity, defaults);
        let parsed = parser
            .parse(entity.kind(), &text, defaults)
            .expect("serialized text parses");
        assert_eq!(parsed, entity, "round trip of '{}'", text);
        text
    }

    /// T0.1: A view in the default space and version is written bare.
    #[test]
    fn matching_defaults_are_omitted() {
        let defaults = Defaults::prefix_version("sp", "v1");
        let view = ViewEntity::new("sp", "Pump").with_version("v1");
        assert_eq!(round_trip(view.into(), &defaults), "Pump");
    }

    /// T0.2: One disagreeing default keeps every default of the entity.
    #[test]
    fn disagreeing_sibling_keeps_defaults() {
        let defaults = Defaults::prefix_version("sp", "v1");
        let view = ViewEntity::new("sp", "Pump").with_version("v2");
        assert_eq!(round_trip(view.into(), &defaults), "sp:Pump(version=v2)");
    }

    /// T0.3: Data models and references follow the same all-or-nothing rule.
    #[test]
    fn data_model_and_reference_defaults() {
        let defaults = Defaults::prefix_version("sp", "v1");
        let data_model = |version: &str| DataModelEntity {
            prefix: Prefix::named("sp"),
            suffix: "plant".to_string(),
            version: Some(version.to_string()),
        };
        assert_eq!(round_trip(data_model("v1").into(), &defaults), "plant");
        assert_eq!(
            round_trip(data_model("v2").into(), &defaults),
            "sp:plant(version=v2)"
        );

        let reference = |version: &str| ReferenceEntity {
            prefix: Prefix::named("sp"),
            suffix: "Pump".to_string(),
            version: Some(version.to_string()),
            property: Some("flow".to_string()),
        };
        assert_eq!(
            round_trip(reference("v1").into(), &defaults),
            "Pump(property=flow)"
        );
        assert_eq!(
            round_trip(reference("v2").into(), &defaults),
            "sp:Pump(version=v2,property=flow)"
        );
    }

    /// T0.4: Edge defaults are stripped one by one.
    #[test]
    fn edge_defaults_strip_individually() {
        let defaults = Defaults::prefix_version("sp", "v1");
        let edge = EdgeEntity {
            edge_type: Some(NodeEntity::new("sp", "Asset.sensor")),
            properties: None,
            direction: Direction::Inwards,
        };
        assert_eq!(
            round_trip(edge.into(), &defaults),
            "edge(type=Asset.sensor,direction=inwards)"
        );
    }

    /// T0.5: A view id that cannot be a view is rejected in strict mode and
    /// handed back in lenient mode.
    #[test]
    fn malformed_text_is_rejected_or_returned_raw() {
        let parser = NotationParser::new().expect("grammar compiles");
        let raw = "sp:Pump(version=";
        assert!(parser.parse_as::<ViewEntity>(raw, &Defaults::none()).is_err());
        assert_eq!(
            parser.parse_or_raw(datamorph_core::EntityKind::View, raw, &Defaults::none()),
            Err(raw.to_string())
        );
    }
}

// =============================================================================
// TIER T1: INHERITANCE CLOSURE
// =============================================================================

mod t1_inheritance_closure {
    use super::*;

    fn chain() -> ConceptualModel {
        let mut model = model();
        let grandparent = model.concept_entity("G");
        let parent = model.concept_entity("P");
        let child = model.concept_entity("C");
        model
            .add_concept(Concept::new(grandparent.clone()))
            .add_concept(Concept::new(parent.clone()).implementing([grandparent.clone()]))
            .add_concept(Concept::new(child.clone()).implementing([parent.clone()]))
            .add_property(ConceptualProperty::new(grandparent, "x", text(DataType::Integer)))
            .add_property(ConceptualProperty::new(parent, "y", text(DataType::Boolean)))
            .add_property(ConceptualProperty::new(child, "x", text(DataType::String)));
        model
    }

    /// T1.1: Ancestors of C are P then G.
    #[test]
    fn ancestors_nearest_first() {
        let model = chain();
        let analysis = Analysis::new(&model);
        let ancestors = analysis
            .ancestors_of(&model.concept_entity("C"))
            .expect("acyclic");
        assert_eq!(
            ancestors,
            &[model.concept_entity("P"), model.concept_entity("G")]
        );
    }

    /// T1.2: A cycle is an error, never a loop.
    #[test]
    fn cycle_raises() {
        let mut model = chain();
        if let Some(grandparent) = model.concepts.first_mut() {
            grandparent.implements.push(ConceptEntity::new("sp", "C"));
        }
        let analysis = Analysis::new(&model);
        let result = analysis.ancestors_of(&model.concept_entity("C"));
        assert!(matches!(result, Err(DataModelError::InheritanceCycle { .. })));

        let mut issues = IssueList::new();
        let lowered = ConceptualToPhysical::default().convert(&model, &mut issues);
        assert!(matches!(lowered, Err(DataModelError::InheritanceCycle { .. })));
    }

    /// T1.3: The child's own `x` shadows the inherited one.
    #[test]
    fn own_property_shadows_inherited() {
        let model = chain();
        let analysis = Analysis::new(&model);
        let properties = analysis
            .properties_by(&model.concept_entity("C"), true)
            .expect("acyclic");

        let xs: Vec<_> = properties.iter().filter(|p| p.property == "x").collect();
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].value_type, text(DataType::String));
        assert_eq!(properties.len(), 2);
    }

    /// T1.4: Without ancestors only own properties are returned.
    #[test]
    fn own_properties_only() {
        let model = chain();
        let analysis = Analysis::new(&model);
        let properties = analysis
            .properties_by(&model.concept_entity("P"), false)
            .expect("acyclic");
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].property, "y");
    }
}

// =============================================================================
// TIER T2: CONTAINER LAYOUT
// =============================================================================

mod t2_container_layout {
    use super::*;

    /// T2.1: N+1 stored properties with capacity N give two containers,
    /// the second named by the bump rule, holding N and 1.
    #[test]
    fn overflow_splits_into_bumped_container() {
        let limit = 2;
        let mut model = model();
        let x = model.concept_entity("X");
        model.add_concept(Concept::new(x.clone()));
        for n in 0..=limit {
            model.add_property(ConceptualProperty::new(
                x.clone(),
                format!("p{}", n),
                text(DataType::String),
            ));
        }

        let config = ConversionConfig {
            max_properties_per_container: limit,
            ..ConversionConfig::default()
        };
        let mut issues = IssueList::new();
        let output = ConceptualToPhysical::new(config)
            .convert(&model, &mut issues)
            .expect("lowering");

        let names: Vec<&str> = output
            .physical
            .containers
            .iter()
            .map(|c| c.container.suffix.as_str())
            .collect();
        assert_eq!(names, vec!["X", "X2"]);

        let first = ContainerEntity::new("sp", "X");
        let second = ContainerEntity::new("sp", "X2");
        assert_eq!(output.physical.container_properties(&first).count(), limit);
        assert_eq!(output.physical.container_properties(&second).count(), 1);
        assert!(issues.contains(IssueCode::ContainerLimit));
    }

    /// T2.2: Union branches resolve to the widest primitive, in any order.
    #[test]
    fn union_resolution() {
        let cases = [
            (vec![DataType::Boolean, DataType::Integer], DataType::Integer),
            (
                vec![DataType::Float, DataType::Integer, DataType::Boolean],
                DataType::Double,
            ),
            (vec![DataType::Date, DataType::DateTime], DataType::DateTime),
            (vec![DataType::Json, DataType::String], DataType::String),
            (vec![DataType::Float, DataType::Float], DataType::Double),
            (vec![DataType::Date, DataType::Date], DataType::DateTime),
            (vec![DataType::Json], DataType::String),
            (vec![DataType::Integer], DataType::Integer),
        ];
        for (branches, expected) in cases {
            assert_eq!(DataType::resolve_union(&branches), expected);
            let reversed: Vec<DataType> = branches.iter().rev().copied().collect();
            assert_eq!(DataType::resolve_union(&reversed), expected);
        }
    }
}

// =============================================================================
// TIER T3: CONNECTION CLASSIFICATION
// =============================================================================

mod t3_connection_classification {
    use super::*;
    use datamorph_core::{
        Connection, ConnectionKind, PhysicalDataType, PhysicalValueType, PlatformSchema,
    };

    /// T3.1: A property typed by an edge class is an edge, even single-valued.
    #[test]
    fn edge_class_is_never_a_direct_relation() {
        let mut model = model();
        let pump = model.concept_entity("Pump");
        let sensor = model.concept_entity("Sensor");
        let reading = model.concept_entity("Reading");
        model
            .add_concept(Concept::new(pump.clone()))
            .add_concept(Concept::new(sensor.clone()))
            .add_concept(Concept::new(reading.clone()))
            .add_property(ConceptualProperty::new(
                reading.clone(),
                "startNode",
                ConceptualValueType::Concept(pump.clone()),
            ))
            .add_property(ConceptualProperty::new(
                reading.clone(),
                "endNode",
                ConceptualValueType::Concept(sensor),
            ))
            .add_property(
                ConceptualProperty::new(pump, "reading", ConceptualValueType::Concept(reading))
                    .with_cardinality(Some(0), Some(1)),
            );

        let output = lower(&model);
        let property = physical(&output, "Pump", "reading");
        assert_eq!(property.connection_kind(), ConnectionKind::EdgeConnection);
        let Some(Connection::Edge(edge)) = &property.connection else {
            unreachable!("classified as an edge");
        };
        assert_eq!(edge.direction, Direction::Outwards);
        assert_eq!(edge.edge_type, Some(NodeEntity::new("sp", "Reading")));
        assert_eq!(
            edge.properties,
            Some(ViewEntity::new("sp", "Reading").with_version("v1"))
        );
        assert!(property.container.is_none());
    }

    /// T3.2: Asset.sensor -> Sensor with unbounded cardinality becomes an
    /// edge with a generated type, not a container column.
    #[test]
    fn asset_sensor_end_to_end() {
        let mut model = model();
        let asset = model.concept_entity("Asset");
        let sensor = model.concept_entity("Sensor");
        model
            .add_concept(Concept::new(asset.clone()))
            .add_concept(Concept::new(sensor.clone()))
            .add_property(
                ConceptualProperty::new(asset, "sensor", ConceptualValueType::Concept(sensor))
                    .with_cardinality(Some(0), None),
            );

        let output = lower(&model);
        let property = physical(&output, "Asset", "sensor");
        assert_eq!(property.connection_kind(), ConnectionKind::EdgeConnection);
        assert!(property.container.is_none());
        assert!(property.container_property.is_none());

        let Some(Connection::Edge(edge)) = &property.connection else {
            unreachable!("classified as an edge");
        };
        assert_eq!(edge.edge_type, Some(NodeEntity::new("sp", "Asset.sensor")));
        assert!(output.physical.containers.is_empty());
        assert_eq!(output.physical.nodes.len(), 1);
    }

    /// T3.3: Properties found on a platform base are copied from the
    /// platform schema, and the platform's value type wins with a warning.
    #[test]
    fn platform_properties_are_copied_verbatim() {
        let mut platform = ConceptualModel::new(ConceptualMetadata::new("cdf", "core", "v1"));
        let describable = platform.concept_entity("Describable");
        platform
            .add_concept(Concept::new(describable.clone()))
            .add_property(ConceptualProperty::new(
                describable.clone(),
                "title",
                text(DataType::String),
            ));
        let platform = PlatformSchema::new(lower(&platform).physical);
        let base = platform
            .model()
            .properties
            .iter()
            .find(|p| p.view_property == "title")
            .expect("platform title");

        let mut model = model();
        let asset = model.concept_entity("Asset");
        model
            .add_concept(Concept::new(describable.clone()))
            .add_concept(Concept::new(asset.clone()).implementing([describable]))
            .add_property(ConceptualProperty::new(asset, "title", text(DataType::Integer)));

        let mut issues = IssueList::new();
        let output = ConceptualToPhysical::default()
            .with_platform(&platform)
            .convert(&model, &mut issues)
            .expect("lowering");

        let title = physical(&output, "Asset", "title");
        assert_eq!(title.value_type, PhysicalValueType::Data(PhysicalDataType::Text));
        assert_eq!(title.value_type, base.value_type);
        assert_eq!(title.container, Some(ContainerEntity::new("cdf", "Describable")));
        assert_eq!(title.container_property, base.container_property);
        assert_eq!(title.nullable, base.nullable);
        assert!(issues.contains(IssueCode::PlatformValueTypeOverridden));
        assert!(!issues.has_errors());
        assert!(
            output
                .physical
                .containers
                .iter()
                .all(|c| c.container.prefix != Prefix::named("cdf"))
        );
    }
}

// =============================================================================
// TIER T4: LINKING
// =============================================================================

mod t4_linking {
    use super::*;
    use datamorph_core::sync;

    fn lowered() -> ConversionOutput {
        let mut model = model();
        let asset = model.concept_entity("Asset");
        let pump = model.concept_entity("Pump");
        model
            .add_concept(Concept::new(asset.clone()))
            .add_concept(Concept::new(pump.clone()).implementing([asset.clone()]))
            .add_property(ConceptualProperty::new(asset, "name", text(DataType::String)))
            .add_property(ConceptualProperty::new(pump, "flow", text(DataType::Double)));
        lower(&model)
    }

    /// T4.1: Lowering stamps both sides of every property.
    #[test]
    fn lowering_links_both_ways() {
        let output = lowered();
        for property in &output.physical.properties {
            let conceptual_id = property.conceptual.clone().expect("physical side linked");
            let conceptual = output
                .conceptual
                .property(&conceptual_id)
                .expect("linked property exists");
            assert_eq!(conceptual.physical.as_ref(), Some(&property.id()));
        }
    }

    /// T4.2: Sync re-derives the conceptual side from the physical one.
    #[test]
    fn sync_restores_conceptual_links() {
        let mut output = lowered();
        for concept in &mut output.conceptual.concepts {
            concept.physical = None;
        }
        for property in &mut output.conceptual.properties {
            property.physical = None;
        }

        let links = sync(&mut output.conceptual, &mut output.physical).expect("sync");
        assert_eq!(links, output.links);
        for property in &output.physical.properties {
            let conceptual_id = property.conceptual.clone().expect("physical side linked");
            let conceptual = output
                .conceptual
                .property(&conceptual_id)
                .expect("linked property exists");
            assert_eq!(conceptual.physical.as_ref(), Some(&property.id()));
        }
        assert!(output.conceptual.concepts.iter().all(|c| c.physical.is_some()));
    }

    /// T4.3: A back-link to a missing conceptual element aborts the sync.
    #[test]
    fn dangling_link_aborts_sync() {
        let mut output = lowered();
        output.conceptual.properties.clear();
        let result = sync(&mut output.conceptual, &mut output.physical);
        assert!(matches!(result, Err(DataModelError::MissingLink { .. })));
    }
}
