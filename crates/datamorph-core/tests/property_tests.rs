//! # Property-Based Tests
//!
//! Determinism and round-trip invariants checked with proptest.

use datamorph_core::entity::notation::serialize;
use datamorph_core::entity::{
    AssetEntity, NamedIndividualEntity, ReferenceEntity, RelationshipEntity, UnitEntity,
    UnknownEntity,
};
use datamorph_core::{
    Concept, ConceptEntity, ConceptualMetadata, ConceptualModel, ConceptualProperty,
    ConceptualToPhysical, ConceptualValueType, ContainerConstraintEntity, ContainerEntity,
    ContainerIndexEntity, DataModelEntity, DataType, Defaults, Direction, EdgeEntity, Entity,
    EntityKind, IssueList, NodeEntity, NotationParser, PhysicalTable, Prefix,
    ReverseConnectionEntity, ViewEntity,
};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::subsequence;

// =============================================================================
// STRATEGIES
// =============================================================================

fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,11}"
}

fn version() -> impl Strategy<Value = String> {
    "v[0-9]{1,3}"
}

/// Either the default prefix or another one, so both the compact and the
/// full form are exercised.
fn prefix() -> impl Strategy<Value = String> {
    prop_oneof![Just("sp".to_string()), "[a-z]{2,6}"]
}

fn concept() -> impl Strategy<Value = ConceptEntity> {
    (prefix(), identifier(), version()).prop_map(|(prefix, suffix, version)| {
        ConceptEntity::new(prefix, suffix).with_version(version)
    })
}

fn view() -> impl Strategy<Value = ViewEntity> {
    (prefix(), identifier(), version())
        .prop_map(|(prefix, suffix, version)| ViewEntity::new(prefix, suffix).with_version(version))
}

fn container() -> impl Strategy<Value = ContainerEntity> {
    (prefix(), identifier()).prop_map(|(prefix, suffix)| ContainerEntity::new(prefix, suffix))
}

fn node() -> impl Strategy<Value = NodeEntity> {
    (prefix(), identifier(), identifier()).prop_map(|(prefix, view, property)| {
        NodeEntity::new(prefix, format!("{}.{}", view, property))
    })
}

fn edge() -> impl Strategy<Value = EdgeEntity> {
    (
        proptest::option::of(node()),
        proptest::option::of(view()),
        prop_oneof![Just(Direction::Outwards), Just(Direction::Inwards)],
    )
        .prop_map(|(edge_type, properties, direction)| EdgeEntity {
            edge_type,
            properties,
            direction,
        })
}

fn index() -> impl Strategy<Value = ContainerIndexEntity> {
    (
        prop_oneof![Just("btree"), Just("inverted")],
        identifier(),
        proptest::option::of(0u32..100),
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(kind, suffix, order, cursorable, by_space)| ContainerIndexEntity {
            prefix: Prefix::named(kind),
            suffix,
            order,
            cursorable,
            by_space,
        })
}

fn constraint() -> impl Strategy<Value = ContainerConstraintEntity> {
    (
        prop_oneof![Just("requires"), Just("uniqueness")],
        identifier(),
        proptest::option::of(container()),
    )
        .prop_map(|(kind, suffix, require)| ContainerConstraintEntity {
            prefix: Prefix::named(kind),
            suffix,
            require,
        })
}

fn data_model() -> impl Strategy<Value = DataModelEntity> {
    (prefix(), identifier(), version()).prop_map(|(prefix, suffix, version)| DataModelEntity {
        prefix: Prefix::named(prefix),
        suffix,
        version: Some(version),
    })
}

fn reference() -> impl Strategy<Value = ReferenceEntity> {
    (prefix(), identifier(), version(), proptest::option::of(identifier())).prop_map(
        |(prefix, suffix, version, property)| ReferenceEntity {
            prefix: Prefix::named(prefix),
            suffix,
            version: Some(version),
            property,
        },
    )
}

/// Variants whose prefix and version both have defaults.
fn versioned() -> impl Strategy<Value = (EntityKind, Entity)> {
    prop_oneof![
        concept().prop_map(|e| (EntityKind::Concept, Entity::from(e))),
        view().prop_map(|e| (EntityKind::View, Entity::from(e))),
        data_model().prop_map(|e| (EntityKind::DataModel, Entity::from(e))),
        reference().prop_map(|e| (EntityKind::Reference, Entity::from(e))),
    ]
}

/// Variants carrying only a prefix and a suffix.
fn named() -> impl Strategy<Value = (EntityKind, Entity)> {
    prop_oneof![
        (prefix(), identifier()).prop_map(|(prefix, suffix)| {
            let unit = UnitEntity {
                prefix: Prefix::named(prefix),
                suffix,
            };
            (EntityKind::Unit, Entity::from(unit))
        }),
        (prefix(), identifier()).prop_map(|(prefix, suffix)| {
            let individual = NamedIndividualEntity {
                prefix: Prefix::named(prefix),
                suffix,
            };
            (EntityKind::NamedIndividual, Entity::from(individual))
        }),
    ]
}

/// Keyword variants and the `#N/A` value of both flavours.
fn fixed() -> impl Strategy<Value = (EntityKind, Entity)> {
    prop_oneof![
        identifier().prop_map(|property| {
            (EntityKind::Asset, Entity::from(AssetEntity { property }))
        }),
        proptest::option::of(identifier()).prop_map(|label| {
            (EntityKind::Relationship, Entity::from(RelationshipEntity { label }))
        }),
        Just((
            EntityKind::Concept,
            Entity::Unknown(UnknownEntity { physical: false })
        )),
        Just((EntityKind::View, Entity::Unknown(UnknownEntity { physical: true }))),
    ]
}

fn entity() -> impl Strategy<Value = (EntityKind, Entity)> {
    prop_oneof![
        versioned(),
        named(),
        fixed(),
        container().prop_map(|e| (EntityKind::Container, Entity::from(e))),
        node().prop_map(|e| (EntityKind::Node, Entity::from(e))),
        edge().prop_map(|e| (EntityKind::Edge, Entity::from(e))),
        identifier().prop_map(|property| {
            (
                EntityKind::ReverseConnection,
                Entity::from(ReverseConnectionEntity { property }),
            )
        }),
        index().prop_map(|e| (EntityKind::ContainerIndex, Entity::from(e))),
        constraint().prop_map(|e| (EntityKind::ContainerConstraint, Entity::from(e))),
    ]
}

fn defaults() -> impl Strategy<Value = Defaults> {
    prop_oneof![
        Just(Defaults::none()),
        Just(Defaults::prefix_version("sp", "v1")),
    ]
}

fn data_types() -> impl Strategy<Value = (Vec<DataType>, Vec<DataType>)> {
    subsequence(DataType::ALL.to_vec(), 1..6)
        .prop_flat_map(|picked| (Just(picked.clone()), Just(picked).prop_shuffle()))
}

/// A small acyclic model: concept `i` may implement a concept `j < i`, and
/// each concept carries a few properties drawn from a mixed pool.
fn model() -> impl Strategy<Value = ConceptualModel> {
    vec((proptest::option::of(0usize..8), vec((0usize..6, 0u8..3), 0..5)), 1..8).prop_map(
        |concepts| {
            let mut model = ConceptualModel::new(ConceptualMetadata::new("sp", "generated", "v1"));
            let names: Vec<ConceptEntity> = (0..concepts.len())
                .map(|i| model.concept_entity(format!("C{}", i)))
                .collect();
            for (i, (parent, properties)) in concepts.iter().enumerate() {
                let mut concept = Concept::new(names[i].clone());
                if let Some(parent) = parent.filter(|p| *p < i) {
                    concept.implements.push(names[parent].clone());
                }
                model.add_concept(concept);
                for (n, (pick, cardinality)) in properties.iter().enumerate() {
                    let value_type = match pick {
                        0 => ConceptualValueType::Data(DataType::String),
                        1 => ConceptualValueType::Data(DataType::Double),
                        2 => ConceptualValueType::Unknown,
                        other => ConceptualValueType::Concept(names[other % names.len()].clone()),
                    };
                    let max = match cardinality {
                        0 => Some(1),
                        1 => Some(5),
                        _ => None,
                    };
                    model.add_property(
                        ConceptualProperty::new(names[i].clone(), format!("p{}", n), value_type)
                            .with_cardinality(Some(0), max),
                    );
                }
            }
            model
        },
    )
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// parse(serialize(e, d), d) == e for every variant.
    #[test]
    fn notation_round_trip((kind, entity) in entity(), defaults in defaults()) {
        let parser = NotationParser::new().expect("grammar compiles");
        let text = serialize(&entity, &defaults);
        let parsed = parser.parse(kind, &text, &defaults).expect("serialized text parses");
        prop_assert_eq!(parsed, entity, "text was '{}'", text);
    }

    /// Entities in the default prefix and version serialize without them.
    #[test]
    fn default_fields_are_omitted(suffix in identifier()) {
        let defaults = Defaults::prefix_version("sp", "v1");
        let view = ViewEntity::new("sp", suffix.clone()).with_version("v1");
        prop_assert_eq!(serialize(&view, &defaults), suffix);
    }

    /// Union resolution ignores branch order.
    #[test]
    fn union_resolution_is_order_independent((picked, shuffled) in data_types()) {
        prop_assert_eq!(
            DataType::resolve_union(&picked),
            DataType::resolve_union(&shuffled)
        );
    }

    /// Two lowerings of the same model are identical, down to the rows.
    #[test]
    fn lowering_is_deterministic(model in model()) {
        let converter = ConceptualToPhysical::default();
        let mut first_issues = IssueList::new();
        let mut second_issues = IssueList::new();
        let first = converter.convert(&model, &mut first_issues).expect("acyclic model lowers");
        let second = converter.convert(&model, &mut second_issues).expect("acyclic model lowers");

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first_issues, second_issues);

        let first_rows = serde_json::to_string(&PhysicalTable::from_model(&first.physical))
            .expect("rows serialize");
        let second_rows = serde_json::to_string(&PhysicalTable::from_model(&second.physical))
            .expect("rows serialize");
        prop_assert_eq!(first_rows, second_rows);
    }

    /// Every lowered property is linked both ways.
    #[test]
    fn lowering_links_are_symmetric(model in model()) {
        let mut issues = IssueList::new();
        let output = ConceptualToPhysical::default()
            .convert(&model, &mut issues)
            .expect("acyclic model lowers");
        for physical in &output.physical.properties {
            let conceptual_id = physical.conceptual.clone().expect("physical side linked");
            let conceptual = output
                .conceptual
                .property(&conceptual_id)
                .expect("linked conceptual property exists");
            prop_assert_eq!(conceptual.physical.as_ref(), Some(&physical.id()));
        }
    }

    /// Containers never hold more stored properties than the limit.
    #[test]
    fn containers_respect_capacity(model in model(), limit in 1usize..4) {
        let config = datamorph_core::ConversionConfig {
            max_properties_per_container: limit,
            ..datamorph_core::ConversionConfig::default()
        };
        let mut issues = IssueList::new();
        let output = ConceptualToPhysical::new(config)
            .convert(&model, &mut issues)
            .expect("acyclic model lowers");
        for container in &output.physical.containers {
            let held = output.physical.container_properties(&container.container).count();
            prop_assert!(held <= limit, "{} holds {}", container.container, held);
        }
    }
}
