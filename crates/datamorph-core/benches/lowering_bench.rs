//! # Lowering Benchmarks
//!
//! Performance benchmarks for datamorph-core conversions.
//!
//! Run with: `cargo bench -p datamorph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use datamorph_core::{
    Analysis, Concept, ConceptualMetadata, ConceptualModel, ConceptualProperty,
    ConceptualToPhysical, ConceptualValueType, DataType, IssueList, PhysicalToConceptual,
};
use std::hint::black_box;

/// A chain of N concepts, each implementing the previous one, with a few
/// primitive properties and a relation back to the root.
fn create_chain_model(size: usize) -> ConceptualModel {
    let mut model = ConceptualModel::new(ConceptualMetadata::new("sp", "bench", "v1"));
    let root = model.concept_entity("C0");
    let mut previous = None;

    for i in 0..size {
        let concept = model.concept_entity(format!("C{}", i));
        let mut built = Concept::new(concept.clone());
        if let Some(parent) = previous.take() {
            built.implements.push(parent);
        }
        model.add_concept(built);
        model
            .add_property(ConceptualProperty::new(
                concept.clone(),
                format!("name{}", i),
                ConceptualValueType::Data(DataType::String),
            ))
            .add_property(ConceptualProperty::new(
                concept.clone(),
                format!("value{}", i),
                ConceptualValueType::Union(vec![
                    ConceptualValueType::Data(DataType::Integer),
                    ConceptualValueType::Data(DataType::Double),
                ]),
            ))
            .add_property(
                ConceptualProperty::new(
                    concept.clone(),
                    format!("root{}", i),
                    ConceptualValueType::Concept(root.clone()),
                )
                .with_cardinality(Some(0), None),
            );
        previous = Some(concept);
    }

    model
}

/// N unrelated concepts with many properties each, to stress container
/// splitting.
fn create_wide_model(size: usize) -> ConceptualModel {
    let mut model = ConceptualModel::new(ConceptualMetadata::new("sp", "bench", "v1"));
    for i in 0..size {
        let concept = model.concept_entity(format!("W{}", i));
        model.add_concept(Concept::new(concept.clone()));
        for p in 0..250 {
            model.add_property(ConceptualProperty::new(
                concept.clone(),
                format!("p{}", p),
                ConceptualValueType::Data(DataType::Double),
            ));
        }
    }
    model
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_ancestor_closure(c: &mut Criterion) {
    let mut group = c.benchmark_group("ancestor_closure");

    for size in [10, 100, 500].iter() {
        let model = create_chain_model(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &model, |b, model| {
            b.iter(|| {
                let analysis = Analysis::new(model);
                black_box(analysis.ancestors_by_node().map(|closure| closure.len()))
            });
        });
    }

    group.finish();
}

fn bench_lowering_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering_chain");
    let converter = ConceptualToPhysical::default();

    for size in [10, 100, 500].iter() {
        let model = create_chain_model(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &model, |b, model| {
            b.iter(|| {
                let mut issues = IssueList::new();
                black_box(converter.convert(model, &mut issues).expect("lowering"))
            });
        });
    }

    group.finish();
}

fn bench_lowering_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering_wide");
    let converter = ConceptualToPhysical::default();

    for size in [1, 10, 50].iter() {
        let model = create_wide_model(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &model, |b, model| {
            b.iter(|| {
                let mut issues = IssueList::new();
                black_box(converter.convert(model, &mut issues).expect("lowering"))
            });
        });
    }

    group.finish();
}

fn bench_lifting(c: &mut Criterion) {
    let mut group = c.benchmark_group("lifting");
    let lifter = PhysicalToConceptual::new();

    for size in [10, 100, 500].iter() {
        let mut issues = IssueList::new();
        let physical = ConceptualToPhysical::default()
            .convert(&create_chain_model(*size), &mut issues)
            .expect("lowering")
            .physical;
        group.bench_with_input(BenchmarkId::from_parameter(size), &physical, |b, physical| {
            b.iter(|| {
                let mut issues = IssueList::new();
                black_box(lifter.convert(physical, &mut issues).expect("lifting"))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ancestor_closure,
    bench_lowering_chain,
    bench_lowering_wide,
    bench_lifting
);
criterion_main!(benches);
