use criterion::{black_box, criterion_group, criterion_main, Criterion, SamplingMode};
use huge_graph::prelude::*;

mod common;

use common::gen::uniform_relationships;
use common::*;

fn import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import");
    group.sampling_mode(SamplingMode::Flat);

    for direction in [
        LoadDirection::Outgoing,
        LoadDirection::Both,
        LoadDirection::Undirected,
    ] {
        group.bench_function(format!("{}_{direction:?}", SMALL.name), |b| {
            bench_import(b, SMALL, direction)
        });
        group.bench_function(format!("{}_{direction:?}", MEDIUM.name), |b| {
            bench_import(b, MEDIUM, direction)
        });
        group.bench_function(format!("{}_{direction:?}", LARGE.name), |b| {
            bench_import(b, LARGE, direction)
        });
    }

    group.finish();
}

fn bench_import(
    b: &mut criterion::Bencher,
    Input {
        name: _,
        node_count,
        relationship_count,
    }: Input,
    direction: LoadDirection,
) {
    let relationships = uniform_relationships(node_count, relationship_count);

    b.iter_batched(
        || relationships.clone(),
        |relationships| {
            black_box(
                GraphBuilder::new()
                    .direction(direction)
                    .nodes(0..node_count)
                    .relationships_with_weights(relationships)
                    .build()
                    .expect("imported graph"),
            )
        },
        criterion::BatchSize::SmallInput,
    )
}

fn edge_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_list");
    group.sampling_mode(SamplingMode::Flat);

    group.bench_function(SMALL.name, |b| bench_edge_list(b, SMALL));
    group.bench_function(MEDIUM.name, |b| bench_edge_list(b, MEDIUM));

    group.finish();
}

fn bench_edge_list(
    b: &mut criterion::Bencher,
    Input {
        name: _,
        node_count,
        relationship_count,
    }: Input,
) {
    let text = uniform_relationships(node_count, relationship_count)
        .into_iter()
        .map(|(s, t, w)| format!("{s} {t} {w}\n"))
        .collect::<String>();

    b.iter(|| black_box(EdgeList::try_from(text.as_bytes()).expect("valid edge list")));
}

criterion_group!(benches, import, edge_list);
criterion_main!(benches);
