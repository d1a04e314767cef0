use huge_graph::prelude::*;
use rand::prelude::*;

/// Relationships between uniformly chosen nodes, with weights in `0..1`.
pub fn uniform_relationships(node_count: u64, relationship_count: usize) -> Vec<(u64, u64, f64)> {
    let mut rng = StdRng::seed_from_u64(42);

    (0..relationship_count)
        .map(|_| {
            let source = rng.gen_range(0..node_count);
            let target = rng.gen_range(0..node_count);

            (source, target, rng.gen::<f64>())
        })
        .collect::<Vec<_>>()
}

/// Builds a graph over the nodes `0..node_count`.
pub fn uniform_graph(
    node_count: u64,
    relationship_count: usize,
    direction: LoadDirection,
) -> HugeGraph {
    let relationships = uniform_relationships(node_count, relationship_count);

    GraphBuilder::new()
        .direction(direction)
        .nodes(0..node_count)
        .relationships(relationships.into_iter().map(|(s, t, _)| (s, t)))
        .build()
        .expect("benchmark graph")
}
