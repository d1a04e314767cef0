use std::time::Instant;

use fxhash::FxHashMap;
use log::info;
use num_format::{Locale, ToFormattedString};

use crate::{
    graph::HugeGraph,
    id_map::{IdMap, IdMapBuilder},
    import,
    input::{EdgeList, InputRelationship},
    node_properties::NodePropertyMap,
    Error, LoadDirection,
};

/// Number of batches that may wait in the queue of a single import worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;
/// Number of node ids the scanner buffers per worker before sending.
pub const DEFAULT_QUEUE_BATCH_SIZE: usize = 3 * 1024;

/// Settings of an import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportConfig {
    pub direction: LoadDirection,
    /// Number of import workers to aim for.
    pub concurrency: usize,
    /// Weight of relationships without a stored weight.
    pub default_weight: f64,
    pub queue_capacity: usize,
    pub queue_batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            direction: LoadDirection::default(),
            concurrency: num_cpus::get(),
            default_weight: 0.0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            queue_batch_size: DEFAULT_QUEUE_BATCH_SIZE,
        }
    }
}

pub struct Uninitialized {
    config: ImportConfig,
}

pub struct WithNodes<Nodes>
where
    Nodes: IntoIterator<Item = u64>,
{
    config: ImportConfig,
    nodes: Nodes,
}

pub struct FromRelationships<Nodes, Rels>
where
    Nodes: IntoIterator<Item = u64>,
    Rels: IntoIterator,
    Rels::Item: Into<InputRelationship>,
{
    config: ImportConfig,
    nodes: Nodes,
    relationships: Rels,
    load_weights: bool,
    node_properties: Vec<NodePropertyInput>,
}

struct NodePropertyInput {
    name: String,
    default_value: f64,
    values: Vec<(u64, f64)>,
}

/// A builder to create graphs in a type-safe way.
///
/// The builder implementation uses different states to allow staged building
/// of graphs: the import is configured first, then the nodes are provided,
/// then the relationships between them.
///
/// # Examples
///
/// ```
/// use huge_graph::prelude::*;
///
/// let graph = GraphBuilder::new()
///     .concurrency(2)
///     .direction(LoadDirection::Undirected)
///     .nodes(0..4)
///     .relationships(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
///     .build()
///     .unwrap();
///
/// assert_eq!(graph.degree(1, Direction::Outgoing), 3);
/// ```
pub struct GraphBuilder<State> {
    state: State,
}

impl Default for GraphBuilder<Uninitialized> {
    fn default() -> Self {
        GraphBuilder::new()
    }
}

impl GraphBuilder<Uninitialized> {
    /// Creates a new builder with the default [`ImportConfig`].
    pub fn new() -> Self {
        Self::with_config(ImportConfig::default())
    }

    pub fn with_config(config: ImportConfig) -> Self {
        Self {
            state: Uninitialized { config },
        }
    }

    /// Sets which adjacency lists are built.
    #[must_use]
    pub fn direction(mut self, direction: LoadDirection) -> Self {
        self.state.config.direction = direction;
        self
    }

    /// Sets the number of import workers to aim for.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.state.config.concurrency = concurrency;
        self
    }

    /// Sets the weight of relationships that have no weight of their own.
    #[must_use]
    pub fn default_weight(mut self, default_weight: f64) -> Self {
        self.state.config.default_weight = default_weight;
        self
    }

    /// Sets the number of batches each worker queue can hold.
    #[must_use]
    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.state.config.queue_capacity = queue_capacity;
        self
    }

    /// Sets the number of node ids per batch.
    #[must_use]
    pub fn queue_batch_size(mut self, queue_batch_size: usize) -> Self {
        self.state.config.queue_batch_size = queue_batch_size;
        self
    }

    /// Provides the external ids of all nodes.
    ///
    /// Dense ids are assigned in iteration order.
    pub fn nodes<Nodes>(self, nodes: Nodes) -> GraphBuilder<WithNodes<Nodes>>
    where
        Nodes: IntoIterator<Item = u64>,
    {
        GraphBuilder {
            state: WithNodes {
                config: self.state.config,
                nodes,
            },
        }
    }

    /// Builds the graph from an edge list, using its endpoints as nodes.
    ///
    /// # Example
    ///
    /// ```
    /// use huge_graph::prelude::*;
    ///
    /// let edge_list = EdgeList::try_from(&b"10 20\n20 30 0.5\n"[..]).unwrap();
    /// let graph = GraphBuilder::new()
    ///     .edge_list(edge_list)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(graph.node_count(), 3);
    /// assert_eq!(graph.weight_of(1, 2), 0.5);
    /// ```
    pub fn edge_list(
        self,
        edge_list: EdgeList,
    ) -> GraphBuilder<FromRelationships<Vec<u64>, EdgeList>> {
        let nodes = edge_list.node_ids();
        self.nodes(nodes).edge_list(edge_list)
    }
}

impl<Nodes> GraphBuilder<WithNodes<Nodes>>
where
    Nodes: IntoIterator<Item = u64>,
{
    /// Provides the relationships as `(source, target)` pairs of external
    /// ids.
    pub fn relationships<Rels>(
        self,
        relationships: Rels,
    ) -> GraphBuilder<FromRelationships<Nodes, Rels>>
    where
        Rels: IntoIterator<Item = (u64, u64)>,
    {
        self.from_relationships(relationships, false)
    }

    /// Provides the relationships as `(source, target, weight)` triplets of
    /// external ids.
    pub fn relationships_with_weights<Rels>(
        self,
        relationships: Rels,
    ) -> GraphBuilder<FromRelationships<Nodes, Rels>>
    where
        Rels: IntoIterator<Item = (u64, u64, f64)>,
    {
        self.from_relationships(relationships, true)
    }

    /// Provides the relationships of an edge list. Weights are loaded if any
    /// relationship has one.
    pub fn edge_list(
        self,
        edge_list: EdgeList,
    ) -> GraphBuilder<FromRelationships<Nodes, EdgeList>> {
        let load_weights = edge_list.has_weights();
        self.from_relationships(edge_list, load_weights)
    }

    fn from_relationships<Rels>(
        self,
        relationships: Rels,
        load_weights: bool,
    ) -> GraphBuilder<FromRelationships<Nodes, Rels>>
    where
        Rels: IntoIterator,
        Rels::Item: Into<InputRelationship>,
    {
        GraphBuilder {
            state: FromRelationships {
                config: self.state.config,
                nodes: self.state.nodes,
                relationships,
                load_weights,
                node_properties: Vec::new(),
            },
        }
    }
}

impl<Nodes, Rels> GraphBuilder<FromRelationships<Nodes, Rels>>
where
    Nodes: IntoIterator<Item = u64>,
    Rels: IntoIterator,
    Rels::Item: Into<InputRelationship>,
{
    /// Adds a numeric node property from `(node, value)` pairs of external
    /// ids.
    ///
    /// Nodes without a value read `default_value`. Values of unknown nodes
    /// are ignored. Adding a property with the same name again replaces it.
    ///
    /// # Example
    ///
    /// ```
    /// use huge_graph::prelude::*;
    ///
    /// let graph = GraphBuilder::new()
    ///     .nodes(vec![10, 20, 30])
    ///     .relationships(vec![(10, 20), (20, 30)])
    ///     .node_property("rank", 1.0, vec![(20, 0.5), (99, 7.0)])
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(graph.node_property("rank", 1), Some(0.5));
    /// assert_eq!(graph.node_property("rank", 2), Some(1.0));
    /// assert_eq!(graph.node_property("age", 1), None);
    /// ```
    #[must_use]
    pub fn node_property<Values>(
        mut self,
        name: &str,
        default_value: f64,
        values: Values,
    ) -> Self
    where
        Values: IntoIterator<Item = (u64, f64)>,
    {
        self.state.node_properties.push(NodePropertyInput {
            name: name.to_string(),
            default_value,
            values: values.into_iter().collect(),
        });
        self
    }

    /// Maps the nodes, imports the relationships and returns the graph.
    pub fn build(self) -> Result<HugeGraph, Error> {
        let FromRelationships {
            config,
            nodes,
            relationships,
            load_weights,
            node_properties,
        } = self.state;

        let start = Instant::now();
        let mut id_map = IdMapBuilder::new();
        id_map.extend(nodes);
        let id_map = id_map.build();
        info!(
            "Mapped {} nodes in {:?}",
            id_map.node_count().to_formatted_string(&Locale::en),
            start.elapsed()
        );

        let start = Instant::now();
        let topology = import::import(
            &id_map,
            &config,
            load_weights,
            relationships.into_iter().map(Into::into),
        )?;
        info!("Imported relationships in {:?}", start.elapsed());

        let node_properties = load_node_properties(&id_map, node_properties);

        Ok(HugeGraph::new(
            id_map,
            topology,
            config.direction,
            node_properties,
        ))
    }
}

fn load_node_properties(
    id_map: &IdMap,
    inputs: Vec<NodePropertyInput>,
) -> FxHashMap<String, NodePropertyMap> {
    let mut properties = FxHashMap::default();

    for NodePropertyInput {
        name,
        default_value,
        values,
    } in inputs
    {
        let start = Instant::now();
        let mut map = NodePropertyMap::new(id_map.node_count(), default_value);
        let mut unknown = 0_u64;
        for (original, value) in values {
            match id_map.to_dense_id(original) {
                Some(node) => map.put(node, value),
                None => unknown += 1,
            }
        }
        info!(
            "Loaded node property '{name}' with {} values ({} unknown nodes) in {:?}",
            map.len().to_formatted_string(&Locale::en),
            unknown.to_formatted_string(&Locale::en),
            start.elapsed()
        );
        properties.insert(name, map);
    }

    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;

    #[test]
    fn default_config() {
        let config = ImportConfig::default();

        assert_eq!(config.direction, LoadDirection::Outgoing);
        assert_eq!(config.concurrency, num_cpus::get());
        assert_eq!(config.default_weight, 0.0);
        assert_eq!(config.queue_capacity, 128);
        assert_eq!(config.queue_batch_size, 3072);
    }

    #[test]
    fn setters_change_the_config() {
        let builder = GraphBuilder::new()
            .direction(LoadDirection::Both)
            .concurrency(3)
            .default_weight(2.0)
            .queue_capacity(4)
            .queue_batch_size(16);

        assert_eq!(
            builder.state.config,
            ImportConfig {
                direction: LoadDirection::Both,
                concurrency: 3,
                default_weight: 2.0,
                queue_capacity: 4,
                queue_batch_size: 16,
            }
        );
    }

    #[test]
    fn graph_from_edge_list_with_explicit_nodes() {
        let edge_list = [(1_u64, 2_u64), (2, 3)].into_iter().collect::<EdgeList>();
        let graph = GraphBuilder::new()
            .concurrency(2)
            .nodes(vec![3, 2, 1])
            .edge_list(edge_list)
            .build()
            .unwrap();

        assert_eq!(graph.to_dense_id(3), Some(0));
        assert_eq!(graph.degree(2, Direction::Outgoing), 1);
        assert!(graph.exists(2, 1, Direction::Outgoing));
    }

    #[test]
    fn node_properties_resolve_external_ids() {
        let graph = GraphBuilder::new()
            .concurrency(2)
            .nodes(vec![7, 5, 3])
            .relationships(vec![(7, 5)])
            .node_property("score", 0.0, vec![(3, 1.5), (8, 2.0)])
            .node_property("size", 10.0, vec![(7, 11.0)])
            .node_property("score", -1.0, vec![(5, 2.5)])
            .build()
            .unwrap();

        assert_eq!(graph.available_node_properties(), vec!["score", "size"]);
        assert_eq!(graph.node_property("score", 1), Some(2.5));
        assert_eq!(graph.node_property("score", 2), Some(-1.0));
        assert_eq!(graph.node_property("size", 0), Some(11.0));
        assert_eq!(graph.node_property("size", 2), Some(10.0));
        assert_eq!(graph.node_property("missing", 0), None);
        assert_eq!(graph.node_properties("size").map(|p| p.len()), Some(1));
    }

    #[test]
    fn empty_graph() {
        let graph = GraphBuilder::new()
            .nodes(Vec::new())
            .relationships(Vec::new())
            .build()
            .unwrap();

        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.relationship_count(), 0);
    }
}
