use std::{ops::Range, sync::Arc};

use fxhash::FxHashMap;

use crate::{
    id_map::IdMap,
    import::Topology,
    node_properties::NodePropertyMap,
    store::{Adjacency, AdjacencyCursor},
    weights::WeightMap,
    Direction, LoadDirection,
};

mod intersect;

pub use intersect::GraphIntersect;

struct GraphInner {
    id_map: IdMap,
    outgoing: Option<Adjacency>,
    incoming: Option<Adjacency>,
    weights: WeightMap,
    direction: LoadDirection,
    relationship_count: u64,
    node_properties: FxHashMap<String, NodePropertyMap>,
}

/// An immutable graph with compressed adjacency lists.
///
/// Nodes are addressed by their dense id `0..node_count()`. The graph is a
/// cheap handle around shared, read-only data: cloning it or calling
/// [`concurrent_copy`](Self::concurrent_copy) does not copy any lists and
/// every copy can be moved to another thread.
///
/// Traversals decode the lists through an [`AdjacencyCursor`] that lives for
/// the duration of a call. Algorithms that visit many nodes can keep a cursor
/// around instead, see [`cursor_for`](Self::cursor_for).
#[derive(Clone)]
pub struct HugeGraph {
    inner: Arc<GraphInner>,
}

impl HugeGraph {
    pub fn new(
        id_map: IdMap,
        topology: Topology,
        direction: LoadDirection,
        node_properties: FxHashMap<String, NodePropertyMap>,
    ) -> Self {
        let Topology {
            outgoing,
            incoming,
            weights,
            relationship_count,
        } = topology;

        Self {
            inner: Arc::new(GraphInner {
                id_map,
                outgoing,
                incoming,
                weights,
                direction,
                relationship_count,
                node_properties,
            }),
        }
    }

    delegate::delegate! {
        to self.inner.id_map {
            /// Number of nodes, i.e. the exclusive upper bound of dense ids.
            pub fn node_count(&self) -> u64;

            /// Returns the external id of a dense node id.
            ///
            /// # Panics
            ///
            /// If `node` is not smaller than [`Self::node_count`].
            pub fn to_original_id(&self, node: u64) -> u64;

            /// Returns the dense id of an external id, if the node exists.
            pub fn to_dense_id(&self, original: u64) -> Option<u64>;

            pub fn contains(&self, original: u64) -> bool;
        }
    }

    /// Number of stored relationships.
    ///
    /// Undirected graphs count every relationship once per endpoint.
    pub fn relationship_count(&self) -> u64 {
        self.inner.relationship_count
    }

    /// The lists built during import.
    pub fn direction(&self) -> LoadDirection {
        self.inner.direction
    }

    pub fn is_undirected(&self) -> bool {
        self.inner.direction.is_undirected()
    }

    /// Returns `true` if weights were loaded.
    pub fn has_weights(&self) -> bool {
        !self.inner.weights.is_null()
    }

    pub fn weights(&self) -> &WeightMap {
        &self.inner.weights
    }

    /// Value of the node property `name` for `node`, falling back to the
    /// property's default value.
    ///
    /// Returns `None` if no property of that name was loaded.
    pub fn node_property(&self, name: &str, node: u64) -> Option<f64> {
        self.inner
            .node_properties
            .get(name)
            .map(|property| property.get(node))
    }

    pub fn node_properties(&self, name: &str) -> Option<&NodePropertyMap> {
        self.inner.node_properties.get(name)
    }

    /// Names of all loaded node properties in ascending order.
    pub fn available_node_properties(&self) -> Vec<&str> {
        let mut names = self
            .inner
            .node_properties
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Number of relationships of `node` in the given direction.
    ///
    /// [`Direction::Both`] sums up outgoing and incoming relationships.
    /// Unknown nodes and directions that were not loaded have degree zero.
    pub fn degree(&self, node: u64, direction: Direction) -> u32 {
        self.lists(direction)
            .fold(0_u32, |degree, (adjacency, _)| {
                degree.saturating_add(adjacency.degree(node))
            })
    }

    /// Calls `consumer` with `(node, target)` for every relationship of
    /// `node` until it returns `false`.
    ///
    /// Targets arrive in ascending order per list. [`Direction::Both`] visits
    /// the outgoing list first, then the incoming one.
    pub fn for_each_relationship<F>(&self, node: u64, direction: Direction, mut consumer: F)
    where
        F: FnMut(u64, u64) -> bool,
    {
        for (adjacency, _) in self.lists(direction) {
            if !visit(adjacency, node, |target| consumer(node, target)) {
                return;
            }
        }
    }

    /// Like [`for_each_relationship`](Self::for_each_relationship) but also
    /// passes the weight of every relationship.
    ///
    /// Weights are stored per source node, so an incoming relationship
    /// `(node, other)` reports the weight of `other -> node`.
    pub fn for_each_weighted_relationship<F>(
        &self,
        node: u64,
        direction: Direction,
        mut consumer: F,
    ) where
        F: FnMut(u64, u64, f64) -> bool,
    {
        let weights = &self.inner.weights;
        for (adjacency, reversed) in self.lists(direction) {
            let proceed = visit(adjacency, node, |target| {
                let weight = if reversed {
                    weights.weight(target, node)
                } else {
                    weights.weight(node, target)
                };
                consumer(node, target, weight)
            });
            if !proceed {
                return;
            }
        }
    }

    /// Returns `true` if there is a relationship between `source` and
    /// `target` in the given direction.
    pub fn exists(&self, source: u64, target: u64, direction: Direction) -> bool {
        self.lists(direction).any(|(adjacency, _)| {
            let address = adjacency.address(source);
            !address.is_empty() && adjacency.list().cursor_at(address).advance(target) == target
        })
    }

    /// Returns the target at position `index` of the relationships of
    /// `source`, in the order [`for_each_relationship`](Self::for_each_relationship)
    /// visits them.
    pub fn nth_target(&self, source: u64, index: usize, direction: Direction) -> Option<u64> {
        let mut index = index;
        for (adjacency, _) in self.lists(direction) {
            let degree = adjacency.degree(source) as usize;
            if index < degree {
                return adjacency
                    .list()
                    .cursor_at(adjacency.address(source))
                    .nth(index);
            }
            index -= degree;
        }
        None
    }

    /// Sorted common outgoing neighbors of `a` and `b`.
    ///
    /// For undirected graphs these are the common neighbors.
    pub fn intersect(&self, a: u64, b: u64) -> Vec<u64> {
        let mut result = Vec::new();
        if let Some(adjacency) = self.primary() {
            let list = adjacency.list();
            let mut first = list.cursor_at(adjacency.address(a));
            let mut second = list.cursor_at(adjacency.address(b));
            if first.remaining() > second.remaining() {
                std::mem::swap(&mut first, &mut second);
            }
            intersect::merge(&mut first, &mut second, |value| result.push(value));
        }
        result
    }

    /// Creates a reusable cursor cache for triangle enumeration.
    pub fn intersection(&self) -> GraphIntersect<'_> {
        GraphIntersect::new(self.primary())
    }

    /// Returns the weight of the relationship `source -> target` or the
    /// default weight if there is none.
    pub fn weight_of(&self, source: u64, target: u64) -> f64 {
        self.inner.weights.weight(source, target)
    }

    /// Returns the weight of the relationship `source -> target` or
    /// `default` if there is none.
    pub fn weight_or(&self, source: u64, target: u64, default: f64) -> f64 {
        self.inner.weights.weight_or(source, target, default)
    }

    /// Calls `consumer` for every node in ascending order until it returns
    /// `false`.
    pub fn for_each_node<F>(&self, mut consumer: F)
    where
        F: FnMut(u64) -> bool,
    {
        for node in 0..self.node_count() {
            if !consumer(node) {
                return;
            }
        }
    }

    /// Splits the nodes into consecutive ranges of `batch_size` nodes. The
    /// last range may be shorter.
    pub fn batch_ranges(&self, batch_size: u64) -> Vec<Range<u64>> {
        let batch_size = batch_size.max(1);
        let node_count = self.node_count();
        (0..node_count)
            .step_by(batch_size as usize)
            .map(|start| start..node_count.min(start + batch_size))
            .collect()
    }

    /// Creates a cursor over the list of the given direction.
    ///
    /// Returns `None` if the direction was not loaded or if it is
    /// [`Direction::Both`] on a directed graph, which spans two lists.
    pub fn adjacency_cursor(&self, direction: Direction) -> Option<AdjacencyCursor<'_>> {
        self.single_list(direction)
            .map(|adjacency| adjacency.list().new_cursor())
    }

    /// Positions `cursor` on the list of `node` and returns the degree.
    ///
    /// A cursor created for another list is replaced. If there is no single
    /// list for `direction`, the cursor is emptied.
    pub fn cursor_for<'g>(
        &'g self,
        node: u64,
        direction: Direction,
        cursor: &mut AdjacencyCursor<'g>,
    ) -> u32 {
        match self.single_list(direction) {
            Some(adjacency) => {
                if !cursor.reads_from(adjacency.list()) {
                    *cursor = adjacency.list().new_cursor();
                }
                cursor.reset(adjacency.address(node))
            }
            None => {
                cursor.reset_empty();
                0
            }
        }
    }

    /// Creates another handle to the same graph, e.g. for another thread.
    pub fn concurrent_copy(&self) -> Self {
        self.clone()
    }

    /// Approximate heap size of the graph in bytes.
    pub fn memory_usage(&self) -> usize {
        let inner = &*self.inner;
        inner.id_map.memory_usage()
            + inner.outgoing.as_ref().map_or(0, Adjacency::memory_usage)
            + inner.incoming.as_ref().map_or(0, Adjacency::memory_usage)
            + inner.weights.memory_usage()
            + inner
                .node_properties
                .values()
                .map(NodePropertyMap::memory_usage)
                .sum::<usize>()
    }

    pub fn outgoing(&self) -> Option<&Adjacency> {
        self.inner.outgoing.as_ref()
    }

    pub fn incoming(&self) -> Option<&Adjacency> {
        self.inner.incoming.as_ref()
    }

    // The list that holds the outgoing neighbors, or all neighbors of an
    // undirected graph.
    fn primary(&self) -> Option<&Adjacency> {
        self.inner.outgoing.as_ref()
    }

    fn single_list(&self, direction: Direction) -> Option<&Adjacency> {
        let inner = &*self.inner;
        if inner.direction.is_undirected() {
            return inner.outgoing.as_ref();
        }
        match direction {
            Direction::Outgoing => inner.outgoing.as_ref(),
            Direction::Incoming => inner.incoming.as_ref(),
            Direction::Both => None,
        }
    }

    // Lists to traverse for `direction`, flagged with `true` if they hold
    // incoming relationships.
    fn lists(&self, direction: Direction) -> impl Iterator<Item = (&Adjacency, bool)> + '_ {
        let inner = &*self.inner;
        let lists = if inner.direction.is_undirected() {
            [(inner.outgoing.as_ref(), false), (None, true)]
        } else {
            match direction {
                Direction::Outgoing => [(inner.outgoing.as_ref(), false), (None, true)],
                Direction::Incoming => [(inner.incoming.as_ref(), true), (None, true)],
                Direction::Both => [
                    (inner.outgoing.as_ref(), false),
                    (inner.incoming.as_ref(), true),
                ],
            }
        };
        lists
            .into_iter()
            .filter_map(|(adjacency, reversed)| adjacency.map(|adjacency| (adjacency, reversed)))
    }
}

impl std::fmt::Debug for HugeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HugeGraph")
            .field("node_count", &self.node_count())
            .field("relationship_count", &self.relationship_count())
            .field("direction", &self.direction())
            .finish()
    }
}

// Feeds the targets of `node` to `consumer`, returns `false` if the consumer
// stopped early.
fn visit<F>(adjacency: &Adjacency, node: u64, mut consumer: F) -> bool
where
    F: FnMut(u64) -> bool,
{
    let address = adjacency.address(node);
    if address.is_empty() {
        return true;
    }
    let mut cursor = adjacency.list().cursor_at(address);
    while cursor.has_next() {
        if !consumer(cursor.next_vlong()) {
            return false;
        }
    }
    true
}
