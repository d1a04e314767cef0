//! A graph store for graphs with billions of relationships.
//!
//! External node ids are mapped to dense ids `0..N`. The neighbors of every
//! node are sorted, deduplicated and stored as varint encoded gaps in large
//! byte pages, which keeps the memory footprint of a relationship at a few
//! bytes. Relationships are imported by many threads at once, each one owning
//! a range of nodes and the pages it writes.
//!
//! Once loaded, the graph is immutable and can be shared freely between
//! threads. Reads go through cursors that decode the neighbors of a node
//! lazily, which allows algorithms to skip over large parts of a list, e.g.
//! when intersecting two neighborhoods.
//!
//! # How to build a graph
//!
//! ```
//! use huge_graph::prelude::*;
//!
//! let graph = GraphBuilder::new()
//!     .direction(LoadDirection::Both)
//!     .nodes(vec![0, 1, 2, 3])
//!     .relationships(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.node_count(), 4);
//! assert_eq!(graph.relationship_count(), 5);
//!
//! assert_eq!(graph.degree(1, Direction::Outgoing), 2);
//! assert_eq!(graph.degree(1, Direction::Incoming), 1);
//! assert_eq!(graph.degree(1, Direction::Both), 3);
//!
//! let mut targets = Vec::new();
//! graph.for_each_relationship(1, Direction::Outgoing, |_, target| {
//!     targets.push(target);
//!     true
//! });
//! assert_eq!(targets, vec![2, 3]);
//! ```
//!
//! Node ids do not need to be dense. Relationships that point to nodes which
//! were not added are ignored:
//!
//! ```
//! use huge_graph::prelude::*;
//!
//! let graph = GraphBuilder::new()
//!     .nodes(vec![42, 1337, 7])
//!     .relationships(vec![(42, 1337), (1337, 7), (7, 99)])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.relationship_count(), 2);
//! assert_eq!(graph.to_dense_id(1337), Some(1));
//! assert_eq!(graph.to_original_id(2), 7);
//! assert_eq!(graph.to_dense_id(99), None);
//! ```
//!
//! Relationships can carry weights:
//!
//! ```
//! use huge_graph::prelude::*;
//!
//! let graph = GraphBuilder::new()
//!     .default_weight(1.0)
//!     .nodes(vec![0, 1, 2])
//!     .relationships_with_weights(vec![(0, 1, 0.5), (0, 2, 1.0)])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(graph.weight_of(0, 1), 0.5);
//! assert_eq!(graph.weight_of(0, 2), 1.0);
//! assert_eq!(graph.weight_or(1, 2, -1.0), -1.0);
//! ```

pub mod builder;
pub mod compression;
pub mod graph;
pub mod graph_ops;
pub mod id_map;
pub mod import;
pub mod input;
pub mod node_properties;
pub mod prelude;
pub mod store;
pub mod varint;
pub mod weights;

pub use crate::builder::GraphBuilder;
pub use crate::graph::HugeGraph;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error while loading graph")]
    IoError {
        #[from]
        source: std::io::Error,
    },
    #[error(
        "there are only {threads} threads available and with {node_count} nodes \
         every thread would have to process {batch_size} nodes, which is unsupported"
    )]
    NotEnoughThreads {
        threads: usize,
        node_count: u64,
        batch_size: u64,
    },
    #[error("importing {node_count} nodes would need {threads} threads which cannot be created")]
    TooManyThreads { node_count: u64, threads: usize },
    #[error("node {node} has {degree} relationships, which exceeds the maximum degree")]
    DegreeOverflow { node: u64, degree: u64 },
    #[error("import worker {worker} panicked")]
    WorkerPanicked { worker: usize },
    #[error("invalid edge list in line {line}")]
    InvalidEdgeList { line: usize },
    #[error("invalid partitioning")]
    InvalidPartitioning,
    #[error("number of node values must be the same as node count")]
    InvalidNodeValues,
}

/// Direction of a traversal from the perspective of a node.
///
/// For an edge `(u, v)`, `v` is an outgoing neighbor of `u` and `u` is an
/// incoming neighbor of `v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Outgoing,
    Incoming,
    /// Outgoing followed by incoming neighbors.
    Both,
}

/// Which adjacency lists are built during import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadDirection {
    #[default]
    Outgoing,
    Incoming,
    /// Outgoing and incoming lists.
    Both,
    /// A single list per node that contains both endpoints of every
    /// relationship.
    Undirected,
}

impl LoadDirection {
    /// Returns `true` if the import builds the outgoing (or undirected)
    /// lists.
    pub fn loads_outgoing(self) -> bool {
        matches!(
            self,
            LoadDirection::Outgoing | LoadDirection::Both | LoadDirection::Undirected
        )
    }

    pub fn loads_incoming(self) -> bool {
        matches!(self, LoadDirection::Incoming | LoadDirection::Both)
    }

    pub fn is_undirected(self) -> bool {
        self == LoadDirection::Undirected
    }

    /// Number of list entries a single relationship produces.
    pub fn records_per_relationship(self) -> u64 {
        match self {
            LoadDirection::Outgoing | LoadDirection::Incoming => 1,
            LoadDirection::Both | LoadDirection::Undirected => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_direction_lists() {
        assert!(LoadDirection::Outgoing.loads_outgoing());
        assert!(!LoadDirection::Outgoing.loads_incoming());
        assert!(LoadDirection::Both.loads_incoming());
        assert!(LoadDirection::Undirected.loads_outgoing());
        assert!(!LoadDirection::Undirected.loads_incoming());
        assert_eq!(LoadDirection::default(), LoadDirection::Outgoing);
    }

    #[test]
    fn errors_are_human_readable() {
        let err = Error::NotEnoughThreads {
            threads: 2,
            node_count: 1000,
            batch_size: 512,
        };
        assert_eq!(
            err.to_string(),
            "there are only 2 threads available and with 1000 nodes every thread \
             would have to process 512 nodes, which is unsupported"
        );
        assert_eq!(
            Error::InvalidEdgeList { line: 3 }.to_string(),
            "invalid edge list in line 3"
        );
    }
}
