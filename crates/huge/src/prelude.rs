pub use crate::builder::GraphBuilder;
pub use crate::builder::ImportConfig;

pub use crate::graph::GraphIntersect;
pub use crate::graph::HugeGraph;

pub use crate::graph_ops::DegreePartitionOp;
pub use crate::graph_ops::ForEachNodeParallelOp;

pub use crate::store::AdjacencyCursor;

pub use crate::input::*;

pub use crate::node_properties::NodePropertyMap;

pub use crate::Direction;
pub use crate::LoadDirection;

pub use crate::Error;
