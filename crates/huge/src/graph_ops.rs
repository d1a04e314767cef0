use log::info;
use rayon::prelude::*;

use crate::{Direction, Error, HugeGraph};

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

/// Partition the node set based on the degrees of the nodes.
pub trait DegreePartitionOp {
    /// Creates a range-based degree partition of the nodes.
    ///
    /// Divide the nodes into `concurrency` number of ranges such that these
    /// ranges have roughly equal total degree in the given direction. That
    /// is, the sum of the degrees of the nodes of each range should be
    /// roughly equal to the extent that that's actually possible.
    /// The length of the returned vector will never exceed `concurrency`.
    fn degree_partition(&self, concurrency: usize, direction: Direction) -> Vec<Range<u64>>;
}

/// Call a particular function for each node with its corresponding state in
/// parallel.
pub trait ForEachNodeParallelOp {
    /// For each node calls `node_fn` with the node id and its mutable state.
    ///
    /// Every rayon task works on its own
    /// [`concurrent_copy`](HugeGraph::concurrent_copy) of the graph.
    ///
    /// # Example
    ///
    /// ```
    /// use huge_graph::prelude::*;
    ///
    /// let graph = GraphBuilder::new()
    ///     .nodes(0..4)
    ///     .relationships(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
    ///     .build()
    ///     .unwrap();
    ///
    /// let mut degrees = vec![0_u32; 4];
    /// graph
    ///     .for_each_node_par(&mut degrees, |graph, node, degree| {
    ///         *degree = graph.degree(node, Direction::Outgoing);
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(degrees, vec![2, 2, 1, 0]);
    /// ```
    fn for_each_node_par<T, F>(&self, node_values: &mut [T], node_fn: F) -> Result<(), Error>
    where
        T: Send,
        F: Fn(&HugeGraph, u64, &mut T) + Send + Sync;

    /// Like [`for_each_node_par`](Self::for_each_node_par), but every range
    /// of `partition` is processed by a single rayon task.
    ///
    /// The ranges must be consecutive and cover all nodes.
    fn for_each_node_par_by_partition<T, F>(
        &self,
        partition: &[Range<u64>],
        node_values: &mut [T],
        node_fn: F,
    ) -> Result<(), Error>
    where
        T: Send,
        F: Fn(&HugeGraph, u64, &mut T) + Send + Sync;
}

impl DegreePartitionOp for HugeGraph {
    fn degree_partition(&self, concurrency: usize, direction: Direction) -> Vec<Range<u64>> {
        let start = Instant::now();
        let concurrency = concurrency.max(1);
        let total_degree = (0..self.node_count())
            .into_par_iter()
            .map(|node| self.degree(node, direction) as u64)
            .sum::<u64>();
        let batch_degree = (total_degree as f64 / concurrency as f64).ceil() as u64;

        let partition = greedy_ranges(
            |node| self.degree(node, direction) as u64,
            self.node_count(),
            batch_degree,
            concurrency,
        );
        info!(
            "Created {} degree partitions in {:?}",
            partition.len(),
            start.elapsed()
        );
        partition
    }
}

impl ForEachNodeParallelOp for HugeGraph {
    fn for_each_node_par<T, F>(&self, node_values: &mut [T], node_fn: F) -> Result<(), Error>
    where
        T: Send,
        F: Fn(&HugeGraph, u64, &mut T) + Send + Sync,
    {
        if node_values.len() as u64 != self.node_count() {
            return Err(Error::InvalidNodeValues);
        }

        node_values
            .par_iter_mut()
            .enumerate()
            .for_each_init(
                || self.concurrent_copy(),
                |graph, (node, node_state)| node_fn(graph, node as u64, node_state),
            );

        Ok(())
    }

    fn for_each_node_par_by_partition<T, F>(
        &self,
        partition: &[Range<u64>],
        node_values: &mut [T],
        node_fn: F,
    ) -> Result<(), Error>
    where
        T: Send,
        F: Fn(&HugeGraph, u64, &mut T) + Send + Sync,
    {
        if node_values.len() as u64 != self.node_count() {
            return Err(Error::InvalidNodeValues);
        }

        if !covers_all_nodes(partition, self.node_count()) {
            return Err(Error::InvalidPartitioning);
        }

        let node_fn = Arc::new(node_fn);

        let chunks = split_by_ranges(partition, node_values);

        chunks
            .into_par_iter()
            .zip(partition.into_par_iter())
            .for_each_with(node_fn, |node_fn, (mutable_chunk, range)| {
                let graph = self.concurrent_copy();
                for (node_state, node) in mutable_chunk.iter_mut().zip(range.clone()) {
                    node_fn(&graph, node, node_state);
                }
            });

        Ok(())
    }
}

fn covers_all_nodes(partition: &[Range<u64>], node_count: u64) -> bool {
    let mut expected_start = 0;
    for range in partition {
        if range.start != expected_start || range.end < range.start {
            return false;
        }
        expected_start = range.end;
    }
    expected_start == node_count
}

fn split_by_ranges<'a, T>(ranges: &[Range<u64>], mut values: &'a mut [T]) -> Vec<&'a mut [T]> {
    ranges
        .iter()
        .map(|range| {
            let len = (range.end - range.start) as usize;
            let (chunk, rest) = std::mem::take(&mut values).split_at_mut(len);
            values = rest;
            chunk
        })
        .collect()
}

// Cuts 0..node_count into consecutive ranges. A range is closed as soon as
// the summed cost of its nodes reaches batch_cost; the last range takes all
// remaining nodes, so there are at most max_ranges ranges.
fn greedy_ranges<F>(
    cost: F,
    node_count: u64,
    batch_cost: u64,
    max_ranges: usize,
) -> Vec<Range<u64>>
where
    F: Fn(u64) -> u64,
{
    let max_ranges = max_ranges.max(1);
    let mut ranges = Vec::with_capacity(max_ranges);
    let mut start = 0;
    let mut sum = 0;

    for node in 0..node_count {
        sum += cost(node);
        if sum >= batch_cost && ranges.len() + 1 < max_ranges {
            ranges.push(start..node + 1);
            start = node + 1;
            sum = 0;
        }
    }

    if start < node_count {
        ranges.push(start..node_count);
    }

    ranges
}
