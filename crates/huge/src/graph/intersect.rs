use crate::store::{Adjacency, AdjacencyCursor};

/// Triangle enumeration over the outgoing (or undirected) lists.
///
/// Holds the cursors needed for a single node so they can be reused across
/// many calls. Like cursors, a `GraphIntersect` is meant to be used by a
/// single thread; create one per thread from a
/// [`concurrent_copy`](super::HugeGraph::concurrent_copy).
///
/// ```
/// use huge_graph::prelude::*;
///
/// let graph = GraphBuilder::new()
///     .direction(LoadDirection::Undirected)
///     .nodes(0..4)
///     .relationships(vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
///     .build()
///     .unwrap();
///
/// let mut triangles = Vec::new();
/// let mut intersect = graph.intersection();
/// for node in 0..graph.node_count() {
///     intersect.intersect_all(node, |a, b, c| triangles.push((a, b, c)));
/// }
///
/// assert_eq!(triangles, vec![(0, 1, 2), (1, 2, 3)]);
/// ```
pub struct GraphIntersect<'g> {
    adjacency: Option<&'g Adjacency>,
    outer: AdjacencyCursor<'g>,
    candidates: AdjacencyCursor<'g>,
    neighbors: AdjacencyCursor<'g>,
}

impl<'g> GraphIntersect<'g> {
    pub(super) fn new(adjacency: Option<&'g Adjacency>) -> Self {
        let cursor = match adjacency {
            Some(adjacency) => adjacency.list().new_cursor(),
            None => AdjacencyCursor::new(&[]),
        };
        Self {
            adjacency,
            outer: cursor.clone(),
            candidates: cursor.clone(),
            neighbors: cursor,
        }
    }

    /// Calls `consumer` with `(a, b, c)` for every triangle `a < b < c` where
    /// `a = node`, `b` and `c` are neighbors of `a` and `c` is a neighbor of
    /// `b`.
    ///
    /// Calling this for every node reports each triangle exactly once.
    pub fn intersect_all<F>(&mut self, node: u64, mut consumer: F)
    where
        F: FnMut(u64, u64, u64),
    {
        let Some(adjacency) = self.adjacency else {
            return;
        };

        self.outer.reset(adjacency.address(node));
        let mut b = self.outer.skip_until(node);
        if b <= node {
            return;
        }

        loop {
            // neighbors of `node` after `b` are the candidates for `c`
            self.candidates.copy_from(&self.outer);
            self.neighbors.reset(adjacency.address(b));
            merge(&mut self.candidates, &mut self.neighbors, |c| consumer(node, b, c));

            if !self.outer.has_next() {
                return;
            }
            b = self.outer.next_vlong();
        }
    }
}

/// Reports every value that both cursors contain, in ascending order.
///
/// Walks `left` and advances `right` to each of its values, so `left`
/// should be the shorter one.
pub(super) fn merge<F>(
    left: &mut AdjacencyCursor<'_>,
    right: &mut AdjacencyCursor<'_>,
    mut consumer: F,
) where
    F: FnMut(u64),
{
    // last value taken from `right` that was not yet passed by `left`
    let mut pending = None;

    while left.has_next() {
        let value = left.next_vlong();
        let candidate = match pending {
            Some(candidate) if candidate >= value => candidate,
            _ => {
                if !right.has_next() {
                    return;
                }
                let candidate = right.advance(value);
                pending = Some(candidate);
                candidate
            }
        };

        if candidate == value {
            consumer(value);
        } else if candidate < value {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::compression::compress;
    use crate::store::{Address, AdjacencyList, AdjacencyListBuilder};

    use super::*;

    fn store(lists: &[&[u64]]) -> (AdjacencyList, Vec<Address>) {
        let builder = AdjacencyListBuilder::new();
        let mut allocator = builder.new_allocator();
        let addresses = lists
            .iter()
            .map(|targets| allocator.insert(&compress(targets)))
            .collect::<Vec<_>>();
        allocator.finish();
        (builder.build(), addresses)
    }

    fn merged(left: &[u64], right: &[u64]) -> Vec<u64> {
        let (list, addresses) = store(&[left, right]);
        let mut result = Vec::new();
        merge(
            &mut list.cursor_at(addresses[0]),
            &mut list.cursor_at(addresses[1]),
            |value| result.push(value),
        );
        result
    }

    #[test]
    fn merge_finds_common_values() {
        assert_eq!(merged(&[1, 3, 5, 7], &[2, 3, 4, 7, 8]), vec![3, 7]);
        assert_eq!(merged(&[2, 3, 4, 7, 8], &[1, 3, 5, 7]), vec![3, 7]);
    }

    #[test]
    fn merge_keeps_value_read_ahead() {
        // advancing to 1 already consumes 5 from the right side
        assert_eq!(merged(&[1, 5], &[5]), vec![5]);
        assert_eq!(merged(&[1, 2, 3, 5], &[5, 6]), vec![5]);
    }

    #[test]
    fn merge_with_disjoint_or_empty_lists() {
        assert!(merged(&[1, 2], &[3, 4]).is_empty());
        assert!(merged(&[3, 4], &[1, 2]).is_empty());

        let (list, addresses) = store(&[&[1, 2]]);
        let mut result = Vec::new();
        merge(
            &mut list.cursor_at(Address::EMPTY),
            &mut list.cursor_at(addresses[0]),
            |value| result.push(value),
        );
        assert!(result.is_empty());
    }

    #[test]
    fn merge_across_chunks() {
        let left = (0..1000).step_by(3).collect::<Vec<u64>>();
        let right = (0..1000).step_by(5).collect::<Vec<u64>>();
        let expected = (0..1000).step_by(15).collect::<Vec<u64>>();

        assert_eq!(merged(&left, &right), expected);
        assert_eq!(merged(&right, &left), expected);
    }

    #[test]
    fn no_adjacency_no_triangles() {
        let mut intersect = GraphIntersect::new(None);
        intersect.intersect_all(0, |_, _, _| panic!("unexpected triangle"));
    }
}
