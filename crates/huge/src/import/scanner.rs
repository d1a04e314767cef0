use crossbeam_channel::Sender;
use log::debug;

use super::{BatchKind, RelationshipsBatch, ThreadSizing};
use crate::id_map::IdMap;
use crate::input::InputRelationship;
use crate::LoadDirection;

/// Counters of a finished scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Relationships read from the input.
    pub scanned: u64,
    /// Relationships with at least one endpoint unknown to the id map.
    pub dropped: u64,
    /// Set if a worker stopped receiving before the input was exhausted.
    pub interrupted_by: Option<usize>,
}

/// Reads the input relationships, resolves their endpoints and routes them
/// to the workers owning the affected nodes.
///
/// Dropping the scanner closes all worker queues, which tells the workers
/// that no more input will arrive.
pub struct RelationshipsScanner<'a> {
    id_map: &'a IdMap,
    sizing: ThreadSizing,
    direction: LoadDirection,
    default_weight: Option<f64>,
    batch_size: usize,
    senders: Vec<Sender<RelationshipsBatch>>,
    outgoing: Vec<RelationshipsBatch>,
    incoming: Vec<RelationshipsBatch>,
    weights: Vec<RelationshipsBatch>,
}

impl<'a> RelationshipsScanner<'a> {
    /// Creates a scanner sending to one queue per worker.
    ///
    /// Weights are loaded if `default_weight` is set; relationships without
    /// a weight then get the default weight. `batch_size` is the number of
    /// node ids buffered per worker before a batch is sent.
    pub fn new(
        id_map: &'a IdMap,
        sizing: ThreadSizing,
        direction: LoadDirection,
        default_weight: Option<f64>,
        batch_size: usize,
        senders: Vec<Sender<RelationshipsBatch>>,
    ) -> Self {
        let buffers = |kind: BatchKind, needed: bool| -> Vec<RelationshipsBatch> {
            if needed {
                (0..senders.len()).map(|_| RelationshipsBatch::new(kind)).collect()
            } else {
                Vec::new()
            }
        };

        let outgoing = buffers(BatchKind::Outgoing, direction.loads_outgoing());
        let incoming = buffers(BatchKind::Incoming, direction.loads_incoming());
        let weights = buffers(
            BatchKind::Weights,
            default_weight.is_some() && direction == LoadDirection::Incoming,
        );

        Self {
            id_map,
            sizing,
            direction,
            default_weight,
            batch_size: batch_size.max(2),
            senders,
            outgoing,
            incoming,
            weights,
        }
    }

    /// Routes all relationships and flushes the remaining buffers.
    ///
    /// Stops early if a worker is gone.
    pub fn scan<I>(mut self, relationships: I) -> ScanSummary
    where
        I: IntoIterator<Item = InputRelationship>,
    {
        let mut summary = ScanSummary::default();

        for relationship in relationships {
            summary.scanned += 1;

            let (Some(source), Some(target)) = (
                self.id_map.to_dense_id(relationship.source),
                self.id_map.to_dense_id(relationship.target),
            ) else {
                summary.dropped += 1;
                continue;
            };

            let weight = self
                .default_weight
                .map(|default| relationship.weight.unwrap_or(default));

            if let Err(worker) = self.route(source, target, weight) {
                summary.interrupted_by = Some(worker);
                break;
            }
        }

        if summary.interrupted_by.is_none() {
            if let Err(worker) = self.flush_all() {
                summary.interrupted_by = Some(worker);
            }
        }

        debug!(
            "Scanner: {} relationships scanned, {} dropped",
            summary.scanned, summary.dropped
        );

        summary
    }

    fn route(&mut self, source: u64, target: u64, weight: Option<f64>) -> Result<(), usize> {
        match self.direction {
            LoadDirection::Outgoing => self.push(BatchKind::Outgoing, source, target, weight),
            LoadDirection::Incoming => {
                self.push(BatchKind::Incoming, target, source, None)?;
                match weight {
                    Some(weight) => self.push(BatchKind::Weights, source, target, Some(weight)),
                    None => Ok(()),
                }
            }
            LoadDirection::Both => {
                self.push(BatchKind::Outgoing, source, target, weight)?;
                self.push(BatchKind::Incoming, target, source, None)
            }
            LoadDirection::Undirected => {
                self.push(BatchKind::Outgoing, source, target, weight)?;
                self.push(BatchKind::Outgoing, target, source, weight)
            }
        }
    }

    fn push(
        &mut self,
        kind: BatchKind,
        owner: u64,
        other: u64,
        weight: Option<f64>,
    ) -> Result<(), usize> {
        let worker = self.sizing.worker(owner);
        let buffers = match kind {
            BatchKind::Outgoing => &mut self.outgoing,
            BatchKind::Incoming => &mut self.incoming,
            BatchKind::Weights => &mut self.weights,
        };

        let buffer = &mut buffers[worker];
        buffer.push(owner, other, weight);

        if buffer.pairs.len() >= self.batch_size {
            let batch = std::mem::replace(buffer, RelationshipsBatch::new(kind));
            self.senders[worker].send(batch).map_err(|_| worker)?;
        }

        Ok(())
    }

    fn flush_all(&mut self) -> Result<(), usize> {
        let buffers = self
            .outgoing
            .iter_mut()
            .chain(self.incoming.iter_mut())
            .chain(self.weights.iter_mut());

        for (index, buffer) in buffers.enumerate() {
            if buffer.is_empty() {
                continue;
            }
            let worker = index % self.senders.len();
            let kind = buffer.kind;
            let batch = std::mem::replace(buffer, RelationshipsBatch::new(kind));
            self.senders[worker].send(batch).map_err(|_| worker)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::{unbounded, Receiver};

    use crate::id_map::IdMapBuilder;
    use crate::import::MAX_BATCH_SIZE;

    use super::*;

    fn scan(
        direction: LoadDirection,
        default_weight: Option<f64>,
        relationships: Vec<InputRelationship>,
    ) -> (ScanSummary, Vec<Vec<RelationshipsBatch>>) {
        let mut ids = IdMapBuilder::new();
        ids.extend([10, 20, 30, 40]);
        let id_map = ids.build();
        let sizing = ThreadSizing::determine(4, 2, 2, MAX_BATCH_SIZE).unwrap();

        let (senders, receivers): (Vec<_>, Vec<Receiver<_>>) =
            (0..sizing.worker_count()).map(|_| unbounded()).unzip();
        let scanner =
            RelationshipsScanner::new(&id_map, sizing, direction, default_weight, 100, senders);
        let summary = scanner.scan(relationships);

        let batches = receivers.into_iter().map(|r| r.into_iter().collect()).collect();
        (summary, batches)
    }

    fn pairs(batches: &[RelationshipsBatch], kind: BatchKind) -> Vec<(u64, u64)> {
        batches
            .iter()
            .filter(|b| b.kind() == kind)
            .flat_map(RelationshipsBatch::pairs)
            .collect()
    }

    #[test]
    fn outgoing_goes_to_source_worker() {
        let (summary, batches) = scan(
            LoadDirection::Outgoing,
            None,
            vec![InputRelationship::new(10, 40), InputRelationship::new(30, 20)],
        );

        assert_eq!(summary.scanned, 2);
        assert_eq!(pairs(&batches[0], BatchKind::Outgoing), vec![(0, 3)]);
        assert_eq!(pairs(&batches[1], BatchKind::Outgoing), vec![(2, 1)]);
    }

    #[test]
    fn incoming_goes_to_target_worker() {
        let (_, batches) = scan(
            LoadDirection::Incoming,
            None,
            vec![InputRelationship::new(10, 40)],
        );

        assert!(batches[0].is_empty());
        assert_eq!(pairs(&batches[1], BatchKind::Incoming), vec![(3, 0)]);
    }

    #[test]
    fn incoming_weights_go_to_source_worker() {
        let (_, batches) = scan(
            LoadDirection::Incoming,
            Some(0.0),
            vec![InputRelationship::with_weight(10, 40, 2.0)],
        );

        assert_eq!(pairs(&batches[0], BatchKind::Weights), vec![(0, 3)]);
        assert_eq!(batches[0][0].weights, vec![2.0]);
        assert!(batches[1].iter().all(|b| b.weights.is_empty()));
    }

    #[test]
    fn both_directions() {
        let (_, batches) = scan(LoadDirection::Both, None, vec![InputRelationship::new(20, 30)]);

        assert_eq!(pairs(&batches[0], BatchKind::Outgoing), vec![(1, 2)]);
        assert_eq!(pairs(&batches[1], BatchKind::Incoming), vec![(2, 1)]);
    }

    #[test]
    fn undirected_emits_both_endpoints() {
        let (_, batches) = scan(
            LoadDirection::Undirected,
            Some(1.0),
            vec![InputRelationship::new(20, 30)],
        );

        assert_eq!(pairs(&batches[0], BatchKind::Outgoing), vec![(1, 2)]);
        assert_eq!(pairs(&batches[1], BatchKind::Outgoing), vec![(2, 1)]);
        assert_eq!(batches[1][0].weights, vec![1.0]);
    }

    #[test]
    fn unresolved_endpoints_are_dropped() {
        let (summary, batches) = scan(
            LoadDirection::Outgoing,
            None,
            vec![
                InputRelationship::new(10, 99),
                InputRelationship::new(99, 10),
                InputRelationship::new(10, 20),
            ],
        );

        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.dropped, 2);
        assert_eq!(pairs(&batches[0], BatchKind::Outgoing), vec![(0, 1)]);
    }

    #[test]
    fn full_buffers_are_sent() {
        let mut ids = IdMapBuilder::new();
        ids.extend(0..2);
        let id_map = ids.build();
        let sizing = ThreadSizing::determine(2, 1, 1, MAX_BATCH_SIZE).unwrap();
        let (sender, receiver) = unbounded();

        let direction = LoadDirection::Outgoing;
        let scanner = RelationshipsScanner::new(&id_map, sizing, direction, None, 4, vec![sender]);
        scanner.scan((0..5).map(|_| InputRelationship::new(0, 1)));

        let sizes = receiver.iter().map(|b| b.len()).collect::<Vec<_>>();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn stops_when_a_worker_is_gone() {
        let mut ids = IdMapBuilder::new();
        ids.extend(0..2);
        let id_map = ids.build();
        let sizing = ThreadSizing::determine(2, 1, 1, MAX_BATCH_SIZE).unwrap();
        let (sender, receiver) = unbounded();
        drop(receiver);

        let direction = LoadDirection::Outgoing;
        let scanner = RelationshipsScanner::new(&id_map, sizing, direction, None, 2, vec![sender]);
        let summary = scanner.scan((0..5).map(|_| InputRelationship::new(0, 1)));

        assert_eq!(summary.interrupted_by, Some(0));
        assert_eq!(summary.scanned, 1);
    }
}
