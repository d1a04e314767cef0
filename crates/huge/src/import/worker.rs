use std::time::Instant;

use crossbeam_channel::Receiver;
use log::debug;

use super::{BatchKind, ImportProgress, RelationshipsBatch, ThreadSizing};
use crate::compression::{AdjacencyCompression, CompressedTargets};
use crate::store::{Address, Allocator};
use crate::weights::WeightPage;
use crate::Error;

/// Everything a worker produced for its node range.
#[derive(Debug)]
pub struct WorkerOutput {
    pub worker: usize,
    pub outgoing: Option<Box<[Address]>>,
    pub incoming: Option<Box<[Address]>>,
    pub weights: Option<WeightPage>,
    pub outgoing_count: u64,
    pub incoming_count: u64,
}

struct DirectionBuffer<'a> {
    targets: Vec<CompressedTargets>,
    allocator: Allocator<'a>,
}

impl<'a> DirectionBuffer<'a> {
    fn new(len: usize, allocator: Allocator<'a>) -> Self {
        Self {
            targets: vec![CompressedTargets::default(); len],
            allocator,
        }
    }

    // Writes the final block of every node and returns the offsets and the
    // number of stored relationships.
    fn finish(
        self,
        start: u64,
        compression: &mut AdjacencyCompression,
    ) -> Result<(Box<[Address]>, u64), Error> {
        let Self {
            mut targets,
            mut allocator,
        } = self;

        let mut offsets = vec![Address::EMPTY; targets.len()];
        let mut count = 0;

        for (local, scratch) in targets.iter_mut().enumerate() {
            if scratch.is_empty() {
                continue;
            }
            let scratch = std::mem::take(scratch);
            let degree = compression.prepare(&scratch);
            let block = compression.encode().ok_or_else(|| Error::DegreeOverflow {
                node: start + local as u64,
                degree: degree as u64,
            })?;
            offsets[local] = allocator.insert(block);
            count += degree as u64;
        }

        allocator.finish();
        Ok((offsets.into_boxed_slice(), count))
    }
}

/// Import worker owning a contiguous range of nodes.
///
/// The worker collects the targets of its nodes from the batches it receives
/// and writes their blocks once the scanner closed the queue.
pub struct PerThreadRelationshipBuilder<'a> {
    worker: usize,
    start: u64,
    outgoing: Option<DirectionBuffer<'a>>,
    incoming: Option<DirectionBuffer<'a>>,
    weights: Option<WeightPage>,
    compression: AdjacencyCompression,
    progress: &'a ImportProgress,
}

impl<'a> PerThreadRelationshipBuilder<'a> {
    pub fn new(
        worker: usize,
        sizing: &ThreadSizing,
        outgoing: Option<Allocator<'a>>,
        incoming: Option<Allocator<'a>>,
        weights: Option<WeightPage>,
        progress: &'a ImportProgress,
    ) -> Self {
        let len = sizing.range_len(worker);
        Self {
            worker,
            start: sizing.range_start(worker),
            outgoing: outgoing.map(|allocator| DirectionBuffer::new(len, allocator)),
            incoming: incoming.map(|allocator| DirectionBuffer::new(len, allocator)),
            weights,
            compression: AdjacencyCompression::new(),
            progress,
        }
    }

    /// Applies batches until the queue is closed, then finishes the range.
    pub fn run(mut self, batches: Receiver<RelationshipsBatch>) -> Result<WorkerOutput, Error> {
        let start = Instant::now();
        let mut received = 0_usize;

        for batch in batches {
            received += 1;
            self.apply(&batch);
        }

        debug!(
            "Worker {}: applied {received} batches in {:?}",
            self.worker,
            start.elapsed()
        );

        let start = Instant::now();
        let worker = self.worker;
        let output = self.finish()?;
        debug!("Worker {worker}: wrote adjacency lists in {:?}", start.elapsed());

        Ok(output)
    }

    /// Adds the relationships of a batch to the scratch buffers.
    pub fn apply(&mut self, batch: &RelationshipsBatch) {
        let start = self.start;
        let lists = match batch.kind {
            BatchKind::Outgoing => self.outgoing.as_mut(),
            BatchKind::Incoming => self.incoming.as_mut(),
            BatchKind::Weights => None,
        };

        if let Some(lists) = lists {
            for (owner, other) in batch.pairs() {
                lists.targets[(owner - start) as usize].add(other);
            }
            self.progress.records_processed(batch.len() as u64);
        }

        if batch.kind == BatchKind::Incoming || batch.weights.is_empty() {
            return;
        }

        if let Some(page) = self.weights.as_mut() {
            for ((source, target), &weight) in batch.pairs().zip(&batch.weights) {
                page.put((source - start) as usize, target, weight);
            }
        }
    }

    /// Writes the blocks of all nodes of the range.
    pub fn finish(self) -> Result<WorkerOutput, Error> {
        let Self {
            worker,
            start,
            outgoing,
            incoming,
            weights,
            mut compression,
            ..
        } = self;

        let (outgoing, outgoing_count) = match outgoing {
            Some(lists) => {
                let (offsets, count) = lists.finish(start, &mut compression)?;
                (Some(offsets), count)
            }
            None => (None, 0),
        };
        let (incoming, incoming_count) = match incoming {
            Some(lists) => {
                let (offsets, count) = lists.finish(start, &mut compression)?;
                (Some(offsets), count)
            }
            None => (None, 0),
        };

        Ok(WorkerOutput {
            worker,
            outgoing,
            incoming,
            weights,
            outgoing_count,
            incoming_count,
        })
    }
}
