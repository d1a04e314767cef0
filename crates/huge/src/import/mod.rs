//! Concurrent import of relationships into compressed adjacency lists.
//!
//! The dense id space is split into power-of-two sized ranges by
//! [`ThreadSizing`], one range per worker. A single
//! [`RelationshipsScanner`] on the calling thread resolves the endpoints of
//! every relationship and routes them in batches to the worker owning the
//! node whose list receives the target. Each [`PerThreadRelationshipBuilder`]
//! collects the targets of its nodes and, once the input is exhausted,
//! writes their final blocks into pages it owns exclusively.

mod progress;
mod scanner;
mod sizing;
mod worker;

use std::time::Instant;

use crossbeam_channel::bounded;
use log::{info, warn};
use num_format::{Locale, ToFormattedString};

pub use progress::ImportProgress;
pub use scanner::{RelationshipsScanner, ScanSummary};
pub use sizing::{ThreadSizing, MAX_BATCH_SIZE};
pub use worker::{PerThreadRelationshipBuilder, WorkerOutput};

use crate::builder::ImportConfig;
use crate::id_map::IdMap;
use crate::input::InputRelationship;
use crate::store::{Adjacency, AdjacencyListBuilder, AdjacencyOffsets};
use crate::weights::{WeightMap, WeightMapBuilder};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// `(source, target)` pairs for the outgoing or undirected lists.
    Outgoing,
    /// `(target, source)` pairs for the incoming lists.
    Incoming,
    /// `(source, target)` pairs whose weights are stored without touching
    /// any list.
    Weights,
}

/// A chunk of relationships destined for a single worker.
///
/// Node ids are stored interleaved: the first id of each pair is the node
/// owned by the receiving worker.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipsBatch {
    pub(crate) kind: BatchKind,
    pub(crate) pairs: Vec<u64>,
    pub(crate) weights: Vec<f64>,
}

impl RelationshipsBatch {
    pub fn new(kind: BatchKind) -> Self {
        Self {
            kind,
            pairs: Vec::new(),
            weights: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, owner: u64, other: u64, weight: Option<f64>) {
        self.pairs.push(owner);
        self.pairs.push(other);
        if let Some(weight) = weight {
            self.weights.push(weight);
        }
    }

    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    /// Number of relationships in the batch.
    pub fn len(&self) -> usize {
        self.pairs.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.pairs.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }
}

/// The result of an import: the lists of all loaded directions and the
/// weights.
#[derive(Debug)]
pub struct Topology {
    pub outgoing: Option<Adjacency>,
    pub incoming: Option<Adjacency>,
    pub weights: WeightMap,
    pub relationship_count: u64,
}

/// Imports `relationships` for the nodes of `id_map`.
///
/// Either every worker succeeds and the complete topology is returned, or the
/// first worker error is returned and everything written so far is
/// discarded.
pub fn import<I>(
    id_map: &IdMap,
    config: &ImportConfig,
    load_weights: bool,
    relationships: I,
) -> Result<Topology, Error>
where
    I: IntoIterator<Item = InputRelationship>,
{
    let node_count = id_map.node_count();
    let direction = config.direction;
    let sizing = ThreadSizing::new(config.concurrency, node_count)?;
    let worker_count = sizing.worker_count();

    let relationships = relationships.into_iter();
    let expected = relationships.size_hint().1.unwrap_or(0) as u64;
    let progress = ImportProgress::new(expected * direction.records_per_relationship());

    info!(
        "Import: {} nodes, {} workers owning {} nodes each",
        node_count.to_formatted_string(&Locale::en),
        worker_count,
        sizing.batch_size().to_formatted_string(&Locale::en)
    );

    let outgoing_lists = direction.loads_outgoing().then(AdjacencyListBuilder::new);
    let incoming_lists = direction.loads_incoming().then(AdjacencyListBuilder::new);
    let mut weights_builder = load_weights
        .then(|| WeightMapBuilder::new(node_count, sizing.range_shift(), config.default_weight));
    let mut weight_pages = weights_builder
        .as_mut()
        .map(WeightMapBuilder::take_pages)
        .unwrap_or_default()
        .into_iter();

    let start = Instant::now();
    let (summary, results) = std::thread::scope(|scope| {
        let mut senders = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for worker in 0..worker_count {
            let (sender, receiver) = bounded(config.queue_capacity);
            senders.push(sender);

            let builder = PerThreadRelationshipBuilder::new(
                worker,
                &sizing,
                outgoing_lists.as_ref().map(AdjacencyListBuilder::new_allocator),
                incoming_lists.as_ref().map(AdjacencyListBuilder::new_allocator),
                weight_pages.next(),
                &progress,
            );
            handles.push(scope.spawn(move || builder.run(receiver)));
        }

        let scanner = RelationshipsScanner::new(
            id_map,
            sizing,
            direction,
            load_weights.then_some(config.default_weight),
            config.queue_batch_size,
            senders,
        );
        let summary = scanner.scan(relationships);

        let results = handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(Error::WorkerPanicked { worker }))
            })
            .collect::<Vec<_>>();

        (summary, results)
    });

    let mut outputs = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (worker, result) in results.into_iter().enumerate() {
        match result {
            Ok(output) => outputs.push(output),
            Err(error) => {
                warn!("Import: worker {worker} failed: {error}");
                first_error.get_or_insert(error);
            }
        }
    }
    if let Some(error) = first_error {
        return Err(error);
    }
    if let Some(worker) = summary.interrupted_by {
        return Err(Error::WorkerPanicked { worker });
    }

    info!(
        "Import: scanned {} relationships ({} dropped) and built lists in {:?}",
        summary.scanned.to_formatted_string(&Locale::en),
        summary.dropped.to_formatted_string(&Locale::en),
        start.elapsed()
    );

    let shift = sizing.range_shift();
    let mut outgoing_offsets = Vec::with_capacity(worker_count);
    let mut incoming_offsets = Vec::with_capacity(worker_count);
    let mut weight_pages = Vec::with_capacity(worker_count);
    let mut outgoing_count = 0;
    let mut incoming_count = 0;

    for output in outputs {
        outgoing_offsets.extend(output.outgoing);
        incoming_offsets.extend(output.incoming);
        weight_pages.extend(output.weights);
        outgoing_count += output.outgoing_count;
        incoming_count += output.incoming_count;
    }

    let outgoing = outgoing_lists.map(|lists| {
        Adjacency::new(lists.build(), AdjacencyOffsets::from_pages(outgoing_offsets, shift))
    });
    let incoming = incoming_lists.map(|lists| {
        Adjacency::new(lists.build(), AdjacencyOffsets::from_pages(incoming_offsets, shift))
    });
    let weights = match weights_builder {
        Some(builder) => builder.build(weight_pages),
        None => WeightMap::Null(config.default_weight),
    };

    let relationship_count = if direction.loads_outgoing() {
        outgoing_count
    } else {
        incoming_count
    };

    info!(
        "Import: stored {} relationships ({} bytes)",
        relationship_count.to_formatted_string(&Locale::en),
        (outgoing.as_ref().map_or(0, Adjacency::memory_usage)
            + incoming.as_ref().map_or(0, Adjacency::memory_usage)
            + weights.memory_usage())
        .to_formatted_string(&Locale::en)
    );

    Ok(Topology {
        outgoing,
        incoming,
        weights,
        relationship_count,
    })
}
