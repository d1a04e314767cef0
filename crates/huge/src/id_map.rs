//! Bidirectional mapping between external node ids and dense ids `0..N`.

use fxhash::FxHashMap;

/// Assigns dense ids to external ids in arrival order.
///
/// ```
/// use huge_graph::id_map::IdMapBuilder;
///
/// let mut builder = IdMapBuilder::new();
/// assert_eq!(builder.add(42), 0);
/// assert_eq!(builder.add(1337), 1);
/// assert_eq!(builder.add(42), 0);
///
/// let id_map = builder.build();
/// assert_eq!(id_map.node_count(), 2);
/// assert_eq!(id_map.to_dense_id(1337), Some(1));
/// assert_eq!(id_map.to_dense_id(7), None);
/// assert_eq!(id_map.to_original_id(0), 42);
/// ```
#[derive(Debug, Default)]
pub struct IdMapBuilder {
    original_ids: Vec<u64>,
    dense_ids: FxHashMap<u64, u64>,
}

impl IdMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            original_ids: Vec::with_capacity(capacity),
            dense_ids: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Returns the dense id of `external`, assigning the next free one if
    /// the id has not been seen before.
    pub fn add(&mut self, external: u64) -> u64 {
        let next = self.original_ids.len() as u64;
        let dense = *self.dense_ids.entry(external).or_insert(next);
        if dense == next {
            self.original_ids.push(external);
        }
        dense
    }

    pub fn build(self) -> IdMap {
        IdMap {
            original_ids: self.original_ids.into_boxed_slice(),
            dense_ids: self.dense_ids,
        }
    }
}

impl Extend<u64> for IdMapBuilder {
    fn extend<T: IntoIterator<Item = u64>>(&mut self, iter: T) {
        for external in iter {
            self.add(external);
        }
    }
}

/// Read-only id mapping used by the loaded graph.
#[derive(Debug)]
pub struct IdMap {
    original_ids: Box<[u64]>,
    dense_ids: FxHashMap<u64, u64>,
}

impl IdMap {
    /// Number of mapped nodes, i.e. the exclusive upper bound of dense ids.
    #[inline]
    pub fn node_count(&self) -> u64 {
        self.original_ids.len() as u64
    }

    /// # Panics
    ///
    /// If `dense` is not smaller than [`Self::node_count`].
    #[inline]
    pub fn to_original_id(&self, dense: u64) -> u64 {
        self.original_ids[dense as usize]
    }

    #[inline]
    pub fn to_dense_id(&self, external: u64) -> Option<u64> {
        self.dense_ids.get(&external).copied()
    }

    #[inline]
    pub fn contains(&self, external: u64) -> bool {
        self.dense_ids.contains_key(&external)
    }

    /// Approximate heap size in bytes.
    pub fn memory_usage(&self) -> usize {
        std::mem::size_of_val(&self.original_ids[..])
            + self.dense_ids.capacity() * (2 * std::mem::size_of::<u64>() + 1)
    }
}
