//! Relationship weights, keyed by `(source, target)` dense ids.
//!
//! Most relationships carry the default weight, so only weights that differ
//! from it are stored at all. During import every worker owns the
//! [`WeightPage`] of its node range; the pages are joined into a
//! [`WeightMap`] afterwards.

use fxhash::FxHashMap;

/// Weights of all relationships whose source lies in a single import range.
#[derive(Debug, Default)]
pub struct WeightPage {
    default_weight: f64,
    sources: Vec<Option<FxHashMap<u64, f64>>>,
}

impl WeightPage {
    pub fn new(range_size: usize, default_weight: f64) -> Self {
        let mut sources = Vec::new();
        sources.resize_with(range_size, || None);
        Self {
            default_weight,
            sources,
        }
    }

    /// Records the weight of `(source, target)` where `local_source` is the
    /// position of the source within the page's range.
    ///
    /// A later call for the same pair overwrites the earlier weight.
    pub fn put(&mut self, local_source: usize, target: u64, weight: f64) {
        if weight == self.default_weight {
            // an earlier, non-default weight must not survive
            if let Some(Some(targets)) = self.sources.get_mut(local_source) {
                targets.remove(&target);
            }
            return;
        }

        self.sources[local_source]
            .get_or_insert_with(FxHashMap::default)
            .insert(target, weight);
    }

    #[inline]
    pub fn get(&self, local_source: usize, target: u64) -> Option<f64> {
        self.sources
            .get(local_source)?
            .as_ref()?
            .get(&target)
            .copied()
    }

    /// Number of stored, i.e. non-default, weights.
    pub fn len(&self) -> usize {
        self.sources.iter().flatten().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn memory_usage(&self) -> usize {
        self.sources.capacity() * std::mem::size_of::<Option<FxHashMap<u64, f64>>>()
            + self
                .sources
                .iter()
                .flatten()
                .map(|targets| targets.capacity() * (2 * std::mem::size_of::<u64>() + 1))
                .sum::<usize>()
    }
}

/// Prepares one [`WeightPage`] per import range.
#[derive(Debug)]
pub struct WeightMapBuilder {
    default_weight: f64,
    shift: u32,
    pages: Vec<WeightPage>,
}

impl WeightMapBuilder {
    pub fn new(node_count: u64, shift: u32, default_weight: f64) -> Self {
        let range_size = 1_u64 << shift;
        let page_count =
            (node_count / range_size + u64::from(node_count % range_size != 0)) as usize;
        let pages = (0..page_count)
            .map(|page| {
                let start = page as u64 * range_size;
                let len = range_size.min(node_count - start) as usize;
                WeightPage::new(len, default_weight)
            })
            .collect();

        Self {
            default_weight,
            shift,
            pages,
        }
    }

    /// Hands out the pages, ordered by range.
    pub fn take_pages(&mut self) -> Vec<WeightPage> {
        std::mem::take(&mut self.pages)
    }

    /// Joins the pages written by the workers, ordered by range.
    pub fn build(self, pages: Vec<WeightPage>) -> WeightMap {
        if pages.len() == 1 {
            return WeightMap::Single(pages.into_iter().next().unwrap_or_default());
        }
        WeightMap::Paged {
            default_weight: self.default_weight,
            shift: self.shift,
            pages: pages.into_boxed_slice(),
        }
    }
}

/// Weight lookup of a loaded graph.
#[derive(Debug)]
pub enum WeightMap {
    /// No weights were loaded, every relationship has the default weight.
    Null(f64),
    /// All weights live in a single page.
    Single(WeightPage),
    Paged {
        default_weight: f64,
        shift: u32,
        pages: Box<[WeightPage]>,
    },
}

impl Default for WeightMap {
    fn default() -> Self {
        WeightMap::Null(0.0)
    }
}

impl WeightMap {
    pub fn default_weight(&self) -> f64 {
        match self {
            WeightMap::Null(default_weight) => *default_weight,
            WeightMap::Single(page) => page.default_weight,
            WeightMap::Paged { default_weight, .. } => *default_weight,
        }
    }

    /// Weight of `(source, target)`, or the configured default.
    #[inline]
    pub fn weight(&self, source: u64, target: u64) -> f64 {
        self.weight_or(source, target, self.default_weight())
    }

    /// Weight of `(source, target)`, or `default` if none is stored.
    #[inline]
    pub fn weight_or(&self, source: u64, target: u64, default: f64) -> f64 {
        let stored = match self {
            WeightMap::Null(_) => None,
            WeightMap::Single(page) => page.get(source as usize, target),
            WeightMap::Paged { shift, pages, .. } => {
                let mask = (1_u64 << shift) - 1;
                pages
                    .get((source >> shift) as usize)
                    .and_then(|page| page.get((source & mask) as usize, target))
            }
        };
        stored.unwrap_or(default)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WeightMap::Null(_))
    }

    /// Number of stored, i.e. non-default, weights.
    pub fn len(&self) -> usize {
        match self {
            WeightMap::Null(_) => 0,
            WeightMap::Single(page) => page.len(),
            WeightMap::Paged { pages, .. } => pages.iter().map(WeightPage::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn memory_usage(&self) -> usize {
        match self {
            WeightMap::Null(_) => 0,
            WeightMap::Single(page) => page.memory_usage(),
            WeightMap::Paged { pages, .. } => pages.iter().map(WeightPage::memory_usage).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_are_not_stored() {
        let mut page = WeightPage::new(4, 1.0);
        page.put(0, 7, 1.0);
        page.put(1, 7, 2.5);

        assert_eq!(page.len(), 1);
        assert_eq!(page.get(0, 7), None);
        assert_eq!(page.get(1, 7), Some(2.5));
    }

    #[test]
    fn later_weight_wins() {
        let mut page = WeightPage::new(1, 0.0);
        page.put(0, 3, 4.0);
        page.put(0, 3, 5.0);
        assert_eq!(page.get(0, 3), Some(5.0));

        page.put(0, 3, 0.0);
        assert_eq!(page.get(0, 3), None);
    }

    #[test]
    fn null_map_returns_defaults() {
        let weights = WeightMap::Null(3.0);

        assert!(weights.is_null());
        assert_eq!(weights.weight(0, 1), 3.0);
        assert_eq!(weights.weight_or(0, 1, 7.0), 7.0);
    }

    #[test]
    fn paged_lookup() {
        // 10 nodes in ranges of 4
        let mut builder = WeightMapBuilder::new(10, 2, 0.0);
        let mut pages = builder.take_pages();
        assert_eq!(pages.len(), 3);

        pages[0].put(1, 9, 0.5);
        pages[2].put(1, 0, 1.5);
        let weights = builder.build(pages);

        assert_eq!(weights.weight(1, 9), 0.5);
        assert_eq!(weights.weight(9, 0), 1.5);
        assert_eq!(weights.weight(9, 1), 0.0);
        assert_eq!(weights.weight_or(9, 1, -1.0), -1.0);
        assert_eq!(weights.weight_or(42, 1, -1.0), -1.0);
        assert_eq!(weights.len(), 2);
    }

    #[test]
    fn single_range_uses_a_single_page() {
        let mut builder = WeightMapBuilder::new(3, 2, 2.0);
        let mut pages = builder.take_pages();
        pages[0].put(2, 1, 4.0);
        let weights = builder.build(pages);

        assert!(matches!(weights, WeightMap::Single(_)));
        assert_eq!(weights.weight(2, 1), 4.0);
        assert_eq!(weights.weight(1, 2), 2.0);
    }
}
