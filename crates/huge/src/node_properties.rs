//! Numeric node properties, keyed by dense node id.
//!
//! Like relationship weights, most nodes carry the default value of a
//! property, so only differing values are stored. Values live in hash maps
//! that each cover a page of [`PROPERTY_PAGE_SIZE`] consecutive nodes; pages
//! without any stored value are never allocated.

use fxhash::FxHashMap;

/// Number of bits of a node id that address a node within a property page.
pub const PROPERTY_PAGE_SHIFT: u32 = 14;
/// Number of nodes covered by a single property page.
pub const PROPERTY_PAGE_SIZE: u64 = 1 << PROPERTY_PAGE_SHIFT;
const PROPERTY_PAGE_MASK: u64 = PROPERTY_PAGE_SIZE - 1;

/// The values of a single node property.
///
/// ```
/// use huge_graph::node_properties::NodePropertyMap;
///
/// let mut ages = NodePropertyMap::new(100_000, 18.0);
/// ages.put(42, 37.0);
/// ages.put(70_000, 18.0);
///
/// assert_eq!(ages.get(42), 37.0);
/// assert_eq!(ages.get(43), 18.0);
/// assert_eq!(ages.get_or(43, -1.0), -1.0);
/// assert_eq!(ages.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NodePropertyMap {
    default_value: f64,
    node_count: u64,
    pages: Vec<Option<FxHashMap<u32, f64>>>,
}

impl NodePropertyMap {
    pub fn new(node_count: u64, default_value: f64) -> Self {
        let page_count = (node_count >> PROPERTY_PAGE_SHIFT)
            + u64::from(node_count & PROPERTY_PAGE_MASK != 0);
        let mut pages = Vec::new();
        pages.resize_with(page_count as usize, || None);
        Self {
            default_value,
            node_count,
            pages,
        }
    }

    /// Sets the value of `node`. A later call for the same node overwrites
    /// the earlier value.
    ///
    /// # Panics
    ///
    /// If `node` is not smaller than the node count the map was created
    /// with.
    pub fn put(&mut self, node: u64, value: f64) {
        assert!(
            node < self.node_count,
            "node {node} is out of range for {} nodes",
            self.node_count
        );
        let (page, index) = split(node);

        if value == self.default_value {
            if let Some(values) = self.pages[page].as_mut() {
                values.remove(&index);
            }
            return;
        }

        self.pages[page]
            .get_or_insert_with(FxHashMap::default)
            .insert(index, value);
    }

    /// Value of `node`, or the default value if none is stored.
    #[inline]
    pub fn get(&self, node: u64) -> f64 {
        self.get_or(node, self.default_value)
    }

    /// Value of `node`, or `default` if none is stored.
    #[inline]
    pub fn get_or(&self, node: u64, default: f64) -> f64 {
        let (page, index) = split(node);
        self.pages
            .get(page)
            .and_then(Option::as_ref)
            .and_then(|values| values.get(&index))
            .copied()
            .unwrap_or(default)
    }

    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Number of stored, i.e. non-default, values.
    pub fn len(&self) -> usize {
        self.pages.iter().flatten().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn memory_usage(&self) -> usize {
        self.pages.capacity() * std::mem::size_of::<Option<FxHashMap<u32, f64>>>()
            + self
                .pages
                .iter()
                .flatten()
                .map(|values| {
                    values.capacity()
                        * (std::mem::size_of::<u32>() + std::mem::size_of::<f64>() + 1)
                })
                .sum::<usize>()
    }
}

#[inline]
fn split(node: u64) -> (usize, u32) {
    (
        (node >> PROPERTY_PAGE_SHIFT) as usize,
        (node & PROPERTY_PAGE_MASK) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_cover_all_nodes() {
        assert_eq!(NodePropertyMap::new(0, 0.0).pages.len(), 0);
        assert_eq!(NodePropertyMap::new(1, 0.0).pages.len(), 1);
        assert_eq!(NodePropertyMap::new(PROPERTY_PAGE_SIZE, 0.0).pages.len(), 1);
        assert_eq!(NodePropertyMap::new(PROPERTY_PAGE_SIZE + 1, 0.0).pages.len(), 2);
    }

    #[test]
    fn only_touched_pages_are_allocated() {
        let mut map = NodePropertyMap::new(4 * PROPERTY_PAGE_SIZE, 0.0);
        map.put(PROPERTY_PAGE_SIZE * 2 + 5, 1.5);

        assert_eq!(map.pages.iter().filter(|page| page.is_some()).count(), 1);
        assert_eq!(map.get(PROPERTY_PAGE_SIZE * 2 + 5), 1.5);
        assert_eq!(map.get(5), 0.0);
    }

    #[test]
    fn values_on_page_boundaries() {
        let mut map = NodePropertyMap::new(2 * PROPERTY_PAGE_SIZE, -1.0);
        map.put(PROPERTY_PAGE_SIZE - 1, 1.0);
        map.put(PROPERTY_PAGE_SIZE, 2.0);

        assert_eq!(map.get(PROPERTY_PAGE_SIZE - 1), 1.0);
        assert_eq!(map.get(PROPERTY_PAGE_SIZE), 2.0);
        assert_eq!(map.get(PROPERTY_PAGE_SIZE + 1), -1.0);
    }

    #[test]
    fn default_value_removes_earlier_value() {
        let mut map = NodePropertyMap::new(10, 3.0);
        map.put(4, 7.0);
        map.put(4, 3.0);

        assert_eq!(map.get(4), 3.0);
        assert!(map.is_empty());
    }

    #[test]
    fn unknown_nodes_read_the_default() {
        let map = NodePropertyMap::new(10, 3.0);
        assert_eq!(map.get(1 << 40), 3.0);
        assert_eq!(map.get_or(1 << 40, 9.0), 9.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn put_out_of_range() {
        NodePropertyMap::new(10, 0.0).put(10, 1.0);
    }
}
