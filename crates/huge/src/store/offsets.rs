use super::Address;

/// Maps each dense node id to the [`Address`] of its block.
///
/// The table is paged by import range: page `i` was written by worker `i`
/// and covers the nodes `i << shift .. (i + 1) << shift`.
#[derive(Debug, Clone)]
pub struct AdjacencyOffsets {
    pages: Box<[Box<[Address]>]>,
    shift: u32,
    mask: u64,
}

impl AdjacencyOffsets {
    /// Assembles the table from the offset pages of all workers, ordered by
    /// worker id.
    pub fn from_pages(pages: Vec<Box<[Address]>>, shift: u32) -> Self {
        Self {
            pages: pages.into_boxed_slice(),
            shift,
            mask: (1_u64 << shift) - 1,
        }
    }

    /// A table in which every node has no relationships.
    pub fn empty() -> Self {
        Self::from_pages(Vec::new(), 0)
    }

    /// Returns the address of the block of `node`, or [`Address::EMPTY`].
    #[inline]
    pub fn get(&self, node: u64) -> Address {
        self.pages
            .get((node >> self.shift) as usize)
            .and_then(|page| page.get((node & self.mask) as usize))
            .copied()
            .unwrap_or(Address::EMPTY)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.pages
            .iter()
            .map(|page| std::mem::size_of_val(&page[..]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_range() {
        let first = vec![
            Address::new(0, 1),
            Address::EMPTY,
            Address::new(0, 9),
            Address::new(1, 0),
        ];
        let second = vec![Address::new(2, 3), Address::new(2, 7)];
        let offsets = AdjacencyOffsets::from_pages(
            vec![first.into_boxed_slice(), second.into_boxed_slice()],
            2,
        );

        assert_eq!(offsets.get(0), Address::new(0, 1));
        assert_eq!(offsets.get(1), Address::EMPTY);
        assert_eq!(offsets.get(3), Address::new(1, 0));
        assert_eq!(offsets.get(4), Address::new(2, 3));
        assert_eq!(offsets.get(5), Address::new(2, 7));
        assert_eq!(offsets.memory_usage(), 6 * 8);
    }

    #[test]
    fn unset_nodes_are_empty() {
        let page = vec![Address::new(0, 1)].into_boxed_slice();
        let offsets = AdjacencyOffsets::from_pages(vec![page], 3);

        assert_eq!(offsets.get(0), Address::new(0, 1));
        assert_eq!(offsets.get(1), Address::EMPTY);
        assert_eq!(offsets.get(100), Address::EMPTY);
        assert_eq!(AdjacencyOffsets::empty().get(0), Address::EMPTY);
    }
}
