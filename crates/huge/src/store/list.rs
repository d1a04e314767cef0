use crate::compression::read_degree;

use super::{Address, AdjacencyCursor};

/// Immutable page table holding the compressed adjacency lists of all nodes
/// for a single direction.
#[derive(Debug, Default)]
pub struct AdjacencyList {
    pages: Box<[Box<[u8]>]>,
}

impl AdjacencyList {
    pub(crate) fn new(pages: Box<[Box<[u8]>]>) -> Self {
        Self { pages }
    }

    /// Reads the degree stored in the header of the block at `address`.
    #[inline]
    pub fn degree_at(&self, address: Address) -> u32 {
        if address.is_empty() {
            return 0;
        }
        read_degree(self.page(address.page_index()), address.index_in_page())
    }

    /// Creates a cursor that is not yet positioned on any block.
    pub fn new_cursor(&self) -> AdjacencyCursor<'_> {
        AdjacencyCursor::new(&self.pages)
    }

    /// Creates a cursor positioned on the block at `address`.
    pub fn cursor_at(&self, address: Address) -> AdjacencyCursor<'_> {
        let mut cursor = self.new_cursor();
        cursor.reset(address);
        cursor
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Bytes occupied by all pages.
    pub fn memory_usage(&self) -> usize {
        self.pages.iter().map(|page| page.len()).sum()
    }

    #[inline]
    pub(crate) fn page(&self, index: usize) -> &[u8] {
        &self.pages[index]
    }

    pub(crate) fn pages(&self) -> &[Box<[u8]>] {
        &self.pages
    }
}

#[cfg(test)]
mod tests {
    use crate::compression::compress;
    use crate::store::AdjacencyListBuilder;

    use super::*;

    #[test]
    fn degree_of_empty_address() {
        let list = AdjacencyList::default();
        assert_eq!(list.degree_at(Address::EMPTY), 0);
        assert_eq!(list.page_count(), 0);
    }

    #[test]
    fn degree_is_read_from_header() {
        let builder = AdjacencyListBuilder::new();
        let mut allocator = builder.new_allocator();
        let a = allocator.insert(&compress(&[1, 2, 3]));
        let b = allocator.insert(&compress(&[5]));
        allocator.finish();

        let list = builder.build();
        assert_eq!(list.degree_at(a), 3);
        assert_eq!(list.degree_at(b), 1);
        assert_eq!(list.cursor_at(a).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
