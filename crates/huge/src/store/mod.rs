//! Paged byte storage for compressed adjacency lists.
//!
//! Blocks written by [`compression`](crate::compression) are stored in pages
//! of [`PAGE_SIZE`] bytes. Each import worker owns an [`Allocator`] and
//! appends the blocks of its nodes to pages it exclusively owns, claiming
//! fresh page indices from the shared [`AdjacencyListBuilder`]. Once all
//! workers are done, the pages form an immutable [`AdjacencyList`] that can
//! be read through any number of [`AdjacencyCursor`]s.

mod builder;
mod cursor;
mod list;
mod offsets;

pub use builder::{AdjacencyListBuilder, Allocator};
pub use cursor::{AdjacencyCursor, CHUNK_SIZE};
pub use list::AdjacencyList;
pub use offsets::AdjacencyOffsets;

/// Number of bits of an [`Address`] that address a byte within a page.
pub const PAGE_SHIFT: u32 = 18;
/// Size of a regular page in bytes.
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
pub const PAGE_MASK: u64 = (PAGE_SIZE - 1) as u64;

/// Location of a block within an [`AdjacencyList`].
///
/// The upper bits hold the page index, the lower [`PAGE_SHIFT`] bits the
/// position inside that page. No block is ever stored at raw address `0`,
/// which therefore represents a node without relationships.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address {
    /// Address of a node without relationships.
    pub const EMPTY: Address = Address(0);

    #[inline]
    pub(crate) fn new(page_index: usize, index_in_page: usize) -> Self {
        debug_assert!(index_in_page as u64 <= PAGE_MASK);
        Self(((page_index as u64) << PAGE_SHIFT) | index_in_page as u64)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    /// The raw 64 bit representation.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub(crate) fn page_index(self) -> usize {
        (self.0 >> PAGE_SHIFT) as usize
    }

    #[inline]
    pub(crate) fn index_in_page(self) -> usize {
        (self.0 & PAGE_MASK) as usize
    }
}

/// The adjacency lists of all nodes for one direction together with their
/// offsets.
#[derive(Debug)]
pub struct Adjacency {
    list: AdjacencyList,
    offsets: AdjacencyOffsets,
}

impl Adjacency {
    pub fn new(list: AdjacencyList, offsets: AdjacencyOffsets) -> Self {
        Self { list, offsets }
    }

    #[inline]
    pub fn degree(&self, node: u64) -> u32 {
        self.list.degree_at(self.offsets.get(node))
    }

    #[inline]
    pub fn address(&self, node: u64) -> Address {
        self.offsets.get(node)
    }

    pub fn list(&self) -> &AdjacencyList {
        &self.list
    }

    pub fn offsets(&self) -> &AdjacencyOffsets {
        &self.offsets
    }

    pub fn memory_usage(&self) -> usize {
        self.list.memory_usage() + self.offsets.memory_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_constants() {
        assert_eq!(PAGE_SIZE, 262_144);
        assert_eq!(PAGE_MASK, 262_143);
    }

    #[test]
    fn address_parts() {
        let address = Address::new(3, 42);

        assert_eq!(address.raw(), (3 << 18) | 42);
        assert_eq!(address.page_index(), 3);
        assert_eq!(address.index_in_page(), 42);
        assert!(!address.is_empty());
    }

    #[test]
    fn empty_address() {
        assert_eq!(Address::default(), Address::EMPTY);
        assert_eq!(Address::new(0, 0), Address::EMPTY);
        assert!(Address::EMPTY.is_empty());
    }
}
