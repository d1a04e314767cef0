use std::cell::Cell;
use std::marker::PhantomData;

use crate::compression::{read_degree, DEGREE_BYTES};
use crate::varint::decode_delta_vlongs;

use super::{Address, AdjacencyList};

/// Number of targets decoded at once.
pub const CHUNK_SIZE: usize = 64;

/// Decoder for a single adjacency list.
///
/// A cursor is cheap to reset and is meant to be reused for many nodes by a
/// single thread. Targets are decoded lazily in chunks of [`CHUNK_SIZE`],
/// which allows [`advance`](Self::advance) to skip whole chunks without
/// looking at every target.
///
/// ```
/// use huge_graph::compression::compress;
/// use huge_graph::store::AdjacencyListBuilder;
///
/// let builder = AdjacencyListBuilder::new();
/// let mut allocator = builder.new_allocator();
/// let address = allocator.insert(&compress(&[3, 9, 27, 81]));
/// allocator.finish();
///
/// let list = builder.build();
/// let mut cursor = list.new_cursor();
///
/// assert_eq!(cursor.reset(address), 4);
/// assert_eq!(cursor.advance(10), 27);
/// assert_eq!(cursor.next_vlong(), 81);
/// assert!(!cursor.has_next());
/// ```
#[derive(Clone)]
pub struct AdjacencyCursor<'a> {
    pages: &'a [Box<[u8]>],
    page: &'a [u8],
    offset: usize,
    block: [u64; CHUNK_SIZE],
    pos: usize,
    len: usize,
    undecoded: usize,
    last: u64,
    degree: usize,
    // cursors carry mutable decoding state and must not be shared
    _not_sync: PhantomData<Cell<()>>,
}

impl<'a> AdjacencyCursor<'a> {
    pub(crate) fn new(pages: &'a [Box<[u8]>]) -> Self {
        Self {
            pages,
            page: &[],
            offset: 0,
            block: [0; CHUNK_SIZE],
            pos: 0,
            len: 0,
            undecoded: 0,
            last: 0,
            degree: 0,
            _not_sync: PhantomData,
        }
    }

    /// Positions the cursor at the start of the block at `address` and
    /// returns its degree.
    pub fn reset(&mut self, address: Address) -> u32 {
        if address.is_empty() {
            self.reset_empty();
            return 0;
        }

        self.page = &self.pages[address.page_index()];
        let offset = address.index_in_page();
        let degree = read_degree(self.page, offset);

        self.offset = offset + DEGREE_BYTES;
        self.degree = degree as usize;
        self.undecoded = self.degree;
        self.pos = 0;
        self.len = 0;
        self.last = 0;
        self.refill();

        degree
    }

    /// Turns the cursor into one over an empty list.
    pub fn reset_empty(&mut self) {
        self.page = &[];
        self.offset = 0;
        self.degree = 0;
        self.undecoded = 0;
        self.pos = 0;
        self.len = 0;
        self.last = 0;
    }

    /// Returns `true` if the cursor decodes blocks of `list`.
    pub fn reads_from(&self, list: &AdjacencyList) -> bool {
        std::ptr::eq(self.pages, list.pages())
    }

    /// Copies the complete decoding state of `other`.
    pub fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// Returns `true` if there are targets left to read.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.pos < self.len || self.undecoded > 0
    }

    /// Number of targets not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len - self.pos + self.undecoded
    }

    /// Degree of the current list, regardless of how much has been consumed.
    #[inline]
    pub fn cost(&self) -> usize {
        self.degree
    }

    /// Returns the next target.
    ///
    /// Calling this on an exhausted cursor returns the last decoded target.
    #[inline]
    pub fn next_vlong(&mut self) -> u64 {
        if self.pos == self.len {
            if self.undecoded == 0 {
                return self.last;
            }
            self.refill();
        }
        let value = self.block[self.pos];
        self.pos += 1;
        value
    }

    /// Consumes targets up to and including the first one that is `>= target`
    /// and returns it.
    ///
    /// If there is no such target, the cursor is exhausted and the last
    /// target is returned. Hence a result `< target` means "not found".
    pub fn advance(&mut self, target: u64) -> u64 {
        if self.pos == self.len {
            if self.undecoded == 0 {
                return self.last;
            }
            self.refill();
        }

        while self.block[self.len - 1] < target && self.undecoded > 0 {
            self.refill();
        }

        let idx = self.pos + self.block[self.pos..self.len].partition_point(|&v| v < target);
        if idx == self.len {
            self.pos = self.len;
            return self.last;
        }

        self.pos = idx + 1;
        self.block[idx]
    }

    /// Like [`advance`](Self::advance) but for the first target that is
    /// strictly greater than `target`.
    pub fn skip_until(&mut self, target: u64) -> u64 {
        match target.checked_add(1) {
            Some(next) => self.advance(next),
            None => {
                while self.undecoded > 0 {
                    self.refill();
                }
                self.pos = self.len;
                self.last
            }
        }
    }

    fn refill(&mut self) {
        let n = self.undecoded.min(CHUNK_SIZE);
        self.offset = decode_delta_vlongs(self.last, self.page, self.offset, &mut self.block[..n]);
        self.len = n;
        self.pos = 0;
        self.undecoded -= n;
        if n > 0 {
            self.last = self.block[n - 1];
        }
    }
}

impl Iterator for AdjacencyCursor<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            Some(self.next_vlong())
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AdjacencyCursor<'_> {}

impl std::fmt::Debug for AdjacencyCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdjacencyCursor")
            .field("degree", &self.degree)
            .field("remaining", &self.remaining())
            .finish()
    }
}
