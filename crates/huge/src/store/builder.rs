use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use parking_lot::Mutex;

use super::{Address, AdjacencyList, PAGE_SIZE};

/// Shared state of all allocators writing into the same [`AdjacencyList`].
///
/// The atomic page counter is the only point of coordination while workers
/// write. Finished pages are deposited into the page table once per
/// allocator.
#[derive(Debug, Default)]
pub struct AdjacencyListBuilder {
    next_page: AtomicUsize,
    pages: Mutex<Vec<Option<Box<[u8]>>>>,
}

impl AdjacencyListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator for a single writer.
    pub fn new_allocator(&self) -> Allocator<'_> {
        Allocator {
            builder: self,
            current: None,
            finished: Vec::new(),
        }
    }

    /// Number of page indices claimed so far.
    pub fn claimed_pages(&self) -> usize {
        self.next_page.load(Ordering::Acquire)
    }

    /// Turns all deposited pages into the final, immutable page table.
    ///
    /// Claimed page indices whose allocator never called
    /// [`Allocator::finish`] become empty pages.
    pub fn build(self) -> AdjacencyList {
        let page_count = self.next_page.into_inner();
        let mut pages = self.pages.into_inner();
        pages.resize_with(page_count.max(pages.len()), || None);

        let pages = pages
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect::<Vec<_>>();

        AdjacencyList::new(pages.into_boxed_slice())
    }

    fn claim_page(&self) -> usize {
        self.next_page.fetch_add(1, Ordering::AcqRel)
    }

    fn deposit(&self, pages: Vec<(usize, Box<[u8]>)>) {
        let mut table = self.pages.lock();
        for (index, page) in pages {
            if table.len() <= index {
                table.resize_with(index + 1, || None);
            }
            table[index] = Some(page);
        }
    }
}

/// Bump allocator that owns the pages it writes to.
///
/// The bytes of a single request never cross a page boundary. Requests larger
/// than [`PAGE_SIZE`] get a dedicated page that is exactly as large as the
/// request.
#[derive(Debug)]
pub struct Allocator<'a> {
    builder: &'a AdjacencyListBuilder,
    current: Option<(usize, Vec<u8>)>,
    finished: Vec<(usize, Box<[u8]>)>,
}

impl<'a> Allocator<'a> {
    /// Reserves `size` zeroed bytes and returns their address.
    ///
    /// A request that does not even fit on a fresh page, such as a full page
    /// on page 0 behind its reserved byte, is treated as oversized.
    pub fn allocate(&mut self, size: usize) -> Address {
        if size > PAGE_SIZE {
            return self.allocate_oversized(size);
        }

        if !self.current_fits(size) {
            self.next_page();
        }

        match &mut self.current {
            Some((index, page)) if PAGE_SIZE.saturating_sub(page.len()) >= size => {
                let offset = page.len();
                page.resize(offset + size, 0);
                Address::new(*index, offset)
            }
            _ => self.allocate_oversized(size),
        }
    }

    fn current_fits(&self, size: usize) -> bool {
        matches!(
            &self.current,
            Some((_, page)) if PAGE_SIZE.saturating_sub(page.len()) >= size
        )
    }

    /// Copies `bytes` to `address`, which must have been returned by
    /// [`Self::allocate`] of this allocator.
    pub fn write(&mut self, address: Address, bytes: &[u8]) {
        let page_index = address.page_index();
        let offset = address.index_in_page();

        let page: &mut [u8] = match &mut self.current {
            Some((index, page)) if *index == page_index => &mut page[..],
            _ => self
                .finished
                .iter_mut()
                .rev()
                .find(|(index, _)| *index == page_index)
                .map(|(_, page)| &mut page[..])
                .unwrap_or_else(|| panic!("page {page_index} is not owned by this allocator")),
        };

        page[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Allocates space for `bytes`, writes them and returns their address.
    pub fn insert(&mut self, bytes: &[u8]) -> Address {
        let address = self.allocate(bytes.len());
        self.write(address, bytes);
        address
    }

    /// Hands all pages over to the builder.
    pub fn finish(mut self) {
        self.retire_current();
        debug!(
            "Allocator: depositing {} pages ({} bytes)",
            self.finished.len(),
            self.finished.iter().map(|(_, p)| p.len()).sum::<usize>()
        );
        self.builder.deposit(self.finished);
    }

    fn next_page(&mut self) {
        self.retire_current();
        let index = self.builder.claim_page();
        let mut page = Vec::with_capacity(PAGE_SIZE);
        if index == 0 {
            // raw address 0 is reserved for empty lists
            page.push(0);
        }
        self.current = Some((index, page));
    }

    fn allocate_oversized(&mut self, size: usize) -> Address {
        let index = self.builder.claim_page();
        let offset = usize::from(index == 0);
        self.finished
            .push((index, vec![0; offset + size].into_boxed_slice()));
        Address::new(index, offset)
    }

    fn retire_current(&mut self) {
        if let Some((index, page)) = self.current.take() {
            self.finished.push((index, page.into_boxed_slice()));
        }
    }
}
