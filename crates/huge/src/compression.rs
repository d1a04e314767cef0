//! The block format of a single adjacency list.
//!
//! A block starts with the degree `d` as a 4 byte little endian unsigned
//! integer, followed by `d` varint encoded deltas. The first delta is relative
//! to `0`, every further delta is relative to the previous target. Targets
//! are sorted ascending and distinct, so all deltas but the first are
//! strictly positive.
//!
//! ```
//! use huge_graph::compression::{compress, decompress};
//!
//! let block = compress(&[42, 7, 1337, 7]);
//!
//! assert_eq!(&block[..4], &3_u32.to_le_bytes());
//! assert_eq!(decompress(&block), vec![7, 42, 1337]);
//! ```

use crate::varint::{decode_delta_vlongs, decode_signed_vlong, encode_vlong, push_vlong, zig_zag};

/// Number of bytes occupied by the degree header of a block.
pub const DEGREE_BYTES: usize = std::mem::size_of::<u32>();

/// Writes `degree` into the first [`DEGREE_BYTES`] bytes of `out`.
#[inline]
pub fn write_degree(degree: u32, out: &mut [u8]) {
    out[..DEGREE_BYTES].copy_from_slice(&degree.to_le_bytes());
}

/// Reads the degree header of the block starting at `offset`.
#[inline]
pub fn read_degree(bytes: &[u8], offset: usize) -> u32 {
    let mut header = [0_u8; DEGREE_BYTES];
    header.copy_from_slice(&bytes[offset..offset + DEGREE_BYTES]);
    u32::from_le_bytes(header)
}

/// Sorts `values`, removes duplicates and replaces the remaining prefix with
/// the gaps between consecutive values.
///
/// Returns the length of the deduplicated prefix. Values behind that prefix
/// are left in an unspecified state.
pub fn apply_delta_encoding(values: &mut [u64]) -> usize {
    if values.is_empty() {
        return 0;
    }

    values.sort_unstable();

    let mut prev = values[0];
    let mut len = 1;
    for i in 1..values.len() {
        let value = values[i];
        let delta = value - prev;
        if delta > 0 {
            values[len] = delta;
            len += 1;
            prev = value;
        }
    }

    len
}

/// Compresses an unordered multiset of targets into a block.
///
/// # Panics
///
/// If the number of distinct targets does not fit into a `u32`.
pub fn compress(raw: &[u64]) -> Vec<u8> {
    let mut out = Vec::new();
    compress_into(raw, &mut out);
    out
}

/// Like [`compress`] but clears and reuses `out`.
///
/// # Panics
///
/// If the number of distinct targets does not fit into a `u32`.
pub fn compress_into(raw: &[u64], out: &mut Vec<u8>) {
    let mut ids = raw.to_vec();
    let degree = apply_delta_encoding(&mut ids);
    ids.truncate(degree);
    assert!(
        encode_block(&ids, out),
        "degree {degree} exceeds the maximum block degree"
    );
}

/// Decodes the block at the start of `bytes`.
pub fn decompress(bytes: &[u8]) -> Vec<u64> {
    let degree = read_degree(bytes, 0) as usize;
    let mut targets = vec![0; degree];
    decode_delta_vlongs(0, bytes, DEGREE_BYTES, &mut targets);
    targets
}

// Writes header and deltas into `out`. Returns false if the degree does not
// fit into the header.
fn encode_block(deltas: &[u64], out: &mut Vec<u8>) -> bool {
    let Ok(degree) = u32::try_from(deltas.len()) else {
        return false;
    };

    out.clear();
    out.extend_from_slice(&degree.to_le_bytes());
    for &delta in deltas {
        push_vlong(delta, out);
    }
    true
}

/// Append-only scratch space for the targets of a single node during import.
///
/// Targets arrive in no particular order, so each one is stored as the zig-zag
/// encoded difference to the previously added target. The buffer keeps
/// duplicates and insertion order; sorting and deduplication happen once the
/// node is finalized.
#[derive(Debug, Default, Clone)]
pub struct CompressedTargets {
    bytes: Vec<u8>,
    last: u64,
    len: usize,
}

impl CompressedTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target.
    #[inline]
    pub fn add(&mut self, target: u64) {
        let delta = target.wrapping_sub(self.last) as i64;
        let mut buf = [0_u8; crate::varint::MAX_VLONG_SIZE];
        let end = encode_vlong(zig_zag(delta), &mut buf, 0);
        self.bytes.extend_from_slice(&buf[..end]);
        self.last = target;
        self.len += 1;
    }

    /// Number of targets added so far, including duplicates.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends all targets in insertion order to `out`.
    pub fn decode_into(&self, out: &mut Vec<u64>) {
        out.reserve(self.len);
        let mut offset = 0;
        let mut value = 0_u64;
        for _ in 0..self.len {
            let (delta, next) = decode_signed_vlong(&self.bytes, offset);
            value = value.wrapping_add(delta as u64);
            out.push(value);
            offset = next;
        }
    }

    /// Bytes held by the scratch buffer.
    pub fn memory_usage(&self) -> usize {
        self.bytes.capacity()
    }
}

/// Reusable buffers that turn a [`CompressedTargets`] into a final block.
///
/// Every import worker owns one instance and reuses it for all of its nodes.
#[derive(Debug, Default)]
pub struct AdjacencyCompression {
    ids: Vec<u64>,
    block: Vec<u8>,
}

impl AdjacencyCompression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes, sorts and deduplicates `targets` and returns the resulting
    /// degree. The block is written by a subsequent call to [`Self::encode`].
    pub fn prepare(&mut self, targets: &CompressedTargets) -> usize {
        self.ids.clear();
        targets.decode_into(&mut self.ids);
        let degree = apply_delta_encoding(&mut self.ids);
        self.ids.truncate(degree);
        degree
    }

    /// Encodes the previously prepared targets.
    ///
    /// Returns `None` if the degree does not fit into the block header.
    pub fn encode(&mut self) -> Option<&[u8]> {
        if encode_block(&self.ids, &mut self.block) {
            Some(&self.block)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;

    use super::*;

    #[test]
    fn delta_encoding_sorts_and_dedupes() {
        let mut values = vec![5, 3, 9, 3, 5, 1];
        let len = apply_delta_encoding(&mut values);

        assert_eq!(len, 4);
        assert_eq!(&values[..len], &[1, 2, 2, 4]);
    }

    #[test]
    fn delta_encoding_keeps_leading_zero() {
        let mut values = vec![0, 0, 2];
        let len = apply_delta_encoding(&mut values);

        assert_eq!(&values[..len], &[0, 2]);
    }

    #[test]
    fn delta_encoding_of_empty_slice() {
        assert_eq!(apply_delta_encoding(&mut []), 0);
    }

    #[test]
    fn block_layout() {
        let block = compress(&[300, 1]);

        assert_eq!(&block[..DEGREE_BYTES], &[2, 0, 0, 0]);
        // 1, then 299 = 0b10_0101011
        assert_eq!(&block[DEGREE_BYTES..], &[0x01, 0xAB, 0x02]);
    }

    #[test]
    fn empty_block_is_just_the_header() {
        let block = compress(&[]);

        assert_eq!(block, vec![0, 0, 0, 0]);
        assert!(decompress(&block).is_empty());
    }

    #[test]
    fn decompress_returns_sorted_distinct_targets() {
        let raw = [17, 4, 17, 1 << 40, 0, 4, 99];
        assert_eq!(decompress(&compress(&raw)), vec![0, 4, 17, 99, 1 << 40]);
    }

    #[test]
    fn degree_header_at_offset() {
        let mut bytes = vec![0xFF; 9];
        write_degree(0x0102_0304, &mut bytes[3..]);

        assert_eq!(read_degree(&bytes, 3), 0x0102_0304);
        assert_eq!(&bytes[3..7], &[4, 3, 2, 1]);
    }

    #[test]
    fn compress_into_reuses_buffer() {
        let mut out = vec![1, 2, 3, 4, 5, 6, 7, 8, 9];
        compress_into(&[2], &mut out);

        assert_eq!(out, vec![1, 0, 0, 0, 2]);
    }

    #[test]
    fn scratch_keeps_insertion_order() {
        let mut targets = CompressedTargets::new();
        for t in [10, 3, 3, u64::MAX, 0, 7] {
            targets.add(t);
        }

        let mut out = Vec::new();
        targets.decode_into(&mut out);

        assert_eq!(targets.len(), 6);
        assert_eq!(out, vec![10, 3, 3, u64::MAX, 0, 7]);
    }

    #[test]
    fn scratch_to_block() {
        let mut targets = CompressedTargets::new();
        for t in [8, 2, 8, 5] {
            targets.add(t);
        }

        let mut compression = AdjacencyCompression::new();
        assert_eq!(compression.prepare(&targets), 3);

        let block = compression.encode().map(<[u8]>::to_vec);
        assert_eq!(block, Some(compress(&[2, 5, 8])));
    }

    #[test]
    fn compression_buffers_are_reused() {
        let mut compression = AdjacencyCompression::new();

        let mut first = CompressedTargets::new();
        (0..100).for_each(|t| first.add(t * 3));
        compression.prepare(&first);
        assert!(compression.encode().is_some());

        let mut second = CompressedTargets::new();
        second.add(1);
        assert_eq!(compression.prepare(&second), 1);
        assert_eq!(compression.encode(), Some(&[1, 0, 0, 0, 1][..]));
    }

    fn random_targets(rng: &mut StdRng) -> Vec<u64> {
        let len = rng.gen_range(0..300);
        let mut targets = Vec::with_capacity(len);
        while targets.len() < len {
            let target = match rng.gen_range(0..4) {
                0 => rng.gen_range(0..64),
                1 => u64::MAX - rng.gen_range(0..64),
                2 => rng.gen(),
                _ => match targets.choose(rng) {
                    Some(&seen) => seen,
                    None => 0,
                },
            };
            targets.push(target);
        }
        targets
    }

    #[test]
    fn random_blocks_decompress_to_sorted_distinct_targets() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut compression = AdjacencyCompression::new();

        for _ in 0..500 {
            let raw = random_targets(&mut rng);
            let mut expected = raw.clone();
            expected.sort_unstable();
            expected.dedup();

            let block = compress(&raw);
            assert_eq!(read_degree(&block, 0) as usize, expected.len());
            assert_eq!(decompress(&block), expected);

            let mut targets = CompressedTargets::new();
            raw.iter().for_each(|&t| targets.add(t));
            assert_eq!(compression.prepare(&targets), expected.len());
            assert_eq!(compression.encode(), Some(&block[..]));
        }
    }

    #[test]
    fn largest_targets_survive_compression() {
        let raw = [u64::MAX, 0, u64::MAX - 1, u64::MAX, 1 << 63];
        assert_eq!(
            decompress(&compress(&raw)),
            vec![0, 1 << 63, u64::MAX - 1, u64::MAX]
        );
    }
}
