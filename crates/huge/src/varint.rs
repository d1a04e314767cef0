//! Variable-length encoding of 64 bit integers.
//!
//! Every byte carries 7 value bits, least significant group first. The high
//! bit of a byte is set if more bytes follow, which means that a `u64` needs
//! between 1 and 10 bytes. Small values, e.g. the gaps between sorted
//! neighbor ids, are cheap to store.
//!
//! Decoding never validates the input. Callers always know how many values
//! they expect (the degree of a node) and stop after that many.

/// The maximum number of bytes an encoded `u64` can occupy.
pub const MAX_VLONG_SIZE: usize = 10;

const VALUE_BITS: u32 = 7;
const VALUE_MASK: u64 = 0x7F;
const CONTINUATION_BIT: u8 = 0x80;

/// Writes `value` into `out` starting at `into` and returns the position
/// right after the last written byte.
///
/// `out` must have at least [`encoded_vlong_size`] bytes of space left.
///
/// # Example
///
/// ```
/// use huge_graph::varint::{decode_vlong, encode_vlong};
///
/// let mut buf = [0_u8; 10];
/// let end = encode_vlong(300, &mut buf, 0);
///
/// assert_eq!(end, 2);
/// assert_eq!(&buf[..end], &[0xAC, 0x02]);
/// assert_eq!(decode_vlong(&buf, 0), (300, 2));
/// ```
#[inline]
pub fn encode_vlong(mut value: u64, out: &mut [u8], mut into: usize) -> usize {
    while value > VALUE_MASK {
        out[into] = (value & VALUE_MASK) as u8 | CONTINUATION_BIT;
        value >>= VALUE_BITS;
        into += 1;
    }
    out[into] = value as u8;
    into + 1
}

/// Appends the encoding of `value` to `out`.
#[inline]
pub fn push_vlong(value: u64, out: &mut Vec<u8>) {
    let mut buf = [0_u8; MAX_VLONG_SIZE];
    let len = encode_vlong(value, &mut buf, 0);
    out.extend_from_slice(&buf[..len]);
}

/// Returns the number of bytes [`encode_vlong`] needs for `value`.
#[inline]
pub fn encoded_vlong_size(value: u64) -> usize {
    let significant_bits = (u64::BITS - value.leading_zeros()).max(1);
    ((significant_bits + VALUE_BITS - 1) / VALUE_BITS) as usize
}

/// Reads a single value starting at `offset`.
///
/// Returns the value and the position of the next unread byte.
#[inline]
pub fn decode_vlong(bytes: &[u8], mut offset: usize) -> (u64, usize) {
    let mut value = 0_u64;
    let mut shift = 0_u32;
    loop {
        let byte = bytes[offset];
        offset += 1;
        value |= ((byte & !CONTINUATION_BIT) as u64) << shift;
        if byte & CONTINUATION_BIT == 0 {
            return (value, offset);
        }
        shift += VALUE_BITS;
    }
}

/// Decodes `out.len()` deltas starting at `offset` and stores their running
/// sum, starting from `start`, in `out`.
///
/// Returns the position of the next unread byte.
#[inline]
pub fn decode_delta_vlongs(
    mut start: u64,
    bytes: &[u8],
    mut offset: usize,
    out: &mut [u64],
) -> usize {
    for slot in out.iter_mut() {
        let (delta, next) = decode_vlong(bytes, offset);
        start += delta;
        *slot = start;
        offset = next;
    }
    offset
}

/// Maps signed integers onto unsigned integers so that values with a small
/// magnitude stay small: `0, -1, 1, -2, 2, ...` become `0, 1, 2, 3, 4, ...`.
#[inline]
pub fn zig_zag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zig_zag`].
#[inline]
pub fn un_zig_zag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Zig-zag maps `value` and writes it like [`encode_vlong`].
#[inline]
pub fn encode_signed_vlong(value: i64, out: &mut [u8], into: usize) -> usize {
    encode_vlong(zig_zag(value), out, into)
}

/// Inverse of [`encode_signed_vlong`].
#[inline]
pub fn decode_signed_vlong(bytes: &[u8], offset: usize) -> (i64, usize) {
    let (value, offset) = decode_vlong(bytes, offset);
    (un_zig_zag(value), offset)
}
