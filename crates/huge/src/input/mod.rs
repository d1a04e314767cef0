//! What the graph is built from.
//!
//! The builder accepts any iterator of external node ids and of
//! relationships between them. [`EdgeList`] additionally reads relationships
//! from a simple text format.

pub mod edgelist;

pub use edgelist::EdgeList;

/// A single relationship as provided by the data source.
///
/// `source` and `target` are external ids; they are resolved against the id
/// map during import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputRelationship {
    pub source: u64,
    pub target: u64,
    pub weight: Option<f64>,
}

impl InputRelationship {
    pub fn new(source: u64, target: u64) -> Self {
        Self {
            source,
            target,
            weight: None,
        }
    }

    pub fn with_weight(source: u64, target: u64, weight: f64) -> Self {
        Self {
            source,
            target,
            weight: Some(weight),
        }
    }
}

impl From<(u64, u64)> for InputRelationship {
    fn from((source, target): (u64, u64)) -> Self {
        Self::new(source, target)
    }
}

impl From<(u64, u64, f64)> for InputRelationship {
    fn from((source, target, weight): (u64, u64, f64)) -> Self {
        Self::with_weight(source, target, weight)
    }
}

/// Parses a node id from the start of `bytes`.
///
/// Returns `None` if `bytes` does not start with a digit or the number does
/// not fit into a `u64`. Otherwise returns the id and the number of bytes
/// read.
///
/// ```
/// use huge_graph::input::parse_id;
///
/// assert_eq!(parse_id(b"1337 42"), Some((1337, 4)));
/// assert_eq!(parse_id(b"x"), None);
/// ```
pub fn parse_id(bytes: &[u8]) -> Option<(u64, usize)> {
    match <u64 as atoi::FromRadix10Checked>::from_radix_10_checked(bytes) {
        (Some(id), len) if len > 0 => Some((id, len)),
        _ => None,
    }
}

/// Parses a weight from the start of `bytes`.
///
/// ```
/// use huge_graph::input::parse_weight;
///
/// assert_eq!(parse_weight(b"13.37\n"), Some((13.37, 5)));
/// assert_eq!(parse_weight(b"-1e3"), Some((-1000.0, 4)));
/// assert_eq!(parse_weight(b"abc"), None);
/// ```
pub fn parse_weight(bytes: &[u8]) -> Option<(f64, usize)> {
    fast_float2::parse_partial::<f64, _>(bytes).ok()
}
