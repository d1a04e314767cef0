use std::{convert::TryFrom, fs::File, path::Path, time::Instant};

use fxhash::FxHashSet;
use log::info;
use rayon::prelude::*;

use super::{parse_id, parse_weight, InputRelationship};
use crate::Error;

/// An in-memory list of relationships.
///
/// The text format has one relationship per line: a source id and a target
/// id, optionally followed by a weight, separated by whitespace. Blank lines
/// and lines starting with `#` are skipped.
///
/// ```ignore
/// > cat my_graph.el
/// # source target weight
/// 0 1 0.5
/// 0 2
/// 1 3 1.5
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeList {
    relationships: Box<[InputRelationship]>,
}

impl EdgeList {
    pub fn new(relationships: Vec<InputRelationship>) -> Self {
        Self {
            relationships: relationships.into_boxed_slice(),
        }
    }

    /// Reads an edge list from a memory-mapped file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::default());
        }
        // the mapping is only read while the file is open
        let mmap = unsafe { memmap2::MmapOptions::new().populate().map(&file)? };
        EdgeList::try_from(mmap.as_ref())
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn relationships(&self) -> &[InputRelationship] {
        &self.relationships
    }

    /// Returns `true` if at least one relationship carries a weight.
    pub fn has_weights(&self) -> bool {
        self.relationships.iter().any(|r| r.weight.is_some())
    }

    /// Distinct endpoints of all relationships in the order they are first
    /// seen.
    pub fn node_ids(&self) -> Vec<u64> {
        let mut seen = FxHashSet::default();
        let mut node_ids = Vec::new();
        for relationship in self.relationships.iter() {
            for id in [relationship.source, relationship.target] {
                if seen.insert(id) {
                    node_ids.push(id);
                }
            }
        }
        node_ids
    }
}

impl IntoIterator for EdgeList {
    type Item = InputRelationship;
    type IntoIter = std::vec::IntoIter<InputRelationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.relationships.into_vec().into_iter()
    }
}

impl FromIterator<(u64, u64)> for EdgeList {
    fn from_iter<T: IntoIterator<Item = (u64, u64)>>(iter: T) -> Self {
        EdgeList::new(iter.into_iter().map(InputRelationship::from).collect())
    }
}

impl FromIterator<(u64, u64, f64)> for EdgeList {
    fn from_iter<T: IntoIterator<Item = (u64, u64, f64)>>(iter: T) -> Self {
        EdgeList::new(iter.into_iter().map(InputRelationship::from).collect())
    }
}

impl TryFrom<&[u8]> for EdgeList {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let start = Instant::now();

        let lines = bytes.split(|&b| b == b'\n').collect::<Vec<_>>();
        let relationships = lines
            .par_iter()
            .enumerate()
            .map(|(index, line)| {
                parse_line(line).map_err(|_| Error::InvalidEdgeList { line: index + 1 })
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        let elapsed = start.elapsed().as_millis() as f64 / 1000_f64;

        info!(
            "Read {} relationships in {:.2}s ({:.2} MB/s)",
            relationships.len(),
            elapsed,
            ((bytes.len() as f64) / elapsed.max(0.001)) / (1024.0 * 1024.0)
        );

        Ok(EdgeList::new(relationships))
    }
}

fn parse_line(line: &[u8]) -> Result<Option<InputRelationship>, ()> {
    let line = trim(line);
    if line.is_empty() || line[0] == b'#' {
        return Ok(None);
    }

    let (source, len) = parse_id(line).ok_or(())?;
    let rest = separator(&line[len..])?;

    let (target, len) = parse_id(rest).ok_or(())?;
    let rest = &rest[len..];
    if rest.is_empty() {
        return Ok(Some(InputRelationship::new(source, target)));
    }

    let rest = separator(rest)?;
    let (weight, len) = parse_weight(rest).ok_or(())?;
    if !trim(&rest[len..]).is_empty() {
        return Err(());
    }

    Ok(Some(InputRelationship::with_weight(source, target, weight)))
}

// Strips the whitespace between two columns, at least one byte is required.
fn separator(bytes: &[u8]) -> Result<&[u8], ()> {
    let rest = trim_start(bytes);
    if rest.len() == bytes.len() {
        Err(())
    } else {
        Ok(rest)
    }
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[skip..]
}

fn trim(bytes: &[u8]) -> &[u8] {
    let bytes = trim_start(bytes);
    let skip = bytes.iter().rev().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[..bytes.len() - skip]
}
