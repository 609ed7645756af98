//! Delta-encoded runs of 32-bit hashes.
//!
//! ## Format
//!
//! A `DELTAS` block containing:
//!
//! ```text
//! [count: VLQ]
//! [first: u32]                  // absent when count == 0
//! [delta: zigzag VLQ] * (count - 1)
//! ```
//!
//! Hashes are normally written in ascending order, which keeps every delta
//! small and non-negative, but any order round-trips.

use crate::error::{Error, Result};
use crate::format::{zigzag_decode, zigzag_encode, BlockType};
use crate::io::{DurableBuffer, DurableInput, DurableOutput, Input};
use bytes::Buf;
use std::ops::Range;
use std::sync::Arc;

/// Accumulates hashes and writes them as one `DELTAS` block.
#[derive(Debug, Default, Clone)]
pub struct HashDeltasWriter {
    hashes: Vec<u32>,
}

impl HashDeltasWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next hash
    pub fn append(&mut self, hash: u32) {
        self.hashes.push(hash);
    }

    /// Number of hashes appended
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Check if no hashes were appended
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Write the accumulated hashes as a framed block.
    pub fn flush_to(&self, out: &mut dyn DurableOutput) -> Result<()> {
        DurableBuffer::flush_to(out, BlockType::Deltas, |acc| {
            acc.write_vlq(self.hashes.len() as u64)?;
            let mut iter = self.hashes.iter();
            if let Some(&first) = iter.next() {
                acc.write_u32(first)?;
                let mut prev = first;
                for &hash in iter {
                    acc.write_vlq(zigzag_encode(hash as i64 - prev as i64))?;
                    prev = hash;
                }
            }
            Ok(())
        })
    }
}

/// The result of probing a [`HashDeltas`] block for a hash.
///
/// `start` is `-1` when the hash is definitely not in the block. When
/// `is_bounded` is set, a hash missing from this block is missing from every
/// later block too, so a search may stop here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    /// First candidate index, or -1.
    pub start: i64,
    /// One past the last candidate index, or -1.
    pub end: i64,
    /// Whether the search can stop at this block.
    pub is_bounded: bool,
}

impl IndexRange {
    /// A range holding no candidates.
    pub fn absent(is_bounded: bool) -> Self {
        Self { start: -1, end: -1, is_bounded }
    }

    /// Returns true if the block cannot hold the hash.
    pub fn is_absent(&self) -> bool {
        self.start < 0
    }

    /// The candidate indices, if any.
    pub fn candidates(&self) -> Option<Range<usize>> {
        if self.is_absent() {
            None
        } else {
            Some(self.start as usize..self.end as usize)
        }
    }
}

/// A decoded run of 32-bit hashes, one per entry of a hash-map block.
#[derive(Debug, Clone)]
pub struct HashDeltas {
    hashes: Arc<[u32]>,
    sorted: bool,
}

impl HashDeltas {
    /// Read the next `DELTAS` block from `input`.
    pub fn decode(input: &mut Input) -> Result<Self> {
        let mut block = input.slice_block(BlockType::Deltas)?;
        let hashes = Self::decode_body(&mut block).map_err(Error::into_framing)?;
        if block.has_remaining() {
            return Err(Error::framing(
                block.absolute_position(),
                format!("{} trailing bytes after hashes", block.remaining()),
            ));
        }
        Ok(Self::from_hashes(hashes))
    }

    fn decode_body(block: &mut Input) -> Result<Vec<u32>> {
        let count = block.read_vlq()?;
        if count == 0 {
            return Ok(Vec::new());
        }
        // four bytes for the first hash, at least one per delta
        if count - 1 > block.remaining().saturating_sub(4) as u64 {
            return Err(Error::corruption(format!(
                "{} hashes cannot fit in {} bytes",
                count,
                block.remaining()
            )));
        }

        let mut hashes = Vec::with_capacity(count as usize);
        let mut prev = block.read_u32()?;
        hashes.push(prev);
        for _ in 1..count {
            let position = block.absolute_position();
            let next = (prev as i64).checked_add(zigzag_decode(block.read_vlq()?));
            prev = next.and_then(|h| u32::try_from(h).ok()).ok_or_else(|| {
                Error::corruption(format!("hash delta at {} leaves 32-bit range", position))
            })?;
            hashes.push(prev);
        }
        Ok(hashes)
    }

    /// Build directly from hashes, in storage order.
    pub fn from_hashes(hashes: Vec<u32>) -> Self {
        let sorted = hashes.windows(2).all(|w| w[0] <= w[1]);
        Self { hashes: hashes.into(), sorted }
    }

    /// Number of hashes.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Check if the block holds no hashes.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Whether the hashes are in ascending order.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Smallest hash in the block.
    pub fn min(&self) -> Option<u32> {
        if self.sorted {
            self.hashes.first().copied()
        } else {
            self.hashes.iter().copied().min()
        }
    }

    /// Largest hash in the block.
    pub fn max(&self) -> Option<u32> {
        if self.sorted {
            self.hashes.last().copied()
        } else {
            self.hashes.iter().copied().max()
        }
    }

    /// The hash at local index `index`.
    pub fn nth(&self, index: u64) -> Option<u32> {
        usize::try_from(index).ok().and_then(|i| self.hashes.get(i).copied())
    }

    /// Iterates over the hashes in storage order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.hashes.iter().copied()
    }

    /// The tightest contiguous range of indices covering every occurrence of
    /// `hash`.
    ///
    /// The range is bounded when `hash` is below the block's largest hash:
    /// entries with equal hashes may spill into the next block only when
    /// they sit at its end.
    pub fn candidate_indices(&self, hash: u32) -> IndexRange {
        let max = match self.max() {
            Some(max) => max,
            None => return IndexRange::absent(false),
        };
        if hash > max {
            return IndexRange::absent(false);
        }
        let is_bounded = hash < max;

        let range = if self.sorted {
            let start = self.hashes.partition_point(|&h| h < hash);
            let end = self.hashes.partition_point(|&h| h <= hash);
            (start < end).then_some(start..end)
        } else {
            let first = self.hashes.iter().position(|&h| h == hash);
            let last = self.hashes.iter().rposition(|&h| h == hash);
            first.zip(last).map(|(first, last)| first..last + 1)
        };

        match range {
            Some(range) => IndexRange { start: range.start as i64, end: range.end as i64, is_bounded },
            None => IndexRange::absent(is_bounded),
        }
    }
}
