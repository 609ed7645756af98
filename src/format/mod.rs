//! Block framing.
//!
//! Every logical chunk written by this crate is a framed block, so readers can
//! slice or skip "the next block of type T" without parsing its contents.
//!
//! ## Block Format
//!
//! ```text
//! [type: u8]          // BlockType
//! [length: VLQ]       // payload length in bytes
//! [payload: length bytes]
//! ```
//!
//! All fixed-width primitives inside payloads are big-endian.

pub mod vlq;

use bytes::BufMut;
use std::fmt;

pub use vlq::{encode_vlq, vlq_len, zigzag_decode, zigzag_encode, MAX_VLQ_LEN};

/// The type tag of a framed block.
///
/// The set is open: tags this crate does not know are preserved as
/// [`BlockType::Unknown`] so that they can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Payload of a primitive encoding.
    Primitive,
    /// A hash-map entries block.
    Table,
    /// A delta-encoded run of 32-bit hashes.
    Deltas,
    /// Header of a durable list.
    List,
    /// Header of a durable set.
    Set,
    /// Header of a durable map.
    Map,
    /// A tag written by some other producer.
    Unknown(u8),
}

impl BlockType {
    /// Decode a tag byte.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => BlockType::Primitive,
            1 => BlockType::Table,
            2 => BlockType::Deltas,
            3 => BlockType::List,
            4 => BlockType::Set,
            5 => BlockType::Map,
            other => BlockType::Unknown(other),
        }
    }

    /// The tag byte written for this type.
    pub fn as_u8(self) -> u8 {
        match self {
            BlockType::Primitive => 0,
            BlockType::Table => 1,
            BlockType::Deltas => 2,
            BlockType::List => 3,
            BlockType::Set => 4,
            BlockType::Map => 5,
            BlockType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Primitive => write!(f, "PRIMITIVE"),
            BlockType::Table => write!(f, "TABLE"),
            BlockType::Deltas => write!(f, "DELTAS"),
            BlockType::List => write!(f, "LIST"),
            BlockType::Set => write!(f, "SET"),
            BlockType::Map => write!(f, "MAP"),
            BlockType::Unknown(tag) => write!(f, "UNKNOWN({})", tag),
        }
    }
}

/// The `(type, length)` header in front of every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPrefix {
    /// Type of the block
    pub block_type: BlockType,
    /// Length of the payload in bytes
    pub length: u64,
}

impl BlockPrefix {
    /// Create a new BlockPrefix
    pub fn new(block_type: BlockType, length: u64) -> Self {
        Self { block_type, length }
    }

    /// Append the encoded prefix to `buf`.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.block_type.as_u8());
        encode_vlq(self.length, buf);
    }

    /// Size of the encoded prefix in bytes.
    pub fn encoded_len(&self) -> usize {
        1 + vlq_len(self.length)
    }

    /// Size of the prefix plus its payload.
    pub fn block_len(&self) -> u64 {
        self.encoded_len() as u64 + self.length
    }
}
