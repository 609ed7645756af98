//! Encodings: how values of one schema type become framed blocks and come
//! back as lazy, skippable sequences.
//!
//! An [`Encoding`] is a descriptor. The one used to write a block must be
//! supplied again to read it; nothing about the schema is stored on disk
//! beyond the block framing.
//!
//! ## Example
//!
//! ```rust
//! use durable::encoding::{self, encode_block, decode_block, Encoding, Value};
//! use durable::io::DurableBuffer;
//! use durable::Root;
//!
//! # fn main() -> Result<(), durable::Error> {
//! let encoding: Encoding = encoding::utf8().into();
//! let mut out = DurableBuffer::new();
//! encode_block(&[Value::from("a"), Value::from("b")], &encoding, &mut out)?;
//!
//! let mut input = out.into_input();
//! let mut values = decode_block(&mut input, &Root::detached(), &encoding)?;
//! values.skip_next()?;
//! assert_eq!(values.next_value()?, Value::from("b"));
//! # Ok(())
//! # }
//! ```

pub mod builtin;
pub mod codec;
pub mod iter;
pub mod primitive;
pub mod tuple;
mod value;

pub use builtin::{bincode_values, bytes, float64, int32, int64, utf8};
pub use codec::Codec;
pub use iter::{BoxedIterator, SkippableIterator, Values, VecIterator};
pub use primitive::PrimitiveEncoding;
pub use tuple::{tuple, tuple_of, tuple_with_block_size};
pub use value::{default_hash, fold_hash, Value};

use crate::config::DEFAULT_BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::format::BlockType;
use crate::io::{DurableBuffer, DurableInput, DurableOutput, Input};
use crate::root::Root;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// The schema of a value: a primitive, or the shape of a collection.
#[derive(Clone)]
pub enum Encoding {
    /// Values with no structure visible to collections.
    Primitive(Arc<PrimitiveEncoding>),
    /// `List[element]`.
    List(Arc<Encoding>),
    /// `Set[element]`.
    Set(Arc<Encoding>),
    /// `Map[key, value]`.
    Map {
        /// Encoding of the keys.
        key: Arc<Encoding>,
        /// Encoding of the values.
        value: Arc<Encoding>,
    },
    /// One primitive encoding used for every key, value and element, as in
    /// schema-free collections.
    Unityped(Arc<PrimitiveEncoding>),
}

/// A primitive encoding.
pub fn primitive(description: impl Into<String>, block_size: usize, codec: Codec) -> PrimitiveEncoding {
    PrimitiveEncoding::new(description, block_size, codec)
}

/// `List[element]`.
pub fn list(element: impl Into<Encoding>) -> Encoding {
    Encoding::List(Arc::new(element.into()))
}

/// `Set[element]`.
pub fn set(element: impl Into<Encoding>) -> Encoding {
    Encoding::Set(Arc::new(element.into()))
}

/// `Map[key, value]`.
pub fn map(key: impl Into<Encoding>, value: impl Into<Encoding>) -> Encoding {
    Encoding::Map { key: Arc::new(key.into()), value: Arc::new(value.into()) }
}

/// An encoding whose keys, values and elements all use `primitive`.
pub fn unityped(primitive: PrimitiveEncoding) -> Encoding {
    Encoding::Unityped(Arc::new(primitive))
}

impl Encoding {
    /// Human-readable name, such as `Map[utf8, int32]`. A unityped encoding
    /// reports its primitive's name.
    pub fn description(&self) -> String {
        match self {
            Encoding::Primitive(p) => p.description().to_string(),
            Encoding::List(e) => format!("List[{}]", e.description()),
            Encoding::Set(e) => format!("Set[{}]", e.description()),
            Encoding::Map { key, value } => {
                format!("Map[{}, {}]", key.description(), value.description())
            }
            Encoding::Unityped(p) => p.description().to_string(),
        }
    }

    /// Target number of values per block. Collections use
    /// [`DEFAULT_BLOCK_SIZE`].
    pub fn block_size(&self) -> usize {
        match self {
            Encoding::Primitive(p) | Encoding::Unityped(p) => p.block_size(),
            Encoding::List(_) | Encoding::Set(_) | Encoding::Map { .. } => DEFAULT_BLOCK_SIZE,
        }
    }

    /// The primitive encoding, if this is one.
    pub fn as_primitive(&self) -> Option<&PrimitiveEncoding> {
        match self {
            Encoding::Primitive(p) | Encoding::Unityped(p) => Some(p),
            _ => None,
        }
    }

    /// Hash of `value`. Collections hash with [`default_hash`].
    pub fn hash(&self, value: &Value) -> u64 {
        match self.as_primitive() {
            Some(p) => p.hash(value),
            None => default_hash(value),
        }
    }

    /// The 32-bit hash stored in hash-map blocks.
    pub fn hash32(&self, value: &Value) -> u32 {
        fold_hash(self.hash(value))
    }

    /// Key equality.
    pub fn equals(&self, a: &Value, b: &Value) -> bool {
        match self.as_primitive() {
            Some(p) => p.equals(a, b),
            None => a == b,
        }
    }

    /// Value order.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match self.as_primitive() {
            Some(p) => p.compare(a, b),
            None => a.cmp(b),
        }
    }

    /// Whether `value` is stored once and referenced.
    pub fn is_singleton(&self, value: &Value) -> bool {
        self.as_primitive().map(|p| p.is_singleton(value)).unwrap_or(false)
    }

    /// Element encoding of a list or set.
    pub fn element_encoding(&self) -> Option<Encoding> {
        match self {
            Encoding::List(e) | Encoding::Set(e) => Some(e.as_ref().clone()),
            Encoding::Unityped(_) => Some(self.clone()),
            _ => None,
        }
    }

    /// Key encoding of a map.
    pub fn key_encoding(&self) -> Option<Encoding> {
        match self {
            Encoding::Map { key, .. } => Some(key.as_ref().clone()),
            Encoding::Unityped(_) => Some(self.clone()),
            _ => None,
        }
    }

    /// Value encoding of a map.
    pub fn value_encoding(&self) -> Option<Encoding> {
        match self {
            Encoding::Map { value, .. } => Some(value.as_ref().clone()),
            Encoding::Unityped(_) => Some(self.clone()),
            _ => None,
        }
    }

    /// Writes a batch of values. Only primitive encodings write values
    /// directly; collections are laid out by their own blocks.
    pub fn encode(&self, values: &[Value], out: &mut dyn DurableOutput) -> Result<()> {
        self.require_primitive()?.encode(values, out)
    }

    /// Opens a lazy iterator over a batch written by [`encode`](Self::encode).
    pub fn decode(&self, input: Input, root: &Root) -> Result<BoxedIterator> {
        self.require_primitive()?.decode(input, root)
    }

    fn require_primitive(&self) -> Result<&PrimitiveEncoding> {
        self.as_primitive().ok_or_else(|| {
            Error::encoding(format!("{} cannot encode values directly", self.description()))
        })
    }
}

impl From<PrimitiveEncoding> for Encoding {
    fn from(p: PrimitiveEncoding) -> Self {
        Encoding::Primitive(Arc::new(p))
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Writes `values` as one `PRIMITIVE` block.
pub fn encode_block(values: &[Value], encoding: &Encoding, out: &mut dyn DurableOutput) -> Result<()> {
    DurableBuffer::flush_to(out, BlockType::Primitive, |acc| encoding.encode(values, acc))
}

/// Slices the next `PRIMITIVE` block from `input` and opens an iterator over it.
pub fn decode_block(input: &mut Input, root: &Root, encoding: &Encoding) -> Result<BoxedIterator> {
    let block = input.slice_block(BlockType::Primitive)?;
    log::trace!("Decoding {} block of {} bytes", encoding.description(), block.size());
    encoding.decode(block, root)
}
