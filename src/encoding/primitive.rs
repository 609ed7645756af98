//! Primitive encodings: a codec plus the hashing, equality and ordering
//! used when values of that encoding are stored in durable collections.

use super::codec::Codec;
use super::iter::BoxedIterator;
use super::value::{default_hash, fold_hash};
use super::Value;
use crate::error::Result;
use crate::io::{DurableOutput, Input};
use crate::root::Root;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Hashes a value. Must agree with the paired equality.
pub type HashFn = Arc<dyn Fn(&Value) -> u64 + Send + Sync>;

/// Decides whether two values are the same key.
pub type EqualityFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Orders two values.
pub type Comparator = Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync>;

/// Flags values that are stored once and referenced.
pub type SingletonFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// An encoding for values with no internal structure visible to the
/// collections that hold them.
///
/// Encodings are descriptors, not data: the same encoding must be supplied
/// when reading a block as was used to write it.
#[derive(Clone)]
pub struct PrimitiveEncoding {
    description: String,
    block_size: usize,
    hash_fn: HashFn,
    equality_fn: EqualityFn,
    comparator: Comparator,
    singleton_fn: SingletonFn,
    codec: Codec,
}

impl PrimitiveEncoding {
    /// A primitive encoding using `codec`, hashing with [`default_hash`],
    /// comparing with `Value`'s own equality and order, and with no
    /// singleton values.
    pub fn new(description: impl Into<String>, block_size: usize, codec: Codec) -> Self {
        Self {
            description: description.into(),
            block_size,
            hash_fn: Arc::new(default_hash),
            equality_fn: Arc::new(|a: &Value, b: &Value| a == b),
            comparator: Arc::new(|a: &Value, b: &Value| a.cmp(b)),
            singleton_fn: Arc::new(|_: &Value| false),
            codec,
        }
    }

    /// Replaces the hash function.
    pub fn with_hash_fn<F>(mut self, hash_fn: F) -> Self
    where
        F: Fn(&Value) -> u64 + Send + Sync + 'static,
    {
        self.hash_fn = Arc::new(hash_fn);
        self
    }

    /// Replaces the equality function.
    pub fn with_equality_fn<F>(mut self, equality_fn: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.equality_fn = Arc::new(equality_fn);
        self
    }

    /// Replaces the comparator.
    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Arc::new(comparator);
        self
    }

    /// Replaces the singleton predicate.
    pub fn with_singleton_fn<F>(mut self, singleton_fn: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.singleton_fn = Arc::new(singleton_fn);
        self
    }

    /// Replaces the block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Human-readable name, for logging and schema checks.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Target number of values per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The codec values are written with.
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// The full 64-bit hash of `value`.
    pub fn hash(&self, value: &Value) -> u64 {
        (self.hash_fn)(value)
    }

    /// The 32-bit hash stored in hash-map blocks.
    pub fn hash32(&self, value: &Value) -> u32 {
        fold_hash(self.hash(value))
    }

    /// Key equality.
    pub fn equals(&self, a: &Value, b: &Value) -> bool {
        (self.equality_fn)(a, b)
    }

    /// Value order.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        (self.comparator)(a, b)
    }

    /// Whether `value` is stored once and referenced.
    pub fn is_singleton(&self, value: &Value) -> bool {
        (self.singleton_fn)(value)
    }

    /// Writes a batch of values.
    pub fn encode(&self, values: &[Value], out: &mut dyn DurableOutput) -> Result<()> {
        self.codec.encode(values, out)
    }

    /// Opens a lazy iterator over a batch written by [`encode`](Self::encode).
    pub fn decode(&self, input: Input, root: &Root) -> Result<BoxedIterator> {
        self.codec.decode(input, root)
    }
}

impl fmt::Debug for PrimitiveEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveEncoding")
            .field("description", &self.description)
            .field("block_size", &self.block_size)
            .field("codec", &self.codec)
            .finish()
    }
}
