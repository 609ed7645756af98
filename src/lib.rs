//! # Durable - Storage Core for Immutable Collections
//!
//! Durable is the on-disk layer beneath persistent, immutable collections.
//! It reads and writes framed blocks over zero-copy buffers, and turns
//! batches of typed values into lazily decoded, skippable sequences.
//!
//! ## Architecture
//!
//! The core consists of several layers:
//!
//! - **Input**: Seekable cursors over one or many reference-counted buffers
//! - **Framing**: Every block is tagged with a type and a VLQ length
//! - **Encodings**: Schema descriptors pairing a value type with a codec
//! - **Blocks**: Hash-map entry tables with delta-encoded hashes
//! - **Root**: The collection a block belongs to, threaded through decoding
//!
//! ## Example Usage
//!
//! ```rust
//! use durable::blocks::{HashEntry, HashMapEntries};
//! use durable::encoding::{self, Value};
//! use durable::io::DurableBuffer;
//! use durable::{EntriesChain, Root};
//!
//! # fn main() -> Result<(), durable::Error> {
//! let map = encoding::map(encoding::utf8(), encoding::int64());
//!
//! // Write a map as a chain of TABLE blocks
//! let entries = vec![
//!     HashEntry::hashed(Value::from("a"), Value::Int(1), &map)?,
//!     HashEntry::hashed(Value::from("b"), Value::Int(2), &map)?,
//! ];
//! let mut out = DurableBuffer::new();
//! HashMapEntries::encode_chain(entries, &map, &mut out)?;
//!
//! // Look a key up without decoding the other entries
//! let root = Root::new("example", out.into_input());
//! let key = Value::from("b");
//! let hash = map.key_encoding().unwrap().hash32(&key);
//! let chain = EntriesChain::new(root.input()?, &root, &map);
//! assert_eq!(HashMapEntries::get(chain, hash, &key)?, Some(Value::Int(2)));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod blocks;
pub mod config;
pub mod encoding;
pub mod error;
pub mod format;
pub mod io;
pub mod root;

// Re-exports
pub use blocks::{EntriesChain, HashDeltas, HashEntry, HashMapEntries, IndexRange};
pub use config::{CompressionType, Options};
pub use encoding::{Codec, Encoding, PrimitiveEncoding, SkippableIterator, Value};
pub use error::{Error, Result};
pub use format::{BlockPrefix, BlockType};
pub use io::{DurableBuffer, DurableInput, DurableOutput, Input};
pub use root::Root;
