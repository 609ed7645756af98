//! Encode/decode pairs for batches of primitive values.

use super::iter::{BoxedIterator, SkippableIterator};
use super::Value;
use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::format::BlockType;
use crate::io::{DurableBuffer, DurableInput, DurableOutput, Input};
use crate::root::Root;
use bytes::Buf;
use std::fmt;
use std::sync::Arc;

/// Writes one value.
pub type EncodeFn = Arc<dyn Fn(&Value, &mut dyn DurableOutput) -> Result<()> + Send + Sync>;

/// Reads one value from the cursor.
pub type DecodeFn = Arc<dyn Fn(&mut Input, &Root) -> Result<Value> + Send + Sync>;

/// Writes a whole batch.
pub type BatchEncodeFn = Arc<dyn Fn(&[Value], &mut dyn DurableOutput) -> Result<()> + Send + Sync>;

/// Opens an iterator over a whole encoded batch.
pub type BatchDecodeFn = Arc<dyn Fn(Input, &Root) -> Result<BoxedIterator> + Send + Sync>;

/// How a batch of values is laid out inside one block.
#[derive(Clone)]
pub enum Codec {
    /// Each value is wrapped in its own `PRIMITIVE` block, so skipping never
    /// decodes. For value formats that do not know their own length.
    Undelimited {
        /// Writes one value body.
        encode: EncodeFn,
        /// Reads one value body, given a cursor limited to it.
        decode: DecodeFn,
    },
    /// Values are packed back to back and must know where they end.
    /// Skipping decodes the value.
    SelfDelimited {
        /// Writes one self-terminating value.
        encode: EncodeFn,
        /// Reads one value, leaving the cursor just past it.
        decode: DecodeFn,
    },
    /// The encoder sees the whole batch and may apply block-level
    /// transforms.
    Batch {
        /// Writes the whole batch.
        encode: BatchEncodeFn,
        /// Opens an iterator over the whole block.
        decode: BatchDecodeFn,
    },
}

impl Codec {
    /// A codec that frames each value in its own `PRIMITIVE` block.
    pub fn undelimited<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&Value, &mut dyn DurableOutput) -> Result<()> + Send + Sync + 'static,
        D: Fn(&mut Input, &Root) -> Result<Value> + Send + Sync + 'static,
    {
        Codec::Undelimited { encode: Arc::new(encode), decode: Arc::new(decode) }
    }

    /// A codec whose values are packed back to back.
    pub fn self_delimited<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&Value, &mut dyn DurableOutput) -> Result<()> + Send + Sync + 'static,
        D: Fn(&mut Input, &Root) -> Result<Value> + Send + Sync + 'static,
    {
        Codec::SelfDelimited { encode: Arc::new(encode), decode: Arc::new(decode) }
    }

    /// A codec that encodes and decodes whole batches.
    pub fn batch<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&[Value], &mut dyn DurableOutput) -> Result<()> + Send + Sync + 'static,
        D: Fn(Input, &Root) -> Result<BoxedIterator> + Send + Sync + 'static,
    {
        Codec::Batch { encode: Arc::new(encode), decode: Arc::new(decode) }
    }

    /// Wraps this codec so its output is compressed as one unit.
    ///
    /// The payload is `type (1 byte) ∥ VLQ raw length ∥ compressed bytes`.
    /// Decoding decompresses the whole block before handing it to this codec.
    pub fn compressed(self, compression: CompressionType) -> Self {
        let inner = self.clone();
        let outer = self;
        Codec::batch(
            move |values, out| {
                let mut raw = DurableBuffer::new();
                inner.encode(values, &mut raw)?;
                let compressed = compress(compression, raw.as_slice())?;
                out.write_u8(compression as u8)?;
                out.write_vlq(raw.len() as u64)?;
                out.write_all(&compressed)
            },
            move |mut input, root| {
                let tag = input.read_u8()?;
                let compression = CompressionType::from_u8(tag)
                    .ok_or_else(|| Error::corruption(format!("invalid compression type {}", tag)))?;
                let raw_len = input.read_vlq()?;
                let len = input.remaining();
                let body = input.read_bytes(len)?;
                let raw = decompress(compression, &body)?;
                if raw.len() as u64 != raw_len {
                    return Err(Error::corruption(format!(
                        "decompressed {} bytes, expected {}",
                        raw.len(),
                        raw_len
                    )));
                }
                outer.decode(Input::from_bytes(raw), root)
            },
        )
    }

    /// Writes `values` in this codec's layout.
    pub fn encode(&self, values: &[Value], out: &mut dyn DurableOutput) -> Result<()> {
        match self {
            Codec::Undelimited { encode, .. } => {
                for value in values {
                    DurableBuffer::flush_to(out, BlockType::Primitive, |acc| encode(value, acc))?;
                }
                Ok(())
            }
            Codec::SelfDelimited { encode, .. } => {
                for value in values {
                    encode(value, out)?;
                }
                Ok(())
            }
            Codec::Batch { encode, .. } => encode(values, out),
        }
    }

    /// Opens a lazy iterator over the values in `input`, which holds exactly
    /// what [`encode`](Self::encode) wrote.
    pub fn decode(&self, input: Input, root: &Root) -> Result<BoxedIterator> {
        match self {
            Codec::Undelimited { decode, .. } => Ok(Box::new(UndelimitedIterator {
                input,
                root: root.clone(),
                decode: decode.clone(),
            })),
            Codec::SelfDelimited { decode, .. } => Ok(Box::new(SelfDelimitedIterator {
                input,
                root: root.clone(),
                decode: decode.clone(),
            })),
            Codec::Batch { decode, .. } => decode(input, root),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Codec::Undelimited { .. } => "Undelimited",
            Codec::SelfDelimited { .. } => "SelfDelimited",
            Codec::Batch { .. } => "Batch",
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

fn exhausted(input: &Input) -> Error {
    Error::EndOfInput { position: input.absolute_position(), needed: 1, remaining: 0 }
}

struct UndelimitedIterator {
    input: Input,
    root: Root,
    decode: DecodeFn,
}

impl SkippableIterator for UndelimitedIterator {
    fn has_next(&self) -> bool {
        self.input.has_remaining()
    }

    fn next_value(&mut self) -> Result<Value> {
        if !self.has_next() {
            return Err(exhausted(&self.input));
        }
        let mut block = self.input.slice_block(BlockType::Primitive)?;
        (self.decode)(&mut block, &self.root)
    }

    fn skip_next(&mut self) -> Result<()> {
        if !self.has_next() {
            return Err(exhausted(&self.input));
        }
        self.input.skip_block()
    }
}

struct SelfDelimitedIterator {
    input: Input,
    root: Root,
    decode: DecodeFn,
}

impl SkippableIterator for SelfDelimitedIterator {
    fn has_next(&self) -> bool {
        self.input.has_remaining()
    }

    fn next_value(&mut self) -> Result<Value> {
        if !self.has_next() {
            return Err(exhausted(&self.input));
        }
        (self.decode)(&mut self.input, &self.root)
    }

    // no length to jump over
    fn skip_next(&mut self) -> Result<()> {
        self.next_value().map(|_| ())
    }
}

fn compress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| Error::encoding(format!("Compression failed: {}", e))),
        #[cfg(feature = "lz4-compression")]
        CompressionType::Lz4 => lz4::block::compress(data, None, true)
            .map_err(|e| Error::encoding(format!("Compression failed: {}", e))),
    }
}

fn decompress(compression: CompressionType, data: &[u8]) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| Error::corruption(format!("Decompression failed: {}", e))),
        #[cfg(feature = "lz4-compression")]
        CompressionType::Lz4 => lz4::block::decompress(data, None)
            .map_err(|e| Error::corruption(format!("Decompression failed: {}", e))),
    }
}
