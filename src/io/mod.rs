//! Zero-copy inputs and growable outputs.
//!
//! An input is a seekable cursor over one or more reference-counted
//! [`Bytes`] buffers, presented as a single logical byte stream. Slicing and
//! duplicating share the backing buffers; the bytes are freed when the last
//! cursor referencing them is dropped.
//!
//! Inputs implement [`bytes::Buf`], so `remaining()`, `has_remaining()` and
//! `chunk()` come from there. Fixed-width reads are big-endian.

mod multi;
mod output;
mod single;
mod slice;

pub use multi::MultiBufferInput;
pub use output::{DurableBuffer, DurableOutput, FileOutput};
pub use single::SingleBufferInput;
pub use slice::Slice;

use crate::config::Options;
use crate::error::{Error, Result};
use crate::format::{BlockPrefix, BlockType};
use bytes::{Buf, Bytes};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// A seekable, sliceable cursor over durable bytes.
pub trait DurableInput: Buf {
    /// The logical range of the outermost stream this cursor covers.
    fn bounds(&self) -> &Arc<Slice>;

    /// Total number of bytes covered by this cursor.
    fn size(&self) -> u64;

    /// Current offset, relative to the start of this cursor.
    fn position(&self) -> u64;

    /// Moves the cursor to `position`, which must lie within `[0, size]`.
    fn seek(&mut self, position: u64) -> Result<()>;

    /// An independent cursor over the same buffers, at the same position.
    fn duplicate(&self) -> Input;

    /// A new cursor over `[start, end)` of this one, positioned at its start.
    fn slice(&self, start: u64, end: u64) -> Result<Input>;

    /// Releases this cursor's references to its buffers.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self)
    }

    /// Current offset within the outermost stream.
    fn absolute_position(&self) -> u64 {
        self.bounds().absolute_start() + self.position()
    }

    /// Fails with [`Error::EndOfInput`] unless `needed` bytes remain.
    fn require(&self, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(Error::EndOfInput {
                position: self.absolute_position(),
                needed,
                remaining,
            });
        }
        Ok(())
    }

    /// Advances past `count` bytes.
    fn skip_bytes(&mut self, count: u64) -> Result<()> {
        if count > self.remaining() as u64 {
            return Err(Error::EndOfInput {
                position: self.absolute_position(),
                needed: count as usize,
                remaining: self.remaining(),
            });
        }
        let target = self.position() + count;
        self.seek(target)
    }

    /// Copies up to `dst.len()` bytes into `dst`, crossing buffer boundaries,
    /// and returns how many were copied.
    fn read(&mut self, dst: &mut [u8]) -> usize {
        let count = dst.len().min(self.remaining());
        self.copy_to_slice(&mut dst[..count]);
        count
    }

    /// Fills `dst` completely or fails without consuming anything.
    fn read_fully(&mut self, dst: &mut [u8]) -> Result<()> {
        self.require(dst.len())?;
        self.copy_to_slice(dst);
        Ok(())
    }

    /// Reads `len` bytes. Zero-copy when they lie within one buffer.
    fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.require(len)?;
        Ok(self.copy_to_bytes(len))
    }

    /// Reads one byte.
    fn read_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        Ok(self.get_u8())
    }

    /// Reads one signed byte.
    fn read_i8(&mut self) -> Result<i8> {
        self.require(1)?;
        Ok(self.get_i8())
    }

    /// Reads a big-endian `i16`.
    fn read_i16(&mut self) -> Result<i16> {
        self.require(2)?;
        Ok(self.get_i16())
    }

    /// Reads a big-endian `u16`.
    fn read_u16(&mut self) -> Result<u16> {
        self.require(2)?;
        Ok(self.get_u16())
    }

    /// Reads a UTF-16 code unit as a `char`. Unpaired surrogates are rejected.
    fn read_char(&mut self) -> Result<char> {
        let position = self.absolute_position();
        let unit = self.read_u16()?;
        char::from_u32(unit as u32).ok_or_else(|| {
            Error::encoding(format!("unpaired surrogate {:#06x} at {}", unit, position))
        })
    }

    /// Reads a big-endian `i32`.
    fn read_i32(&mut self) -> Result<i32> {
        self.require(4)?;
        Ok(self.get_i32())
    }

    /// Reads a big-endian `u32`.
    fn read_u32(&mut self) -> Result<u32> {
        self.require(4)?;
        Ok(self.get_u32())
    }

    /// Reads a big-endian `i64`.
    fn read_i64(&mut self) -> Result<i64> {
        self.require(8)?;
        Ok(self.get_i64())
    }

    /// Reads a big-endian `u64`.
    fn read_u64(&mut self) -> Result<u64> {
        self.require(8)?;
        Ok(self.get_u64())
    }

    /// Reads a big-endian IEEE-754 `f32`.
    fn read_f32(&mut self) -> Result<f32> {
        self.require(4)?;
        Ok(self.get_f32())
    }

    /// Reads a big-endian IEEE-754 `f64`.
    fn read_f64(&mut self) -> Result<f64> {
        self.require(8)?;
        Ok(self.get_f64())
    }

    /// Reads an unsigned variable-length quantity.
    fn read_vlq(&mut self) -> Result<u64> {
        let position = self.absolute_position();
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.read_u8()?;
            let payload = (byte & 0x7F) as u64;
            if shift > 63 || (shift == 63 && payload > 1) {
                return Err(Error::corruption(format!("VLQ at {} overflows 64 bits", position)));
            }
            result |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Reads a block prefix. Running out of bytes here is a framing error.
    fn read_prefix(&mut self) -> Result<BlockPrefix> {
        let tag = self.read_u8().map_err(Error::into_framing)?;
        let length = self.read_vlq().map_err(Error::into_framing)?;
        Ok(BlockPrefix::new(BlockType::from_u8(tag), length))
    }

    /// Reads the next block prefix without consuming it.
    fn peek_prefix(&mut self) -> Result<BlockPrefix> {
        let start = self.position();
        let prefix = self.read_prefix();
        self.seek(start)?;
        prefix
    }

    /// Slices the next block, which must be of type `expected`, and moves past it.
    ///
    /// On a type mismatch the cursor is left at the start of the block.
    fn slice_block(&mut self, expected: BlockType) -> Result<Input> {
        let start = self.position();
        let prefix = self.read_prefix()?;
        if prefix.block_type != expected {
            self.seek(start)?;
            return Err(Error::UnexpectedBlockType {
                expected,
                actual: prefix.block_type,
                position: self.bounds().absolute_start() + start,
            });
        }
        take_block(self, start, prefix)
    }

    /// Slices the next block of any type and moves past it.
    fn slice_prefixed_block(&mut self) -> Result<(BlockType, Input)> {
        let start = self.position();
        let prefix = self.read_prefix()?;
        let block = take_block(self, start, prefix)?;
        Ok((prefix.block_type, block))
    }

    /// Moves past the next block without decoding it.
    fn skip_block(&mut self) -> Result<()> {
        let start = self.position();
        let prefix = self.read_prefix()?;
        check_block_length(self, start, &prefix)?;
        let end = self.position() + prefix.length;
        self.seek(end)
    }
}

fn check_block_length<I: DurableInput + ?Sized>(
    input: &mut I,
    start: u64,
    prefix: &BlockPrefix,
) -> Result<()> {
    let remaining = input.remaining() as u64;
    if prefix.length > remaining {
        let position = input.bounds().absolute_start() + start;
        input.seek(start)?;
        return Err(Error::framing(
            position,
            format!(
                "{} block declares {} bytes but only {} remain",
                prefix.block_type, prefix.length, remaining
            ),
        ));
    }
    Ok(())
}

fn take_block<I: DurableInput + ?Sized>(
    input: &mut I,
    start: u64,
    prefix: BlockPrefix,
) -> Result<Input> {
    check_block_length(input, start, &prefix)?;
    let body = input.position();
    let end = body + prefix.length;
    let block = input.slice(body, end)?;
    input.seek(end)?;
    Ok(block)
}

pub(crate) fn check_range(start: u64, end: u64, size: u64) -> Result<()> {
    if start > end || end > size {
        return Err(Error::OutOfBounds { start, end, size });
    }
    Ok(())
}

/// A durable input over one buffer or many.
///
/// Slicing returns the single-buffer variant whenever the requested range lies
/// within one underlying buffer.
#[derive(Debug, Clone)]
pub enum Input {
    /// Cursor over one contiguous buffer.
    Single(SingleBufferInput),
    /// Cursor over several buffers joined end to end.
    Multi(MultiBufferInput),
}

impl Input {
    /// An input over a single buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let bounds = Slice::root(bytes.len() as u64);
        Input::Single(SingleBufferInput::new(bytes, bounds))
    }

    /// An input over `buffers` joined in order. Empty buffers are dropped.
    pub fn from_buffers<I: IntoIterator<Item = Bytes>>(buffers: I) -> Self {
        let mut buffers: Vec<Bytes> = buffers.into_iter().filter(|b| !b.is_empty()).collect();
        let size: u64 = buffers.iter().map(|b| b.len() as u64).sum();
        let bounds = Slice::root(size);

        if buffers.len() <= 1 {
            let bytes = buffers.pop().unwrap_or_default();
            Input::Single(SingleBufferInput::new(bytes, bounds))
        } else {
            Input::Multi(MultiBufferInput::new(buffers, bounds))
        }
    }

    /// Loads a file into buffers of `options.buffer_size` bytes.
    pub fn open<P: AsRef<Path>>(path: P, options: &Options) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();

        let mut buffers = Vec::new();
        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(options.buffer_size as u64) as usize;
            let mut buffer = vec![0u8; chunk];
            file.read_exact(&mut buffer)?;
            buffers.push(Bytes::from(buffer));
            remaining -= chunk as u64;
        }

        log::debug!("Loaded {:?}: {} bytes in {} buffers", path, len, buffers.len());
        Ok(Self::from_buffers(buffers))
    }

    /// Number of underlying buffers.
    pub fn buffer_count(&self) -> usize {
        match self {
            Input::Single(_) => 1,
            Input::Multi(input) => input.buffer_count(),
        }
    }

    /// Returns true when the input spans more than one buffer.
    pub fn is_multi_buffer(&self) -> bool {
        matches!(self, Input::Multi(_))
    }
}

impl Buf for Input {
    fn remaining(&self) -> usize {
        match self {
            Input::Single(input) => input.remaining(),
            Input::Multi(input) => input.remaining(),
        }
    }

    fn chunk(&self) -> &[u8] {
        match self {
            Input::Single(input) => input.chunk(),
            Input::Multi(input) => input.chunk(),
        }
    }

    fn advance(&mut self, cnt: usize) {
        match self {
            Input::Single(input) => input.advance(cnt),
            Input::Multi(input) => input.advance(cnt),
        }
    }

    fn copy_to_bytes(&mut self, len: usize) -> Bytes {
        match self {
            Input::Single(input) => input.copy_to_bytes(len),
            Input::Multi(input) => input.copy_to_bytes(len),
        }
    }
}

impl DurableInput for Input {
    fn bounds(&self) -> &Arc<Slice> {
        match self {
            Input::Single(input) => input.bounds(),
            Input::Multi(input) => input.bounds(),
        }
    }

    fn size(&self) -> u64 {
        match self {
            Input::Single(input) => input.size(),
            Input::Multi(input) => input.size(),
        }
    }

    fn position(&self) -> u64 {
        match self {
            Input::Single(input) => input.position(),
            Input::Multi(input) => input.position(),
        }
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        match self {
            Input::Single(input) => input.seek(position),
            Input::Multi(input) => input.seek(position),
        }
    }

    fn duplicate(&self) -> Input {
        self.clone()
    }

    fn slice(&self, start: u64, end: u64) -> Result<Input> {
        match self {
            Input::Single(input) => input.slice(start, end),
            Input::Multi(input) => input.slice(start, end),
        }
    }
}
