//! Output sinks.

use super::Input;
use crate::config::Options;
use crate::error::{Error, Result};
use crate::format::{BlockPrefix, BlockType, MAX_VLQ_LEN};
use bytes::{BufMut, Bytes, BytesMut};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A write-once sink for durable bytes. Fixed-width writes are big-endian.
pub trait DurableOutput {
    /// Appends `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Total number of bytes written so far.
    fn written(&self) -> u64;

    /// Writes one byte.
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value])
    }

    /// Writes a big-endian `i16`.
    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a big-endian `u16`.
    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a `char` as one UTF-16 code unit. Characters outside the basic
    /// multilingual plane need two units and are rejected.
    fn write_char(&mut self, value: char) -> Result<()> {
        let mut units = [0u16; 2];
        match value.encode_utf16(&mut units) {
            [unit] => self.write_u16(*unit),
            _ => Err(Error::encoding(format!("{:?} does not fit in one UTF-16 unit", value))),
        }
    }

    /// Writes a big-endian `i32`.
    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a big-endian `u32`.
    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a big-endian `i64`.
    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a big-endian `u64`.
    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a big-endian IEEE-754 `f32`.
    fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes a big-endian IEEE-754 `f64`.
    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// Writes an unsigned variable-length quantity.
    fn write_vlq(&mut self, value: u64) -> Result<()> {
        let mut scratch = [0u8; MAX_VLQ_LEN];
        let len = crate::format::vlq::encode_vlq_into(value, &mut scratch);
        self.write_all(&scratch[..len])
    }

    /// Writes a block prefix.
    fn write_prefix(&mut self, prefix: BlockPrefix) -> Result<()> {
        self.write_u8(prefix.block_type.as_u8())?;
        self.write_vlq(prefix.length)
    }

    /// Writes `body` as one framed block of `block_type`.
    fn write_block(&mut self, block_type: BlockType, body: &[u8]) -> Result<()> {
        self.write_prefix(BlockPrefix::new(block_type, body.len() as u64))?;
        self.write_all(body)
    }
}

/// A growable in-memory output.
///
/// Blocks are framed by accumulating their body here first, since the
/// prefix needs the body length.
#[derive(Debug, Default, Clone)]
pub struct DurableBuffer {
    buf: BytesMut,
}

impl DurableBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity) }
    }

    /// Runs `body` against a fresh buffer, then writes what it produced to
    /// `out` as one framed block of `block_type`.
    pub fn flush_to<F>(out: &mut dyn DurableOutput, block_type: BlockType, body: F) -> Result<()>
    where
        F: FnOnce(&mut DurableBuffer) -> Result<()>,
    {
        let mut acc = DurableBuffer::new();
        body(&mut acc)?;
        out.write_block(block_type, &acc.buf)
    }

    /// Number of bytes written
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The bytes written so far
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Freeze into an immutable, shareable buffer
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Freeze into an input positioned at the first byte
    pub fn into_input(self) -> Input {
        Input::from_bytes(self.freeze())
    }
}

impl DurableOutput for DurableBuffer {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.put_slice(bytes);
        Ok(())
    }

    fn written(&self) -> u64 {
        self.buf.len() as u64
    }
}

/// A buffered output backed by a file.
pub struct FileOutput {
    writer: BufWriter<File>,
    written: u64,
    sync: bool,
}

impl FileOutput {
    /// Create (or truncate) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, options: &Options) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self { writer: BufWriter::new(file), written: 0, sync: options.sync_writes })
    }

    /// Flush buffered bytes, sync if configured, and return the file size.
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        if self.sync {
            self.writer.get_ref().sync_all()?;
        }
        log::debug!("Finished durable file: {} bytes", self.written);
        Ok(self.written)
    }
}

impl DurableOutput for FileOutput {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }
}
