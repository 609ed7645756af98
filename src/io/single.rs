//! Cursor over a single contiguous buffer.

use super::{check_range, DurableInput, Input, Slice};
use crate::error::{Error, Result};
use bytes::{Buf, Bytes};
use std::sync::Arc;

/// A cursor over one [`Bytes`] buffer.
#[derive(Debug, Clone)]
pub struct SingleBufferInput {
    bounds: Arc<Slice>,
    bytes: Bytes,
    position: usize,
}

impl SingleBufferInput {
    /// Create a cursor over `bytes`, which must be exactly `bounds.size()` long.
    pub fn new(bytes: Bytes, bounds: Arc<Slice>) -> Self {
        debug_assert_eq!(bytes.len() as u64, bounds.size());
        Self { bounds, bytes, position: 0 }
    }

    /// The underlying buffer.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl Buf for SingleBufferInput {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn chunk(&self) -> &[u8] {
        &self.bytes[self.position..]
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= self.remaining(),
            "cannot advance past `remaining`: {:?} <= {:?}",
            cnt,
            self.remaining()
        );
        self.position += cnt;
    }

    fn copy_to_bytes(&mut self, len: usize) -> Bytes {
        assert!(len <= self.remaining(), "`len` greater than remaining");
        let out = self.bytes.slice(self.position..self.position + len);
        self.position += len;
        out
    }
}

impl DurableInput for SingleBufferInput {
    fn bounds(&self) -> &Arc<Slice> {
        &self.bounds
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.size() {
            return Err(Error::OutOfBounds { start: position, end: position, size: self.size() });
        }
        self.position = position as usize;
        Ok(())
    }

    fn duplicate(&self) -> Input {
        Input::Single(self.clone())
    }

    fn slice(&self, start: u64, end: u64) -> Result<Input> {
        check_range(start, end, self.size())?;
        let bytes = self.bytes.slice(start as usize..end as usize);
        let bounds = Slice::child(&self.bounds, start, end);
        Ok(Input::Single(SingleBufferInput::new(bytes, bounds)))
    }
}
