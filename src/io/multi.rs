//! Cursor over several buffers joined end to end.

use super::{check_range, DurableInput, Input, SingleBufferInput, Slice};
use crate::error::{Error, Result};
use bytes::{Buf, Bytes, BytesMut};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A cursor presenting many [`Bytes`] buffers as one stream.
///
/// Buffers are keyed by their absolute start offset, so locating the buffer
/// that holds a position is a `floor` lookup, O(log N) in the number of
/// buffers. After every operation the current buffer contains the position,
/// unless the position equals the size.
///
/// Fixed-width reads that straddle two buffers are assembled in a stack
/// scratch array by [`Buf`]'s provided getters, so they never allocate.
#[derive(Debug, Clone)]
pub struct MultiBufferInput {
    bounds: Arc<Slice>,
    buffers: Arc<BTreeMap<u64, Bytes>>,
    size: u64,
    /// Absolute start of `curr`.
    offset: u64,
    curr: Bytes,
    curr_pos: usize,
}

impl MultiBufferInput {
    /// Join `buffers` in order. Their total length must equal `bounds.size()`.
    pub fn new<I: IntoIterator<Item = Bytes>>(buffers: I, bounds: Arc<Slice>) -> Self {
        let mut map = BTreeMap::new();
        let mut size = 0u64;
        for buffer in buffers {
            if buffer.is_empty() {
                continue;
            }
            let len = buffer.len() as u64;
            map.insert(size, buffer);
            size += len;
        }
        debug_assert_eq!(size, bounds.size());

        let mut input = Self {
            bounds,
            buffers: Arc::new(map),
            size,
            offset: 0,
            curr: Bytes::new(),
            curr_pos: 0,
        };
        input.update_curr(0);
        input
    }

    /// Number of underlying buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn floor(&self, position: u64) -> Option<(u64, &Bytes)> {
        self.buffers.range(..=position).next_back().map(|(offset, buffer)| (*offset, buffer))
    }

    fn update_curr(&mut self, position: u64) {
        let (offset, curr) = match self.floor(position) {
            Some((offset, buffer)) => (offset, buffer.clone()),
            None => (0, Bytes::new()),
        };
        self.offset = offset;
        self.curr_pos = (position - offset) as usize;
        self.curr = curr;
    }
}

impl Buf for MultiBufferInput {
    fn remaining(&self) -> usize {
        (self.size - self.position()) as usize
    }

    fn chunk(&self) -> &[u8] {
        &self.curr[self.curr_pos..]
    }

    fn advance(&mut self, mut cnt: usize) {
        assert!(
            cnt <= self.remaining(),
            "cannot advance past `remaining`: {:?} <= {:?}",
            cnt,
            self.remaining()
        );
        while cnt > 0 {
            let available = self.curr.len() - self.curr_pos;
            if cnt < available {
                self.curr_pos += cnt;
                return;
            }
            cnt -= available;
            self.curr_pos = self.curr.len();
            let position = self.position();
            if position < self.size {
                self.update_curr(position);
            }
        }
    }

    fn copy_to_bytes(&mut self, len: usize) -> Bytes {
        assert!(len <= self.remaining(), "`len` greater than remaining");
        if len <= self.curr.len() - self.curr_pos {
            let out = self.curr.slice(self.curr_pos..self.curr_pos + len);
            self.advance(len);
            return out;
        }

        let mut out = BytesMut::with_capacity(len);
        let mut left = len;
        while left > 0 {
            let chunk = self.chunk();
            let n = chunk.len().min(left);
            out.extend_from_slice(&chunk[..n]);
            self.advance(n);
            left -= n;
        }
        out.freeze()
    }
}

impl DurableInput for MultiBufferInput {
    fn bounds(&self) -> &Arc<Slice> {
        &self.bounds
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn position(&self) -> u64 {
        self.offset + self.curr_pos as u64
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.size {
            return Err(Error::OutOfBounds { start: position, end: position, size: self.size });
        }
        self.update_curr(position);
        Ok(())
    }

    fn duplicate(&self) -> Input {
        Input::Multi(self.clone())
    }

    fn slice(&self, start: u64, end: u64) -> Result<Input> {
        check_range(start, end, self.size)?;
        let bounds = Slice::child(&self.bounds, start, end);
        let length = end - start;
        if length == 0 {
            return Ok(Input::Single(SingleBufferInput::new(Bytes::new(), bounds)));
        }

        let (first_offset, first) = self
            .floor(start)
            .ok_or_else(|| Error::internal(format!("no buffer holds offset {}", start)))?;
        let head = first.slice((start - first_offset) as usize..);
        if length <= head.len() as u64 {
            let bytes = head.slice(..length as usize);
            return Ok(Input::Single(SingleBufferInput::new(bytes, bounds)));
        }

        let (last_offset, last) = self
            .floor(end - 1)
            .ok_or_else(|| Error::internal(format!("no buffer holds offset {}", end - 1)))?;
        debug_assert!(
            end - last_offset <= last.len() as u64,
            "slice [{}, {}) overruns the buffer at {}",
            start,
            end,
            last_offset
        );
        let tail = last.slice(..(end - last_offset) as usize);

        let mut buffers = Vec::with_capacity(2);
        buffers.push(head);
        buffers.extend(self.buffers.range(first_offset + 1..last_offset).map(|(_, b)| b.clone()));
        buffers.push(tail);

        Ok(Input::Multi(MultiBufferInput::new(buffers, bounds)))
    }
}
