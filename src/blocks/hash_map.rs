//! Hash-map entries blocks.
//!
//! A persistent hash map is stored as a chain of `TABLE` blocks, each holding
//! a contiguous run of entries in ascending hash order.
//!
//! ## Block Format
//!
//! ```text
//! [entry_offset: VLQ]          // entries preceding this block in the map
//! [hashes: DELTAS block]       // one 32-bit hash per entry
//! [keys: PRIMITIVE block]      // written by the key encoding
//! [values: PRIMITIVE block]    // written by the value encoding
//! ```
//!
//! Keys and values are sliced but not decoded until a lookup needs them.

use super::hash_deltas::{HashDeltas, HashDeltasWriter, IndexRange};
use crate::config::Options;
use crate::encoding::{encode_block, BoxedIterator, Encoding, Value};
use crate::error::{Error, Result};
use crate::format::BlockType;
use crate::io::{DurableBuffer, DurableInput, DurableOutput, Input};
use crate::root::Root;
use bytes::Buf;
use std::borrow::Borrow;

/// One map entry with its precomputed key hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    /// 32-bit hash of the key.
    pub hash: u32,
    /// The key.
    pub key: Value,
    /// The value.
    pub value: Value,
}

impl HashEntry {
    /// An entry with an explicit hash.
    pub fn new(hash: u32, key: Value, value: Value) -> Self {
        Self { hash, key, value }
    }

    /// An entry hashed with the key encoding of `encoding`.
    pub fn hashed(key: Value, value: Value, encoding: &Encoding) -> Result<Self> {
        let hash = key_encoding(encoding)?.hash32(&key);
        Ok(Self { hash, key, value })
    }
}

fn key_encoding(encoding: &Encoding) -> Result<Encoding> {
    encoding.key_encoding().ok_or_else(|| {
        Error::invalid_argument(format!("{} is not a map encoding", encoding.description()))
    })
}

fn value_encoding(encoding: &Encoding) -> Result<Encoding> {
    encoding.value_encoding().ok_or_else(|| {
        Error::invalid_argument(format!("{} is not a map encoding", encoding.description()))
    })
}

/// A decoded hash-map entries block.
#[derive(Debug, Clone)]
pub struct HashMapEntries {
    entry_offset: u64,
    hashes: HashDeltas,
    keys: Input,
    values: Input,
    key_encoding: Encoding,
    value_encoding: Encoding,
    root: Root,
}

impl HashMapEntries {
    /// Writes `entries` as one `TABLE` block. `offset` is the number of
    /// entries preceding them in the map.
    pub fn encode(
        offset: u64,
        entries: &[HashEntry],
        encoding: &Encoding,
        out: &mut dyn DurableOutput,
    ) -> Result<()> {
        let key_encoding = key_encoding(encoding)?;
        let value_encoding = value_encoding(encoding)?;

        DurableBuffer::flush_to(out, BlockType::Table, |acc| {
            acc.write_vlq(offset)?;

            let mut hashes = HashDeltasWriter::new();
            entries.iter().for_each(|e| hashes.append(e.hash));
            hashes.flush_to(acc)?;

            let keys: Vec<Value> = entries.iter().map(|e| e.key.clone()).collect();
            encode_block(&keys, &key_encoding, acc)?;
            let values: Vec<Value> = entries.iter().map(|e| e.value.clone()).collect();
            encode_block(&values, &value_encoding, acc)
        })
    }

    /// Writes `entries` as a chain of blocks of at most the key encoding's
    /// block size, in ascending hash order. Entries with equal hashes keep
    /// their relative order. Returns the number of blocks written.
    pub fn encode_chain(
        mut entries: Vec<HashEntry>,
        encoding: &Encoding,
        out: &mut dyn DurableOutput,
    ) -> Result<usize> {
        let block_size = key_encoding(encoding)?.block_size().max(1);
        entries.sort_by_key(|e| e.hash);

        let mut offset = 0u64;
        let mut blocks = 0;
        for chunk in entries.chunks(block_size) {
            Self::encode(offset, chunk, encoding, out)?;
            offset += chunk.len() as u64;
            blocks += 1;
        }
        log::debug!(
            "Wrote {} entries of {} in {} blocks",
            offset,
            encoding.description(),
            blocks
        );
        Ok(blocks)
    }

    /// Reads the next `TABLE` block from `input`.
    ///
    /// Only the hashes are decoded; keys and values are captured as slices.
    /// Any shortfall inside the block is reported as a framing error.
    pub fn decode(input: &mut Input, root: &Root, encoding: &Encoding) -> Result<Self> {
        let mut block = input.slice_block(BlockType::Table)?;
        let position = block.bounds().absolute_start();

        let entry_offset = block.read_vlq().map_err(Error::into_framing)?;
        let hashes = HashDeltas::decode(&mut block).map_err(Error::into_framing)?;
        let keys = block.slice_block(BlockType::Primitive).map_err(Error::into_framing)?;
        let values = block.slice_block(BlockType::Primitive).map_err(Error::into_framing)?;
        if block.has_remaining() {
            return Err(Error::framing(
                block.absolute_position(),
                format!("{} trailing bytes in TABLE block", block.remaining()),
            ));
        }

        log::trace!(
            "Decoded TABLE block at {}: offset {}, {} entries",
            position,
            entry_offset,
            hashes.len()
        );
        Ok(Self {
            entry_offset,
            hashes,
            keys,
            values,
            key_encoding: key_encoding(encoding)?,
            value_encoding: value_encoding(encoding)?,
            root: root.clone(),
        })
    }

    /// Looks `key` up across consecutive blocks of one map.
    ///
    /// Stops at the first block that either holds the key or proves it
    /// absent. A missing key is `Ok(None)`, not an error.
    pub fn get<I, B>(blocks: I, hash: u32, key: &Value) -> Result<Option<Value>>
    where
        I: IntoIterator<Item = Result<B>>,
        B: Borrow<HashMapEntries>,
    {
        for block in blocks {
            let block = block?;
            let entries: &HashMapEntries = block.borrow();
            let candidates = entries.hashes.candidate_indices(hash);
            match entries.local_index_of(&candidates, key)? {
                Some(index) => return entries.value_at(index).map(Some),
                None if candidates.is_bounded => return Ok(None),
                None => {}
            }
        }
        Ok(None)
    }

    /// Like [`get`](Self::get), returning `default` when the key is missing.
    pub fn get_or<I, B>(blocks: I, hash: u32, key: &Value, default: Value) -> Result<Value>
    where
        I: IntoIterator<Item = Result<B>>,
        B: Borrow<HashMapEntries>,
    {
        Ok(Self::get(blocks, hash, key)?.unwrap_or(default))
    }

    /// The index of `key` within the whole map.
    pub fn index_of<I, B>(blocks: I, hash: u32, key: &Value) -> Result<Option<u64>>
    where
        I: IntoIterator<Item = Result<B>>,
        B: Borrow<HashMapEntries>,
    {
        for block in blocks {
            let block = block?;
            let entries: &HashMapEntries = block.borrow();
            let candidates = entries.hashes.candidate_indices(hash);
            match entries.local_index_of(&candidates, key)? {
                Some(index) => return Ok(Some(entries.entry_offset + index)),
                None if candidates.is_bounded => return Ok(None),
                None => {}
            }
        }
        Ok(None)
    }

    /// Scans `candidates` for a key equal to `key` under the key encoding.
    pub fn local_index_of(&self, candidates: &IndexRange, key: &Value) -> Result<Option<u64>> {
        let range = match candidates.candidates() {
            Some(range) => range,
            None => return Ok(None),
        };

        let mut keys = self.key_iter()?;
        keys.skip_n(range.start as u64)?;
        for index in range {
            if !keys.has_next() {
                return Err(self.count_mismatch("keys", index as u64));
            }
            let candidate = keys.next_value()?;
            if self.key_encoding.equals(&candidate, key) {
                return Ok(Some(index as u64));
            }
        }
        Ok(None)
    }

    /// The entry at local index `index`.
    pub fn nth(&self, index: u64) -> Result<HashEntry> {
        let hash = self.hashes.nth(index).ok_or(Error::OutOfBounds {
            start: index,
            end: index.saturating_add(1),
            size: self.len() as u64,
        })?;
        let mut keys = self.key_iter()?;
        keys.skip_n(index)?;
        Ok(HashEntry { hash, key: keys.next_value()?, value: self.value_at(index)? })
    }

    /// Iterates over the block's entries, starting at local index `dropped`.
    pub fn entries(&self, dropped: u64) -> Result<Entries> {
        let dropped = dropped.min(self.len() as u64);
        let mut keys = self.key_iter()?;
        keys.skip_n(dropped)?;
        let mut values = self.value_iter()?;
        values.skip_n(dropped)?;
        Ok(Entries {
            hashes: self.hashes.clone(),
            index: dropped,
            keys,
            values,
            done: false,
        })
    }

    /// Checks that the hashes, keys and values have the same length.
    pub fn verify(&self) -> Result<()> {
        let expected = self.len() as u64;
        for (what, mut it) in [("keys", self.key_iter()?), ("values", self.value_iter()?)] {
            let mut count = 0u64;
            while it.has_next() {
                it.skip_next()?;
                count += 1;
            }
            if count != expected {
                return Err(self.count_mismatch(what, count));
            }
        }
        Ok(())
    }

    /// Number of entries, as recorded by the hashes.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns true if the block holds no entries.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Number of entries preceding this block in the map.
    pub fn entry_offset(&self) -> u64 {
        self.entry_offset
    }

    /// The entries' hashes.
    pub fn hashes(&self) -> &HashDeltas {
        &self.hashes
    }

    /// The root this block was decoded under.
    pub fn root(&self) -> &Root {
        &self.root
    }

    fn key_iter(&self) -> Result<BoxedIterator> {
        self.key_encoding.decode(self.keys.duplicate(), &self.root)
    }

    fn value_iter(&self) -> Result<BoxedIterator> {
        self.value_encoding.decode(self.values.duplicate(), &self.root)
    }

    fn value_at(&self, index: u64) -> Result<Value> {
        let mut values = self.value_iter()?;
        values.skip_n(index)?;
        if !values.has_next() {
            return Err(self.count_mismatch("values", index));
        }
        values.next_value()
    }

    fn count_mismatch(&self, what: &str, count: u64) -> Error {
        Error::corruption(format!(
            "TABLE block at offset {} has {} hashes but {} {}",
            self.entry_offset,
            self.len(),
            count,
            what
        ))
    }
}

/// Iterator over the entries of one block, driving the hashes, keys and
/// values in lockstep.
pub struct Entries {
    hashes: HashDeltas,
    index: u64,
    keys: BoxedIterator,
    values: BoxedIterator,
    done: bool,
}

impl Entries {
    fn mismatch(&mut self) -> Option<Result<HashEntry>> {
        self.done = true;
        Some(Err(Error::corruption(format!(
            "hash, key and value counts disagree at entry {}",
            self.index
        ))))
    }
}

impl Iterator for Entries {
    type Item = Result<HashEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let hash = match self.hashes.nth(self.index) {
            Some(hash) => hash,
            None => {
                if self.keys.has_next() || self.values.has_next() {
                    return self.mismatch();
                }
                self.done = true;
                return None;
            }
        };
        if !self.keys.has_next() || !self.values.has_next() {
            return self.mismatch();
        }

        let entry = self.keys.next_value().and_then(|key| {
            let value = self.values.next_value()?;
            Ok(HashEntry { hash, key, value })
        });
        self.index += 1;
        if entry.is_err() {
            self.done = true;
        }
        Some(entry)
    }
}

/// Walks consecutive `TABLE` blocks of one map, decoding each lazily.
///
/// Iteration stops after the first malformed block.
pub struct EntriesChain {
    input: Input,
    root: Root,
    encoding: Encoding,
    verify: bool,
    failed: bool,
}

impl EntriesChain {
    /// Walk the blocks in `input`, which holds nothing but the chain.
    pub fn new(input: Input, root: &Root, encoding: &Encoding) -> Self {
        Self { input, root: root.clone(), encoding: encoding.clone(), verify: false, failed: false }
    }

    /// Apply `options`; `verify_blocks` checks every block's counts as it is
    /// decoded.
    pub fn with_options(mut self, options: &Options) -> Self {
        self.verify = options.verify_blocks;
        self
    }

    fn decode_next(&mut self) -> Result<HashMapEntries> {
        let entries = HashMapEntries::decode(&mut self.input, &self.root, &self.encoding)?;
        if self.verify {
            entries.verify()?;
        }
        Ok(entries)
    }
}

impl Iterator for EntriesChain {
    type Item = Result<HashMapEntries>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || !self.input.has_remaining() {
            return None;
        }
        let position = self.input.absolute_position();
        let result = self.decode_next();
        if let Err(e) = &result {
            log::warn!("Malformed TABLE block at {} in {}: {}", position, self.root.description(), e);
            self.failed = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{self, int32, utf8};

    fn map_encoding() -> Encoding {
        encoding::map(utf8(), int32())
    }

    fn scenario_entries() -> Vec<HashEntry> {
        vec![
            HashEntry::new(1, Value::from("a"), Value::Int(1)),
            HashEntry::new(2, Value::from("b"), Value::Int(2)),
            HashEntry::new(1, Value::from("c"), Value::Int(3)),
        ]
    }

    fn block(offset: u64, entries: &[HashEntry]) -> HashMapEntries {
        let mut out = DurableBuffer::new();
        HashMapEntries::encode(offset, entries, &map_encoding(), &mut out).unwrap();
        let mut input = out.into_input();
        let block = HashMapEntries::decode(&mut input, &Root::detached(), &map_encoding()).unwrap();
        assert!(!input.has_remaining());
        block
    }

    fn one(block: &HashMapEntries) -> Vec<Result<&HashMapEntries>> {
        vec![Ok(block)]
    }

    #[test]
    fn test_get_within_block() {
        let block = block(10, &scenario_entries());
        assert_eq!(HashMapEntries::get(one(&block), 1, &Value::from("c")).unwrap(), Some(Value::Int(3)));
        assert_eq!(HashMapEntries::get(one(&block), 1, &Value::from("a")).unwrap(), Some(Value::Int(1)));
        assert_eq!(HashMapEntries::get(one(&block), 1, &Value::from("x")).unwrap(), None);
        assert_eq!(
            HashMapEntries::get_or(one(&block), 1, &Value::from("x"), Value::Null).unwrap(),
            Value::Null
        );
        assert_eq!(HashMapEntries::index_of(one(&block), 2, &Value::from("b")).unwrap(), Some(11));
    }

    #[test]
    fn test_entries_and_nth() {
        let entries = scenario_entries();
        let block = block(0, &entries);
        assert_eq!(block.len(), 3);
        block.verify().unwrap();

        let all: Vec<HashEntry> = block.entries(0).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(all, entries);

        let tail: Vec<HashEntry> = block.entries(2).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(tail, entries[2..]);
        assert_eq!(block.entries(9).unwrap().count(), 0);

        assert_eq!(block.nth(1).unwrap(), entries[1]);
        assert!(matches!(block.nth(3), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn test_empty_block() {
        let block = block(0, &[]);
        assert!(block.is_empty());
        assert_eq!(block.entries(0).unwrap().count(), 0);
        assert_eq!(HashMapEntries::get(one(&block), 5, &Value::from("a")).unwrap(), None);
        block.verify().unwrap();
    }

    #[test]
    fn test_count_mismatch() {
        let mut out = DurableBuffer::new();
        DurableBuffer::flush_to(&mut out, BlockType::Table, |acc| {
            acc.write_vlq(0)?;
            let mut hashes = HashDeltasWriter::new();
            hashes.append(1);
            hashes.append(2);
            hashes.flush_to(acc)?;
            encode_block(&[Value::from("a")], &utf8().into(), acc)?;
            encode_block(&[Value::Int(1), Value::Int(2)], &int32().into(), acc)
        })
        .unwrap();

        let block =
            HashMapEntries::decode(&mut out.into_input(), &Root::detached(), &map_encoding()).unwrap();
        assert!(matches!(block.verify(), Err(Error::Corruption(_))));

        let results: Vec<Result<HashEntry>> = block.entries(0).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Corruption(_))));

        assert!(matches!(
            HashMapEntries::get(one(&block), 2, &Value::from("b")),
            Err(Error::Corruption(_))
        ));
    }

    #[test]
    fn test_not_a_map_encoding() {
        let mut out = DurableBuffer::new();
        let err = HashMapEntries::encode(0, &[], &int32().into(), &mut out).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
