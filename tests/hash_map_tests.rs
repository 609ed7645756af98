// Hash-Map Block Tests for Durable
// Lookups, iteration and failure modes over TABLE blocks and chains of them

use bytes::{Buf, Bytes};
use durable::blocks::{EntriesChain, HashDeltasWriter, HashEntry, HashMapEntries};
use durable::encoding::{self, Encoding, Value};
use durable::io::{DurableBuffer, DurableOutput, Input};
use durable::{BlockType, Error, Options, Result, Root};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

fn str_to_int() -> Encoding {
    encoding::map(encoding::utf8(), encoding::int32())
}

fn decode_one(bytes: Bytes, encoding: &Encoding) -> Result<HashMapEntries> {
    HashMapEntries::decode(&mut Input::from_bytes(bytes), &Root::detached(), encoding)
}

fn only(block: &HashMapEntries) -> Vec<Result<&HashMapEntries>> {
    vec![Ok(block)]
}

fn chain(bytes: &Bytes, encoding: &Encoding) -> EntriesChain {
    EntriesChain::new(Input::from_bytes(bytes.clone()), &Root::detached(), encoding)
}

/// Test lookups in a block whose hashes repeat out of order
#[test]
fn test_lookup_with_repeated_hash() {
    let map = str_to_int();
    let entries = vec![
        HashEntry::new(0x00000001, Value::from("a"), Value::Int(1)),
        HashEntry::new(0x00000002, Value::from("b"), Value::Int(2)),
        HashEntry::new(0x00000001, Value::from("c"), Value::Int(3)),
    ];
    let mut out = DurableBuffer::new();
    HashMapEntries::encode(100, &entries, &map, &mut out).unwrap();
    let block = decode_one(out.freeze(), &map).unwrap();

    assert_eq!(block.entry_offset(), 100);
    assert_eq!(
        HashMapEntries::get_or(only(&block), 0x00000001, &Value::from("c"), Value::Null).unwrap(),
        Value::Int(3)
    );
    assert_eq!(
        HashMapEntries::get_or(only(&block), 0x00000001, &Value::from("x"), Value::Null).unwrap(),
        Value::Null
    );
    assert_eq!(
        HashMapEntries::index_of(only(&block), 0x00000002, &Value::from("b")).unwrap(),
        Some(block.entry_offset() + 1)
    );
}

/// Test that a truncated TABLE block fails with a framing error
#[test]
fn test_truncated_table_block() {
    let map = str_to_int();
    let entries = vec![HashEntry::hashed(Value::from("key"), Value::Int(7), &map).unwrap()];
    let mut out = DurableBuffer::new();
    HashMapEntries::encode(0, &entries, &map, &mut out).unwrap();
    let bytes = out.freeze();

    // cut the outer block short
    for len in 0..bytes.len() {
        let err = decode_one(bytes.slice(..len), &map).unwrap_err();
        assert!(err.is_framing(), "length {}: {}", len, err);
    }

    // keep the outer frame consistent but drop the last byte of its body
    let body = &bytes[2..bytes.len() - 1];
    let mut out = DurableBuffer::new();
    out.write_block(BlockType::Table, body).unwrap();
    let err = decode_one(out.freeze(), &map).unwrap_err();
    assert!(err.is_framing(), "{}", err);
}

/// Test keys whose hashes collide but which are not equal
#[test]
fn test_hash_collisions() {
    let map = str_to_int();
    let entries: Vec<HashEntry> =
        (0..5).map(|i| HashEntry::new(42, Value::from(format!("k{}", i)), Value::Int(i))).collect();
    let mut out = DurableBuffer::new();
    HashMapEntries::encode(0, &entries, &map, &mut out).unwrap();
    let block = decode_one(out.freeze(), &map).unwrap();

    for i in 0..5 {
        let key = Value::from(format!("k{}", i));
        assert_eq!(HashMapEntries::get(only(&block), 42, &key).unwrap(), Some(Value::Int(i)));
        assert_eq!(HashMapEntries::index_of(only(&block), 42, &key).unwrap(), Some(i as u64));
    }
    assert_eq!(HashMapEntries::get(only(&block), 42, &Value::from("k9")).unwrap(), None);
}

/// Test a key at the end of a block whose hash is the block's maximum
#[test]
fn test_max_hash_continues_to_next_block() {
    let map = encoding::map(encoding::utf8().with_block_size(2), encoding::int32());
    let entries = vec![
        HashEntry::new(1, Value::from("a"), Value::Int(1)),
        HashEntry::new(5, Value::from("b"), Value::Int(2)),
        HashEntry::new(5, Value::from("c"), Value::Int(3)),
        HashEntry::new(9, Value::from("d"), Value::Int(4)),
    ];
    let mut out = DurableBuffer::new();
    assert_eq!(HashMapEntries::encode_chain(entries, &map, &mut out).unwrap(), 2);
    let bytes = out.freeze();

    // "c" shares the maximum hash of the first block but lives in the second
    let first = chain(&bytes, &map).next().unwrap().unwrap();
    let candidates = first.hashes().candidate_indices(5);
    assert!(!candidates.is_bounded);

    assert_eq!(HashMapEntries::get(chain(&bytes, &map), 5, &Value::from("c")).unwrap(), Some(Value::Int(3)));
    assert_eq!(HashMapEntries::index_of(chain(&bytes, &map), 5, &Value::from("c")).unwrap(), Some(2));
    assert_eq!(HashMapEntries::index_of(chain(&bytes, &map), 9, &Value::from("d")).unwrap(), Some(3));

    // below the first block's maximum, so the search stops there
    assert_eq!(HashMapEntries::get(chain(&bytes, &map), 3, &Value::from("z")).unwrap(), None);
    // past every block
    assert_eq!(HashMapEntries::get(chain(&bytes, &map), 10, &Value::from("z")).unwrap(), None);
}

/// Test that a bounded miss stops before malformed later blocks are read
#[test]
fn test_bounded_miss_stops_early() {
    let map = str_to_int();
    let mut out = DurableBuffer::new();
    let entries = [
        HashEntry::new(1, Value::from("a"), Value::Int(1)),
        HashEntry::new(9, Value::from("b"), Value::Int(2)),
    ];
    HashMapEntries::encode(0, &entries, &map, &mut out).unwrap();
    out.write_block(BlockType::Table, &[0xFF]).unwrap();
    let bytes = out.freeze();

    assert_eq!(HashMapEntries::index_of(chain(&bytes, &map), 4, &Value::from("x")).unwrap(), None);
    // an unbounded miss reaches the malformed block
    assert!(HashMapEntries::get(chain(&bytes, &map), 10, &Value::from("x")).is_err());
}

/// Test a randomized map split across many blocks and buffers
#[test]
fn test_randomized_chain() {
    env_logger::try_init().ok();
    let mut rng = StdRng::seed_from_u64(0xD0_4AB1E);
    let map = encoding::map(encoding::utf8().with_block_size(16), encoding::int64());

    let mut expected = HashMap::new();
    let mut entries = Vec::new();
    for i in 0..500i64 {
        let key = format!("key-{}", rng.random_range(0..100_000u32));
        if expected.contains_key(&key) {
            continue;
        }
        expected.insert(key.clone(), i);
        entries.push(HashEntry::hashed(Value::from(key), Value::Int(i), &map).unwrap());
    }

    let mut out = DurableBuffer::new();
    let blocks = HashMapEntries::encode_chain(entries, &map, &mut out).unwrap();
    assert_eq!(blocks, expected.len().div_ceil(16));

    // serve the chain from small, unevenly sized buffers
    let bytes = out.freeze();
    let mut buffers = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let end = (start + rng.random_range(1..64)).min(bytes.len());
        buffers.push(bytes.slice(start..end));
        start = end;
    }
    let root = Root::new("randomized", Input::from_buffers(buffers));
    let key_encoding = map.key_encoding().unwrap();

    let lookup = |key: &Value| {
        let chain = EntriesChain::new(root.input().unwrap(), &root, &map);
        HashMapEntries::get(chain, key_encoding.hash32(key), key).unwrap()
    };
    for (key, value) in &expected {
        assert_eq!(lookup(&Value::from(key.as_str())), Some(Value::Int(*value)), "{}", key);
    }
    for i in 0..50 {
        assert_eq!(lookup(&Value::from(format!("absent-{}", i))), None);
    }

    // every entry appears once, in ascending hash order, with consecutive offsets
    let mut seen = 0u64;
    let mut last_hash = 0u32;
    for block in EntriesChain::new(root.input().unwrap(), &root, &map) {
        let block = block.unwrap();
        assert_eq!(block.entry_offset(), seen);
        for entry in block.entries(0).unwrap() {
            let entry = entry.unwrap();
            assert!(entry.hash >= last_hash);
            last_hash = entry.hash;
            assert_eq!(expected[entry.key.as_str().unwrap()], entry.value.as_int().unwrap());
            seen += 1;
        }
    }
    assert_eq!(seen, expected.len() as u64);
}

/// Test that verification catches count mismatches while walking a chain
#[test]
fn test_chain_verification() {
    env_logger::try_init().ok();
    let map = str_to_int();
    let mut out = DurableBuffer::new();
    DurableBuffer::flush_to(&mut out, BlockType::Table, |acc| {
        acc.write_vlq(0)?;
        // one hash but no keys or values
        let mut writer = HashDeltasWriter::new();
        writer.append(1);
        writer.flush_to(acc)?;
        encoding::encode_block(&[], &encoding::utf8().into(), acc)?;
        encoding::encode_block(&[], &encoding::int32().into(), acc)
    })
    .unwrap();
    let bytes = out.freeze();

    // lazily, the block decodes
    assert!(chain(&bytes, &map).next().unwrap().is_ok());

    // with verification the walk fails and then stops
    let options = Options::default().verify_blocks(true);
    let mut verified = chain(&bytes, &map).with_options(&options);
    assert!(matches!(verified.next(), Some(Err(Error::Corruption(_)))));
    assert!(verified.next().is_none());
}

/// Test entries iteration with a dropped prefix and nth access
#[test]
fn test_entries_dropped_and_nth() {
    let map = encoding::map(encoding::int64(), encoding::bytes());
    let entries: Vec<HashEntry> = (0..10i64)
        .map(|i| HashEntry::hashed(Value::Int(i), Value::from(vec![i as u8; i as usize]), &map).unwrap())
        .collect();
    let mut out = DurableBuffer::new();
    HashMapEntries::encode(0, &entries, &map, &mut out).unwrap();
    let mut input = out.into_input();
    let block = HashMapEntries::decode(&mut input, &Root::detached(), &map).unwrap();
    assert!(!input.has_remaining());

    let tail: Vec<HashEntry> = block.entries(7).unwrap().collect::<Result<_>>().unwrap();
    assert_eq!(tail, entries[7..]);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(&block.nth(i as u64).unwrap(), entry);
    }
}

/// Test a chain written to a file and read back in small segments
#[test]
fn test_chain_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("map.durable");
    let options = Options::default().buffer_size(32).verify_blocks(true);
    let map = encoding::map(encoding::int64().with_block_size(8), encoding::utf8());

    let entries: Vec<HashEntry> = (0..40i64)
        .map(|i| HashEntry::hashed(Value::Int(i), Value::from(format!("v{}", i)), &map).unwrap())
        .collect();
    let mut out = durable::io::FileOutput::create(&path, &options).unwrap();
    assert_eq!(HashMapEntries::encode_chain(entries, &map, &mut out).unwrap(), 5);
    let size = out.finish().unwrap();

    let root = Root::open(&path, &options).unwrap();
    assert_eq!(root.size(), size);
    let key_encoding = map.key_encoding().unwrap();
    for i in 0..40i64 {
        let key = Value::Int(i);
        let chain = EntriesChain::new(root.input().unwrap(), &root, &map).with_options(&options);
        let value = HashMapEntries::get(chain, key_encoding.hash32(&key), &key).unwrap();
        assert_eq!(value, Some(Value::from(format!("v{}", i))));
    }
}
