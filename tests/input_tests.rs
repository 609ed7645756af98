// Input Tests for Durable
// These tests exercise cursors over single and multiple buffers

use bytes::{Buf, Bytes};
use durable::io::{DurableBuffer, DurableOutput, Input};
use durable::{BlockType, DurableInput, Error, Options, Root};
use tempfile::TempDir;

fn three_buffers() -> Input {
    Input::from_buffers(vec![
        Bytes::from_static(&[0x00, 0x00, 0x00]),
        Bytes::from_static(&[0x01, 0x02, 0x03, 0x04, 0x05]),
        Bytes::from_static(&[0x06, 0x07, 0x08, 0x09]),
    ])
}

/// Test fixed-width reads that start inside one buffer and end in the next
#[test]
fn test_reads_across_buffer_boundaries() {
    let mut input = three_buffers();
    assert_eq!(input.size(), 12);
    assert_eq!(input.buffer_count(), 3);

    input.seek(2).unwrap();
    assert_eq!(input.read_i32().unwrap(), 0x00010203);

    input.seek(6).unwrap();
    assert_eq!(input.read_i32().unwrap(), 0x04050607);

    input.seek(8).unwrap();
    assert_eq!(input.read_i32().unwrap(), 0x06070809);
    assert!(!input.has_remaining());
}

/// Test that every primitive decodes the same whether or not it is split
#[test]
fn test_cross_buffer_primitives_match_contiguous() {
    let mut out = DurableBuffer::new();
    out.write_i16(-2).unwrap();
    out.write_i32(0x12345678).unwrap();
    out.write_i64(-0x0102030405060708).unwrap();
    out.write_f32(1.5).unwrap();
    out.write_f64(-2.25).unwrap();
    out.write_char('Z').unwrap();
    let bytes = out.freeze();

    for split in 1..bytes.len() {
        let mut contiguous = Input::from_bytes(bytes.clone());
        let mut split_input = Input::from_buffers(vec![bytes.slice(..split), bytes.slice(split..)]);

        assert_eq!(contiguous.read_i16().unwrap(), split_input.read_i16().unwrap());
        assert_eq!(contiguous.read_i32().unwrap(), split_input.read_i32().unwrap());
        assert_eq!(contiguous.read_i64().unwrap(), split_input.read_i64().unwrap());
        assert_eq!(contiguous.read_f32().unwrap(), split_input.read_f32().unwrap());
        assert_eq!(contiguous.read_f64().unwrap(), split_input.read_f64().unwrap());
        assert_eq!(contiguous.read_char().unwrap(), split_input.read_char().unwrap());
        assert!(!split_input.has_remaining(), "split at {}", split);
    }
}

/// Test that a duplicated slice starts at zero and is independent
#[test]
fn test_slice_duplicate() {
    let input = Input::from_bytes((0u8..32).collect::<Vec<_>>());
    let slice = input.slice(10, 20).unwrap();
    let mut dup = slice.duplicate();

    assert_eq!(dup.position(), 0);
    assert_eq!(dup.size(), 10);
    assert_eq!(dup.bounds().absolute_start(), 10);

    dup.seek(5).unwrap();
    assert_eq!(dup.read_u8().unwrap(), 15);
    assert_eq!(slice.position(), 0, "duplicate must not move the original");
}

/// Test that nested slices match a single slice over the same range
#[test]
fn test_slice_commutativity() {
    let input = three_buffers();
    for a in 0..=12u64 {
        for b in a..=12 {
            let outer = input.slice(a, b).unwrap();
            for c in 0..=(b - a) {
                for d in c..=(b - a) {
                    let mut nested = outer.slice(c, d).unwrap();
                    let mut direct = input.slice(a + c, a + d).unwrap();
                    let len = (d - c) as usize;
                    assert_eq!(nested.read_bytes(len).unwrap(), direct.read_bytes(len).unwrap());
                    assert_eq!(nested.bounds().absolute_start(), a + c);
                }
            }
        }
    }
}

/// Test that seeking to any valid position reports that position
#[test]
fn test_seek_idempotence() {
    let mut input = three_buffers();
    for p in (0..=12).rev() {
        input.seek(p).unwrap();
        assert_eq!(input.position(), p);
        assert_eq!(input.remaining() as u64, 12 - p);
    }
    assert!(matches!(input.seek(13), Err(Error::OutOfBounds { .. })));
}

/// Test invalid slice ranges
#[test]
fn test_invalid_slices() {
    let input = three_buffers();
    assert!(matches!(input.slice(5, 4), Err(Error::OutOfBounds { start: 5, end: 4, size: 12 })));
    assert!(matches!(input.slice(0, 13), Err(Error::OutOfBounds { .. })));
    assert_eq!(input.slice(12, 12).unwrap().size(), 0);
}

/// Test that bulk reads cross every buffer
#[test]
fn test_bulk_read() {
    let mut input = three_buffers();
    input.seek(1).unwrap();
    let mut dst = [0u8; 16];
    assert_eq!(input.read(&mut dst), 11);
    assert_eq!(&dst[..11], &[0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(input.read(&mut dst), 0);
}

/// Test framed blocks whose bodies span buffers
#[test]
fn test_blocks_span_buffers() {
    let mut out = DurableBuffer::new();
    out.write_block(BlockType::Primitive, b"hello, world").unwrap();
    out.write_block(BlockType::Table, b"!").unwrap();
    let bytes = out.freeze();

    let chunks: Vec<Bytes> = (0..bytes.len()).step_by(3).map(|i| bytes.slice(i..(i + 3).min(bytes.len()))).collect();
    let mut input = Input::from_buffers(chunks);
    assert!(input.is_multi_buffer());

    let mut block = input.slice_block(BlockType::Primitive).unwrap();
    assert_eq!(block.read_bytes(12).unwrap().as_ref(), b"hello, world");
    assert_eq!(input.peek_prefix().unwrap().block_type, BlockType::Table);
    input.skip_block().unwrap();
    assert!(!input.has_remaining());
}

/// Test loading a file into several buffers
#[test]
fn test_open_file_in_segments() {
    env_logger::try_init().ok();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("segments.bin");
    let data: Vec<u8> = (0..100u8).collect();
    std::fs::write(&path, &data).unwrap();

    let options = Options::default().buffer_size(16);
    let mut input = Input::open(&path, &options).unwrap();
    assert_eq!(input.size(), 100);
    assert_eq!(input.buffer_count(), 7);

    input.seek(14).unwrap();
    assert_eq!(input.read_i32().unwrap(), i32::from_be_bytes([14, 15, 16, 17]));

    let root = Root::open(&path, &options).unwrap();
    assert_eq!(root.size(), 100);
    assert_eq!(root.slice(98, 100).unwrap().read_u16().unwrap(), u16::from_be_bytes([98, 99]));

    assert!(Input::open(dir.path().join("missing"), &options).is_err());
    assert!(Input::open(&path, &Options::default().buffer_size(0)).is_err());
}
