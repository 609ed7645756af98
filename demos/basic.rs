//! Basic usage example for Durable
//!
//! This example demonstrates the fundamental operations:
//! - Writing a map to a file as a chain of TABLE blocks
//! - Opening the file as a collection root
//! - Looking keys up without decoding the rest of the map
//! - Iterating every entry in hash order

use durable::blocks::{HashEntry, HashMapEntries};
use durable::encoding::{self, Value};
use durable::io::FileOutput;
use durable::{EntriesChain, Options, Root};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    // Read the file back in small buffers so blocks span several of them
    let options = Options::default().buffer_size(256).verify_blocks(true);
    let map = encoding::map(encoding::utf8().with_block_size(32), encoding::int64());

    let path = std::env::temp_dir().join("durable_basic_example.bin");

    // Write the map
    println!("Writing data...");
    let entries = (0..100i64)
        .map(|i| HashEntry::hashed(Value::from(format!("key{:03}", i)), Value::Int(i * i), &map))
        .collect::<Result<Vec<_>, _>>()?;
    let mut out = FileOutput::create(&path, &options)?;
    let blocks = HashMapEntries::encode_chain(entries, &map, &mut out)?;
    let size = out.finish()?;
    println!("Wrote {} blocks, {} bytes to {}", blocks, size, path.display());

    // Open it as a collection
    let root = Root::open(&path, &options)?;
    let key_encoding = map.key_encoding().ok_or("map encodings have a key encoding")?;

    // Look keys up
    println!("Reading data...");
    for key in ["key007", "key042", "missing"] {
        let key = Value::from(key);
        let chain = EntriesChain::new(root.input()?, &root, &map).with_options(&options);
        match HashMapEntries::get(chain, key_encoding.hash32(&key), &key)? {
            Some(value) => println!("{:?} => {:?}", key, value),
            None => println!("{:?} is not in the map", key),
        }
    }

    // Walk every entry
    let mut count = 0;
    for block in EntriesChain::new(root.input()?, &root, &map) {
        for entry in block?.entries(0)? {
            entry?;
            count += 1;
        }
    }
    println!("Iterated {} entries", count);

    std::fs::remove_file(&path)?;
    Ok(())
}
