//! Structured blocks built on the framing and encoding layers.

pub mod hash_deltas;
pub mod hash_map;

pub use hash_deltas::{HashDeltas, HashDeltasWriter, IndexRange};
pub use hash_map::{Entries, EntriesChain, HashEntry, HashMapEntries};
