//! Configuration options for durable inputs and outputs.

use serde::{Deserialize, Serialize};

/// Default number of elements per physical block for the built-in encodings.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Default segment size when a file is loaded into memory (1MB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Configuration options for opening and writing durable collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Size of each buffer a file is split into when it is loaded.
    /// Inputs larger than one buffer are served by a multi-buffer cursor.
    /// Default: 1MB
    pub buffer_size: usize,

    /// Sync file outputs to disk when they are finished.
    /// Default: true
    pub sync_writes: bool,

    /// Eagerly check that the hash, key and value sequences of every hash-map
    /// block have the same length when a chain of blocks is walked.
    /// Default: false
    pub verify_blocks: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            sync_writes: true,
            verify_blocks: false,
        }
    }
}

/// Compression algorithms available to [`Codec::compressed`](crate::encoding::Codec::compressed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    None = 0,

    /// Snappy compression (fast, moderate compression ratio).
    #[cfg(feature = "snappy")]
    Snappy = 1,

    /// LZ4 compression (very fast, lower compression ratio).
    #[cfg(feature = "lz4-compression")]
    Lz4 = 2,
}

impl CompressionType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            #[cfg(feature = "snappy")]
            1 => Some(CompressionType::Snappy),
            #[cfg(feature = "lz4-compression")]
            2 => Some(CompressionType::Lz4),
            _ => None,
        }
    }
}

impl Default for CompressionType {
    fn default() -> Self {
        #[cfg(feature = "snappy")]
        return CompressionType::Snappy;

        #[cfg(not(feature = "snappy"))]
        CompressionType::None
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let options: Options = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Sets the buffer size used when loading files.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets whether finished file outputs are synced to disk.
    pub fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }

    /// Sets whether hash-map blocks are verified while a chain is walked.
    pub fn verify_blocks(mut self, value: bool) -> Self {
        self.verify_blocks = value;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.buffer_size == 0 {
            return Err(crate::Error::invalid_argument("buffer_size must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = Options::default();
        assert_eq!(opts.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(opts.sync_writes);
        assert!(!opts.verify_blocks);
    }

    #[test]
    fn test_options_builder() {
        let opts = Options::new().buffer_size(4096).sync_writes(false).verify_blocks(true);

        assert_eq!(opts.buffer_size, 4096);
        assert!(!opts.sync_writes);
        assert!(opts.verify_blocks);
    }

    #[test]
    fn test_options_validation() {
        let mut opts = Options::default();
        assert!(opts.validate().is_ok());

        opts.buffer_size = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_options_from_json() {
        let opts = Options::from_json(r#"{ "buffer_size": 512 }"#).unwrap();
        assert_eq!(opts.buffer_size, 512);
        assert!(opts.sync_writes);

        assert!(Options::from_json(r#"{ "buffer_size": 0 }"#).is_err());
        assert!(Options::from_json("not json").is_err());
    }

    #[test]
    fn test_compression_from_u8() {
        assert_eq!(CompressionType::from_u8(0), Some(CompressionType::None));
        assert_eq!(CompressionType::from_u8(200), None);
    }
}
