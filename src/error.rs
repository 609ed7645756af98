//! Error types for the durable storage layer.

use crate::format::BlockType;
use std::io;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for durable encode, decode and lookup operations.
///
/// Positions carried by the variants are absolute offsets into the outermost
/// stream, resolved through the [`Slice`](crate::io::Slice) parent chain.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A seek or slice fell outside the valid range.
    #[error("[{start}, {end}) is not within [0, {size}]")]
    OutOfBounds {
        /// Requested start offset.
        start: u64,
        /// Requested end offset.
        end: u64,
        /// Size of the input the request was made against.
        size: u64,
    },

    /// A read needed more bytes than the input has left.
    #[error("end of input at {position}: needed {needed} bytes, {remaining} remaining")]
    EndOfInput {
        /// Absolute position of the failed read.
        position: u64,
        /// Number of bytes the read needed.
        needed: usize,
        /// Number of bytes that were left.
        remaining: usize,
    },

    /// A framed block had a different type than the one expected.
    #[error("expected {expected} block at {position}, found {actual}")]
    UnexpectedBlockType {
        /// The block type the reader asked for.
        expected: BlockType,
        /// The block type found in the prefix.
        actual: BlockType,
        /// Absolute position of the block prefix.
        position: u64,
    },

    /// A block prefix or body is inconsistent with the bytes available.
    #[error("framing error at {position}: {message}")]
    Framing {
        /// Absolute position where the inconsistency was detected.
        position: u64,
        /// What was wrong.
        message: String,
    },

    /// A codec failed to encode or decode a value.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Data corruption was detected.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new encoding error.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Error::Encoding(msg.into())
    }

    /// Creates a new framing error at an absolute position.
    pub fn framing(position: u64, msg: impl Into<String>) -> Self {
        Error::Framing { position, message: msg.into() }
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Returns true for errors caused by block framing: a wrong block type or
    /// a length that disagrees with the bytes available.
    pub fn is_framing(&self) -> bool {
        matches!(self, Error::UnexpectedBlockType { .. } | Error::Framing { .. })
    }

    /// Returns true if a read ran past the end of its input.
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, Error::EndOfInput { .. })
    }

    /// Reinterprets an underflow inside a framed block as a framing error.
    ///
    /// A block whose declared length was honoured but whose body runs short is
    /// malformed, not merely exhausted.
    pub fn into_framing(self) -> Self {
        match self {
            Error::EndOfInput { position, needed, remaining } => Error::Framing {
                position,
                message: format!(
                    "truncated block: needed {} bytes, {} remaining",
                    needed, remaining
                ),
            },
            other => other,
        }
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::corruption("test corruption");
        assert_eq!(err.to_string(), "Data corruption: test corruption");

        let err = Error::OutOfBounds { start: 5, end: 3, size: 10 };
        assert_eq!(err.to_string(), "[5, 3) is not within [0, 10]");

        let err = Error::UnexpectedBlockType {
            expected: BlockType::Table,
            actual: BlockType::Primitive,
            position: 42,
        };
        assert!(err.to_string().contains("TABLE"));
        assert!(err.to_string().contains("PRIMITIVE"));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_into_framing() {
        let err = Error::EndOfInput { position: 7, needed: 4, remaining: 1 };
        assert!(err.is_end_of_input());

        let err = err.into_framing();
        assert!(err.is_framing());
        assert!(matches!(err, Error::Framing { position: 7, .. }));

        let err = Error::corruption("x").into_framing();
        assert!(matches!(err, Error::Corruption(_)));
    }
}
