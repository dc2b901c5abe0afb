//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Unknown type tag.
    #[error("invalid type tag 0x{tag:02x} at offset {offset}")]
    InvalidTag {
        /// The tag byte found.
        tag: u8,
        /// Offset of the tag byte.
        offset: usize,
    },

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// A zero byte not followed by a valid escape or terminator.
    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape {
        /// Offset of the offending zero byte.
        offset: usize,
    },

    /// Input continues after a complete value.
    #[error("{count} trailing bytes after value")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        count: usize,
    },
}

impl CodecError {
    /// Create an invalid tag error.
    pub fn invalid_tag(tag: u8, offset: usize) -> Self {
        Self::InvalidTag { tag, offset }
    }

    /// Create an invalid escape error.
    pub fn invalid_escape(offset: usize) -> Self {
        Self::InvalidEscape { offset }
    }

    /// Create a trailing bytes error.
    pub fn trailing_bytes(count: usize) -> Self {
        Self::TrailingBytes { count }
    }
}
