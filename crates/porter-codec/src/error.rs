//! Error types for codec operations.

use thiserror::Error;

/// Errors produced while decoding base62 tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The token was empty.
    #[error("empty base62 token")]
    Empty,

    /// A character outside the 62-character alphabet.
    #[error("invalid base62 character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    /// The decoded value is wider than the requested width.
    #[error("decoded value needs {bits} bits, at most {max_bits} allowed")]
    Overflow { bits: u64, max_bits: u64 },
}

/// Convenience type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
