//! Base62 codec for porter.
//!
//! One source platform obfuscates the SHA-1 of every uploaded file as a
//! base62 token inside post bodies (`upload://<token>.<ext>`). This crate
//! converts between such tokens and arbitrary-precision integers, and between
//! tokens and fixed-width digests.
//!
//! The alphabet is `0-9`, `a-z`, `A-Z`; the most significant digit comes
//! first.
//!
//! ```rust
//! use num_bigint::BigUint;
//! use porter_codec::base62;
//!
//! let n = BigUint::from(3_844u32);
//! assert_eq!(base62::encode(&n), "100");
//! assert_eq!(base62::decode("100").unwrap(), n);
//! ```

pub mod base62;
pub mod error;

pub use error::{CodecError, Result};
