//! Positional base62 encoding over arbitrary-precision integers.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::error::{CodecError, Result};

/// The 62 digit symbols, in digit-value order.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: u32 = 62;

/// Digit value of `ch`, or `None` if it is outside the alphabet.
fn digit_value(ch: char) -> Option<u32> {
    match ch {
        '0'..='9' => Some(ch as u32 - '0' as u32),
        'a'..='z' => Some(ch as u32 - 'a' as u32 + 10),
        'A'..='Z' => Some(ch as u32 - 'A' as u32 + 36),
        _ => None,
    }
}

/// Encode a non-negative integer as a base62 token.
///
/// Zero encodes as `"0"`; no other token has leading zero digits.
pub fn encode(n: &BigUint) -> String {
    n.to_radix_be(BASE)
        .into_iter()
        .map(|d| ALPHABET[d as usize] as char)
        .collect()
}

/// Encode a `u64` as a base62 token.
pub fn encode_u64(n: u64) -> String {
    encode(&BigUint::from(n))
}

/// Decode a base62 token into an integer.
///
/// Leading zero digits are accepted and do not change the value. Any
/// character outside [`ALPHABET`] fails with
/// [`CodecError::InvalidCharacter`].
pub fn decode(token: &str) -> Result<BigUint> {
    if token.is_empty() {
        return Err(CodecError::Empty);
    }

    let mut value = BigUint::zero();
    for (position, ch) in token.chars().enumerate() {
        let digit = digit_value(ch).ok_or(CodecError::InvalidCharacter { ch, position })?;
        value = value * BASE + digit;
    }
    Ok(value)
}

/// Decode a base62 token that must fit in a `u64`.
pub fn decode_u64(token: &str) -> Result<u64> {
    let value = decode(token)?;
    value.to_u64().ok_or(CodecError::Overflow {
        bits: value.bits(),
        max_bits: 64,
    })
}

/// Decode a token into a big-endian digest of exactly `width` bytes.
///
/// The value is left-padded with zero bytes. A value wider than `width`
/// bytes is not a well-formed digest and fails with
/// [`CodecError::Overflow`].
pub fn decode_digest(token: &str, width: usize) -> Result<Vec<u8>> {
    let value = decode(token)?;
    let max_bits = (width as u64) * 8;
    if value.bits() > max_bits {
        return Err(CodecError::Overflow {
            bits: value.bits(),
            max_bits,
        });
    }

    let mut digest = vec![0u8; width];
    if !value.is_zero() {
        let bytes = value.to_bytes_be();
        digest[width - bytes.len()..].copy_from_slice(&bytes);
    }
    Ok(digest)
}

/// Decode a token into a lowercase hex digest of `width` bytes.
pub fn decode_digest_hex(token: &str, width: usize) -> Result<String> {
    decode_digest(token, width).map(hex::encode)
}

/// Encode a big-endian digest as a base62 token.
pub fn encode_digest(digest: &[u8]) -> String {
    encode(&BigUint::from_bytes_be(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_digits() {
        assert_eq!(decode("0").unwrap(), BigUint::zero());
        assert_eq!(decode("a").unwrap(), BigUint::from(10u32));
        assert_eq!(decode("Z").unwrap(), BigUint::from(61u32));
        assert_eq!(encode_u64(61), "Z");
        assert_eq!(encode_u64(0), "0");
    }

    #[test]
    fn most_significant_digit_first() {
        assert_eq!(decode_u64("10").unwrap(), 62);
        assert_eq!(decode_u64("zz").unwrap(), 35 * 62 + 35);
        assert_eq!(encode_u64(62 * 62), "100");
    }

    #[test]
    fn leading_zeros_are_ignored() {
        assert_eq!(decode_u64("000a").unwrap(), 10);
    }

    #[test]
    fn invalid_character_is_distinct_error() {
        let err = decode("ab-c").unwrap_err();
        assert_eq!(err, CodecError::InvalidCharacter { ch: '-', position: 2 });
        assert!(matches!(
            decode("é"),
            Err(CodecError::InvalidCharacter { ch: 'é', position: 0 })
        ));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert_eq!(decode("").unwrap_err(), CodecError::Empty);
    }

    #[test]
    fn u64_overflow() {
        let big = encode(&(BigUint::from(u64::MAX) + 1u32));
        assert!(matches!(
            decode_u64(&big),
            Err(CodecError::Overflow { bits: 65, max_bits: 64 })
        ));
        assert_eq!(decode_u64(&encode_u64(u64::MAX)).unwrap(), u64::MAX);
    }

    #[test]
    fn sha1_sized_digest() {
        let sha1 = hex::decode("a9993e364706816aba3e25717850c26c9cd0d89d").unwrap();
        let token = encode_digest(&sha1);
        assert_eq!(decode_digest(&token, 20).unwrap(), sha1);
        assert_eq!(
            decode_digest_hex(&token, 20).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn short_digest_is_left_padded() {
        let digest = decode_digest("a", 4).unwrap();
        assert_eq!(digest, vec![0, 0, 0, 10]);
        assert_eq!(decode_digest("0", 2).unwrap(), vec![0, 0]);
    }

    #[test]
    fn oversized_digest_is_rejected() {
        let wide = encode_digest(&[0xff; 21]);
        assert!(matches!(
            decode_digest(&wide, 20),
            Err(CodecError::Overflow { max_bits: 160, .. })
        ));
    }

    proptest! {
        #[test]
        fn u64_roundtrip(n in any::<u64>()) {
            prop_assert_eq!(decode_u64(&encode_u64(n)).unwrap(), n);
        }

        #[test]
        fn bigint_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let n = BigUint::from_bytes_be(&bytes);
            prop_assert_eq!(decode(&encode(&n)).unwrap(), n);
        }

        #[test]
        fn tokens_use_only_alphabet(n in any::<u128>()) {
            let token = encode(&BigUint::from(n));
            prop_assert!(token.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }
}
