//! Binary-to-text encoding for frame and image payloads.
//!
//! The bridge expects pixel buffers as padded base64 text. Host capture APIs
//! hand back plain integer sequences, so the encoder validates every element
//! before producing any output.

use crate::error::{BridgeError, Result};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const PAD: char = '=';

/// Encode a sequence of integers, each in `0..=255`, as padded base64.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidInput`] for the first element outside the
/// byte range. Nothing is encoded in that case.
///
/// # Example
///
/// ```
/// use kraken_bridge::encoding::encode;
///
/// assert_eq!(encode(&[77i32, 97, 110]).unwrap(), "TWFu");
/// assert!(encode(&[256i32]).is_err());
/// ```
pub fn encode<T>(values: &[T]) -> Result<String>
where
    T: Copy + Into<i64>,
{
    let mut bytes = Vec::with_capacity(values.len());
    for (index, &value) in values.iter().enumerate() {
        let value: i64 = value.into();
        let byte = u8::try_from(value).map_err(|_| BridgeError::InvalidInput { index, value })?;
        bytes.push(byte);
    }
    Ok(encode_bytes(&bytes))
}

/// Encode raw bytes as padded base64.
pub fn encode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);

    for chunk in bytes.chunks(3) {
        let first = chunk[0];
        let second = chunk.get(1).copied();
        let third = chunk.get(2).copied();

        out.push(symbol(first >> 2));
        out.push(symbol(((first & 0x03) << 4) | (second.unwrap_or(0) >> 4)));

        match second {
            Some(second) => out.push(symbol(((second & 0x0f) << 2) | (third.unwrap_or(0) >> 6))),
            None => out.push(PAD),
        }
        match third {
            Some(third) => out.push(symbol(third & 0x3f)),
            None => out.push(PAD),
        }
    }

    out
}

fn symbol(index: u8) -> char {
    char::from(ALPHABET[usize::from(index)])
}
