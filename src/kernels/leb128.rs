//! This module contains the LEB128 (Little-Endian Base 128) varint kernels used
//! by the internal lossless stage to pack quantization symbols.
//!
//! Symbols are zigzag-mapped quantization codes, so most of them are small and
//! fit in one or two bytes. Decoding is panic-free and rejects truncated or
//! overflowing input.

use std::io::Cursor;

use crate::error::VerifyError;

//==================================================================================
// 1. Single-Value Operations
//==================================================================================

/// Appends one value to `buffer`.
pub fn encode_one(mut value: u64, buffer: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

/// Reads one value at the cursor position and advances past it.
pub fn decode_one(cursor: &mut Cursor<&[u8]>) -> Result<u64, VerifyError> {
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let pos = cursor.position() as usize;
        let byte = *cursor
            .get_ref()
            .get(pos)
            .ok_or_else(|| VerifyError::Leb128DecodeError("Unexpected end of buffer".to_string()))?;
        cursor.set_position((pos + 1) as u64);

        let payload = (byte & 0x7F) as u64;
        // The tenth byte may only carry the single remaining bit of a u64.
        if (shift == 63 && payload > 1) || shift > 63 {
            return Err(VerifyError::Leb128DecodeError(
                "Integer overflow during decoding".to_string(),
            ));
        }
        result |= payload << shift;

        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

//==================================================================================
// 2. Slice Operations
//==================================================================================

/// Decodes exactly `num_values` values from the start of `input_bytes`.
///
/// Returns the values and the number of bytes consumed; trailing bytes are
/// left for the caller (the outlier section follows the symbols in a block).
pub fn decode(input_bytes: &[u8], num_values: usize) -> Result<(Vec<u64>, usize), VerifyError> {
    let mut cursor = Cursor::new(input_bytes);
    // Every value takes at least one byte.
    let mut values = Vec::with_capacity(num_values.min(input_bytes.len()));
    for _ in 0..num_values {
        values.push(decode_one(&mut cursor)?);
    }
    Ok((values, cursor.position() as usize))
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        let mut buf = Vec::new();
        encode_one(0, &mut buf);
        encode_one(127, &mut buf);
        encode_one(128, &mut buf);
        encode_one(624_485, &mut buf);
        assert_eq!(buf, vec![0x00, 0x7F, 0x80, 0x01, 0xE5, 0x8E, 0x26]);
    }

    #[test]
    fn test_leb128_roundtrip_with_trailing_bytes() {
        let original: Vec<u64> = vec![0, 1, 127, 128, 16_384, u64::MAX];
        let mut encoded = Vec::new();
        for &v in &original {
            encode_one(v, &mut encoded);
        }
        let body_len = encoded.len();
        // u64::MAX needs the full ten bytes.
        assert_eq!(body_len, 1 + 1 + 1 + 2 + 3 + 10);
        encoded.extend_from_slice(&[0xAA, 0xBB]);

        let (decoded, consumed) = decode(&encoded, original.len()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(consumed, body_len);
    }

    #[test]
    fn test_decode_truncated_buffer() {
        let mut encoded = Vec::new();
        encode_one(624_485, &mut encoded);
        let result = decode(&encoded[..2], 1);
        assert!(result.unwrap_err().to_string().contains("Unexpected end of buffer"));
    }

    #[test]
    fn test_decode_overflow_error() {
        // This represents a value larger than u64::MAX
        let encoded_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        match decode(&encoded_bytes, 1) {
            Err(VerifyError::Leb128DecodeError(msg)) => assert!(msg.contains("overflow")),
            other => panic!("Expected Leb128DecodeError, got {:?}", other),
        }
    }
}
