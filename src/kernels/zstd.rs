//! This module contains the Zstandard kernels behind the secondary lossless stage.
//!
//! A block stream is cut into frames of a configured size and each frame is
//! compressed independently. Every frame is length-prefixed so the decoder can
//! walk the stream without any external index. This module is a safe,
//! panic-free wrapper around the `zstd` crate.

use std::io::Write;
use zstd::stream::Encoder;

use crate::error::VerifyError;

/// Compression level used for every frame.
pub const DEFAULT_LEVEL: i32 = 3;

//==================================================================================
// 1. Single Buffer API
//==================================================================================

/// Compresses `input_bytes`, prepending the uncompressed length as a `u64`.
pub fn encode(input_bytes: &[u8], level: i32) -> Result<Vec<u8>, VerifyError> {
    if input_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let mut output_buf = Vec::with_capacity(input_bytes.len() / 2 + 8);
    output_buf.extend_from_slice(&(input_bytes.len() as u64).to_le_bytes());

    let mut encoder = Encoder::new(&mut output_buf, level)
        .map_err(|e| VerifyError::ZstdError(e.to_string()))?;
    encoder
        .write_all(input_bytes)
        .map_err(|e| VerifyError::ZstdError(e.to_string()))?;
    // `finish` is essential to finalize the Zstd frame.
    encoder
        .finish()
        .map_err(|e| VerifyError::ZstdError(e.to_string()))?;

    Ok(output_buf)
}

/// Inverse of `encode`. Fails if the decoded length disagrees with the header.
pub fn decode(input_bytes: &[u8]) -> Result<Vec<u8>, VerifyError> {
    if input_bytes.is_empty() {
        return Ok(Vec::new());
    }
    let (len_bytes, compressed) = input_bytes.split_first_chunk::<8>().ok_or_else(|| {
        VerifyError::ZstdError("Input stream too short to contain size header.".to_string())
    })?;
    let uncompressed_len = u64::from_le_bytes(*len_bytes) as usize;

    // The header is untrusted; let the decoder grow the buffer.
    let mut decompressed = Vec::new();
    zstd::stream::copy_decode(compressed, &mut decompressed)
        .map_err(|e| VerifyError::ZstdError(e.to_string()))?;

    if decompressed.len() != uncompressed_len {
        return Err(VerifyError::ZstdError(format!(
            "Decompressed size does not match header. Expected {}, got {}.",
            uncompressed_len,
            decompressed.len()
        )));
    }
    Ok(decompressed)
}

//==================================================================================
// 2. Framed Stream API
//==================================================================================

/// Appends `input_bytes` to `output_buf` as a sequence of `[u32 len][frame]` records,
/// one per `frame_size` bytes of input.
pub fn encode_frames(
    input_bytes: &[u8],
    frame_size: usize,
    level: i32,
    output_buf: &mut Vec<u8>,
) -> Result<(), VerifyError> {
    if frame_size == 0 {
        return Err(VerifyError::ZstdError("Frame size must be positive.".to_string()));
    }
    for chunk in input_bytes.chunks(frame_size) {
        let frame = encode(chunk, level)?;
        let frame_len = u32::try_from(frame.len()).map_err(|_| {
            VerifyError::ZstdError(format!("Frame of {} bytes exceeds u32 length.", frame.len()))
        })?;
        output_buf.extend_from_slice(&frame_len.to_le_bytes());
        output_buf.extend_from_slice(&frame);
    }
    Ok(())
}

/// Decodes a complete framed stream produced by `encode_frames`.
pub fn decode_frames(mut input_bytes: &[u8]) -> Result<Vec<u8>, VerifyError> {
    let mut output = Vec::new();
    while !input_bytes.is_empty() {
        let (len_bytes, rest) = input_bytes.split_first_chunk::<4>().ok_or_else(|| {
            VerifyError::ZstdError("Truncated frame length prefix.".to_string())
        })?;
        let frame_len = u32::from_le_bytes(*len_bytes) as usize;
        if rest.len() < frame_len {
            return Err(VerifyError::ZstdError(format!(
                "Frame declares {} bytes but only {} remain.",
                frame_len,
                rest.len()
            )));
        }
        let (frame, tail) = rest.split_at(frame_len);
        output.extend_from_slice(&decode(frame)?);
        input_bytes = tail;
    }
    Ok(output)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_roundtrip_highly_compressible_data() {
        let original_bytes = vec![42u8; 10_000];
        let compressed_bytes = encode(&original_bytes, 5).unwrap();
        // The compressed size is slightly larger than zstd's own due to the 8-byte header.
        assert!(compressed_bytes.len() < 50);
        assert_eq!(decode(&compressed_bytes).unwrap(), original_bytes);
    }

    #[test]
    fn test_zstd_decompress_invalid_data() {
        let result = decode(&[1, 2, 3, 4, 5]);
        assert!(result.unwrap_err().to_string().contains("Zstd"));
    }

    #[test]
    fn test_oversized_length_header_fails_cleanly() {
        let mut stream = u64::MAX.to_le_bytes().to_vec();
        stream.extend_from_slice(&[0x28, 0xB5, 0x2F, 0xFD]);
        assert!(matches!(decode(&stream), Err(VerifyError::ZstdError(_))));

        let mut lying = encode(&[5u8; 32], DEFAULT_LEVEL).unwrap();
        lying[..8].copy_from_slice(&(1u64 << 40).to_le_bytes());
        assert!(decode(&lying).unwrap_err().to_string().contains("does not match"));
    }

    #[test]
    fn test_framed_stream_spans_multiple_frames() {
        let original: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut framed = Vec::new();
        encode_frames(&original, 4096, DEFAULT_LEVEL, &mut framed).unwrap();

        // Three frames: 4096 + 4096 + 1808 bytes of input.
        let first_len = u32::from_le_bytes(framed[..4].try_into().unwrap()) as usize;
        assert!(first_len > 8);
        assert_eq!(decode_frames(&framed).unwrap(), original);
    }

    #[test]
    fn test_truncated_framed_stream_fails() {
        let mut framed = Vec::new();
        encode_frames(&[7u8; 100], 64, DEFAULT_LEVEL, &mut framed).unwrap();
        framed.truncate(framed.len() - 1);
        assert!(decode_frames(&framed).is_err());
    }

    #[test]
    fn test_empty_framed_stream() {
        let mut framed = Vec::new();
        encode_frames(&[], 64, DEFAULT_LEVEL, &mut framed).unwrap();
        assert!(framed.is_empty());
        assert!(decode_frames(&framed).unwrap().is_empty());
    }
}
