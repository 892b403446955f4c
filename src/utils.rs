//! This module provides a set of shared, low-level utility functions used
//! throughout the crate, chiefly safe conversions between raw byte buffers and
//! typed element slices. All casting goes through `bytemuck`; there is no
//! `unsafe` code in this crate.

use crate::error::VerifyError;

/// Copies a byte slice into an owned, properly aligned `Vec<T>`.
///
/// Works for buffers with arbitrary alignment (e.g. file contents read into a
/// `Vec<u8>` or a stream sliced out of a payload). Bytes are interpreted in
/// native order.
pub fn bytes_to_typed_vec<T>(bytes: &[u8]) -> Result<Vec<T>, VerifyError>
where
    T: bytemuck::Pod,
{
    let size = std::mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return Err(VerifyError::PodCast(format!(
            "{} bytes is not a multiple of the element size {}",
            bytes.len(),
            size
        )));
    }
    match bytemuck::try_cast_slice::<u8, T>(bytes) {
        Ok(aligned) => Ok(aligned.to_vec()),
        Err(bytemuck::PodCastError::TargetAlignmentGreaterAndInputNotAligned) => {
            Ok(bytes.chunks_exact(size).map(bytemuck::pod_read_unaligned).collect())
        }
        Err(e) => Err(e.into()),
    }
}

/// Converts a slice of plain-old-data values into an owned `Vec<u8>`.
pub fn typed_slice_to_bytes<T: bytemuck::Pod>(data: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(data).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_roundtrip_f64() {
        let original = vec![1.0f64, -2.5, 1e300];
        let bytes = typed_slice_to_bytes(&original);
        assert_eq!(bytes.len(), 24);
        assert_eq!(bytes_to_typed_vec::<f64>(&bytes).unwrap(), original);
    }

    #[test]
    fn test_unaligned_bytes_are_copied() {
        let original = vec![3.0f32, 4.0];
        let mut padded = vec![0u8];
        padded.extend_from_slice(&typed_slice_to_bytes(&original));
        assert_eq!(bytes_to_typed_vec::<f32>(&padded[1..]).unwrap(), original);
    }

    #[test]
    fn test_every_offset_decodes_f64() {
        let original = vec![1.5f64, -0.25, 6.0e-310];
        let raw = typed_slice_to_bytes(&original);
        for pad in 0..8 {
            let mut padded = vec![0u8; pad];
            padded.extend_from_slice(&raw);
            assert_eq!(bytes_to_typed_vec::<f64>(&padded[pad..]).unwrap(), original);
        }
    }

    #[test]
    fn test_ragged_length_is_rejected() {
        assert!(matches!(
            bytes_to_typed_vec::<f32>(&[0u8; 6]),
            Err(VerifyError::PodCast(_))
        ));
    }
}
