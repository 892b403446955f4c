//! This module contains the pure, stateless kernels for computing norms of a
//! buffer and reconstruction errors between two buffers.
//!
//! All accumulation happens in the buffer's own precision with no epsilon
//! correction, so an `f32` run reports exactly what single-precision
//! arithmetic produces. Summation order is fixed and sequential; backends and
//! the verifier must derive identical relative-mode tolerances.

use num_traits::Float;

use crate::error::VerifyError;
use crate::types::NormKind;

//==================================================================================
// 1. Norms
//==================================================================================

/// Square root of the sum of squares.
pub fn l2_norm<T: Float>(data: &[T]) -> Result<T, VerifyError> {
    if data.is_empty() {
        return Err(VerifyError::EmptyInput);
    }
    let sum = data.iter().fold(T::zero(), |acc, &x| acc + x * x);
    Ok(sum.sqrt())
}

/// Maximum absolute value.
pub fn linf_norm<T: Float>(data: &[T]) -> Result<T, VerifyError> {
    if data.is_empty() {
        return Err(VerifyError::EmptyInput);
    }
    Ok(data.iter().fold(T::zero(), |acc, &x| {
        let a = x.abs();
        if a > acc {
            a
        } else {
            acc
        }
    }))
}

pub fn norm<T: Float>(data: &[T], kind: NormKind) -> Result<T, VerifyError> {
    match kind {
        NormKind::L2 => l2_norm(data),
        NormKind::LInf => linf_norm(data),
    }
}

//==================================================================================
// 2. Errors
//==================================================================================

fn check_lengths<T>(original: &[T], reconstructed: &[T]) -> Result<(), VerifyError> {
    if original.len() != reconstructed.len() {
        return Err(VerifyError::LengthMismatch {
            original: original.len(),
            reconstructed: reconstructed.len(),
        });
    }
    if original.is_empty() {
        return Err(VerifyError::EmptyInput);
    }
    Ok(())
}

/// L2 norm of the element-wise difference.
pub fn l2_error<T: Float>(original: &[T], reconstructed: &[T]) -> Result<T, VerifyError> {
    check_lengths(original, reconstructed)?;
    let sum = original
        .iter()
        .zip(reconstructed)
        .fold(T::zero(), |acc, (&a, &b)| {
            let d = a - b;
            acc + d * d
        });
    Ok(sum.sqrt())
}

/// Maximum absolute element-wise difference.
pub fn linf_error<T: Float>(original: &[T], reconstructed: &[T]) -> Result<T, VerifyError> {
    check_lengths(original, reconstructed)?;
    Ok(original
        .iter()
        .zip(reconstructed)
        .fold(T::zero(), |acc, (&a, &b)| {
            let d = (a - b).abs();
            if d > acc {
                d
            } else {
                acc
            }
        }))
}

pub fn error<T: Float>(
    original: &[T],
    reconstructed: &[T],
    kind: NormKind,
) -> Result<T, VerifyError> {
    match kind {
        NormKind::L2 => l2_error(original, reconstructed),
        NormKind::LInf => linf_error(original, reconstructed),
    }
}

//==================================================================================
// 3. Diagnostics
//==================================================================================

/// Minimum and maximum of a buffer, reported after loading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMax<T> {
    pub min: T,
    pub max: T,
}

/// Returns `None` for an empty buffer. NaNs are skipped.
pub fn min_max<T: Float>(data: &[T]) -> Option<MinMax<T>> {
    let mut iter = data.iter().copied().filter(|x| !x.is_nan());
    let first = iter.next()?;
    Some(iter.fold(MinMax { min: first, max: first }, |mm, x| MinMax {
        min: if x < mm.min { x } else { mm.min },
        max: if x > mm.max { x } else { mm.max },
    }))
}

//==================================================================================
// 4. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norms_of_small_fixed_array() {
        let data = [1.0f64, -3.0, 2.0];
        assert_eq!(linf_norm(&data).unwrap(), 3.0);
        assert_eq!(l2_norm(&data).unwrap(), 14.0f64.sqrt());
        assert_eq!(norm(&data, NormKind::LInf).unwrap(), 3.0);
        assert_eq!(norm(&data, NormKind::L2).unwrap(), 14.0f64.sqrt());
    }

    #[test]
    fn test_norms_in_single_precision() {
        let data = [1.0f32, -3.0, 2.0];
        assert_eq!(linf_norm(&data).unwrap(), 3.0f32);
        assert_eq!(l2_norm(&data).unwrap(), 14.0f32.sqrt());
    }

    #[test]
    fn test_empty_norm_fails() {
        let empty: [f64; 0] = [];
        assert!(matches!(l2_norm(&empty), Err(VerifyError::EmptyInput)));
        assert!(matches!(linf_norm(&empty), Err(VerifyError::EmptyInput)));
    }

    #[test]
    fn test_errors_against_hand_computed_values() {
        let original = [1.0f64, 2.0, 3.0, 4.0];
        let reconstructed = [1.0f64, 2.5, 3.0, 2.0];
        assert_eq!(linf_error(&original, &reconstructed).unwrap(), 2.0);
        assert_eq!(l2_error(&original, &reconstructed).unwrap(), 4.25f64.sqrt());
    }

    #[test]
    fn test_error_is_zero_only_for_identical_buffers() {
        let original = [0.5f32, -7.25, 100.0];
        assert_eq!(l2_error(&original, &original).unwrap(), 0.0);
        assert_eq!(linf_error(&original, &original).unwrap(), 0.0);

        let mut perturbed = original;
        perturbed[2] = 100.0 + 1.0 / 64.0;
        assert!(l2_error(&original, &perturbed).unwrap() > 0.0);
        assert!(linf_error(&original, &perturbed).unwrap() > 0.0);
    }

    #[test]
    fn test_error_length_mismatch() {
        let result = error(&[1.0f64, 2.0], &[1.0f64], NormKind::L2);
        assert!(matches!(
            result,
            Err(VerifyError::LengthMismatch {
                original: 2,
                reconstructed: 1
            })
        ));
    }

    #[test]
    fn test_min_max() {
        let mm = min_max(&[3.0f64, -1.0, f64::NAN, 7.5]).unwrap();
        assert_eq!(mm, MinMax { min: -1.0, max: 7.5 });
        assert!(min_max::<f32>(&[]).is_none());
    }
}
