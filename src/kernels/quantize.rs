//! This module contains the error-bounded uniform quantizer used by the
//! in-tree compression backends.
//!
//! Given an absolute tolerance `τ` on a metric, every element is rounded to the
//! nearest multiple of a quantum `q`. The per-element error is at most `q / 2`:
//!
//! * L-infinity: `q / 2 < τ` bounds the maximum error directly.
//! * L2: `q / 2 < τ / √n` bounds the square root of the summed squared error by `τ`.
//!
//! The per-element bound is first reduced by the rounding step of the element
//! precision at the data's magnitude, since every reconstructed value is
//! rounded back into that precision. The quantum is then shrunk by
//! `QUANTUM_SAFETY`.

use crate::types::{Element, NormKind};

/// Fraction of the ideal quantum actually used.
pub const QUANTUM_SAFETY: f64 = 0.999;

/// Largest code magnitude that survives the `i64 -> f64 -> i64` trip exactly (2^52).
pub const MAX_CODE_MAGNITUDE: f64 = 4_503_599_627_370_496.0;

/// Bound on the absolute error of any single element for the given metric.
pub fn per_element_bound(effective_tolerance: f64, num_elements: usize, metric: NormKind) -> f64 {
    match metric {
        NormKind::LInf => effective_tolerance,
        NormKind::L2 => effective_tolerance / (num_elements as f64).sqrt(),
    }
}

/// The quantization step, or `None` if no positive finite step exists
/// (zero, negative, NaN, or infinite tolerance, or a bound swallowed by `rounding`).
///
/// `rounding` is the largest error introduced by storing a reconstructed value
/// in the element precision.
pub fn quantum_for(
    effective_tolerance: f64,
    num_elements: usize,
    metric: NormKind,
    rounding: f64,
) -> Option<f64> {
    let bound = per_element_bound(effective_tolerance, num_elements, metric) - rounding;
    let q = 2.0 * bound * QUANTUM_SAFETY;
    (q.is_finite() && q > 0.0).then_some(q)
}

/// Rounding allowance for reconstructed values no larger than `max_abs`.
pub fn rounding_for<T: Element>(max_abs: T) -> f64 {
    max_abs.widen() * T::epsilon().widen()
}

/// The integer code of `value`, or `None` if it is not representable.
pub fn quantize<T: Element>(value: T, quantum: f64) -> Option<i64> {
    let code = (value.widen() / quantum).round();
    (code.is_finite() && code.abs() <= MAX_CODE_MAGNITUDE).then_some(code as i64)
}

pub fn dequantize<T: Element>(code: i64, quantum: f64) -> T {
    T::cast_from(code as f64 * quantum)
}

/// True if every element of `data` has a representable code.
pub fn codes_fit<T: Element>(data: &[T], quantum: f64) -> bool {
    data.iter().all(|&x| quantize(x, quantum).is_some())
}

/// Maps signed codes onto unsigned symbols so small magnitudes stay small.
pub fn zigzag(code: i64) -> u64 {
    ((code << 1) ^ (code >> 63)) as u64
}

pub fn unzigzag(symbol: u64) -> i64 {
    ((symbol >> 1) as i64) ^ -((symbol & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantum_per_metric() {
        let q_inf = quantum_for(0.5, 100, NormKind::LInf, 0.0).unwrap();
        assert!((q_inf - 0.999).abs() < 1e-12);
        let q_l2 = quantum_for(5.0, 100, NormKind::L2, 0.0).unwrap();
        assert!((q_l2 - 0.999).abs() < 1e-12);
    }

    #[test]
    fn test_single_precision_rounding_shrinks_quantum() {
        let rounding = rounding_for(100.0f32);
        assert_eq!(rounding, 100.0 * f32::EPSILON as f64);
        assert!(rounding_for(100.0f64) < 1e-13);

        let plain = quantum_for(0.01, 50, NormKind::L2, 0.0).unwrap();
        let shrunk = quantum_for(0.01, 50, NormKind::L2, rounding).unwrap();
        assert!(shrunk < plain);
        // Worst case: half a step plus half an f32 ulp at 100 stays inside the bound.
        let bound = per_element_bound(0.01, 50, NormKind::L2);
        assert!(shrunk / 2.0 + rounding / 2.0 < bound);
        // A bound smaller than the rounding step leaves no usable quantum.
        assert!(quantum_for(1e-6, 1, NormKind::LInf, rounding).is_none());
    }

    #[test]
    fn test_degenerate_tolerances_have_no_quantum() {
        assert!(quantum_for(0.0, 10, NormKind::LInf, 0.0).is_none());
        assert!(quantum_for(-1.0, 10, NormKind::L2, 0.0).is_none());
        assert!(quantum_for(f64::NAN, 10, NormKind::L2, 0.0).is_none());
        assert!(quantum_for(f64::INFINITY, 10, NormKind::LInf, 0.0).is_none());
    }

    #[test]
    fn test_quantization_error_is_within_half_step() {
        let q = 0.3;
        for i in -50..50 {
            let x = i as f64 * 0.173;
            let code = quantize(x, q).unwrap();
            let back: f64 = dequantize(code, q);
            assert!((x - back).abs() <= q / 2.0 + 1e-12);
        }
    }

    #[test]
    fn test_unrepresentable_codes() {
        assert!(quantize(f64::NAN, 1.0).is_none());
        assert!(quantize(1e300f64, 1e-300).is_none());
        assert!(!codes_fit(&[1.0f32, f32::INFINITY], 0.5));
        assert!(codes_fit(&[1.0f32, -2.0], 0.5));
    }

    #[test]
    fn test_zigzag_mapping() {
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
        assert_eq!(zigzag(-2), 3);
        for code in [0, 1, -1, 63, -64, i64::MAX, i64::MIN] {
            assert_eq!(unzigzag(zigzag(code)), code);
        }
    }
}
