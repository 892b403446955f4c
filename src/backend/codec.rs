//! Block-level encoding shared by every backend.
//!
//! A block is a run of consecutive elements. Its stored stream is
//!
//! ```text
//! [LEB128 symbols ...][outlier values, native-endian T ...]   (Quantized)
//! [raw values, native-endian T ...]                            (Verbatim)
//! ```
//!
//! optionally wrapped in zstd frames by the secondary lossless stage. A symbol
//! equal to the dictionary size is an escape: the element is taken, exactly,
//! from the next outlier value.

use std::borrow::Cow;

use crate::error::VerifyError;
use crate::kernels::{leb128, metrics, quantize, zstd};
use crate::types::{Element, ErrorBoundMode, NormKind};
use crate::utils::{bytes_to_typed_vec, typed_slice_to_bytes};

/// How element values are represented in every block of one payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Encoding {
    /// Values are stored as integer multiples of `quantum`.
    Quantized { quantum: f64 },
    /// Values are stored exactly; used when no usable quantum exists.
    Verbatim,
}

/// The output of encoding one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EncodedBlock {
    pub elements: u64,
    pub outliers: u64,
    pub bytes: Vec<u8>,
}

/// Chooses the encoding for a whole buffer.
///
/// The effective tolerance is derived exactly as the verifier derives it:
/// same metric rule, same norm kernel, same conversion helper, all in `T`.
/// The quantum also leaves room for rounding reconstructed values into `T`.
pub(crate) fn plan_encoding<T: Element>(
    data: &[T],
    smoothness: f64,
    tolerance: f64,
    mode: ErrorBoundMode,
) -> Result<Encoding, VerifyError> {
    let metric = NormKind::for_element::<T>(smoothness);
    let norm = match mode {
        ErrorBoundMode::Relative => metrics::norm(data, metric)?,
        ErrorBoundMode::Absolute => T::one(),
    };
    let effective = mode.effective_tolerance(norm, T::cast_from(tolerance));
    let max_abs = data.iter().fold(T::zero(), |m, &x| m.max(x.abs()));
    let rounding = quantize::rounding_for(max_abs);

    match quantize::quantum_for(effective.widen(), data.len(), metric, rounding) {
        Some(quantum) if quantize::codes_fit(data, quantum) => {
            Ok(Encoding::Quantized { quantum })
        }
        _ => {
            log::info!(
                "No usable quantum for effective tolerance {:e}; storing values verbatim",
                effective
            );
            Ok(Encoding::Verbatim)
        }
    }
}

/// Per-payload block coding parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BlockCodec {
    pub encoding: Encoding,
    pub dictionary_size: u32,
    /// Frame size of the secondary lossless stage, if enabled.
    pub secondary_frame_size: Option<usize>,
}

impl BlockCodec {
    pub fn encode_block<T: Element>(&self, block: &[T]) -> Result<EncodedBlock, VerifyError> {
        let mut raw = Vec::with_capacity(block.len() * 2);
        let mut outliers: Vec<T> = Vec::new();

        match self.encoding {
            Encoding::Verbatim => raw.extend_from_slice(&typed_slice_to_bytes(block)),
            Encoding::Quantized { quantum } => {
                let escape = self.dictionary_size as u64;
                for &x in block {
                    let code = quantize::quantize(x, quantum).ok_or_else(|| {
                        VerifyError::Backend(format!(
                            "value {} has no code for quantum {:e}",
                            x, quantum
                        ))
                    })?;
                    let symbol = quantize::zigzag(code);
                    if symbol >= escape {
                        leb128::encode_one(escape, &mut raw);
                        outliers.push(x);
                    } else {
                        leb128::encode_one(symbol, &mut raw);
                    }
                }
                raw.extend_from_slice(&typed_slice_to_bytes(&outliers));
            }
        }

        let bytes = match self.secondary_frame_size {
            Some(frame_size) => {
                let mut framed = Vec::with_capacity(raw.len() / 2);
                zstd::encode_frames(&raw, frame_size, zstd::DEFAULT_LEVEL, &mut framed)?;
                framed
            }
            None => raw,
        };

        Ok(EncodedBlock {
            elements: block.len() as u64,
            outliers: outliers.len() as u64,
            bytes,
        })
    }

    pub fn decode_block<T: Element>(
        &self,
        bytes: &[u8],
        elements: usize,
        outliers: usize,
    ) -> Result<Vec<T>, VerifyError> {
        let raw: Cow<'_, [u8]> = match self.secondary_frame_size {
            Some(_) => Cow::Owned(zstd::decode_frames(bytes)?),
            None => Cow::Borrowed(bytes),
        };

        let values = match self.encoding {
            Encoding::Verbatim => bytes_to_typed_vec::<T>(&raw)?,
            Encoding::Quantized { quantum } => {
                let (symbols, consumed) = leb128::decode(&raw, elements)?;
                let outlier_values = bytes_to_typed_vec::<T>(&raw[consumed..])?;
                if outlier_values.len() != outliers {
                    return Err(VerifyError::MalformedPayload(format!(
                        "block declares {} outliers but stores {}",
                        outliers,
                        outlier_values.len()
                    )));
                }

                let escape = self.dictionary_size as u64;
                let mut next_outlier = outlier_values.into_iter();
                let mut values = Vec::with_capacity(elements);
                for symbol in symbols {
                    let value = if symbol == escape {
                        next_outlier.next().ok_or_else(|| {
                            VerifyError::MalformedPayload(
                                "escape without outlier value".to_string(),
                            )
                        })?
                    } else if symbol > escape {
                        return Err(VerifyError::MalformedPayload(format!(
                            "symbol {} outside dictionary of {}",
                            symbol, self.dictionary_size
                        )));
                    } else {
                        quantize::dequantize(quantize::unzigzag(symbol), quantum)
                    };
                    values.push(value);
                }
                if next_outlier.next().is_some() {
                    return Err(VerifyError::MalformedPayload(
                        "unreferenced outlier values".to_string(),
                    ));
                }
                values
            }
        };

        if values.len() != elements {
            return Err(VerifyError::MalformedPayload(format!(
                "block decoded to {} elements, expected {}",
                values.len(),
                elements
            )));
        }
        Ok(values)
    }

    /// Decodes a freshly encoded block and checks it against its source.
    ///
    /// Quantized values must be within one quantum of the original; verbatim
    /// values must match bit for bit.
    pub fn check_block<T: Element>(
        &self,
        original: &[T],
        encoded: &EncodedBlock,
    ) -> Result<(), VerifyError> {
        let decoded = self.decode_block::<T>(
            &encoded.bytes,
            encoded.elements as usize,
            encoded.outliers as usize,
        )?;
        let ok = match self.encoding {
            Encoding::Verbatim => {
                bytemuck::cast_slice::<T, u8>(original) == bytemuck::cast_slice::<T, u8>(&decoded)
            }
            Encoding::Quantized { quantum } => {
                decoded.len() == original.len()
                    && metrics::linf_error(original, &decoded)?.widen() <= quantum
            }
        };
        if ok {
            Ok(())
        } else {
            Err(VerifyError::Backend(format!(
                "block check failed for a block of {} elements",
                original.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(encoding: Encoding, dictionary_size: u32, secondary: Option<usize>) -> BlockCodec {
        BlockCodec {
            encoding,
            dictionary_size,
            secondary_frame_size: secondary,
        }
    }

    #[test]
    fn test_plan_uses_relative_norm() {
        // L-inf norm 4, relative tolerance 0.25 -> absolute bound 1.0.
        let data = [1.0f64, -4.0, 2.0, 3.0];
        let plan = plan_encoding(&data, f64::INFINITY, 0.25, ErrorBoundMode::Relative).unwrap();
        let Encoding::Quantized { quantum } = plan else {
            panic!("expected a quantized plan, got {:?}", plan);
        };
        let expected = 2.0 * (1.0 - 4.0 * f64::EPSILON) * quantize::QUANTUM_SAFETY;
        assert!((quantum - expected).abs() < 1e-15);
    }

    #[test]
    fn test_single_precision_plan_meets_l2_bound() {
        let data: Vec<f32> = (0..50).map(|i| ((i * 37) % 100 + 1) as f32).collect();
        let plan = plan_encoding(&data, 0.0, 0.01, ErrorBoundMode::Absolute).unwrap();
        let Encoding::Quantized { quantum } = plan else {
            panic!("expected a quantized plan, got {:?}", plan);
        };
        let c = codec(plan, 8192, None);
        let encoded = c.encode_block(&data).unwrap();
        let decoded: Vec<f32> = c
            .decode_block(&encoded.bytes, data.len(), encoded.outliers as usize)
            .unwrap();
        assert!(metrics::l2_error(&data, &decoded).unwrap() < 0.01f32);
        assert!(metrics::linf_error(&data, &decoded).unwrap().widen() <= quantum);
    }

    #[test]
    fn test_plan_falls_back_to_verbatim() {
        let data = [1.0f32, 2.0];
        assert_eq!(
            plan_encoding(&data, 0.0, 0.0, ErrorBoundMode::Absolute).unwrap(),
            Encoding::Verbatim
        );
        let zeros = [0.0f64; 4];
        assert_eq!(
            plan_encoding(&zeros, 0.0, 0.1, ErrorBoundMode::Relative).unwrap(),
            Encoding::Verbatim
        );
    }

    #[test]
    fn test_quantized_block_respects_bound() {
        let data: Vec<f64> = (0..500).map(|i| (i as f64 * 0.37).sin() * 50.0).collect();
        let c = codec(Encoding::Quantized { quantum: 0.1 }, 8192, None);
        let encoded = c.encode_block(&data).unwrap();
        assert_eq!(encoded.elements, 500);
        assert_eq!(encoded.outliers, 0);

        let decoded: Vec<f64> = c.decode_block(&encoded.bytes, 500, 0).unwrap();
        assert!(metrics::linf_error(&data, &decoded).unwrap() <= 0.05 + 1e-12);
        c.check_block(&data, &encoded).unwrap();
    }

    #[test]
    fn test_outliers_are_escaped_and_exact() {
        // Dictionary of 8 symbols covers codes -4..=3; the rest are outliers.
        let data = [0.0f32, 1.0, 2.0, 100.0, -50.0, 3.0];
        let c = codec(Encoding::Quantized { quantum: 1.0 }, 8, None);
        let encoded = c.encode_block(&data).unwrap();
        assert_eq!(encoded.outliers, 2);

        let decoded: Vec<f32> = c.decode_block(&encoded.bytes, data.len(), 2).unwrap();
        assert_eq!(decoded, data.to_vec());
    }

    #[test]
    fn test_secondary_stage_roundtrip() {
        let data: Vec<f32> = (0..4096).map(|i| (i % 17) as f32).collect();
        let plain = codec(Encoding::Quantized { quantum: 0.5 }, 8192, None);
        let framed = codec(Encoding::Quantized { quantum: 0.5 }, 8192, Some(1024));

        let a = plain.encode_block(&data).unwrap();
        let b = framed.encode_block(&data).unwrap();
        assert!(b.bytes.len() < a.bytes.len());

        let decoded: Vec<f32> = framed.decode_block(&b.bytes, data.len(), 0).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_verbatim_block_is_lossless() {
        let data = [f64::MIN_POSITIVE, -0.0, 1e308, 7.25];
        let c = codec(Encoding::Verbatim, 8192, Some(16));
        let encoded = c.encode_block(&data).unwrap();
        let decoded: Vec<f64> = c.decode_block(&encoded.bytes, 4, 0).unwrap();
        assert_eq!(
            bytemuck::cast_slice::<f64, u8>(&decoded),
            bytemuck::cast_slice::<f64, u8>(&data)
        );
        c.check_block(&data, &encoded).unwrap();
    }

    #[test]
    fn test_corrupt_block_is_rejected() {
        let data = [1.0f64, 2.0, 3.0];
        let c = codec(Encoding::Quantized { quantum: 0.5 }, 4, None);
        let encoded = c.encode_block(&data).unwrap();
        // Declared element count larger than the stream holds.
        assert!(c.decode_block::<f64>(&encoded.bytes, 5, encoded.outliers as usize).is_err());
        // Declared outlier count disagrees with the stored values.
        assert!(c.decode_block::<f64>(&encoded.bytes, 3, 0).is_err());
    }
}
