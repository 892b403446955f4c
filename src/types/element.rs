//! This module defines the two element precisions the harness runs with, the
//! `Element` trait that lets the pipeline be written once for both, and the
//! precision-tagged buffers exchanged with a compression backend.

use bytemuck::Pod;
use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VerifyError;

/// The floating-point width used for the entire run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    pub fn element_size(&self) -> usize {
        match self {
            Self::Single => std::mem::size_of::<f32>(),
            Self::Double => std::mem::size_of::<f64>(),
        }
    }

    /// Stable tag used by the payload format.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Self::Single => 0,
            Self::Double => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Single),
            1 => Some(Self::Double),
            _ => None,
        }
    }
}

/// Parses the command-line spelling: `s` or `d`.
impl FromStr for Precision {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s" => Ok(Self::Single),
            "d" => Ok(Self::Double),
            other => Err(VerifyError::InvalidArgument {
                name: "precision",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single precision"),
            Self::Double => write!(f, "double precision"),
        }
    }
}

//==================================================================================
// Precision-tagged buffers
//==================================================================================

/// A borrowed, precision-tagged view of an element buffer.
#[derive(Debug, Clone, Copy)]
pub enum BufferRef<'a> {
    F32(&'a [f32]),
    F64(&'a [f64]),
}

impl BufferRef<'_> {
    pub fn precision(&self) -> Precision {
        match self {
            Self::F32(_) => Precision::Single,
            Self::F64(_) => Precision::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F32(d) => d.len(),
            Self::F64(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An owned, precision-tagged element buffer, as returned by decompression.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Buffer {
    pub fn precision(&self) -> Precision {
        match self {
            Self::F32(_) => Precision::Single,
            Self::F64(_) => Precision::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F32(d) => d.len(),
            Self::F64(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//==================================================================================
// The Element trait
//==================================================================================

/// A floating-point element type the pipeline can be instantiated with.
///
/// All norm, error, and tolerance arithmetic is carried out in `Self`, so an
/// `f32` run accumulates in single precision exactly like the legacy tool.
pub trait Element:
    Float + Pod + Send + Sync + fmt::Debug + fmt::Display + fmt::LowerExp + 'static
{
    const PRECISION: Precision;

    /// Rounds an `f64` parameter (tolerance, `s`, a reconstructed value) into `Self`.
    fn cast_from(value: f64) -> Self;

    /// Widens to `f64` for reporting.
    fn widen(self) -> f64;

    fn as_buffer_ref(data: &[Self]) -> BufferRef<'_>;

    fn from_buffer_ref(buffer: BufferRef<'_>) -> Option<&[Self]>;

    fn into_buffer(data: Vec<Self>) -> Buffer;

    /// Unwraps an owned buffer, failing if its precision differs from `Self`.
    fn from_buffer(buffer: Buffer) -> Result<Vec<Self>, VerifyError>;
}

impl Element for f32 {
    const PRECISION: Precision = Precision::Single;

    fn cast_from(value: f64) -> Self {
        value as f32
    }

    fn widen(self) -> f64 {
        self as f64
    }

    fn as_buffer_ref(data: &[Self]) -> BufferRef<'_> {
        BufferRef::F32(data)
    }

    fn from_buffer_ref(buffer: BufferRef<'_>) -> Option<&[Self]> {
        match buffer {
            BufferRef::F32(d) => Some(d),
            BufferRef::F64(_) => None,
        }
    }

    fn into_buffer(data: Vec<Self>) -> Buffer {
        Buffer::F32(data)
    }

    fn from_buffer(buffer: Buffer) -> Result<Vec<Self>, VerifyError> {
        match buffer {
            Buffer::F32(d) => Ok(d),
            Buffer::F64(_) => Err(VerifyError::Backend(
                "expected a single precision buffer, got double precision".to_string(),
            )),
        }
    }
}

impl Element for f64 {
    const PRECISION: Precision = Precision::Double;

    fn cast_from(value: f64) -> Self {
        value
    }

    fn widen(self) -> f64 {
        self
    }

    fn as_buffer_ref(data: &[Self]) -> BufferRef<'_> {
        BufferRef::F64(data)
    }

    fn from_buffer_ref(buffer: BufferRef<'_>) -> Option<&[Self]> {
        match buffer {
            BufferRef::F64(d) => Some(d),
            BufferRef::F32(_) => None,
        }
    }

    fn into_buffer(data: Vec<Self>) -> Buffer {
        Buffer::F64(data)
    }

    fn from_buffer(buffer: Buffer) -> Result<Vec<Self>, VerifyError> {
        match buffer {
            Buffer::F64(d) => Ok(d),
            Buffer::F32(_) => Err(VerifyError::Backend(
                "expected a double precision buffer, got single precision".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_parsing() {
        assert_eq!("s".parse::<Precision>().unwrap(), Precision::Single);
        assert_eq!("d".parse::<Precision>().unwrap(), Precision::Double);
        assert!("f".parse::<Precision>().is_err());
        assert_eq!(Precision::Double.element_size(), 8);
    }

    #[test]
    fn test_buffer_precision_mismatch_is_rejected() {
        let buffer = Buffer::F64(vec![1.0, 2.0]);
        assert!(f32::from_buffer(buffer.clone()).is_err());
        assert_eq!(f64::from_buffer(buffer).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_buffer_ref_roundtrip_through_element() {
        let data = [1.5f32, -2.0];
        let view = f32::as_buffer_ref(&data);
        assert_eq!(view.precision(), Precision::Single);
        assert_eq!(f32::from_buffer_ref(view), Some(&data[..]));
        assert_eq!(f64::from_buffer_ref(view), None);
    }
}
