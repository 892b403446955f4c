//! Run-level mode enums: how the tolerance is interpreted, which metric governs
//! the run, and which device executes the compression engine.

use num_traits::Float;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::VerifyError;
use crate::types::Element;

/// Whether the user tolerance bounds the error directly or as a fraction of the data norm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorBoundMode {
    Absolute,
    Relative,
}

impl ErrorBoundMode {
    /// Converts a user tolerance into absolute units.
    ///
    /// This is the only place the conversion is written down. The verifier and
    /// every backend call it with values in the buffer's own precision, so both
    /// sides produce the same bits.
    pub fn effective_tolerance<T: Float>(self, norm: T, tolerance: T) -> T {
        match self {
            Self::Absolute => tolerance,
            Self::Relative => tolerance * norm,
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            Self::Absolute => 0,
            Self::Relative => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Absolute),
            1 => Some(Self::Relative),
            _ => None,
        }
    }
}

impl FromStr for ErrorBoundMode {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abs" => Ok(Self::Absolute),
            "rel" => Ok(Self::Relative),
            other => Err(VerifyError::InvalidArgument {
                name: "mode",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ErrorBoundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "Absolute"),
            Self::Relative => write!(f, "Relative"),
        }
    }
}

/// The metric used for both the reference norm and the reconstruction error.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormKind {
    L2,
    LInf,
}

impl NormKind {
    /// `s == +inf` selects L-infinity; every other value (including NaN) selects L2.
    pub fn from_smoothness(s: f64) -> Self {
        if s == f64::INFINITY {
            Self::LInf
        } else {
            Self::L2
        }
    }

    /// Same rule, applied to `s` after conversion to the element precision.
    ///
    /// A finite `s` beyond `f32::MAX` becomes infinite in single precision and
    /// selects L-infinity there.
    pub fn for_element<T: Element>(s: f64) -> Self {
        Self::from_smoothness(T::cast_from(s).widen())
    }

    /// Label used in result lines, e.g. `L^infty`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::L2 => "L^2",
            Self::LInf => "L^infty",
        }
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The execution device for the compression engine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

impl FromStr for Device {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            other => Err(VerifyError::InvalidArgument {
                name: "device",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Gpu => write!(f, "GPU"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinite_smoothness_selects_linf() {
        assert_eq!(NormKind::from_smoothness(f64::INFINITY), NormKind::LInf);
        assert_eq!(NormKind::from_smoothness(0.0), NormKind::L2);
        assert_eq!(NormKind::from_smoothness(f64::NEG_INFINITY), NormKind::L2);
        assert_eq!(NormKind::from_smoothness(f64::NAN), NormKind::L2);
        let parsed = "inf".parse::<f64>().map(NormKind::from_smoothness).unwrap();
        assert_eq!(parsed, NormKind::LInf);
    }

    #[test]
    fn test_smoothness_rule_follows_element_precision() {
        assert_eq!(NormKind::for_element::<f32>(1e39), NormKind::LInf);
        assert_eq!(NormKind::for_element::<f64>(1e39), NormKind::L2);
        assert_eq!(NormKind::for_element::<f32>(-1e39), NormKind::L2);
        assert_eq!(NormKind::for_element::<f32>(3.0e38), NormKind::L2);
        assert_eq!(NormKind::for_element::<f64>(f64::INFINITY), NormKind::LInf);
    }

    #[test]
    fn test_effective_tolerance() {
        assert_eq!(ErrorBoundMode::Absolute.effective_tolerance(8.0f64, 0.5), 0.5);
        assert_eq!(ErrorBoundMode::Relative.effective_tolerance(8.0f64, 0.5), 4.0);
        assert_eq!(ErrorBoundMode::Relative.effective_tolerance(3.0f32, 0.1), 3.0f32 * 0.1f32);
    }

    #[test]
    fn test_mode_and_device_parsing() {
        assert_eq!("rel".parse::<ErrorBoundMode>().unwrap(), ErrorBoundMode::Relative);
        assert_eq!("abs".parse::<ErrorBoundMode>().unwrap(), ErrorBoundMode::Absolute);
        assert!("REL".parse::<ErrorBoundMode>().is_err());
        assert_eq!("gpu".parse::<Device>().unwrap(), Device::Gpu);
        assert!("tpu".parse::<Device>().is_err());
    }
}
