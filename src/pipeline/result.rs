//! The immutable outcome of one verification run.

use serde::Serialize;
use std::time::Duration;

use crate::types::{Device, ErrorBoundMode, NormKind};

/// Wall-clock duration of one backend call and the bytes it processed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseTiming {
    #[serde(rename = "elapsed_seconds", serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
    pub bytes: usize,
}

impl PhaseTiming {
    /// Bytes per second, or `None` if the phase took no measurable time.
    pub fn throughput(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        (seconds > 0.0).then(|| self.bytes as f64 / seconds)
    }
}

fn serialize_seconds<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub device: Device,
    pub original_size_bytes: usize,
    pub compressed_size_bytes: usize,
    /// `original / compressed`; never truncated, `inf` for an empty payload.
    pub compression_ratio: f64,
    pub metric: NormKind,
    pub mode: ErrorBoundMode,
    /// Norm of the original data under `metric`, widened to `f64`.
    pub norm: f64,
    /// Reconstruction error; relative to `norm` in relative mode.
    pub measured_error: f64,
    /// The user tolerance, in the same units as `measured_error`.
    pub tolerance: f64,
    /// Absolute bound the reconstruction error was checked against.
    pub effective_tolerance: f64,
    pub tolerance_met: bool,
    pub compress: PhaseTiming,
    pub decompress: PhaseTiming,
}

pub fn compression_ratio(original_size_bytes: usize, compressed_size_bytes: usize) -> f64 {
    if compressed_size_bytes == 0 {
        f64::INFINITY
    } else {
        original_size_bytes as f64 / compressed_size_bytes as f64
    }
}
