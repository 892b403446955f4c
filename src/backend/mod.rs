// In: src/backend/mod.rs

//! The compression engine seam.
//!
//! The pipeline talks to an engine only through `CompressionBackend`. Two
//! in-tree engines implement it, one per `Device`; both write the same
//! self-describing payload format, so a payload produced on one device
//! decodes on the other.

pub(crate) mod codec;
pub mod payload;

mod accelerated;
mod cpu;


pub use accelerated::AcceleratedBackend;
pub use cpu::CpuBackend;
pub use payload::CompressedPayload;

use crate::backend::codec::{plan_encoding, BlockCodec};
use crate::backend::payload::{ParsedPayload, PayloadHeader};
use crate::config::BackendConfig;
use crate::error::VerifyError;
use crate::types::{Buffer, BufferRef, Device, Element, ErrorBoundMode, Precision, Shape};

//==================================================================================
// 1. Public API
//==================================================================================

/// Everything a backend needs to compress one buffer.
///
/// `tolerance` is the user tolerance exactly as given; in relative mode the
/// backend performs its own conversion to an absolute bound.
#[derive(Debug, Clone, Copy)]
pub struct CompressRequest<'a> {
    pub shape: &'a Shape,
    pub smoothness: f64,
    pub tolerance: f64,
    pub mode: ErrorBoundMode,
    pub data: BufferRef<'a>,
}

/// A compression engine. Calls are synchronous and block until completion.
pub trait CompressionBackend: Send + Sync {
    /// The device this backend executes on.
    fn device(&self) -> Device;

    fn compress(
        &self,
        request: &CompressRequest<'_>,
        config: &BackendConfig,
    ) -> Result<CompressedPayload, VerifyError>;

    /// Reconstructs a buffer of exactly `shape.num_elements()` elements.
    fn decompress(
        &self,
        shape: &Shape,
        precision: Precision,
        payload: &CompressedPayload,
        config: &BackendConfig,
    ) -> Result<Buffer, VerifyError>;
}

/// Returns the in-tree backend for `device`.
pub fn for_device(device: Device) -> Box<dyn CompressionBackend> {
    match device {
        Device::Cpu => Box::new(CpuBackend),
        Device::Gpu => Box::new(AcceleratedBackend),
    }
}

//==================================================================================
// 2. Shared Helpers
//==================================================================================

/// Validates a request and derives the block codec for its data.
fn prepare<T: Element>(
    data: &[T],
    request: &CompressRequest<'_>,
    config: &BackendConfig,
) -> Result<(PayloadHeader, BlockCodec), VerifyError> {
    config.validate()?;
    if data.len() != request.shape.num_elements() {
        return Err(VerifyError::Backend(format!(
            "buffer holds {} elements but shape {} needs {}",
            data.len(),
            request.shape,
            request.shape.num_elements()
        )));
    }
    if data.is_empty() {
        return Err(VerifyError::Backend("cannot compress an empty buffer".to_string()));
    }

    let codec = BlockCodec {
        encoding: plan_encoding(data, request.smoothness, request.tolerance, request.mode)?,
        dictionary_size: config.dictionary_size,
        secondary_frame_size: config
            .enable_secondary_lossless
            .then_some(config.secondary_block_size),
    };
    let header = PayloadHeader {
        precision: T::PRECISION,
        mode: request.mode,
        dims: request.shape.dims().to_vec(),
        smoothness: request.smoothness,
        tolerance: request.tolerance,
        codec,
        blocks: Vec::new(),
    };
    Ok((header, codec))
}

/// Parses a payload and checks it describes the requested array.
fn open_payload<'a>(
    payload: &'a CompressedPayload,
    shape: &Shape,
    precision: Precision,
) -> Result<ParsedPayload<'a>, VerifyError> {
    let parsed = ParsedPayload::parse(payload)?;
    parsed.header.validate(shape, precision)?;
    Ok(parsed)
}

/// Throughput in GB/s, for timing logs.
fn gigabytes_per_second(bytes: usize, seconds: f64) -> f64 {
    if seconds > 0.0 {
        bytes as f64 / seconds / 1e9
    } else {
        f64::INFINITY
    }
}
