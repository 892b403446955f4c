//! Sequential backend for `Device::Cpu`.
//!
//! The buffer is cut into flat runs of `block_size` elements and encoded one
//! after another on the calling thread.

use std::time::Instant;

use super::payload::{CompressedPayload, PayloadBuilder};
use super::{gigabytes_per_second, open_payload, prepare, CompressRequest, CompressionBackend};
use crate::config::BackendConfig;
use crate::error::VerifyError;
use crate::types::{Buffer, BufferRef, Device, Element, Precision, Shape};

#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl CpuBackend {
    fn compress_typed<T: Element>(
        &self,
        data: &[T],
        request: &CompressRequest<'_>,
        config: &BackendConfig,
    ) -> Result<CompressedPayload, VerifyError> {
        let (header, codec) = prepare(data, request, config)?;
        let start = Instant::now();

        let mut builder = PayloadBuilder::new(header);
        for block in data.chunks(config.block_size) {
            builder.push(codec.encode_block(block)?);
        }
        let payload = builder.finish()?;

        if config.enable_timing {
            let seconds = start.elapsed().as_secs_f64();
            log::info!(
                "[CPU] encode: {:.6} s, {:.3} GB/s",
                seconds,
                gigabytes_per_second(std::mem::size_of_val(data), seconds)
            );
        }
        Ok(payload)
    }

    fn decompress_typed<T: Element>(
        &self,
        shape: &Shape,
        payload: &CompressedPayload,
        config: &BackendConfig,
    ) -> Result<Vec<T>, VerifyError> {
        let parsed = open_payload(payload, shape, T::PRECISION)?;
        let codec = parsed.header.codec;
        let start = Instant::now();

        let mut values = Vec::with_capacity(shape.num_elements());
        for (entry, stream) in parsed.blocks() {
            let block: Vec<T> =
                codec.decode_block(stream, entry.elements as usize, entry.outliers as usize)?;
            values.extend_from_slice(&block);
        }

        if config.enable_timing {
            let seconds = start.elapsed().as_secs_f64();
            log::info!(
                "[CPU] decode: {:.6} s, {:.3} GB/s",
                seconds,
                gigabytes_per_second(std::mem::size_of_val(values.as_slice()), seconds)
            );
        }
        Ok(values)
    }
}

impl CompressionBackend for CpuBackend {
    fn device(&self) -> Device {
        Device::Cpu
    }

    fn compress(
        &self,
        request: &CompressRequest<'_>,
        config: &BackendConfig,
    ) -> Result<CompressedPayload, VerifyError> {
        match request.data {
            BufferRef::F32(data) => self.compress_typed(data, request, config),
            BufferRef::F64(data) => self.compress_typed(data, request, config),
        }
    }

    fn decompress(
        &self,
        shape: &Shape,
        precision: Precision,
        payload: &CompressedPayload,
        config: &BackendConfig,
    ) -> Result<Buffer, VerifyError> {
        Ok(match precision {
            Precision::Single => f32::into_buffer(self.decompress_typed(shape, payload, config)?),
            Precision::Double => f64::into_buffer(self.decompress_typed(shape, payload, config)?),
        })
    }
}
