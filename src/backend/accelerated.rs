//! Data-parallel backend for `Device::Gpu`.
//!
//! The array is viewed through `ndarray` and cut into slabs along its
//! outermost axis, each slab holding as many whole hyperplanes as fit in
//! `block_size` elements. Slabs are encoded and decoded on the rayon pool.
//!
//! Execution toggles from `BackendConfig`:
//! * `reduce_memory_footprint` encodes in waves of one block per worker
//!   thread, so at most one wave of intermediate streams is alive at a time.
//! * `synchronize_and_check_kernels` decodes every freshly encoded block and
//!   checks it against its source before it is committed.
//! * `enable_timing` logs the duration and throughput of each stage.

use std::time::Instant;

use ndarray::{ArrayD, ArrayViewD, Axis};
use rayon::prelude::*;

use super::codec::{BlockCodec, EncodedBlock};
use super::payload::{CompressedPayload, PayloadBuilder};
use super::{gigabytes_per_second, open_payload, prepare, CompressRequest, CompressionBackend};
use crate::config::BackendConfig;
use crate::error::VerifyError;
use crate::types::{Buffer, BufferRef, Device, Element, Precision, Shape};

#[derive(Debug, Default, Clone, Copy)]
pub struct AcceleratedBackend;

/// Logs one stage timing when instrumentation is enabled.
fn log_stage(config: &BackendConfig, stage: &str, bytes: usize, start: Instant) {
    if config.enable_timing {
        let seconds = start.elapsed().as_secs_f64();
        log::info!(
            "[GPU] {}: {:.6} s, {:.3} GB/s",
            stage,
            seconds,
            gigabytes_per_second(bytes, seconds)
        );
    }
}

/// Encodes a group of blocks in parallel, preserving their order.
fn encode_wave<T: Element>(
    codec: &BlockCodec,
    blocks: &[&[T]],
    check: bool,
) -> Result<Vec<EncodedBlock>, VerifyError> {
    blocks
        .par_iter()
        .map(|block| {
            let encoded = codec.encode_block(block)?;
            if check {
                codec.check_block(block, &encoded)?;
            }
            Ok(encoded)
        })
        .collect()
}

impl AcceleratedBackend {
    fn compress_typed<T: Element>(
        &self,
        data: &[T],
        request: &CompressRequest<'_>,
        config: &BackendConfig,
    ) -> Result<CompressedPayload, VerifyError> {
        let (header, codec) = prepare(data, request, config)?;
        let shape = request.shape;

        let start = Instant::now();
        let view = ArrayViewD::from_shape(shape.to_ix(), data)?;
        let slabs_per_block = (config.block_size / shape.slab_len()).max(1);
        let blocks = view
            .axis_chunks_iter(Axis(0), slabs_per_block)
            .map(|slab| {
                slab.to_slice()
                    .ok_or_else(|| VerifyError::Backend("slab is not contiguous".to_string()))
            })
            .collect::<Result<Vec<&[T]>, _>>()?;
        log::debug!(
            "[GPU] {} blocks of up to {} hyperplanes",
            blocks.len(),
            slabs_per_block
        );

        let mut builder = PayloadBuilder::new(header);
        let wave_size = if config.reduce_memory_footprint {
            rayon::current_num_threads().max(1)
        } else {
            blocks.len().max(1)
        };
        for wave in blocks.chunks(wave_size) {
            for encoded in encode_wave(&codec, wave, config.synchronize_and_check_kernels)? {
                builder.push(encoded);
            }
        }
        log_stage(config, "encode", std::mem::size_of_val(data), start);

        let start = Instant::now();
        let payload = builder.finish()?;
        log_stage(config, "serialize", payload.len(), start);
        Ok(payload)
    }

    fn decompress_typed<T: Element>(
        &self,
        shape: &Shape,
        payload: &CompressedPayload,
        config: &BackendConfig,
    ) -> Result<Vec<T>, VerifyError> {
        let start = Instant::now();
        let parsed = open_payload(payload, shape, T::PRECISION)?;
        let codec = parsed.header.codec;
        log_stage(config, "deserialize", payload.len(), start);

        let start = Instant::now();
        let decoded = parsed
            .blocks()
            .par_iter()
            .map(|(entry, stream)| {
                codec.decode_block::<T>(stream, entry.elements as usize, entry.outliers as usize)
            })
            .collect::<Result<Vec<_>, VerifyError>>()?;

        // Reassemble and confirm the reconstruction fills the declared shape.
        let array = ArrayD::from_shape_vec(shape.to_ix(), decoded.concat())?;
        let (values, _) = array.into_raw_vec_and_offset();
        log_stage(config, "decode", std::mem::size_of_val(values.as_slice()), start);
        Ok(values)
    }
}

impl CompressionBackend for AcceleratedBackend {
    fn device(&self) -> Device {
        Device::Gpu
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
