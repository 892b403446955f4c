// In: src/pipeline/orchestrator.rs

//! The verification state machine.
//!
//! A run moves through
//! `Configured -> Loaded -> Normed -> Compressed -> Decompressed -> Verified`
//! and ends in `Success` or `Failure`. Any error ends the run in `Failure`;
//! there are no retries. The pipeline owns the original and reconstructed
//! buffers for the whole run, so they are released on every exit path.

use std::fmt;
use std::time::Instant;

use crate::backend::{self, CompressRequest, CompressionBackend};
use crate::config::{BackendConfig, RunConfig};
use crate::error::VerifyError;
use crate::kernels::metrics;
use crate::pipeline::result::{compression_ratio, PhaseTiming, RunResult};
use crate::pipeline::source::DataSource;
use crate::report::{Phase, ReportingSink};
use crate::types::{Element, ErrorBoundMode, NormKind, Precision};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configured,
    Loaded,
    Normed,
    Compressed,
    Decompressed,
    Verified,
    Success,
    Failure,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Success | Stage::Failure)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub struct VerificationPipeline {
    config: RunConfig,
    backend_config: BackendConfig,
    backend: Box<dyn CompressionBackend>,
    stage: Stage,
}

impl VerificationPipeline {
    /// Creates a pipeline using the in-tree backend for `config.device`.
    pub fn new(config: RunConfig, backend_config: BackendConfig) -> Self {
        let backend = backend::for_device(config.device);
        Self::with_backend(config, backend_config, backend)
    }

    pub fn with_backend(
        config: RunConfig,
        backend_config: BackendConfig,
        backend: Box<dyn CompressionBackend>,
    ) -> Self {
        Self {
            config,
            backend_config,
            backend,
            stage: Stage::Configured,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Executes the run once. A tolerance miss is a normal outcome and is
    /// returned as `Ok` with `tolerance_met == false`.
    pub fn run(&mut self, sink: &mut dyn ReportingSink) -> Result<RunResult, VerifyError> {
        if self.stage != Stage::Configured {
            return Err(VerifyError::AlreadyFinished(self.stage.to_string()));
        }
        sink.print_config(&self.config);

        let outcome = match self.config.precision {
            Precision::Single => self.run_typed::<f32>(sink),
            Precision::Double => self.run_typed::<f64>(sink),
        };

        match &outcome {
            Ok(result) if result.tolerance_met => self.advance(Stage::Success),
            Ok(_) => self.advance(Stage::Failure),
            Err(e) => {
                log::error!("Run failed: {}", e);
                self.advance(Stage::Failure);
            }
        }
        outcome
    }

    fn advance(&mut self, next: Stage) {
        log::debug!("Pipeline stage: {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn run_typed<T: Element>(
        &mut self,
        sink: &mut dyn ReportingSink,
    ) -> Result<RunResult, VerifyError> {
        let shape = self.config.shape.clone();
        let mode = self.config.mode;
        let smoothness = self.config.smoothness;
        let metric = NormKind::for_element::<T>(smoothness);

        // --- Load ---
        let original_size_bytes = self.config.input_byte_len()?;
        let source = DataSource::from_identifier(&self.config.input);
        let loaded = source.load::<T>(original_size_bytes, self.config.enforce_size)?;
        if let Some(range) = loaded.min_max {
            sink.print_min_max(range.min.widen(), range.max.widen());
        }
        let original = loaded.data;
        self.advance(Stage::Loaded);

        // --- Norm ---
        let norm = metrics::norm(&original, metric)?;
        let effective_tolerance =
            mode.effective_tolerance(norm, T::cast_from(self.config.tolerance));
        if mode == ErrorBoundMode::Relative && norm == T::zero() {
            log::warn!("Input has zero {} norm; a relative bound cannot be met", metric);
        }
        self.advance(Stage::Normed);

        // --- Compress ---
        log::info!("Start compressing");
        let request = CompressRequest {
            shape: &shape,
            smoothness,
            tolerance: self.config.tolerance,
            mode,
            data: T::as_buffer_ref(&original),
        };
        let start = Instant::now();
        let payload = self
            .backend
            .compress(&request, &self.backend_config)
            .map_err(|e| e.at_stage(Stage::Compressed.to_string()))?;
        let compress = PhaseTiming {
            elapsed: start.elapsed(),
            bytes: original_size_bytes,
        };
        sink.print_phase(Phase::Compress, &compress);
        self.advance(Stage::Compressed);

        // --- Decompress ---
        log::info!("Start decompressing");
        let start = Instant::now();
        let restored = self
            .backend
            .decompress(&shape, T::PRECISION, &payload, &self.backend_config)
            .and_then(T::from_buffer)
            .map_err(|e| e.at_stage(Stage::Decompressed.to_string()))?;
        let decompress = PhaseTiming {
            elapsed: start.elapsed(),
            bytes: original_size_bytes,
        };
        if restored.len() != original.len() {
            return Err(VerifyError::Backend(format!(
                "decompression produced {} elements, expected {}",
                restored.len(),
                original.len()
            ))
            .at_stage(Stage::Decompressed.to_string()));
        }
        sink.print_phase(Phase::Decompress, &decompress);
        self.advance(Stage::Decompressed);

        // --- Verify ---
        let error = metrics::error(&original, &restored, metric)?;
        let tolerance_met = error < effective_tolerance;
        let measured_error = match mode {
            ErrorBoundMode::Relative => error / norm,
            ErrorBoundMode::Absolute => error,
        };
        self.advance(Stage::Verified);

        let result = RunResult {
            device: self.backend.device(),
            original_size_bytes,
            compressed_size_bytes: payload.len(),
            compression_ratio: compression_ratio(original_size_bytes, payload.len()),
            metric,
            mode,
            norm: norm.widen(),
            measured_error: measured_error.widen(),
            tolerance: self.config.tolerance,
            effective_tolerance: effective_tolerance.widen(),
            tolerance_met,
            compress,
            decompress,
        };
        log_metric!(
            "event" = "verified",
            "metric" = metric.label(),
            "ratio" = &result.compression_ratio,
            "error" = &result.measured_error,
            "tolerance_met" = &result.tolerance_met
        );
        sink.print_result(&result);
        Ok(result)
    }
}
