// In: src/error.rs

//! This module defines the single, unified error type for the entire verification harness.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling,
//! and owns the mapping from failure kinds to process exit codes.

use thiserror::Error;

//==================================================================================
// 0. Exit Codes
//==================================================================================

/// Configuration errors print the usage message and exit with 0, like the legacy tool.
pub const EXIT_USAGE: i32 = 0;
/// The input resource could not be opened.
pub const EXIT_NOT_FOUND: i32 = 1;
/// The input resource has a different byte length than the declared shape requires.
pub const EXIT_SIZE_MISMATCH: i32 = 2;
/// Fewer bytes than requested could be read from the input resource.
pub const EXIT_SHORT_READ: i32 = 3;
/// The compression engine failed to compress or decompress.
pub const EXIT_BACKEND: i32 = 4;
/// A numeric or internal invariant was violated.
pub const EXIT_INTERNAL: i32 = 5;
/// The round trip completed but the reconstruction error was not below tolerance.
pub const EXIT_TOLERANCE_NOT_MET: i32 = -1;

/// Coarse classification of a `VerifyError`, used to pick the exit behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Backend,
    Internal,
}

#[derive(Error, Debug)]
pub enum VerifyError {
    // =========================================================================
    // === Configuration Errors (bad arguments, shapes, dimensions)
    // =========================================================================
    #[error("Unsupported dimensionality: {0} (expected between 1 and 5 dimensions)")]
    UnsupportedDimensionality(usize),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Missing argument: <{0}>")]
    MissingArgument(&'static str),

    #[error("Invalid value for <{name}>: '{value}'")]
    InvalidArgument { name: &'static str, value: String },

    #[error("Invalid backend configuration: {0}")]
    InvalidBackendConfig(String),

    // =========================================================================
    // === Data Source Errors
    // =========================================================================
    #[error("File error: {0} could not be opened")]
    NotFound(String),

    #[error("{path} contains {actual} bytes when {expected} were expected")]
    SizeMismatch {
        path: String,
        actual: u64,
        expected: u64,
    },

    #[error("Reading error: got {read} of {expected} bytes from {path}")]
    ShortRead {
        path: String,
        read: usize,
        expected: usize,
    },

    // =========================================================================
    // === Numeric Errors
    // =========================================================================
    #[error("Norm of an empty buffer is undefined")]
    EmptyInput,

    #[error(
        "Buffer length mismatch: original has {original} elements, \
         reconstructed has {reconstructed}"
    )]
    LengthMismatch { original: usize, reconstructed: usize },

    #[error("Pipeline has already finished in state '{0}'")]
    AlreadyFinished(String),

    // =========================================================================
    // === Backend / Payload Errors
    // =========================================================================
    #[error("Compression backend failed: {0}")]
    Backend(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Zstd operation failed: {0}")]
    ZstdError(String),

    #[error("LEB128 decoding error: {0}")]
    Leb128DecodeError(String),

    #[error("Pipeline execution failed at stage '{stage}': {source}")]
    PipelineError {
        stage: String,
        #[source]
        source: Box<VerifyError>,
    },

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a backend config.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An error raised when an N-d view cannot be built over a flat buffer.
    #[error("Array shape error: {0}")]
    ArrayShape(#[from] ndarray::ShapeError),

    /// An error from a safe byte-casting operation failing.
    #[error("Byte slice casting error: {0}")]
    PodCast(String), // Manual `From` impl is needed as bytemuck::PodCastError doesn't impl Error
}

impl VerifyError {
    /// Wraps an error with the name of the pipeline stage it occurred in.
    pub fn at_stage(self, stage: impl Into<String>) -> Self {
        VerifyError::PipelineError {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// Classifies the error, looking through any stage wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::UnsupportedDimensionality(_)
            | VerifyError::InvalidShape(_)
            | VerifyError::MissingArgument(_)
            | VerifyError::InvalidArgument { .. }
            | VerifyError::InvalidBackendConfig(_)
            | VerifyError::SerdeJson(_) => ErrorKind::Configuration,

            VerifyError::NotFound(_)
            | VerifyError::SizeMismatch { .. }
            | VerifyError::ShortRead { .. }
            | VerifyError::Io(_) => ErrorKind::Io,

            VerifyError::Backend(_)
            | VerifyError::MalformedPayload(_)
            | VerifyError::ZstdError(_)
            | VerifyError::Leb128DecodeError(_)
            | VerifyError::ArrayShape(_) => ErrorKind::Backend,

            VerifyError::EmptyInput
            | VerifyError::LengthMismatch { .. }
            | VerifyError::AlreadyFinished(_)
            | VerifyError::PodCast(_) => ErrorKind::Internal,

            VerifyError::PipelineError { source, .. } => source.kind(),
        }
    }

    /// The process exit code for this failure. Each data-source failure has its own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            VerifyError::PipelineError { source, .. } => source.exit_code(),
            VerifyError::NotFound(_) => EXIT_NOT_FOUND,
            VerifyError::SizeMismatch { .. } => EXIT_SIZE_MISMATCH,
            VerifyError::ShortRead { .. } => EXIT_SHORT_READ,
            other => match other.kind() {
                ErrorKind::Configuration => EXIT_USAGE,
                ErrorKind::Io => EXIT_NOT_FOUND,
                ErrorKind::Backend => EXIT_BACKEND,
                ErrorKind::Internal => EXIT_INTERNAL,
            },
        }
    }
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<bytemuck::PodCastError> for VerifyError {
    fn from(err: bytemuck::PodCastError) -> Self {
        VerifyError::PodCast(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_failures_have_distinct_exit_codes() {
        let not_found = VerifyError::NotFound("a.bin".into());
        let mismatch = VerifyError::SizeMismatch {
            path: "a.bin".into(),
            actual: 3,
            expected: 4,
        };
        let short = VerifyError::ShortRead {
            path: "a.bin".into(),
            read: 3,
            expected: 4,
        };

        let codes = [not_found.exit_code(), mismatch.exit_code(), short.exit_code()];
        assert_eq!(codes, [EXIT_NOT_FOUND, EXIT_SIZE_MISMATCH, EXIT_SHORT_READ]);
        assert!(codes.iter().all(|&c| c != 0));
    }

    #[test]
    fn test_configuration_errors_exit_with_usage_code() {
        let err = VerifyError::UnsupportedDimensionality(6);
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn test_stage_wrapper_preserves_classification() {
        let err = VerifyError::MalformedPayload("bad magic".into()).at_stage("Decompressed");
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.exit_code(), EXIT_BACKEND);
        assert!(err.to_string().contains("Decompressed"));
        assert!(err.to_string().contains("bad magic"));
    }
}
