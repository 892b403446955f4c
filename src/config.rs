// In: src/config.rs

//! The single source of truth for run and backend configuration.
//!
//! `RunConfig` describes one verification run (what to load, how to judge it).
//! `BackendConfig` is the engine tuning the pipeline never interprets: it is
//! created once at the application boundary (defaults, a JSON file, or the
//! environment) and then passed by reference into every compress and
//! decompress call. Neither value is mutated after construction.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::VerifyError;
use crate::types::{Device, ErrorBoundMode, Precision, Shape};

/// Environment variable naming a JSON file with a `BackendConfig`.
pub const BACKEND_CONFIG_ENV: &str = "MGARD_VERIFY_BACKEND_CONFIG";

//==================================================================================
// I. Backend Configuration
//==================================================================================

/// Tuning for the compression engine's lossless stages and execution checks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct BackendConfig {
    /// Number of quantization symbols the internal lossless stage codes directly.
    /// Values outside the dictionary are escaped and stored verbatim.
    pub dictionary_size: u32,

    /// Number of elements per block for the internal lossless stage.
    pub block_size: usize,

    /// If true, every block stream is additionally passed through the
    /// secondary (zstd) lossless codec.
    pub enable_secondary_lossless: bool,

    /// Frame size in bytes for the secondary lossless codec.
    pub secondary_block_size: usize,

    /// Bounds peak intermediate memory on the accelerated device by encoding
    /// blocks in waves instead of all at once.
    pub reduce_memory_footprint: bool,

    /// Re-checks each block produced on the accelerated device before it is
    /// committed to the payload.
    pub synchronize_and_check_kernels: bool,

    /// Logs per-stage timings from inside the backend.
    pub enable_timing: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            dictionary_size: 8192,
            block_size: 1024 * 30,
            enable_secondary_lossless: false,
            secondary_block_size: 1 << 15,
            reduce_memory_footprint: true,
            synchronize_and_check_kernels: true,
            enable_timing: true,
        }
    }
}

impl BackendConfig {
    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, VerifyError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VerifyError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            VerifyError::InvalidBackendConfig(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Loads the file named by `MGARD_VERIFY_BACKEND_CONFIG`, or the defaults if unset.
    pub fn from_env() -> Result<Self, VerifyError> {
        match std::env::var_os(BACKEND_CONFIG_ENV) {
            Some(path) => {
                log::info!("Loading backend configuration from {:?}", path);
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), VerifyError> {
        if self.dictionary_size < 2 {
            return Err(VerifyError::InvalidBackendConfig(format!(
                "dictionary_size must be at least 2, got {}",
                self.dictionary_size
            )));
        }
        if self.block_size == 0 {
            return Err(VerifyError::InvalidBackendConfig(
                "block_size must be positive".to_string(),
            ));
        }
        if self.secondary_block_size == 0 {
            return Err(VerifyError::InvalidBackendConfig(
                "secondary_block_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

//==================================================================================
// II. Run Configuration
//==================================================================================

/// The parameters of one verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// A file path, or `random` for the synthetic source.
    pub input: String,
    pub precision: Precision,
    pub shape: Shape,
    pub mode: ErrorBoundMode,
    /// User tolerance, in the units selected by `mode`.
    pub tolerance: f64,
    /// Smoothness parameter; `+inf` selects the L-infinity metric.
    pub smoothness: f64,
    pub device: Device,
    /// If true, a file input must be exactly the declared byte size.
    pub enforce_size: bool,
}

impl RunConfig {
    /// Byte size of the input array.
    pub fn input_byte_len(&self) -> Result<usize, VerifyError> {
        self.shape.byte_len(self.precision.element_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_backend_config_matches_legacy_tool() {
        let config = BackendConfig::default();
        assert_eq!(config.dictionary_size, 8192);
        assert_eq!(config.block_size, 30720);
        assert!(!config.enable_secondary_lossless);
        assert_eq!(config.secondary_block_size, 32768);
        assert!(config.reduce_memory_footprint);
        assert!(config.synchronize_and_check_kernels);
        assert!(config.enable_timing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "enable_secondary_lossless": true, "block_size": 64 }"#;
        let config = BackendConfig::from_json_str(json).unwrap();
        assert!(config.enable_secondary_lossless);
        assert_eq!(config.block_size, 64);
        assert_eq!(config.dictionary_size, 8192);
    }

    #[test]
    fn test_invalid_backend_config_is_rejected() {
        let err = BackendConfig::from_json_str(r#"{ "dictionary_size": 1 }"#).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidBackendConfig(_)));
        let err = BackendConfig::from_json_str(r#"{ "block_size": 0 }"#).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidBackendConfig(_)));
        assert!(BackendConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_backend_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "enable_timing": false }}"#).unwrap();
        let config = BackendConfig::from_file(file.path()).unwrap();
        assert!(!config.enable_timing);
    }

    #[test]
    fn test_run_config_byte_len() {
        let config = RunConfig {
            input: "random".into(),
            precision: Precision::Single,
            shape: Shape::new(vec![10, 10]).unwrap(),
            mode: ErrorBoundMode::Absolute,
            tolerance: 5.0,
            smoothness: 0.0,
            device: Device::Cpu,
            enforce_size: false,
        };
        assert_eq!(config.input_byte_len().unwrap(), 400);
    }
}
