//! Produces the input buffer of a run: synthetic data or the contents of a file.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::VerifyError;
use crate::kernels::{min_max, MinMax};
use crate::types::Element;
use crate::utils::bytes_to_typed_vec;

/// Input identifier selecting the synthetic source.
pub const SYNTHETIC_MARKER: &str = "random";
/// Seed of the synthetic source's generator.
pub const SYNTHETIC_SEED: u64 = 7117;

/// A loaded input buffer and its value range.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedBuffer<T> {
    pub data: Vec<T>,
    /// `None` only if every element is NaN.
    pub min_max: Option<MinMax<T>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Integers in `[1, 100]` drawn from `StdRng` seeded with `SYNTHETIC_SEED`.
    Synthetic,
    File(PathBuf),
}

impl DataSource {
    pub fn from_identifier(identifier: &str) -> Self {
        if identifier == SYNTHETIC_MARKER {
            DataSource::Synthetic
        } else {
            DataSource::File(PathBuf::from(identifier))
        }
    }

    /// Loads exactly `expected_bytes` bytes worth of elements.
    ///
    /// For a file source, `enforce_size` additionally requires the file to be
    /// exactly `expected_bytes` long.
    pub fn load<T: Element>(
        &self,
        expected_bytes: usize,
        enforce_size: bool,
    ) -> Result<LoadedBuffer<T>, VerifyError> {
        let data = match self {
            DataSource::Synthetic => synthesize(expected_bytes / std::mem::size_of::<T>()),
            DataSource::File(path) => read_file(path, expected_bytes, enforce_size)?,
        };
        let min_max = min_max(&data);
        Ok(LoadedBuffer { data, min_max })
    }
}

fn synthesize<T: Element>(len: usize) -> Vec<T> {
    let mut rng = StdRng::seed_from_u64(SYNTHETIC_SEED);
    (0..len)
        .map(|_| T::cast_from(rng.random_range(1..=100u32) as f64))
        .collect()
}

fn read_file<T: Element>(
    path: &Path,
    expected_bytes: usize,
    enforce_size: bool,
) -> Result<Vec<T>, VerifyError> {
    let name = path.display().to_string();
    log::info!("Loading file: {}", name);

    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => VerifyError::NotFound(name.clone()),
        _ => VerifyError::Io(e),
    })?;

    if enforce_size {
        let actual = file.metadata()?.len();
        if actual != expected_bytes as u64 {
            return Err(VerifyError::SizeMismatch {
                path: name,
                actual,
                expected: expected_bytes as u64,
            });
        }
    }

    let mut bytes = Vec::with_capacity(expected_bytes);
    file.take(expected_bytes as u64).read_to_end(&mut bytes)?;
    if bytes.len() < expected_bytes {
        return Err(VerifyError::ShortRead {
            path: name,
            read: bytes.len(),
            expected: expected_bytes,
        });
    }
    bytes_to_typed_vec(&bytes)
}
