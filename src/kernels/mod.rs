//! Pure, stateless numeric and byte kernels.
//!
//! * `metrics`  - norms, reconstruction errors, and min/max diagnostics.
//! * `quantize` - the error-bounded uniform quantizer.
//! * `leb128`   - varint packing for the internal lossless stage.
//! * `zstd`     - framed Zstandard coding for the secondary lossless stage.

pub mod leb128;
pub mod metrics;
pub mod quantize;
pub mod zstd;

pub use metrics::{error, min_max, norm, MinMax};
