//! This file is the root of the `mgard_verify` Rust crate.
//!
//! The crate is a round-trip verification harness for error-bounded lossy
//! compression of N-dimensional floating-point arrays: it loads or synthesizes
//! an array, compresses and decompresses it through a `CompressionBackend`, and
//! checks the reconstruction error against the requested tolerance.
//!
//! Its responsibilities here are limited to declaring the top-level modules and
//! re-exporting the types a caller needs to drive one verification run.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod kernels;
pub mod pipeline;
pub mod report;
pub mod types;

mod utils;

//==================================================================================
// 2. Public Re-exports
//==================================================================================
pub use backend::{CompressRequest, CompressedPayload, CompressionBackend};
pub use config::{BackendConfig, RunConfig};
pub use error::VerifyError;
pub use pipeline::{RunResult, Stage, VerificationPipeline};
pub use report::{ConsoleReporter, JsonReporter, ReportingSink};
pub use types::{Device, ErrorBoundMode, NormKind, Precision, Shape};
