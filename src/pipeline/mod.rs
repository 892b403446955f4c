//! The verification pipeline: data source, orchestration, and the run result.

mod orchestrator;
mod result;
mod source;


pub use orchestrator::{Stage, VerificationPipeline};
pub use result::{compression_ratio, PhaseTiming, RunResult};
pub use source::{DataSource, LoadedBuffer, SYNTHETIC_MARKER, SYNTHETIC_SEED};
