//! This module defines the core, strongly-typed run parameters used
//! throughout the verification pipeline.
//!
//! `Shape`, `Precision`, `ErrorBoundMode`, `NormKind`, and `Device` are plain
//! configuration values: created once per run and never mutated. The `Element`
//! trait and the `Buffer`/`BufferRef` enums carry element data across the
//! backend boundary without making the backend trait generic.

pub mod element;
pub mod modes;
pub mod shape;

// Re-export the main type(s) for easier access.
pub use element::{Buffer, BufferRef, Element, Precision};
pub use modes::{Device, ErrorBoundMode, NormKind};
pub use shape::{Shape, MAX_DIMS, MIN_DIMS};
