//! ELF-to-RPX conversion pipeline.
//!
//! The binary in `main.rs` is a thin wrapper; the transformation passes
//! live here so integration tests can drive the pipeline in-process.

pub mod passes;
pub mod verbose;
