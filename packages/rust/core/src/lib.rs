//! Composition root for Batchline.
//!
//! Wires storage, the batch engine, and the flat-file writer into the
//! end-to-end employee export pipeline.

pub mod pipeline;

pub use pipeline::{ExportJobConfig, ExportResult, SeedOutcome, run_export, seed};
