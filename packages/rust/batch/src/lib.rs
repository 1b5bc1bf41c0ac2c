//! Chunk-oriented batch engine for Batchline.
//!
//! The engine drives data through three seams — a reader, a processor, and a
//! writer — in fixed-size committed chunks:
//!
//! - [`ItemReader`] yields items one at a time from a forward-only source.
//! - [`ItemProcessor`] applies a pure transform (or filters an item out).
//! - [`ItemWriter`] lands a whole chunk in the sink atomically.
//!
//! A [`Step`] pulls up to `chunk_size` items, processes them in order, and
//! hands the batch to the writer; the writer call is the chunk's commit
//! point. A [`Job`] runs its steps sequentially and stops at the first
//! failure. Committed chunks stay committed when a later chunk fails.

pub mod item;
pub mod job;
pub mod listener;
pub mod processor;
pub mod step;

pub use item::{ItemProcessor, ItemReader, ItemWriter, ProcessorAction};
pub use job::{Job, JobBuilder, JobExecution, JobStatus};
pub use listener::{NoopListener, StepListener};
pub use processor::UppercaseNameProcessor;
pub use step::{Step, StepBuilder, StepExecution, StepStatus};
