//! The three seams of a chunk-oriented step: reader, processor, writer.

use batchline_shared::Result;

/// What a processor decided to do with one item.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorAction<O> {
    /// Pass the transformed item on to the writer.
    Keep(O),
    /// Filter the item out of the chunk. Counted, not written, not an error.
    Skip,
}

/// Retrieval of input for a step, one item at a time.
///
/// Implementations are forward-only and single-pass: once `read` returns
/// `Ok(None)` the source is exhausted and a fresh reader must be constructed
/// to re-read from the start. `read` may block on I/O.
pub trait ItemReader<I> {
    async fn read(&mut self) -> Result<Option<I>>;
}

/// The business transform applied to each item read.
///
/// Must be pure and stateless: same input, same output, no side effects.
/// Returning an error marks the item as a transform failure, which counts
/// against the step's skip limit.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: &I) -> Result<ProcessorAction<O>>;
}

/// Output of a step, one chunk of items at a time.
///
/// A `write` call is the chunk's commit point and must be atomic: either the
/// whole batch lands in the sink or the sink is left exactly as it was.
/// `open` prepares the sink at step start (e.g. create/truncate a file) and
/// `close` releases it at step end; both are invoked exactly once per step.
pub trait ItemWriter<O> {
    fn open(&mut self) -> Result<()>;
    fn write(&mut self, items: &[O]) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}
