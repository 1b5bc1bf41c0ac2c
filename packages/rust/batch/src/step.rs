//! The chunked step driver.
//!
//! A step pulls up to `chunk_size` items from its reader, processes them in
//! order, and hands the batch to its writer. The writer call is the chunk's
//! commit point: it either lands the whole chunk in the sink or leaves the
//! sink untouched, so a failed chunk rolls back cleanly while previously
//! committed chunks stay committed.

use std::marker::PhantomData;

use batchline_shared::{BatchlineError, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::item::{ItemProcessor, ItemReader, ItemWriter, ProcessorAction};
use crate::listener::StepListener;

/// Step state machine: `Ready → Running → (Completed | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Ready,
    Running,
    Completed,
    Failed,
}

/// Execution record for one step run. In-memory only — Batchline does not
/// persist execution metadata.
#[derive(Debug)]
pub struct StepExecution {
    /// Time-sortable execution identifier.
    pub id: Uuid,
    /// Step name.
    pub name: String,
    /// Terminal (or current) status.
    pub status: StepStatus,
    /// Items pulled from the reader.
    pub read_count: usize,
    /// Items the processor filtered out (not errors).
    pub filter_count: usize,
    /// Transform failures tolerated under the skip limit.
    pub skip_count: usize,
    /// Items handed to the writer in committed chunks.
    pub write_count: usize,
    /// Chunks committed.
    pub chunk_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// The error that failed the step, if any.
    pub failure: Option<BatchlineError>,
}

impl StepExecution {
    fn new(name: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.to_string(),
            status: StepStatus::Ready,
            read_count: 0,
            filter_count: 0,
            skip_count: 0,
            write_count: 0,
            chunk_count: 0,
            started_at: Utc::now(),
            finished_at: None,
            failure: None,
        }
    }
}

/// Builder for a [`Step`]. Chunk size defaults to 5, skip limit to 0.
pub struct StepBuilder {
    name: String,
    chunk_size: usize,
    skip_limit: usize,
}

impl StepBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunk_size: 5,
            skip_limit: 0,
        }
    }

    /// Number of items per committed chunk (the commit interval).
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Transform failures tolerated before the step fails.
    pub fn skip_limit(mut self, skip_limit: usize) -> Self {
        self.skip_limit = skip_limit;
        self
    }

    /// Attach the reader, processor, and writer, producing a runnable step.
    pub fn build<I, O, R, P, W>(self, reader: R, processor: P, writer: W) -> Result<Step<I, O, R, P, W>>
    where
        R: ItemReader<I>,
        P: ItemProcessor<I, O>,
        W: ItemWriter<O>,
    {
        if self.chunk_size == 0 {
            return Err(BatchlineError::validation("chunk size must be at least 1"));
        }
        Ok(Step {
            name: self.name,
            chunk_size: self.chunk_size,
            skip_limit: self.skip_limit,
            reader,
            processor,
            writer,
            _items: PhantomData,
        })
    }
}

/// One bounded unit of chunked read-process-write work within a job.
pub struct Step<I, O, R, P, W>
where
    R: ItemReader<I>,
    P: ItemProcessor<I, O>,
    W: ItemWriter<O>,
{
    name: String,
    chunk_size: usize,
    skip_limit: usize,
    reader: R,
    processor: P,
    writer: W,
    _items: PhantomData<(I, O)>,
}

impl<I, O, R, P, W> Step<I, O, R, P, W>
where
    R: ItemReader<I>,
    P: ItemProcessor<I, O>,
    W: ItemWriter<O>,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the step to a terminal state, consuming it.
    ///
    /// Items flow in reader order; chunk boundaries are deterministic for a
    /// fixed chunk size and a stable reader ordering. Any error — reader,
    /// transform past the skip limit, or writer — fails the step without
    /// pulling further chunks. The sink is closed on both exit paths.
    pub async fn execute(mut self, listener: &dyn StepListener) -> StepExecution {
        let mut execution = StepExecution::new(&self.name);
        execution.status = StepStatus::Running;
        info!(step = %self.name, chunk_size = self.chunk_size, "step starting");

        if let Err(e) = self.writer.open() {
            return self.fail(execution, e, listener);
        }

        let mut exhausted = false;
        while !exhausted {
            // (a) pull up to chunk_size items, stopping early at end-of-stream
            let mut chunk = Vec::with_capacity(self.chunk_size);
            while chunk.len() < self.chunk_size {
                match self.reader.read().await {
                    Ok(Some(item)) => {
                        execution.read_count += 1;
                        chunk.push(item);
                    }
                    Ok(None) => {
                        exhausted = true;
                        break;
                    }
                    Err(e) => return self.fail(execution, e, listener),
                }
            }

            // (b) empty pull means we are done
            if chunk.is_empty() {
                break;
            }

            // (c) process each item in order
            let mut outputs = Vec::with_capacity(chunk.len());
            for item in &chunk {
                match self.processor.process(item) {
                    Ok(ProcessorAction::Keep(out)) => outputs.push(out),
                    Ok(ProcessorAction::Skip) => execution.filter_count += 1,
                    Err(e) => {
                        execution.skip_count += 1;
                        if execution.skip_count > self.skip_limit {
                            return self.fail(execution, e, listener);
                        }
                        warn!(step = %self.name, error = %e, "transform failure skipped");
                        listener.item_skipped(&self.name, &e);
                    }
                }
            }

            // (d)+(e) hand the batch to the writer; a successful write call
            // is the chunk's commit
            if let Err(e) = self.writer.write(&outputs) {
                return self.fail(execution, e, listener);
            }
            execution.write_count += outputs.len();
            execution.chunk_count += 1;
            debug!(
                step = %self.name,
                chunk = execution.chunk_count,
                items = outputs.len(),
                "chunk committed"
            );
            listener.chunk_committed(&self.name, execution.chunk_count, outputs.len());
        }

        if let Err(e) = self.writer.close() {
            return Self::finish_failed(execution, e, listener);
        }

        execution.status = StepStatus::Completed;
        execution.finished_at = Some(Utc::now());
        info!(
            step = %execution.name,
            read = execution.read_count,
            written = execution.write_count,
            chunks = execution.chunk_count,
            skipped = execution.skip_count,
            "step completed"
        );
        listener.step_finished(&execution);
        execution
    }

    fn fail(
        mut self,
        execution: StepExecution,
        error: BatchlineError,
        listener: &dyn StepListener,
    ) -> StepExecution {
        // Best-effort close; the original failure is what gets reported.
        if let Err(close_err) = self.writer.close() {
            warn!(step = %execution.name, error = %close_err, "sink close failed after step error");
        }
        Self::finish_failed(execution, error, listener)
    }

    fn finish_failed(
        mut execution: StepExecution,
        error: BatchlineError,
        listener: &dyn StepListener,
    ) -> StepExecution {
        warn!(step = %execution.name, error = %error, "step failed");
        execution.status = StepStatus::Failed;
        execution.finished_at = Some(Utc::now());
        execution.failure = Some(error);
        listener.step_finished(&execution);
        execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::NoopListener;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct VecReader {
        items: VecDeque<i64>,
    }

    impl VecReader {
        fn of(range: std::ops::Range<i64>) -> Self {
            Self {
                items: range.collect(),
            }
        }
    }

    impl ItemReader<i64> for VecReader {
        async fn read(&mut self) -> Result<Option<i64>> {
            Ok(self.items.pop_front())
        }
    }

    struct FailingReader {
        remaining: usize,
    }

    impl ItemReader<i64> for FailingReader {
        async fn read(&mut self) -> Result<Option<i64>> {
            if self.remaining == 0 {
                return Err(BatchlineError::Storage("connection reset".into()));
            }
            self.remaining -= 1;
            Ok(Some(1))
        }
    }

    struct Double;

    impl ItemProcessor<i64, i64> for Double {
        fn process(&self, item: &i64) -> Result<ProcessorAction<i64>> {
            Ok(ProcessorAction::Keep(item * 2))
        }
    }

    /// Fails on odd items, filters multiples of ten.
    struct Picky;

    impl ItemProcessor<i64, i64> for Picky {
        fn process(&self, item: &i64) -> Result<ProcessorAction<i64>> {
            if item % 2 != 0 {
                return Err(BatchlineError::transform(format!("odd item {item}")));
            }
            if item % 10 == 0 {
                return Ok(ProcessorAction::Skip);
            }
            Ok(ProcessorAction::Keep(*item))
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        opened: bool,
        closed: bool,
        chunks: Vec<Vec<i64>>,
        fail_on_chunk: Option<usize>,
    }

    impl ItemWriter<i64> for RecordingWriter {
        fn open(&mut self) -> Result<()> {
            self.opened = true;
            Ok(())
        }

        fn write(&mut self, items: &[i64]) -> Result<()> {
            if self.fail_on_chunk == Some(self.chunks.len() + 1) {
                return Err(BatchlineError::Sink("no space left on device".into()));
            }
            self.chunks.push(items.to_vec());
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    /// Writer wrapper that exposes its state after the step consumed it.
    #[derive(Default)]
    struct SharedWriter {
        inner: std::rc::Rc<RefCell<RecordingWriter>>,
    }

    impl ItemWriter<i64> for SharedWriter {
        fn open(&mut self) -> Result<()> {
            self.inner.borrow_mut().open()
        }
        fn write(&mut self, items: &[i64]) -> Result<()> {
            self.inner.borrow_mut().write(items)
        }
        fn close(&mut self) -> Result<()> {
            self.inner.borrow_mut().close()
        }
    }

    fn shared_writer(fail_on_chunk: Option<usize>) -> (SharedWriter, std::rc::Rc<RefCell<RecordingWriter>>) {
        let inner = std::rc::Rc::new(RefCell::new(RecordingWriter {
            fail_on_chunk,
            ..RecordingWriter::default()
        }));
        (
            SharedWriter {
                inner: inner.clone(),
            },
            inner,
        )
    }

    #[tokio::test]
    async fn chunks_of_five_over_twelve_items() {
        let (writer, state) = shared_writer(None);
        let step = StepBuilder::new("test")
            .chunk_size(5)
            .build(VecReader::of(0..12), Double, writer)
            .unwrap();

        let execution = step.execute(&NoopListener).await;

        assert_eq!(execution.status, StepStatus::Completed);
        assert_eq!(execution.read_count, 12);
        assert_eq!(execution.write_count, 12);
        assert_eq!(execution.chunk_count, 3);

        let state = state.borrow();
        let sizes: Vec<usize> = state.chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        // input order preserved, transform applied
        let flat: Vec<i64> = state.chunks.iter().flatten().copied().collect();
        assert_eq!(flat, (0..12).map(|n| n * 2).collect::<Vec<_>>());
        assert!(state.opened);
        assert!(state.closed);
    }

    #[tokio::test]
    async fn exact_multiple_of_chunk_size() {
        let (writer, state) = shared_writer(None);
        let step = StepBuilder::new("test")
            .chunk_size(5)
            .build(VecReader::of(0..10), Double, writer)
            .unwrap();

        let execution = step.execute(&NoopListener).await;
        assert_eq!(execution.status, StepStatus::Completed);
        assert_eq!(execution.chunk_count, 2);
        let sizes: Vec<usize> = state.borrow().chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 5]);
    }

    #[tokio::test]
    async fn empty_source_completes_without_writes() {
        let (writer, state) = shared_writer(None);
        let step = StepBuilder::new("test")
            .chunk_size(5)
            .build(VecReader::of(0..0), Double, writer)
            .unwrap();

        let execution = step.execute(&NoopListener).await;
        assert_eq!(execution.status, StepStatus::Completed);
        assert_eq!(execution.chunk_count, 0);
        let state = state.borrow();
        assert!(state.chunks.is_empty());
        // the sink is still opened (truncated) and closed
        assert!(state.opened);
        assert!(state.closed);
    }

    #[tokio::test]
    async fn sink_failure_keeps_committed_chunks() {
        let (writer, state) = shared_writer(Some(2));
        let step = StepBuilder::new("test")
            .chunk_size(5)
            .build(VecReader::of(0..12), Double, writer)
            .unwrap();

        let execution = step.execute(&NoopListener).await;

        assert_eq!(execution.status, StepStatus::Failed);
        assert!(matches!(execution.failure, Some(BatchlineError::Sink(_))));
        // chunk 1 committed, chunk 2 rolled back, chunk 3 never attempted
        assert_eq!(execution.chunk_count, 1);
        assert_eq!(execution.write_count, 5);
        let state = state.borrow();
        assert_eq!(state.chunks.len(), 1);
        assert!(state.closed, "sink must be released on the failure path");
    }

    #[tokio::test]
    async fn reader_failure_fails_step() {
        let (writer, _state) = shared_writer(None);
        let step = StepBuilder::new("test")
            .chunk_size(3)
            .build(FailingReader { remaining: 2 }, Double, writer)
            .unwrap();

        let execution = step.execute(&NoopListener).await;
        assert_eq!(execution.status, StepStatus::Failed);
        assert!(matches!(
            execution.failure,
            Some(BatchlineError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn transform_failures_within_skip_limit() {
        // items 0..6: odds 1,3,5 fail the transform; 0 is filtered (multiple of ten)
        let (writer, state) = shared_writer(None);
        let step = StepBuilder::new("test")
            .chunk_size(10)
            .skip_limit(3)
            .build(VecReader::of(0..6), Picky, writer)
            .unwrap();

        let execution = step.execute(&NoopListener).await;

        assert_eq!(execution.status, StepStatus::Completed);
        assert_eq!(execution.read_count, 6);
        assert_eq!(execution.skip_count, 3);
        assert_eq!(execution.filter_count, 1);
        assert_eq!(execution.write_count, 2);
        assert_eq!(state.borrow().chunks, vec![vec![2, 4]]);
    }

    #[tokio::test]
    async fn transform_failure_past_skip_limit_fails_step() {
        let (writer, state) = shared_writer(None);
        let step = StepBuilder::new("test")
            .chunk_size(10)
            .skip_limit(1)
            .build(VecReader::of(0..6), Picky, writer)
            .unwrap();

        let execution = step.execute(&NoopListener).await;

        assert_eq!(execution.status, StepStatus::Failed);
        assert!(matches!(
            execution.failure,
            Some(BatchlineError::Transform { .. })
        ));
        // the failing chunk never reached its commit point
        assert!(state.borrow().chunks.is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_size_rejected_at_build() {
        let (writer, _state) = shared_writer(None);
        let result = StepBuilder::new("test")
            .chunk_size(0)
            .build(VecReader::of(0..1), Double, writer);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn listener_sees_chunk_commits() {
        // StepListener requires Send + Sync, so record through a Mutex.
        struct MutexListener(std::sync::Mutex<Vec<usize>>);
        impl StepListener for MutexListener {
            fn chunk_committed(&self, _step: &str, _chunk: usize, items: usize) {
                self.0.lock().unwrap().push(items);
            }
        }

        let listener = MutexListener(std::sync::Mutex::new(Vec::new()));
        let (writer, _state) = shared_writer(None);
        let step = StepBuilder::new("test")
            .chunk_size(5)
            .build(VecReader::of(0..12), Double, writer)
            .unwrap();

        step.execute(&listener).await;
        assert_eq!(*listener.0.lock().unwrap(), vec![5, 5, 2]);
    }
}
