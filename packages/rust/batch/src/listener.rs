//! Step progress callbacks.

use batchline_shared::BatchlineError;

use crate::step::StepExecution;

/// Callback hooks for reporting step progress.
///
/// All methods have empty defaults so implementors only override what they
/// care about (the CLI attaches a progress bar, tests attach recorders).
pub trait StepListener: Send + Sync {
    /// Called after a chunk's commit point succeeds.
    fn chunk_committed(&self, step_name: &str, chunk_index: usize, items: usize) {
        let _ = (step_name, chunk_index, items);
    }

    /// Called when a transform failure is skipped under the skip limit.
    fn item_skipped(&self, step_name: &str, error: &BatchlineError) {
        let _ = (step_name, error);
    }

    /// Called once when the step reaches a terminal state.
    fn step_finished(&self, execution: &StepExecution) {
        let _ = execution;
    }
}

/// No-op listener for headless/test usage.
pub struct NoopListener;

impl StepListener for NoopListener {}
