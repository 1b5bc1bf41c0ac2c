//! Jobs: the top-level unit composed of one or more steps.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::item::{ItemProcessor, ItemReader, ItemWriter};
use crate::listener::StepListener;
use crate::step::{Step, StepExecution, StepStatus};

/// Terminal status of a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Execution record for one job run.
#[derive(Debug)]
pub struct JobExecution {
    /// Time-sortable execution identifier.
    pub id: Uuid,
    /// Job name.
    pub name: String,
    /// Overall outcome.
    pub status: JobStatus,
    /// Executions of the steps that ran, in order.
    pub step_executions: Vec<StepExecution>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobExecution {
    /// The failing step's error, if the job failed.
    pub fn failure(&self) -> Option<&batchline_shared::BatchlineError> {
        self.step_executions
            .iter()
            .find_map(|s| s.failure.as_ref())
    }

    /// Consume the execution and take ownership of the failing step's error.
    pub fn into_failure(self) -> Option<batchline_shared::BatchlineError> {
        self.step_executions
            .into_iter()
            .find_map(|s| s.failure)
    }
}

/// Builder for a [`Job`]. Steps run in the order they are added.
pub struct JobBuilder<I, O, R, P, W>
where
    R: ItemReader<I>,
    P: ItemProcessor<I, O>,
    W: ItemWriter<O>,
{
    name: String,
    steps: Vec<Step<I, O, R, P, W>>,
}

impl<I, O, R, P, W> JobBuilder<I, O, R, P, W>
where
    R: ItemReader<I>,
    P: ItemProcessor<I, O>,
    W: ItemWriter<O>,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Set the first step of the job.
    pub fn start(mut self, step: Step<I, O, R, P, W>) -> Self {
        self.steps.push(step);
        self
    }

    /// Add a subsequent step, run after the previous one completes.
    pub fn next(mut self, step: Step<I, O, R, P, W>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> Job<I, O, R, P, W> {
        Job {
            name: self.name,
            steps: self.steps,
        }
    }
}

/// A runnable job. Steps execute sequentially; the first failed step stops
/// the job and marks it [`JobStatus::Failed`]. Chunks committed by earlier
/// steps (or earlier chunks of the failing step) remain committed — there is
/// no whole-job rollback.
pub struct Job<I, O, R, P, W>
where
    R: ItemReader<I>,
    P: ItemProcessor<I, O>,
    W: ItemWriter<O>,
{
    name: String,
    steps: Vec<Step<I, O, R, P, W>>,
}

impl<I, O, R, P, W> Job<I, O, R, P, W>
where
    R: ItemReader<I>,
    P: ItemProcessor<I, O>,
    W: ItemWriter<O>,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the job to completion or first failure, consuming it.
    pub async fn run(self, listener: &dyn StepListener) -> JobExecution {
        let started_at = Utc::now();
        let id = Uuid::now_v7();
        info!(job = %self.name, %id, steps = self.steps.len(), "job starting");

        let mut step_executions = Vec::with_capacity(self.steps.len());
        let mut status = JobStatus::Completed;

        for step in self.steps {
            let execution = step.execute(listener).await;
            let failed = execution.status == StepStatus::Failed;
            step_executions.push(execution);
            if failed {
                status = JobStatus::Failed;
                break;
            }
        }

        let execution = JobExecution {
            id,
            name: self.name,
            status,
            step_executions,
            started_at,
            finished_at: Utc::now(),
        };
        info!(job = %execution.name, status = ?execution.status, "job finished");
        execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ProcessorAction;
    use crate::listener::NoopListener;
    use crate::step::StepBuilder;
    use batchline_shared::{BatchlineError, Result};
    use std::collections::VecDeque;

    struct VecReader(VecDeque<i64>);

    impl ItemReader<i64> for VecReader {
        async fn read(&mut self) -> Result<Option<i64>> {
            Ok(self.0.pop_front())
        }
    }

    struct Identity;

    impl ItemProcessor<i64, i64> for Identity {
        fn process(&self, item: &i64) -> Result<ProcessorAction<i64>> {
            Ok(ProcessorAction::Keep(*item))
        }
    }

    struct SinkWriter {
        fail: bool,
    }

    impl ItemWriter<i64> for SinkWriter {
        fn open(&mut self) -> Result<()> {
            Ok(())
        }
        fn write(&mut self, _items: &[i64]) -> Result<()> {
            if self.fail {
                Err(BatchlineError::Sink("broken pipe".into()))
            } else {
                Ok(())
            }
        }
        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_step_job_completes() {
        let step = StepBuilder::new("only")
            .chunk_size(2)
            .build(VecReader((0..5).collect()), Identity, SinkWriter { fail: false })
            .unwrap();
        let job = JobBuilder::new("demo").start(step).build();

        let execution = job.run(&NoopListener).await;
        assert_eq!(execution.status, JobStatus::Completed);
        assert_eq!(execution.step_executions.len(), 1);
        assert!(execution.failure().is_none());
        assert_eq!(execution.step_executions[0].write_count, 5);
    }

    #[tokio::test]
    async fn failed_step_fails_job() {
        let step = StepBuilder::new("only")
            .chunk_size(2)
            .build(VecReader((0..5).collect()), Identity, SinkWriter { fail: true })
            .unwrap();
        let job = JobBuilder::new("demo").start(step).build();

        let execution = job.run(&NoopListener).await;
        assert_eq!(execution.status, JobStatus::Failed);
        assert!(matches!(
            execution.failure(),
            Some(BatchlineError::Sink(_))
        ));
    }

    #[tokio::test]
    async fn failed_step_stops_later_steps() {
        let failing = StepBuilder::new("first")
            .chunk_size(2)
            .build(VecReader((0..5).collect()), Identity, SinkWriter { fail: true })
            .unwrap();
        let never_run = StepBuilder::new("second")
            .chunk_size(2)
            .build(VecReader((0..5).collect()), Identity, SinkWriter { fail: false })
            .unwrap();
        let job = JobBuilder::new("demo").start(failing).next(never_run).build();

        let execution = job.run(&NoopListener).await;
        assert_eq!(execution.status, JobStatus::Failed);
        assert_eq!(execution.step_executions.len(), 1, "second step must not run");
    }
}
