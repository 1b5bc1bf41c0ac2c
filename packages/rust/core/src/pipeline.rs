//! End-to-end export pipeline: seed → cursor read → transform → CSV file.
//!
//! Everything is wired by explicit construction — the reader, processor,
//! writer, and step driver are built here and handed their collaborators
//! directly.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use batchline_batch::{JobBuilder, JobStatus, StepBuilder, StepListener, UppercaseNameProcessor};
use batchline_export::CsvFileWriter;
use batchline_shared::{AppConfig, BatchlineError, Result, demo_employees};
use batchline_storage::Storage;

/// Name of the single chunked step in the demo job.
const STEP_NAME: &str = "export-employees";

/// Name of the demo job.
const JOB_NAME: &str = "employee-export";

/// Configuration for one export run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ExportJobConfig {
    /// Path to the libSQL database file.
    pub db_path: PathBuf,
    /// Path of the delimited output file.
    pub output_path: PathBuf,
    /// Records per committed chunk.
    pub chunk_size: usize,
    /// Output field delimiter (single-byte ASCII).
    pub delimiter: char,
    /// Emit a header row before the first record.
    pub header: bool,
    /// Transform failures tolerated before the step fails.
    pub skip_limit: usize,
}

impl From<&AppConfig> for ExportJobConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            db_path: PathBuf::from(&config.storage.db_path),
            output_path: PathBuf::from(&config.job.output_path),
            chunk_size: config.job.chunk_size,
            delimiter: config.job.delimiter,
            header: config.job.header,
            skip_limit: config.job.skip_limit,
        }
    }
}

impl ExportJobConfig {
    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BatchlineError::validation("chunk_size must be at least 1"));
        }
        if !self.delimiter.is_ascii() {
            return Err(BatchlineError::validation(format!(
                "delimiter {:?} is not a single-byte ASCII character",
                self.delimiter
            )));
        }
        Ok(())
    }
}

/// Result of a completed export run.
#[derive(Debug)]
pub struct ExportResult {
    /// Records pulled from storage.
    pub read_count: usize,
    /// Records written to the output file.
    pub write_count: usize,
    /// Chunks committed.
    pub chunk_count: usize,
    /// Transform failures skipped under the skip limit.
    pub skip_count: usize,
    /// Path of the output file.
    pub output_path: PathBuf,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// What the seeder did.
#[derive(Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Rows were inserted with these assigned ids.
    Seeded(Vec<i64>),
    /// The table already had rows; nothing was inserted.
    AlreadyPopulated(u64),
}

/// Seed the demo employees if (and only if) the table is empty.
///
/// Runs once at process start, independent of the export step. Any storage
/// error aborts startup and is not retried.
pub async fn seed(db_path: &std::path::Path) -> Result<SeedOutcome> {
    let storage = Storage::open(db_path).await?;
    seed_into(&storage).await
}

async fn seed_into(storage: &Storage) -> Result<SeedOutcome> {
    let existing = storage.count_employees().await?;
    if existing > 0 {
        info!(rows = existing, "employees table already populated, skipping seed");
        return Ok(SeedOutcome::AlreadyPopulated(existing));
    }

    let ids = storage.insert_employees(&demo_employees()).await?;
    Ok(SeedOutcome::Seeded(ids))
}

/// Run the full export pipeline.
///
/// 1. Open storage (applying migrations)
/// 2. Seed the demo rows if the table is empty
/// 3. Open the employee cursor
/// 4. Run the single chunked step: cursor → uppercase → CSV file
///
/// A failed job surfaces as the failing step's error; chunks committed
/// before the failure remain in the output file.
#[instrument(skip_all, fields(db = %config.db_path.display(), out = %config.output_path.display()))]
pub async fn run_export(
    config: &ExportJobConfig,
    listener: &dyn StepListener,
) -> Result<ExportResult> {
    let start = Instant::now();
    config.validate()?;

    // --- Phase 1: storage + seed ---
    let storage = Storage::open(&config.db_path).await?;
    seed_into(&storage).await?;

    // --- Phase 2: assemble the step ---
    let reader = storage.stream_employees().await?;
    let writer = CsvFileWriter::new(&config.output_path)
        .delimiter(config.delimiter as u8)
        .header(config.header);

    let step = StepBuilder::new(STEP_NAME)
        .chunk_size(config.chunk_size)
        .skip_limit(config.skip_limit)
        .build(reader, UppercaseNameProcessor, writer)?;

    // --- Phase 3: run the job ---
    let job = JobBuilder::new(JOB_NAME).start(step).build();
    let execution = job.run(listener).await;

    if execution.status == JobStatus::Failed {
        return Err(execution
            .into_failure()
            .unwrap_or_else(|| BatchlineError::validation("job failed without a recorded error")));
    }

    let step_execution = &execution.step_executions[0];
    let result = ExportResult {
        read_count: step_execution.read_count,
        write_count: step_execution.write_count,
        chunk_count: step_execution.chunk_count,
        skip_count: step_execution.skip_count,
        output_path: config.output_path.clone(),
        elapsed: start.elapsed(),
    };

    info!(
        read = result.read_count,
        written = result.write_count,
        chunks = result.chunk_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "export completed"
    );
    Ok(result)
}
