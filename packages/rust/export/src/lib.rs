//! Delimited flat-file writer for exported employees.
//!
//! [`CsvFileWriter`] implements the batch engine's [`ItemWriter`] seam over
//! a delimited text file: one line per record, fields in the order
//! `name, department, salary`, comma-delimited by default, no header unless
//! configured.
//!
//! Each `write` call is atomic: the whole chunk is serialized into an
//! in-memory buffer first and only then appended and flushed to the file in
//! one step. A chunk that fails mid-serialization leaves the file exactly as
//! it was, and a torn append (an I/O error after part of the buffer landed)
//! is truncated back to the last committed chunk — this is the rollback half
//! of the step driver's per-chunk commit boundary. Commit happens only after
//! the flush succeeds.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use batchline_batch::ItemWriter;
use batchline_shared::{BatchlineError, Employee, Result};
use serde::Serialize;
use tracing::{debug, warn};

/// The append target for one chunk commit.
///
/// Abstracts the three file operations the commit path needs so the torn-
/// append rollback is exercisable without forcing a real device error.
trait ChunkSink {
    /// Bytes already committed to the sink.
    fn committed_len(&mut self) -> std::io::Result<u64>;
    /// Append and flush `buffer`; may fail after part of it has landed.
    fn append(&mut self, buffer: &[u8]) -> std::io::Result<()>;
    /// Discard everything past `len`.
    fn truncate(&mut self, len: u64) -> std::io::Result<()>;
}

impl ChunkSink for File {
    fn committed_len(&mut self) -> std::io::Result<u64> {
        self.metadata().map(|m| m.len())
    }

    fn append(&mut self, buffer: &[u8]) -> std::io::Result<()> {
        self.write_all(buffer)?;
        self.flush()
    }

    fn truncate(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

/// Append one serialized chunk to the sink, all or nothing.
///
/// `write_all` can fail after some of the buffer has already landed (a full
/// disk mid-chunk, for instance); the torn tail is truncated back to the
/// committed length before the error propagates, so the sink only ever holds
/// whole chunks.
fn append_chunk(sink: &mut impl ChunkSink, buffer: &[u8]) -> Result<()> {
    let committed = sink
        .committed_len()
        .map_err(|e| BatchlineError::Sink(e.to_string()))?;

    if let Err(e) = sink.append(buffer) {
        if let Err(truncate_err) = sink.truncate(committed) {
            warn!(error = %truncate_err, "could not roll back torn chunk append");
        }
        return Err(BatchlineError::Sink(e.to_string()));
    }
    Ok(())
}

/// Output line layout. Serialized field order is the output field order;
/// the struct field names become the header row when headers are enabled.
#[derive(Serialize)]
struct OutputRow<'a> {
    name: &'a str,
    department: &'a str,
    salary: f64,
}

/// Writes employees to a delimited file, one chunk per atomic append.
///
/// Salary formatting follows serde/ryu: integral values keep a trailing
/// `.0` (`60000.0`), non-integral values render minimally (`50000.5`).
pub struct CsvFileWriter {
    path: PathBuf,
    delimiter: u8,
    header: bool,
    file: Option<File>,
}

impl CsvFileWriter {
    /// Comma-delimited, no header.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            header: false,
            file: None,
        }
    }

    /// Override the field delimiter.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Emit a header row before the first record.
    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemWriter<Employee> for CsvFileWriter {
    /// Create or truncate the output file; it stays open for the whole step.
    fn open(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| BatchlineError::io(parent, e))?;
            }
        }
        let file = File::create(&self.path).map_err(|e| BatchlineError::io(&self.path, e))?;
        debug!(path = %self.path.display(), "output file opened");
        self.file = Some(file);
        Ok(())
    }

    fn write(&mut self, items: &[Employee]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| BatchlineError::Sink("writer is not open".into()))?;

        // The header belongs to the first committed chunk.
        let with_header = self.header;
        let buffer = {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.delimiter)
                .has_headers(with_header)
                .from_writer(Vec::new());

            for employee in items {
                writer
                    .serialize(OutputRow {
                        name: &employee.name,
                        department: &employee.department,
                        salary: employee.salary,
                    })
                    .map_err(|e| BatchlineError::Sink(e.to_string()))?;
            }
            writer
                .into_inner()
                .map_err(|e| BatchlineError::Sink(e.to_string()))?
        };

        // Commit point: append and flush the whole chunk in one step, rolling
        // back a torn append.
        append_chunk(file, &buffer)?;

        if with_header && !items.is_empty() {
            self.header = false;
        }
        debug!(items = items.len(), bytes = buffer.len(), "chunk appended");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .map_err(|e| BatchlineError::Sink(e.to_string()))?;
        }
        Ok(())
    }
}
