//! Forward-only cursor over the employees query.

use batchline_batch::ItemReader;
use batchline_shared::{BatchlineError, Employee, Result};
use libsql::Rows;

/// A lazy, single-pass iteration handle over employee rows.
///
/// Wraps a libSQL [`Rows`] handle; each [`next`](EmployeeCursor::next) call
/// fetches and maps exactly one row, so the full result set is never held in
/// memory. The underlying statement handle is closed when the cursor drops.
/// Not restartable — open a fresh cursor to re-read from the start.
pub struct EmployeeCursor {
    rows: Rows,
    read_count: usize,
}

impl EmployeeCursor {
    pub(crate) fn new(rows: Rows) -> Self {
        Self {
            rows,
            read_count: 0,
        }
    }

    /// Fetch and map the next row, or `Ok(None)` at end-of-stream.
    pub async fn next(&mut self) -> Result<Option<Employee>> {
        match self.rows.next().await {
            Ok(Some(row)) => {
                let employee = map_row(&row)?;
                self.read_count += 1;
                Ok(Some(employee))
            }
            Ok(None) => {
                tracing::debug!(read_count = self.read_count, "cursor exhausted");
                Ok(None)
            }
            Err(e) => Err(BatchlineError::Storage(e.to_string())),
        }
    }
}

impl ItemReader<Employee> for EmployeeCursor {
    async fn read(&mut self) -> Result<Option<Employee>> {
        self.next().await
    }
}

/// Map a `SELECT id, name, department, salary` row to an [`Employee`].
fn map_row(row: &libsql::Row) -> Result<Employee> {
    Ok(Employee {
        id: row
            .get::<i64>(0)
            .map_err(|e| BatchlineError::Storage(e.to_string()))?,
        name: row
            .get::<String>(1)
            .map_err(|e| BatchlineError::Storage(e.to_string()))?,
        department: row
            .get::<String>(2)
            .map_err(|e| BatchlineError::Storage(e.to_string()))?,
        salary: row
            .get::<f64>(3)
            .map_err(|e| BatchlineError::Storage(e.to_string()))?,
    })
}
