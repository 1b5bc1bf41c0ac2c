//! libSQL storage layer for the Batchline demo pipeline.
//!
//! The [`Storage`] struct wraps a libSQL database holding the `employees`
//! input table. It covers both ends of the pipeline's storage boundary:
//! the one-time seeding write path ([`Storage::insert_employees`]) and the
//! forward-only read path ([`Storage::stream_employees`]).

mod cursor;
mod migrations;

use std::path::Path;

use batchline_shared::{BatchlineError, NewEmployee, Result};
use libsql::{Connection, Database, params};

pub use cursor::EmployeeCursor;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BatchlineError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| BatchlineError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| BatchlineError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    BatchlineError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Seeder write path
    // -----------------------------------------------------------------------

    /// Insert employees as new rows, returning the storage-assigned ids in
    /// input order. Any failure aborts immediately; rows already inserted in
    /// this call are not rolled back (the caller treats the error as fatal
    /// to startup).
    pub async fn insert_employees(&self, employees: &[NewEmployee]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(employees.len());

        for employee in employees {
            self.conn
                .execute(
                    "INSERT INTO employees (name, department, salary) VALUES (?1, ?2, ?3)",
                    params![
                        employee.name.as_str(),
                        employee.department.as_str(),
                        employee.salary
                    ],
                )
                .await
                .map_err(|e| BatchlineError::Storage(e.to_string()))?;
            ids.push(self.conn.last_insert_rowid());
        }

        tracing::info!(count = ids.len(), "seeded employees");
        Ok(ids)
    }

    /// Count rows in the employees table.
    pub async fn count_employees(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM employees", params![])
            .await
            .map_err(|e| BatchlineError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map(|n| n as u64)
                .map_err(|e| BatchlineError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(BatchlineError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Reader path
    // -----------------------------------------------------------------------

    /// Open a forward-only cursor over all employees, ordered by id.
    ///
    /// Rows are fetched lazily, one per [`EmployeeCursor::next`] call. The
    /// cursor is single-pass; call this again for a fresh read from the
    /// start. The explicit `ORDER BY id` makes chunk boundaries
    /// deterministic across runs.
    pub async fn stream_employees(&self) -> Result<EmployeeCursor> {
        let rows = self
            .conn
            .query(
                "SELECT id, name, department, salary FROM employees ORDER BY id",
                params![],
            )
            .await
            .map_err(|e| BatchlineError::Storage(e.to_string()))?;

        Ok(EmployeeCursor::new(rows))
    }
}
