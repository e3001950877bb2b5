//! Executor and cursor capabilities.
//!
//! The engine never talks to a database directly. An [`Executor`] runs
//! rendered statements; a [`Rows`] cursor feeds column values into
//! [`ScanTargets`] one row at a time.

use crate::error::Result;
use crate::value::SqlValue;

mod memory;

pub use memory::MemoryRows;

/// Summary of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
}

/// Receives the column values of the current row.
pub trait ScanTargets {
    /// Number of columns the targets expect.
    fn len(&self) -> usize;

    /// Returns true when no column is expected.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores the value of the column at `index`.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be stored in its field.
    fn scan_column(&mut self, index: usize, value: SqlValue) -> Result<()>;
}

/// A forward-only row cursor.
pub trait Rows {
    /// Result column names, in order.
    fn columns(&self) -> &[String];

    /// Advances to the next row. Returns false when exhausted.
    ///
    /// # Errors
    ///
    /// Driver failures while fetching.
    fn next(&mut self) -> Result<bool>;

    /// Feeds every column of the current row to `targets`.
    ///
    /// # Errors
    ///
    /// Fails when there is no current row, when `targets` expects a different
    /// column count, or when a value cannot be stored.
    fn scan(&mut self, targets: &mut dyn ScanTargets) -> Result<()>;
}

/// Runs rendered statements.
pub trait Executor {
    /// Executes a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult>;

    /// Executes a query and returns its cursor.
    ///
    /// # Errors
    ///
    /// Driver failures.
    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Box<dyn Rows + '_>>;
}
