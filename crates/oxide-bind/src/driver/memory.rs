use std::collections::VecDeque;

use super::{Rows, ScanTargets};
use crate::error::{Error, Result};
use crate::value::SqlValue;

/// An in-memory cursor over pre-built rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    columns: Vec<String>,
    pending: VecDeque<Vec<SqlValue>>,
    current: Option<Vec<SqlValue>>,
}

impl MemoryRows {
    /// Creates a cursor with the given column names and no rows.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            pending: VecDeque::new(),
            current: None,
        }
    }

    /// Appends a row, builder style.
    #[must_use]
    pub fn row(mut self, values: impl IntoIterator<Item = SqlValue>) -> Self {
        self.pending.push_back(values.into_iter().collect());
        self
    }

    /// Number of rows not yet reached.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Rows for MemoryRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next(&mut self) -> Result<bool> {
        self.current = self.pending.pop_front();
        Ok(self.current.is_some())
    }

    fn scan(&mut self, targets: &mut dyn ScanTargets) -> Result<()> {
        let row = self
            .current
            .take()
            .ok_or_else(|| Error::ScanShape(String::from("no current row")))?;
        if row.len() != self.columns.len() || targets.len() != self.columns.len() {
            return Err(Error::ScanShape(format!(
                "expected {} columns, row has {} and targets {}",
                self.columns.len(),
                row.len(),
                targets.len()
            )));
        }
        for (index, value) in row.into_iter().enumerate() {
            targets.scan_column(index, value)?;
        }
        Ok(())
    }
}
