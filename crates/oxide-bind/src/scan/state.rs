//! Per-scan buffers and the column targets handed to cursors.

use super::plan::{ColumnStrategy, ScanPlan};
use crate::driver::ScanTargets;
use crate::error::{Error, Result};
use crate::record::{assign_at_path, ensure_path, Field, Holder, NodeMut, Record, Scan};
use crate::value::SqlValue;

enum Slot {
    /// Discarded columns and leaves written in place.
    Direct,
    Holder(Box<dyn Holder>),
    /// Raw value awaiting conversion into an optional custom leaf.
    Raw(SqlValue),
}

/// Holders and sinks for one scan operation, reused across its rows.
pub(crate) struct ScanState {
    slots: Vec<Slot>,
}

impl ScanState {
    pub(crate) fn new(plan: &ScanPlan) -> Self {
        let slots = plan
            .columns
            .iter()
            .map(|column| match (column.strategy, column.holder) {
                (ColumnStrategy::OptionalLeaf, Some(holder)) => Slot::Holder(holder()),
                (ColumnStrategy::CustomScan, _) if column.optional => Slot::Raw(SqlValue::Null),
                _ => Slot::Direct,
            })
            .collect();
        Self { slots }
    }

    /// Clears buffered values so nothing leaks from the previous row.
    pub(crate) fn reset(&mut self) {
        for slot in &mut self.slots {
            match slot {
                Slot::Holder(holder) => holder.reset(),
                Slot::Raw(raw) => *raw = SqlValue::Null,
                Slot::Direct => {}
            }
        }
    }

    /// Moves buffered values into the record once the row is fetched.
    pub(crate) fn finish(&mut self, plan: &ScanPlan, record: &mut dyn Record) -> Result<()> {
        for (column, slot) in plan.columns.iter().zip(&mut self.slots) {
            match slot {
                Slot::Holder(holder) => {
                    if !assign_at_path(record, &column.path, holder.as_mut()) {
                        return Err(unreachable_leaf(plan, &column.column));
                    }
                }
                Slot::Raw(raw) => {
                    let value = std::mem::replace(raw, SqlValue::Null);
                    let leaf = ensure_path(record, &column.path)
                        .ok_or_else(|| unreachable_leaf(plan, &column.column))?;
                    scan_leaf(leaf, value, &column.column)?;
                }
                Slot::Direct => {}
            }
        }
        Ok(())
    }
}

fn unreachable_leaf(plan: &ScanPlan, column: &str) -> Error {
    Error::ScanShape(format!(
        "column '{column}' has no reachable field in {}",
        plan.record
    ))
}

/// Scans `value` into a leaf field.
pub(crate) fn scan_leaf(leaf: &mut dyn Field, value: SqlValue, column: &str) -> Result<()> {
    match leaf.node_mut() {
        NodeMut::Value(slot) => scan_value(slot, value, column),
        NodeMut::Record(_) | NodeMut::Optional(_) => Err(Error::ScanShape(format!(
            "column '{column}' targets a record, not a value"
        ))),
    }
}

fn scan_value<S: Scan + ?Sized>(slot: &mut S, value: SqlValue, column: &str) -> Result<()> {
    slot.scan(value).map_err(|source| Error::Convert {
        column: column.to_owned(),
        source,
    })
}

/// Routes each column of the current row according to the plan.
pub(crate) struct RowTargets<'s> {
    pub(crate) plan: &'s ScanPlan,
    pub(crate) state: &'s mut ScanState,
    pub(crate) record: &'s mut dyn Record,
}

impl ScanTargets for RowTargets<'_> {
    fn len(&self) -> usize {
        self.plan.columns.len()
    }

    fn scan_column(&mut self, index: usize, value: SqlValue) -> Result<()> {
        let column = self
            .plan
            .columns
            .get(index)
            .ok_or_else(|| Error::ScanShape(format!("no column at index {index}")))?;
        match (&mut self.state.slots[index], column.strategy) {
            (_, ColumnStrategy::Discard) => Ok(()),
            (Slot::Holder(holder), _) => scan_value(holder.as_mut(), value, &column.column),
            (Slot::Raw(raw), _) => {
                *raw = value;
                Ok(())
            }
            (Slot::Direct, _) => {
                let leaf = ensure_path(self.record, &column.path)
                    .ok_or_else(|| unreachable_leaf(self.plan, &column.column))?;
                scan_leaf(leaf, value, &column.column)
            }
        }
    }
}

/// Target for a single non-record destination.
pub(crate) struct ValueTarget<'s> {
    pub(crate) slot: &'s mut dyn Scan,
    pub(crate) column: &'s str,
}

impl ScanTargets for ValueTarget<'_> {
    fn len(&self) -> usize {
        1
    }

    fn scan_column(&mut self, index: usize, value: SqlValue) -> Result<()> {
        if index != 0 {
            return Err(Error::ScanShape(format!("no column at index {index}")));
        }
        scan_value(&mut *self.slot, value, self.column)
    }
}
