//! Mapping result rows into records and values.
//!
//! A [`Scanner`] is built once per result set from the destination shape and
//! the column list. Record destinations get a cached [`ScanPlan`]; any other
//! destination must face exactly one column. Shape problems therefore surface
//! before the first row is fetched.

use std::sync::Arc;

use crate::driver::Rows;
use crate::error::{Error, Result};
use crate::record::{Field, FieldDef, NodeMut, Record, Shape, ShapeKind};

mod plan;
mod state;

pub use plan::{scan_plan, ColumnPlan, ColumnStrategy, ScanPlan};

use state::{RowTargets, ScanState, ValueTarget};

enum Mode {
    Record {
        plan: Arc<ScanPlan>,
        state: ScanState,
    },
    Value,
}

/// Scans the rows of one result set into destinations of one shape.
pub struct Scanner {
    columns: Vec<String>,
    type_name: &'static str,
    mode: Mode,
}

impl Scanner {
    /// Prepares a scanner for a destination type.
    ///
    /// # Errors
    ///
    /// [`Error::ScanShape`] when a value destination faces other than one
    /// column; [`Error::FieldAmbiguous`] when a column maps to two fields.
    pub fn new(shape: &Shape, columns: &[String]) -> Result<Self> {
        let type_name = (shape.type_name)();
        let mode = match shape.kind {
            ShapeKind::Record(descriptor) => {
                let plan = scan_plan(descriptor(), columns)?;
                let state = ScanState::new(&plan);
                Mode::Record { plan, state }
            }
            ShapeKind::Value | ShapeKind::Convert => {
                if columns.len() != 1 {
                    return Err(Error::ScanShape(format!(
                        "{type_name} needs exactly one column, got {}",
                        columns.len()
                    )));
                }
                Mode::Value
            }
        };
        Ok(Self {
            columns: columns.to_vec(),
            type_name,
            mode,
        })
    }

    /// Prepares a scanner for `T`.
    ///
    /// # Errors
    ///
    /// See [`Scanner::new`].
    pub fn for_type<T: FieldDef>(columns: &[String]) -> Result<Self> {
        Self::new(&T::SHAPE, columns)
    }

    /// Scans the cursor's current row into `dest`.
    ///
    /// # Errors
    ///
    /// Cursor failures, conversion failures, or a destination that does not
    /// match the shape the scanner was built for.
    pub fn scan_row(&mut self, rows: &mut dyn Rows, dest: &mut dyn Field) -> Result<()> {
        match &mut self.mode {
            Mode::Record { plan, state } => {
                let plan: &ScanPlan = plan;
                let record: &mut dyn Record = match dest.node_mut() {
                    NodeMut::Record(record) => record,
                    NodeMut::Optional(optional) => optional
                        .ensure()
                        .ok_or_else(|| not_a_record(self.type_name))?,
                    NodeMut::Value(_) => return Err(not_a_record(self.type_name)),
                };
                state.reset();
                rows.scan(&mut RowTargets {
                    plan,
                    state: &mut *state,
                    record: &mut *record,
                })?;
                state.finish(plan, record)
            }
            Mode::Value => match dest.node_mut() {
                NodeMut::Value(slot) => rows.scan(&mut ValueTarget {
                    slot,
                    column: &self.columns[0],
                }),
                NodeMut::Record(_) | NodeMut::Optional(_) => Err(Error::ScanShape(format!(
                    "{} is not a value destination",
                    self.type_name
                ))),
            },
        }
    }
}

fn not_a_record(type_name: &str) -> Error {
    Error::ScanShape(format!("{type_name} is not a record destination"))
}

/// Scans the cursor's current row into `dest`.
///
/// The cursor must already be positioned on a row.
///
/// # Errors
///
/// See [`Scanner::new`] and [`Scanner::scan_row`].
pub fn scan_one<T: FieldDef>(rows: &mut dyn Rows, dest: &mut T) -> Result<()> {
    let mut scanner = Scanner::for_type::<T>(rows.columns())?;
    scanner.scan_row(rows, dest)
}

/// Scans every remaining row into `dest`, replacing its contents.
///
/// One plan serves all rows. On a mid-stream failure, rows scanned so far
/// stay in `dest`.
///
/// # Errors
///
/// See [`Scanner::new`] and [`Scanner::scan_row`].
pub fn scan_all<T: FieldDef + Default>(rows: &mut dyn Rows, dest: &mut Vec<T>) -> Result<()> {
    let mut scanner = Scanner::for_type::<T>(rows.columns())?;
    dest.clear();
    while rows.next()? {
        let mut item = T::default();
        scanner.scan_row(rows, &mut item)?;
        dest.push(item);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use oxide_bind_derive::Record;

    use super::*;
    use crate::driver::MemoryRows;
    use crate::value::SqlValue;

    #[derive(Debug, Default, PartialEq, Record)]
    pub struct Pair {
        pub a: i64,
        pub b: Option<String>,
    }

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_owned())
    }

    #[test]
    fn test_null_does_not_leak_between_rows() {
        let mut rows = MemoryRows::new(["a", "b"])
            .row([SqlValue::Int(1), text("x")])
            .row([SqlValue::Int(3), SqlValue::Null]);
        let mut out: Vec<Pair> = Vec::new();
        scan_all(&mut rows, &mut out).unwrap();
        assert_eq!(
            out,
            [
                Pair {
                    a: 1,
                    b: Some(String::from("x"))
                },
                Pair { a: 3, b: None },
            ]
        );
    }

    #[test]
    fn test_scan_all_clears_destination() {
        let mut rows = MemoryRows::new(["a"]).row([SqlValue::Int(5)]);
        let mut out = vec![Pair::default(), Pair::default()];
        scan_all(&mut rows, &mut out).unwrap();
        assert_eq!(out, [Pair { a: 5, b: None }]);
    }

    #[test]
    fn test_scan_one_positioned() {
        let mut rows = MemoryRows::new(["b", "ignored", "a"]).row([
            text("y"),
            SqlValue::Bool(false),
            SqlValue::Int(2),
        ]);
        assert!(rows.next().unwrap());
        let mut pair = Pair::default();
        scan_one(&mut rows, &mut pair).unwrap();
        assert_eq!(
            pair,
            Pair {
                a: 2,
                b: Some(String::from("y"))
            }
        );
    }

    #[test]
    fn test_value_destinations() {
        let mut rows = MemoryRows::new(["n"])
            .row([SqlValue::Int(1)])
            .row([SqlValue::Null]);
        let mut out: Vec<Option<i64>> = Vec::new();
        scan_all(&mut rows, &mut out).unwrap();
        assert_eq!(out, [Some(1), None]);

        let mut rows = MemoryRows::new(["a", "b"]);
        let mut ints: Vec<i64> = Vec::new();
        assert!(matches!(
            scan_all(&mut rows, &mut ints),
            Err(Error::ScanShape(_))
        ));
    }

    #[test]
    fn test_optional_and_boxed_records() {
        let mut rows = MemoryRows::new(["a"])
            .row([SqlValue::Int(1)])
            .row([SqlValue::Int(2)]);
        let mut out: Vec<Option<Box<Pair>>> = Vec::new();
        scan_all(&mut rows, &mut out).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].as_ref().map(|p| p.a), Some(2));
    }

    #[test]
    fn test_conversion_error_names_column() {
        let mut rows = MemoryRows::new(["a"]).row([text("nope")]);
        let mut out: Vec<Pair> = Vec::new();
        let err = scan_all(&mut rows, &mut out).unwrap_err();
        assert!(matches!(err, Error::Convert { ref column, .. } if column == "a"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_null_into_required_field_fails() {
        let mut rows = MemoryRows::new(["a"]).row([SqlValue::Null]);
        rows.next().unwrap();
        let mut pair = Pair::default();
        assert!(matches!(
            scan_one(&mut rows, &mut pair),
            Err(Error::Convert { .. })
        ));
    }
}
