#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use oxide_bind::{
    impl_sql_convert, ConvertError, Error, ExecResult, Executor, MemoryRows, Result, Rows,
    SqlConvert, SqlValue,
};
use oxide_bind_derive::Record;

#[derive(Debug, Default, Clone, PartialEq, Record)]
pub struct Address {
    pub street: String,
    pub city: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<Address>,
    #[column(scalar)]
    pub tags: Vec<String>,
}

/// Amount in cents, stored as text like `"12.34"`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cents(pub i64);

impl SqlConvert for Cents {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(format!("{}.{:02}", self.0 / 100, self.0 % 100))
    }

    fn from_sql(value: SqlValue) -> std::result::Result<Self, ConvertError> {
        match value {
            SqlValue::Text(s) => {
                let (whole, frac) = s
                    .split_once('.')
                    .ok_or_else(|| ConvertError::custom(format!("bad amount {s}")))?;
                let whole: i64 = whole
                    .parse()
                    .map_err(|_| ConvertError::custom(format!("bad amount {s}")))?;
                let frac: i64 = frac
                    .parse()
                    .map_err(|_| ConvertError::custom(format!("bad amount {s}")))?;
                Ok(Self(whole * 100 + frac))
            }
            SqlValue::Int(n) => Ok(Self(n * 100)),
            other => Err(ConvertError::unexpected("Cents", &other)),
        }
    }
}

impl_sql_convert!(Cents);

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_owned())
}

pub fn user(id: i64, name: &str) -> User {
    User {
        id,
        name: name.to_owned(),
        ..User::default()
    }
}

/// Executor returning queued cursors and recording every statement.
#[derive(Default)]
pub struct FakeExecutor {
    results: RefCell<VecDeque<MemoryRows>>,
    log: RefCell<Vec<(String, Vec<SqlValue>)>>,
    rows_affected: u64,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn affecting(mut self, rows_affected: u64) -> Self {
        self.rows_affected = rows_affected;
        self
    }

    pub fn returning(self, rows: MemoryRows) -> Self {
        self.results.borrow_mut().push_back(rows);
        self
    }

    pub fn statements(&self) -> Vec<(String, Vec<SqlValue>)> {
        self.log.borrow().clone()
    }
}

impl Executor for FakeExecutor {
    fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult> {
        self.log.borrow_mut().push((sql.to_owned(), args.to_vec()));
        Ok(ExecResult {
            rows_affected: self.rows_affected,
        })
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Box<dyn Rows + '_>> {
        self.log.borrow_mut().push((sql.to_owned(), args.to_vec()));
        let rows = self
            .results
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::driver("no result queued"))?;
        Ok(Box::new(rows))
    }
}
