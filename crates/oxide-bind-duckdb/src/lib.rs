//! # oxide-bind-duckdb
//!
//! A DuckDB [`Executor`] for statements rendered by `oxide-bind`.
//!
//! DuckDB numbers its parameters like `PostgreSQL`, so sessions driving this
//! executor use [`DIALECT`].
//!
//! ```rust
//! use oxide_bind::Session;
//! use oxide_bind_duckdb::{DuckDbExecutor, DIALECT};
//!
//! let db = DuckDbExecutor::open_in_memory().unwrap();
//! let session = Session::new(DIALECT);
//! session.write("CREATE TABLE t (id BIGINT)").exec(&db).unwrap();
//! session
//!     .write("INSERT INTO t VALUES (:a), (:b)")
//!     .set("a", 1_i64)
//!     .set("b", 2_i64)
//!     .exec(&db)
//!     .unwrap();
//!
//! let mut ids: Vec<i64> = Vec::new();
//! session
//!     .write("SELECT id FROM t WHERE id IN (:ids) ORDER BY id")
//!     .set("ids", [1_i64, 2])
//!     .scan_all(&db, &mut ids)
//!     .unwrap();
//! assert_eq!(ids, [1, 2]);
//! ```

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use duckdb::{params_from_iter, Connection, Statement};
use oxide_bind::{Dialect, Error, ExecResult, Executor, MemoryRows, Result, Rows, SqlValue};
use tracing::debug;

/// Placeholder dialect understood by DuckDB.
pub const DIALECT: Dialect = Dialect::Postgres;

const TIMESTAMP_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Executes statements on a DuckDB connection.
///
/// Query results are read eagerly and handed back as a [`MemoryRows`]
/// cursor.
pub struct DuckDbExecutor {
    conn: Connection,
}

impl DuckDbExecutor {
    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] when DuckDB fails to start.
    pub fn open_in_memory() -> Result<Self> {
        Connection::open_in_memory()
            .map(Self::new)
            .map_err(Error::driver)
    }

    /// Opens or creates a database file.
    ///
    /// # Errors
    ///
    /// [`Error::Driver`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Connection::open(path).map(Self::new).map_err(Error::driver)
    }

    /// Wraps an existing connection.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        self.conn.prepare(sql).map_err(Error::driver)
    }
}

impl Executor for DuckDbExecutor {
    fn execute(&self, sql: &str, args: &[SqlValue]) -> Result<ExecResult> {
        let params = to_duckdb_params(args)?;
        debug!(sql, args = params.len(), "duckdb execute");
        let affected = self
            .prepare(sql)?
            .execute(params_from_iter(params.iter()))
            .map_err(Error::driver)?;
        Ok(ExecResult {
            rows_affected: u64::try_from(affected).map_err(Error::driver)?,
        })
    }

    fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Box<dyn Rows + '_>> {
        let params = to_duckdb_params(args)?;
        debug!(sql, args = params.len(), "duckdb query");
        let mut stmt = self.prepare(sql)?;
        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(Error::driver)?;
        let columns = rows
            .as_ref()
            .map(Statement::column_names)
            .unwrap_or_default();

        let mut fetched = Vec::new();
        while let Some(row) = rows.next().map_err(Error::driver)? {
            let values = (0..columns.len())
                .map(|i| {
                    row.get::<_, Value>(i)
                        .map_err(Error::driver)
                        .and_then(from_duckdb)
                })
                .collect::<Result<Vec<_>>>()?;
            fetched.push(values);
        }
        debug!(rows = fetched.len(), "duckdb fetched rows");

        let cursor = fetched
            .into_iter()
            .fold(MemoryRows::new(columns), MemoryRows::row);
        Ok(Box::new(cursor))
    }
}

fn to_duckdb_params(args: &[SqlValue]) -> Result<Vec<Value>> {
    args.iter().map(to_duckdb).collect()
}

/// Converts a bound argument into a DuckDB value.
///
/// Timestamps travel as text and rely on DuckDB's implicit cast.
///
/// # Errors
///
/// [`Error::Driver`] for arrays, which DuckDB cannot bind as one parameter.
pub fn to_duckdb(value: &SqlValue) -> Result<Value> {
    Ok(match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Boolean(*b),
        SqlValue::Int(n) => Value::BigInt(*n),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
        SqlValue::Timestamp(ts) => Value::Text(ts.format(TIMESTAMP_TEXT_FORMAT).to_string()),
        SqlValue::Array(_) => {
            return Err(Error::driver("array parameters are not supported by DuckDB"));
        }
    })
}

/// Converts a DuckDB result value.
///
/// # Errors
///
/// [`Error::Driver`] for values outside the `i64` range and for types
/// without a [`SqlValue`] counterpart (intervals, structs, maps, unions).
pub fn from_duckdb(value: Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Bool(b),
        Value::TinyInt(n) => SqlValue::Int(n.into()),
        Value::SmallInt(n) => SqlValue::Int(n.into()),
        Value::Int(n) => SqlValue::Int(n.into()),
        Value::BigInt(n) => SqlValue::Int(n),
        Value::UTinyInt(n) => SqlValue::Int(n.into()),
        Value::USmallInt(n) => SqlValue::Int(n.into()),
        Value::UInt(n) => SqlValue::Int(n.into()),
        Value::HugeInt(n) => SqlValue::Int(i64::try_from(n).map_err(Error::driver)?),
        Value::UBigInt(n) => SqlValue::Int(i64::try_from(n).map_err(Error::driver)?),
        Value::Float(f) => SqlValue::Float(f.into()),
        Value::Double(f) => SqlValue::Float(f),
        Value::Decimal(d) => SqlValue::Text(d.to_string()),
        Value::Text(s) | Value::Enum(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
        Value::Timestamp(unit, ticks) => SqlValue::Timestamp(timestamp(unit, ticks)?),
        Value::Date32(days) => {
            let date = days
                .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(|| Error::driver(format!("date out of range: {days}")))?;
            SqlValue::Timestamp(date)
        }
        Value::Time64(unit, ticks) => SqlValue::Text(time_of_day(unit, ticks)?.to_string()),
        Value::List(items) | Value::Array(items) => SqlValue::Array(
            items
                .into_iter()
                .map(from_duckdb)
                .collect::<Result<Vec<_>>>()?,
        ),
        other => {
            return Err(Error::driver(format!(
                "unsupported DuckDB value: {other:?}"
            )));
        }
    })
}

const fn to_micros(unit: TimeUnit, ticks: i64) -> i64 {
    match unit {
        TimeUnit::Second => ticks.saturating_mul(1_000_000),
        TimeUnit::Millisecond => ticks.saturating_mul(1_000),
        TimeUnit::Microsecond => ticks,
        TimeUnit::Nanosecond => ticks / 1_000,
    }
}

fn timestamp(unit: TimeUnit, ticks: i64) -> Result<chrono::NaiveDateTime> {
    let ts = match unit {
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(ticks)),
        _ => DateTime::from_timestamp_micros(to_micros(unit, ticks)),
    };
    ts.map(|t| t.naive_utc())
        .ok_or_else(|| Error::driver(format!("timestamp out of range: {ticks}")))
}

fn time_of_day(unit: TimeUnit, ticks: i64) -> Result<NaiveTime> {
    let micros = to_micros(unit, ticks);
    let secs = u32::try_from(micros.div_euclid(1_000_000)).map_err(Error::driver)?;
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).map_err(Error::driver)?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .ok_or_else(|| Error::driver(format!("time out of range: {ticks}")))
}
