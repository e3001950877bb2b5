//! Session and statement builder.

use std::fmt;

use tracing::debug;

use crate::bind::{Input, Params, Resolver, Row};
use crate::config::{Config, Limits};
use crate::dialect::Dialect;
use crate::driver::{ExecResult, Executor};
use crate::error::{Error, Result};
use crate::record::FieldDef;
use crate::scan::{self, Scanner};
use crate::template::{render_with, Statement};
use crate::value::ToParam;

/// A dialect plus rendering limits. Cheap to share across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    dialect: Dialect,
    limits: Limits,
}

impl Session {
    /// Creates a session with the dialect's default limits.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            limits: Limits::for_dialect(dialect),
        }
    }

    /// Creates a session from a configuration.
    #[must_use]
    pub const fn with_config(dialect: Dialect, config: &Config) -> Self {
        Self {
            dialect,
            limits: config.limits(dialect),
        }
    }

    /// The session's dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The effective limits.
    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// Starts a statement.
    ///
    /// ```rust
    /// use oxide_bind::{Dialect, Session};
    ///
    /// let session = Session::new(Dialect::SqlServer);
    /// let stmt = session
    ///     .write("SELECT * FROM users WHERE id = :id")
    ///     .write(" AND active = :active")
    ///     .set("id", 7_i64)
    ///     .set("active", true)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(stmt.sql, "SELECT * FROM users WHERE id = @p1 AND active = @p2");
    /// ```
    #[must_use]
    pub fn write<'a>(&self, sql: &str) -> Builder<'_, 'a> {
        Builder {
            session: self,
            sql: String::from(sql),
            inputs: Vec::new(),
            bag: Params::new(),
            invalid_key: false,
        }
    }
}

/// Accumulates SQL fragments and bindings for one statement.
///
/// Values given to [`set`](Self::set) and [`set_rows`](Self::set_rows) go
/// into an implicit bag that outranks every input passed to
/// [`bind`](Self::bind).
#[derive(Debug)]
pub struct Builder<'s, 'a> {
    session: &'s Session,
    sql: String,
    inputs: Vec<Input<'a>>,
    bag: Params<'a>,
    invalid_key: bool,
}

impl<'a> Builder<'_, 'a> {
    /// Appends a fragment verbatim.
    #[must_use]
    pub fn write(mut self, sql: &str) -> Self {
        self.sql.push_str(sql);
        self
    }

    /// Appends a formatted fragment, e.g. `.writef(format_args!("LIMIT {n}"))`.
    #[must_use]
    pub fn writef(mut self, args: fmt::Arguments<'_>) -> Self {
        self.sql.push_str(&fmt::format(args));
        self
    }

    /// Adds an input. Later inputs win over earlier ones.
    #[must_use]
    pub fn bind(mut self, input: impl Into<Input<'a>>) -> Self {
        self.inputs.push(input.into());
        self
    }

    /// Sets a named value.
    #[must_use]
    pub fn set(mut self, key: &str, value: impl ToParam) -> Self {
        if key.is_empty() {
            self.invalid_key = true;
        } else {
            self.bag.insert(key, value);
        }
        self
    }

    /// Sets named rows for a `:key{...}` block.
    #[must_use]
    pub fn set_rows(mut self, key: &str, rows: Vec<Row<'a>>) -> Self {
        if key.is_empty() {
            self.invalid_key = true;
        } else {
            self.bag.insert_rows(key, rows);
        }
        self
    }

    /// Renders without consuming the builder.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBindKey`] after an empty key was set, otherwise any
    /// rendering error.
    pub fn preview(&self) -> Result<Statement> {
        if self.invalid_key {
            return Err(Error::InvalidBindKey);
        }
        let resolver = Resolver::new(&self.inputs).with_bag(&self.bag);
        render_with(
            self.session.dialect,
            &self.sql,
            &resolver,
            self.session.limits,
        )
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// See [`preview`](Self::preview).
    pub fn build(self) -> Result<Statement> {
        self.preview()
    }

    /// Renders and executes a statement that returns no rows.
    ///
    /// # Errors
    ///
    /// Rendering or driver errors.
    pub fn exec<E: Executor + ?Sized>(self, executor: &E) -> Result<ExecResult> {
        let stmt = self.build()?;
        debug!(sql = %stmt.sql, args = stmt.args.len(), "executing statement");
        executor.execute(&stmt.sql, &stmt.args)
    }

    /// Renders, queries and scans exactly one row into `dest`.
    ///
    /// # Errors
    ///
    /// [`Error::NoRows`] when the query returns nothing,
    /// [`Error::MoreThanOneRow`] when it returns more than one row, plus any
    /// rendering, driver or scan error.
    pub fn scan_one<E, T>(self, executor: &E, dest: &mut T) -> Result<()>
    where
        E: Executor + ?Sized,
        T: FieldDef,
    {
        let stmt = self.build()?;
        debug!(sql = %stmt.sql, args = stmt.args.len(), "querying one row");
        let mut rows = executor.query(&stmt.sql, &stmt.args)?;
        let mut scanner = Scanner::for_type::<T>(rows.columns())?;
        if !rows.next()? {
            return Err(Error::NoRows);
        }
        scanner.scan_row(rows.as_mut(), dest)?;
        if rows.next()? {
            return Err(Error::MoreThanOneRow);
        }
        Ok(())
    }

    /// Renders, queries and scans every row into `dest`, replacing its
    /// contents.
    ///
    /// # Errors
    ///
    /// Rendering, driver or scan errors.
    pub fn scan_all<E, T>(self, executor: &E, dest: &mut Vec<T>) -> Result<()>
    where
        E: Executor + ?Sized,
        T: FieldDef + Default,
    {
        let stmt = self.build()?;
        debug!(sql = %stmt.sql, args = stmt.args.len(), "querying rows");
        let mut rows = executor.query(&stmt.sql, &stmt.args)?;
        scan::scan_all(rows.as_mut(), dest)
    }
}
