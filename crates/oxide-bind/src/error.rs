//! Error types for rendering, binding and scanning.

use crate::value::ConvertError;

/// Errors returned by rendering, binding, scanning and executor adapters.
///
/// Every error names the offending placeholder or column where one exists.
/// Row-block errors also carry the 0-based row index that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A placeholder name was not found in any bound input.
    #[error("Missing parameter: {0}")]
    ParamMissing(String),

    /// A collection bound to a placeholder was empty.
    #[error("Empty collection bound to :{0}")]
    SliceEmpty(String),

    /// A row collection bound to a row-block was empty.
    #[error("Empty rows bound to :{0}{{...}}")]
    RowsEmpty(String),

    /// A row-block column list could not be parsed.
    #[error("Malformed rows placeholder :{name}{{...}}: {reason}")]
    RowsMalformed {
        /// Placeholder name.
        name: String,
        /// What was wrong with the column list.
        reason: &'static str,
    },

    /// A row in a row-block has no value for a requested column.
    #[error("Column '{column}' not found in :{name}{{...}} (record {row})")]
    ColumnNotFound {
        /// Requested column.
        column: String,
        /// Placeholder name.
        name: String,
        /// 0-based row index.
        row: usize,
    },

    /// Emitting the next batch would exceed the parameter ceiling.
    #[error("Too many parameters: requested={requested}, limit={limit}")]
    TooManyParams {
        /// Total parameter count the batch would reach.
        requested: usize,
        /// Configured ceiling.
        limit: usize,
    },

    /// A placeholder name exceeds the configured length ceiling.
    #[error("Parameter name too long: '{name}' ({len} > {limit})")]
    ParamNameTooLong {
        /// The offending name.
        name: String,
        /// Its length in bytes.
        len: usize,
        /// Configured ceiling.
        limit: usize,
    },

    /// Two distinct fields of a record expose the same column name.
    #[error(
        "Ambiguous field name: '{name}'{}",
        .row.map_or_else(String::new, |r| format!(" (record {r})"))
    )]
    FieldAmbiguous {
        /// The ambiguous column name.
        name: String,
        /// Row index, when raised from a row-block.
        row: Option<usize>,
    },

    /// The destination cannot receive the result set as shaped.
    #[error("Scan shape mismatch: {0}")]
    ScanShape(String),

    /// A column value could not be converted into its destination field.
    #[error("Cannot scan column '{column}': {source}")]
    Convert {
        /// Result column.
        column: String,
        /// Underlying conversion failure.
        #[source]
        source: ConvertError,
    },

    /// A single-row scan found no rows.
    #[error("No rows returned")]
    NoRows,

    /// A single-row scan found more than one row.
    #[error("More than one row returned")]
    MoreThanOneRow,

    /// A builder key was empty.
    #[error("Bind key must be a non-empty string")]
    InvalidBindKey,

    /// Error raised by the underlying executor or row cursor.
    #[error("Driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an executor or cursor error.
    pub fn driver(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Driver(err.into())
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
