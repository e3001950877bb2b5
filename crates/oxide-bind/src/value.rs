//! SQL values and parameter handling.
//!
//! Values travel to the executor as [`SqlValue`] and come back the same way.
//! [`ToSqlValue`] and [`FromSqlValue`] cover the built-in leaf types;
//! [`SqlConvert`] is the hook for user types that convert themselves.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const TIMESTAMP_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A SQL value that can be used as a parameter or read from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value. Never expanded by the template renderer.
    Blob(Vec<u8>),
    /// Timestamp without time zone.
    Timestamp(NaiveDateTime),
    /// Ordered list of values. Expanded into one placeholder per element
    /// unless bound as a scalar.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Returns true for `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in conversion errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Timestamp(_) => "timestamp",
            Self::Array(_) => "array",
        }
    }
}

/// Failure to convert a [`SqlValue`] into a Rust value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// NULL reached a field that cannot represent it.
    #[error("Unexpected NULL for {expected}")]
    UnexpectedNull {
        /// Destination type.
        expected: &'static str,
    },

    /// The value has the wrong kind for the destination.
    #[error("Cannot convert {found} into {expected}")]
    Mismatch {
        /// Destination type.
        expected: &'static str,
        /// Kind of the received value.
        found: &'static str,
    },

    /// The value does not fit the destination type.
    #[error("Value {value} out of range for {expected}")]
    OutOfRange {
        /// Destination type.
        expected: &'static str,
        /// The received value.
        value: String,
    },

    /// The destination is a record, not a value field.
    #[error("{0} is not a value field")]
    NotAValue(&'static str),

    /// Error raised by a [`SqlConvert`] implementation.
    #[error("{0}")]
    Custom(String),
}

impl ConvertError {
    /// Builds the error for a value of the wrong kind or a NULL.
    #[must_use]
    pub const fn unexpected(expected: &'static str, found: &SqlValue) -> Self {
        match found {
            SqlValue::Null => Self::UnexpectedNull { expected },
            other => Self::Mismatch {
                expected,
                found: other.kind_name(),
            },
        }
    }

    /// Builds a custom conversion error.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(&self) -> SqlValue;
}

/// Trait for types that can be built from SQL values.
pub trait FromSqlValue: Sized {
    /// Converts a `SqlValue` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] when the value has the wrong kind, is NULL,
    /// or does not fit.
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError>;
}

/// Custom conversion between a user type and the driver representation.
///
/// Types implementing this trait are opaque leaves: they are never flattened,
/// never expanded when bound, and scanned through [`SqlConvert::from_sql`].
/// Register a type with [`impl_sql_convert!`](crate::impl_sql_convert).
pub trait SqlConvert: Sized {
    /// Converts the value into its driver representation.
    fn to_sql(&self) -> SqlValue;

    /// Builds the value from its driver representation.
    ///
    /// When the field is an `Option`, this is only called for non-NULL values.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] when the value cannot be decoded.
    fn from_sql(value: SqlValue) -> Result<Self, ConvertError>;
}

/// A bound parameter: a value plus whether it must stay a single argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    value: SqlValue,
    opaque: bool,
}

impl Param {
    /// A parameter that is expanded when it holds an array.
    #[must_use]
    pub const fn new(value: SqlValue) -> Self {
        Self {
            value,
            opaque: false,
        }
    }

    /// A parameter that is always bound as exactly one argument.
    #[must_use]
    pub const fn opaque(value: SqlValue) -> Self {
        Self {
            value,
            opaque: true,
        }
    }

    /// A NULL parameter.
    #[must_use]
    pub const fn null() -> Self {
        Self::new(SqlValue::Null)
    }

    /// Marks the parameter as a single argument.
    #[must_use]
    pub const fn into_opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    /// Returns the value.
    #[must_use]
    pub const fn value(&self) -> &SqlValue {
        &self.value
    }

    /// Consumes the parameter, returning the value.
    #[must_use]
    pub fn into_value(self) -> SqlValue {
        self.value
    }

    /// Returns true when the parameter is never expanded.
    #[must_use]
    pub const fn is_opaque(&self) -> bool {
        self.opaque
    }
}

/// Anything that can be bound to a named placeholder.
pub trait ToParam {
    /// Converts the value into a parameter.
    fn to_param(&self) -> Param;
}

impl<T: ToSqlValue + ?Sized> ToParam for T {
    fn to_param(&self) -> Param {
        Param::new(self.to_sql_value())
    }
}

/// Forces a collection to bind as one argument, e.g. `= ANY(:ids)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar<T>(pub T);

/// Wraps a value in [`Scalar`].
pub const fn scalar<T>(value: T) -> Scalar<T> {
    Scalar(value)
}

impl<T: ToSqlValue> ToParam for Scalar<T> {
    fn to_param(&self) -> Param {
        Param::opaque(self.0.to_sql_value())
    }
}

impl ToParam for Param {
    fn to_param(&self) -> Param {
        self.clone()
    }
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(&self) -> SqlValue {
        self.clone()
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        Ok(value)
    }
}

impl<T: ToSqlValue + ?Sized> ToSqlValue for &T {
    fn to_sql_value(&self) -> SqlValue {
        (**self).to_sql_value()
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            // SQLite and MySQL hand booleans back as integers.
            SqlValue::Int(n) => Ok(n != 0),
            other => Err(ConvertError::unexpected("bool", &other)),
        }
    }
}

macro_rules! impl_int {
    ($($t:ty),+) => {$(
        impl ToSqlValue for $t {
            fn to_sql_value(&self) -> SqlValue {
                SqlValue::Int(i64::from(*self))
            }
        }

        impl FromSqlValue for $t {
            #[allow(clippy::useless_conversion)]
            fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
                match value {
                    SqlValue::Int(n) => <$t>::try_from(n).map_err(|_| ConvertError::OutOfRange {
                        expected: stringify!($t),
                        value: n.to_string(),
                    }),
                    other => Err(ConvertError::unexpected(stringify!($t), &other)),
                }
            }
        }
    )+};
}

impl_int!(i8, i16, i32, i64, u8, u16, u32);

impl ToSqlValue for f64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(*self)
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        match value {
            SqlValue::Float(f) => Ok(f),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(n) => Ok(n as Self),
            other => Err(ConvertError::unexpected("f64", &other)),
        }
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float(f64::from(*self))
    }
}

impl FromSqlValue for f32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        match value {
            SqlValue::Float(f) => Ok(f as Self),
            SqlValue::Int(n) => Ok(n as Self),
            other => Err(ConvertError::unexpected("f32", &other)),
        }
    }
}

impl ToSqlValue for str {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        match value {
            SqlValue::Text(s) => Ok(s),
            other => Err(ConvertError::unexpected("String", &other)),
        }
    }
}

impl ToSqlValue for [u8] {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Blob(self.clone())
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        match value {
            SqlValue::Blob(b) => Ok(b),
            SqlValue::Text(s) => Ok(s.into_bytes()),
            other => Err(ConvertError::unexpected("Vec<u8>", &other)),
        }
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        match value {
            SqlValue::Timestamp(ts) => Ok(ts),
            SqlValue::Text(s) => Self::parse_from_str(&s, TIMESTAMP_TEXT_FORMAT)
                .map_err(|e| ConvertError::custom(format!("invalid timestamp '{s}': {e}"))),
            other => Err(ConvertError::unexpected("NaiveDateTime", &other)),
        }
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(self.naive_utc())
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        NaiveDateTime::from_sql_value(value).map(|ts| ts.and_utc())
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(&self) -> SqlValue {
        self.and_hms_opt(0, 0, 0)
            .map_or(SqlValue::Null, SqlValue::Timestamp)
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
        match value {
            SqlValue::Timestamp(ts) => Ok(ts.date()),
            SqlValue::Text(s) => Self::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| ConvertError::custom(format!("invalid date '{s}': {e}"))),
            other => Err(ConvertError::unexpected("NaiveDate", &other)),
        }
    }
}

// Arrays of non-byte leaves. `Vec<u8>` and `[u8]` are blobs above.
macro_rules! impl_array {
    ($($t:ty),+) => {$(
        impl ToSqlValue for [$t] {
            fn to_sql_value(&self) -> SqlValue {
                SqlValue::Array(self.iter().map(ToSqlValue::to_sql_value).collect())
            }
        }

        impl ToSqlValue for Vec<$t> {
            fn to_sql_value(&self) -> SqlValue {
                self.as_slice().to_sql_value()
            }
        }

        impl FromSqlValue for Vec<$t> {
            fn from_sql_value(value: SqlValue) -> Result<Self, ConvertError> {
                match value {
                    SqlValue::Array(items) => items.into_iter().map(<$t>::from_sql_value).collect(),
                    other => Err(ConvertError::unexpected(concat!("Vec<", stringify!($t), ">"), &other)),
                }
            }
        }
    )+};
}

impl_array!(bool, i8, i16, i32, i64, u16, u32, f32, f64, String, NaiveDateTime, NaiveDate);

impl ToSqlValue for [&str] {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Array(self.iter().map(|s| s.to_sql_value()).collect())
    }
}

impl ToSqlValue for Vec<&str> {
    fn to_sql_value(&self) -> SqlValue {
        self.as_slice().to_sql_value()
    }
}

impl ToSqlValue for [SqlValue] {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Array(self.to_vec())
    }
}

impl ToSqlValue for Vec<SqlValue> {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Array(self.clone())
    }
}

impl<T, const N: usize> ToSqlValue for [T; N]
where
    [T]: ToSqlValue,
{
    fn to_sql_value(&self) -> SqlValue {
        self.as_slice().to_sql_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_round_trip_and_range() {
        assert_eq!(42_i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!(i16::from_sql_value(SqlValue::Int(7)), Ok(7));
        assert!(matches!(
            u8::from_sql_value(SqlValue::Int(300)),
            Err(ConvertError::OutOfRange { expected: "u8", .. })
        ));
    }

    #[test]
    fn test_null_into_non_optional_fails() {
        assert_eq!(
            i64::from_sql_value(SqlValue::Null),
            Err(ConvertError::UnexpectedNull { expected: "i64" })
        );
        assert_eq!(Option::<i64>::from_sql_value(SqlValue::Null), Ok(None));
    }

    #[test]
    fn test_bytes_are_blobs_not_arrays() {
        assert_eq!(vec![1_u8, 2].to_sql_value(), SqlValue::Blob(vec![1, 2]));
        assert_eq!(
            vec![1_i64, 2].to_sql_value(),
            SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Int(2)])
        );
        assert_eq!(
            [10, 11].to_sql_value(),
            SqlValue::Array(vec![SqlValue::Int(10), SqlValue::Int(11)])
        );
    }

    #[test]
    fn test_scalar_is_opaque() {
        let param = scalar(vec![1_i64, 2, 3]).to_param();
        assert!(param.is_opaque());
        assert!(matches!(param.value(), SqlValue::Array(items) if items.len() == 3));
        assert!(!vec![1_i64].to_param().is_opaque());
    }

    #[test]
    fn test_timestamp_from_text() {
        let ts = NaiveDateTime::from_sql_value(SqlValue::Text(String::from(
            "2024-03-01 12:30:00",
        )))
        .unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 12:30:00");
        assert_eq!(
            NaiveDate::from_sql_value(SqlValue::Timestamp(ts)).unwrap(),
            ts.date()
        );
    }

    #[test]
    fn test_bool_from_int() {
        assert_eq!(bool::from_sql_value(SqlValue::Int(1)), Ok(true));
        assert_eq!(bool::from_sql_value(SqlValue::Int(0)), Ok(false));
    }
}
