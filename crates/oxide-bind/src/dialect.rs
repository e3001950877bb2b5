//! SQL dialects.
//!
//! A dialect decides how placeholders are rendered and which quoting and
//! comment forms the template lexer recognizes.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL: `$1, $2, ...`, dollar-quoted strings.
    Postgres,
    /// MySQL: `?`, backtick identifiers, `#` line comments.
    MySql,
    /// SQLite: `?`, backtick identifiers.
    Sqlite,
    /// SQL Server: `@p1, @p2, ...`, bracket identifiers.
    SqlServer,
}

impl Dialect {
    /// Returns the name of the dialect.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
            Self::SqlServer => "sqlserver",
        }
    }

    /// Renders the placeholder for a 1-based argument ordinal.
    #[must_use]
    pub fn placeholder(self, ordinal: usize) -> Cow<'static, str> {
        match self {
            Self::Postgres => Cow::Owned(format!("${ordinal}")),
            Self::SqlServer => Cow::Owned(format!("@p{ordinal}")),
            Self::MySql | Self::Sqlite => Cow::Borrowed("?"),
        }
    }

    /// Whether `#` starts a line comment.
    #[must_use]
    pub const fn hash_comments(self) -> bool {
        matches!(self, Self::MySql)
    }

    /// Whether backticks quote identifiers.
    #[must_use]
    pub const fn backtick_identifiers(self) -> bool {
        matches!(self, Self::MySql | Self::Sqlite)
    }

    /// Whether square brackets quote identifiers.
    #[must_use]
    pub const fn bracket_identifiers(self) -> bool {
        matches!(self, Self::SqlServer)
    }

    /// Maximum number of bind parameters the server accepts per statement.
    #[must_use]
    pub const fn default_max_params(self) -> usize {
        match self {
            Self::SqlServer => 2100,
            Self::Sqlite => 999,
            Self::Postgres | Self::MySql => 65535,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown dialect name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown SQL dialect: '{0}'")]
pub struct UnknownDialect(pub String);

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            _ => Err(UnknownDialect(String::from(s))),
        }
    }
}
