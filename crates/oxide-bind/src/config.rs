//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Placeholder names longer than this are rejected unless configured otherwise.
pub const DEFAULT_MAX_NAME_LEN: usize = 64;

/// Ceiling on the number of arguments a single statement may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLimit {
    /// Use [`Dialect::default_max_params`].
    #[default]
    DialectDefault,
    /// No ceiling.
    Unlimited,
    /// An explicit ceiling.
    Max(usize),
}

/// Limits and behavior tweaks for a [`Session`](crate::Session).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of placeholders a single statement may emit.
    pub max_params: ParamLimit,
    /// Maximum placeholder name length. Defaults to 64 when unset.
    pub max_name_len: Option<usize>,
}

impl Config {
    /// Creates a configuration that uses the dialect defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parameter ceiling.
    #[must_use]
    pub const fn max_params(mut self, limit: ParamLimit) -> Self {
        self.max_params = limit;
        self
    }

    /// Sets the placeholder name length ceiling.
    #[must_use]
    pub const fn max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = Some(len);
        self
    }

    /// Resolves the effective limits for a dialect.
    #[must_use]
    pub const fn limits(&self, dialect: Dialect) -> Limits {
        let max_params = match self.max_params {
            ParamLimit::DialectDefault => Some(dialect.default_max_params()),
            ParamLimit::Unlimited => None,
            ParamLimit::Max(n) => Some(n),
        };
        let max_name_len = match self.max_name_len {
            Some(n) => n,
            None => DEFAULT_MAX_NAME_LEN,
        };
        Limits {
            max_params,
            max_name_len: Some(max_name_len),
        }
    }
}

/// Effective limits applied while rendering a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limits {
    /// Maximum total placeholders; `None` is unlimited.
    pub max_params: Option<usize>,
    /// Maximum placeholder name length; `None` is unlimited.
    pub max_name_len: Option<usize>,
}

impl Limits {
    /// No limits at all.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_params: None,
            max_name_len: None,
        }
    }

    /// The defaults for a dialect.
    #[must_use]
    pub const fn for_dialect(dialect: Dialect) -> Self {
        Config {
            max_params: ParamLimit::DialectDefault,
            max_name_len: None,
        }
        .limits(dialect)
    }
}
