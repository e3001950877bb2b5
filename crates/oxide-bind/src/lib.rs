//! # oxide-bind
//!
//! Named-placeholder SQL templating and struct mapping.
//!
//! This crate provides:
//! - A single-pass template lexer that finds `:name` and `:name{a,b}`
//!   placeholders while skipping quoted literals, quoted identifiers,
//!   comments and dollar-quoted bodies
//! - Rendering into `$n`, `@pn` or `?` placeholders with an ordered argument
//!   list, expanding collections and row blocks
//! - Flattened column mapping for `#[derive(Record)]` structs, used both to
//!   bind fields and to scan result rows back into them
//! - Bounded caches for field indices and scan plans
//!
//! ## Rendering
//!
//! ```rust
//! use oxide_bind::{Dialect, Session, SqlValue};
//!
//! let session = Session::new(Dialect::Postgres);
//! let stmt = session
//!     .write("SELECT * FROM t WHERE id IN (:ids) AND s = :s")
//!     .set("ids", vec![10_i64, 11, 12])
//!     .set("s", "active")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(stmt.sql, "SELECT * FROM t WHERE id IN ($1,$2,$3) AND s = $4");
//! assert_eq!(stmt.args[3], SqlValue::Text("active".into()));
//! ```
//!
//! ## Records
//!
//! ```rust
//! use oxide_bind::{bind::rows, Dialect, MemoryRows, Session, SqlValue};
//! use oxide_bind_derive::Record;
//!
//! #[derive(Debug, Default, Record)]
//! pub struct User {
//!     pub id: i64,
//!     pub name: String,
//!     pub email: Option<String>,
//! }
//!
//! let users = vec![
//!     User { id: 1, name: "A".into(), email: None },
//!     User { id: 2, name: "B".into(), email: None },
//! ];
//! let stmt = Session::new(Dialect::Sqlite)
//!     .write("INSERT INTO users (id, name) VALUES :rows{id,name}")
//!     .bind(rows(&users))
//!     .build()
//!     .unwrap();
//! assert_eq!(stmt.sql, "INSERT INTO users (id, name) VALUES (?,?),(?,?)");
//!
//! let mut cursor = MemoryRows::new(["id", "name", "email"])
//!     .row([SqlValue::Int(3), SqlValue::Text("C".into()), SqlValue::Null]);
//! let mut out: Vec<User> = Vec::new();
//! oxide_bind::scan_all(&mut cursor, &mut out).unwrap();
//! assert_eq!(out[0].name, "C");
//! assert!(out[0].email.is_none());
//! ```

extern crate self as oxide_bind;

pub mod bind;
pub mod cache;
pub mod config;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod record;
pub mod scan;
pub mod session;
pub mod template;
pub mod value;

pub use bind::{Arg, Input, Params, Row};
pub use config::{Config, Limits, ParamLimit};
pub use dialect::Dialect;
pub use driver::{ExecResult, Executor, MemoryRows, Rows, ScanTargets};
pub use error::{Error, Result};
pub use record::{Field, FieldDef, Record};
pub use scan::{scan_all, scan_one, Scanner};
pub use session::{Builder, Session};
pub use template::{render, Statement};
pub use value::{
    scalar, ConvertError, FromSqlValue, Param, Scalar, SqlConvert, SqlValue, ToParam, ToSqlValue,
};
