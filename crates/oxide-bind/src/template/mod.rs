//! Template rendering.
//!
//! [`render`] rewrites named placeholders into the dialect's positional form
//! and collects the arguments in emission order:
//!
//! - `:name` binds one value. Arrays expand into one placeholder per element
//!   unless the value is opaque (scalar fields, [`Scalar`](crate::Scalar),
//!   custom conversions) or a blob.
//! - `:name{a,b}` binds a row collection as `(p,p),(p,p)`, one tuple per row.
//!
//! ```rust
//! use oxide_bind::{render, Dialect, Input, Limits, Params, SqlValue};
//!
//! let params = Params::new().with("ids", vec![10_i64, 11]).with("s", "active");
//! let stmt = render(
//!     Dialect::Postgres,
//!     "SELECT * FROM t WHERE id IN (:ids) AND s = :s",
//!     &[Input::from(params)],
//!     Limits::for_dialect(Dialect::Postgres),
//! )
//! .unwrap();
//! assert_eq!(stmt.sql, "SELECT * FROM t WHERE id IN ($1,$2) AND s = $3");
//! assert_eq!(stmt.args.len(), 3);
//! assert_eq!(stmt.args[2], SqlValue::Text("active".into()));
//! ```

use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::trace;

use crate::bind::{Input, Resolved, Resolver, Row};
use crate::config::Limits;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::record::{field_index, read_at_path, Record};
use crate::value::{Param, SqlValue};

mod lexer;

pub use lexer::{Lexer, Segment};

/// A rendered statement: positional SQL plus its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text with dialect placeholders.
    pub sql: String,
    /// Arguments in placeholder order.
    pub args: Vec<SqlValue>,
}

/// Renders `template` against `inputs`.
///
/// # Errors
///
/// Fails on the first missing, empty, ambiguous or malformed placeholder, or
/// when a limit is exceeded. No partial output is returned.
pub fn render(
    dialect: Dialect,
    template: &str,
    inputs: &[Input<'_>],
    limits: Limits,
) -> Result<Statement> {
    render_with(dialect, template, &Resolver::new(inputs), limits)
}

pub(crate) fn render_with(
    dialect: Dialect,
    template: &str,
    resolver: &Resolver<'_, '_>,
    limits: Limits,
) -> Result<Statement> {
    let mut out = Emitter {
        dialect,
        max_params: limits.max_params,
        sql: String::with_capacity(template.len() + 16),
        args: Vec::new(),
    };
    let mut row_paths = HashMap::new();

    for segment in Lexer::new(template, dialect, limits.max_name_len) {
        match segment? {
            Segment::Text(text) => out.sql.push_str(text),
            Segment::Placeholder(name) => out.value(name, resolver.lookup_value(name))?,
            Segment::RowBlock { name, columns } => {
                let rows = resolver
                    .lookup_rows(name)
                    .ok_or_else(|| Error::ParamMissing(name.to_owned()))?;
                out.rows(name, &columns, rows, &mut row_paths)?;
            }
        }
    }

    trace!(
        dialect = %dialect,
        args = out.args.len(),
        sql = %out.sql,
        "rendered statement"
    );
    Ok(Statement {
        sql: out.sql,
        args: out.args,
    })
}

/// Resolved column paths per record type seen in a row block.
type RowPaths = HashMap<TypeId, Vec<Vec<usize>>>;

struct Emitter {
    dialect: Dialect,
    max_params: Option<usize>,
    sql: String,
    args: Vec<SqlValue>,
}

impl Emitter {
    /// Checks that `add` more arguments fit under the ceiling.
    fn reserve(&self, add: usize) -> Result<()> {
        if let Some(limit) = self.max_params {
            let requested = self.args.len().saturating_add(add);
            if requested > limit {
                return Err(Error::TooManyParams { requested, limit });
            }
        }
        Ok(())
    }

    fn push(&mut self, value: SqlValue) {
        self.args.push(value);
        let token = self.dialect.placeholder(self.args.len());
        self.sql.push_str(&token);
    }

    fn value(&mut self, name: &str, resolved: Option<Resolved>) -> Result<()> {
        let param = match resolved {
            Some(Resolved::Value(param)) => param,
            Some(Resolved::Ambiguous) => {
                return Err(Error::FieldAmbiguous {
                    name: name.to_owned(),
                    row: None,
                })
            }
            None => return Err(Error::ParamMissing(name.to_owned())),
        };

        let opaque = param.is_opaque();
        match param.into_value() {
            SqlValue::Array(items) if !opaque => {
                if items.is_empty() {
                    return Err(Error::SliceEmpty(name.to_owned()));
                }
                self.reserve(items.len())?;
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        self.sql.push(',');
                    }
                    self.push(item);
                }
            }
            value => {
                self.reserve(1)?;
                self.push(value);
            }
        }
        Ok(())
    }

    fn rows(
        &mut self,
        name: &str,
        columns: &[&str],
        rows: &[Row<'_>],
        row_paths: &mut RowPaths,
    ) -> Result<()> {
        if rows.is_empty() {
            return Err(Error::RowsEmpty(name.to_owned()));
        }
        self.reserve(rows.len().saturating_mul(columns.len()))?;

        for (r, row) in rows.iter().enumerate() {
            if r > 0 {
                self.sql.push(',');
            }
            self.sql.push('(');
            match row {
                Row::Record(record) => {
                    let paths = paths_for(*record, name, columns, r, row_paths)?;
                    for (c, path) in paths.iter().enumerate() {
                        let value = read_at_path(*record, path)
                            .map(Param::into_value)
                            .ok_or_else(|| column_not_found(columns[c], name, r))?;
                        if c > 0 {
                            self.sql.push(',');
                        }
                        self.push(value);
                    }
                }
                Row::Map(map) => {
                    for (c, column) in columns.iter().enumerate() {
                        let value = map
                            .get(*column)
                            .cloned()
                            .ok_or_else(|| column_not_found(column, name, r))?;
                        if c > 0 {
                            self.sql.push(',');
                        }
                        self.push(value);
                    }
                }
            }
            self.sql.push(')');
        }
        Ok(())
    }
}

/// Column paths for the record's type, resolved on first sight of the type.
fn paths_for<'p>(
    record: &dyn Record,
    name: &str,
    columns: &[&str],
    row: usize,
    row_paths: &'p mut RowPaths,
) -> Result<&'p Vec<Vec<usize>>> {
    let descriptor = record.record_descriptor();
    match row_paths.entry(descriptor.id()) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let index = field_index(descriptor);
            let paths = columns
                .iter()
                .map(|column| match index.get(*column) {
                    None => Err(column_not_found(column, name, row)),
                    Some(info) if info.ambiguous => Err(Error::FieldAmbiguous {
                        name: (*column).to_owned(),
                        row: Some(row),
                    }),
                    Some(info) => Ok(info.path.clone()),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(entry.insert(paths))
        }
    }
}

fn column_not_found(column: &str, name: &str, row: usize) -> Error {
    Error::ColumnNotFound {
        column: column.to_owned(),
        name: name.to_owned(),
        row,
    }
}

#[cfg(test)]
mod tests {
    use oxide_bind_derive::Record;

    use super::*;
    use crate::bind::Params;
    use crate::value::scalar;

    #[derive(Debug, Default, Record)]
    pub struct User {
        pub id: i64,
        pub name: String,
    }

    #[derive(Debug, Default, Record)]
    pub struct Named {
        pub name: String,
        pub id: i64,
        pub extra: bool,
    }

    fn pg(template: &str, params: Params<'_>) -> Result<Statement> {
        render(
            Dialect::Postgres,
            template,
            &[Input::from(params)],
            Limits::unlimited(),
        )
    }

    #[test]
    fn test_expansion_and_ordinals() {
        let stmt = pg(
            "SELECT * FROM t WHERE id IN (:ids) AND s=:s",
            Params::new().with("ids", vec![10_i64, 11, 12]).with("s", "active"),
        )
        .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM t WHERE id IN ($1,$2,$3) AND s=$4");
        assert_eq!(
            stmt.args,
            [
                SqlValue::Int(10),
                SqlValue::Int(11),
                SqlValue::Int(12),
                SqlValue::Text(String::from("active")),
            ]
        );
    }

    #[test]
    fn test_opaque_values_are_single() {
        let stmt = pg(
            "SELECT :a, :b",
            Params::new()
                .with("a", scalar(vec![1_i64, 2]))
                .with("b", vec![1_u8, 2, 3]),
        )
        .unwrap();
        assert_eq!(stmt.sql, "SELECT $1, $2");
        assert!(matches!(stmt.args[0], SqlValue::Array(_)));
        assert!(matches!(stmt.args[1], SqlValue::Blob(_)));
    }

    #[test]
    fn test_repeated_name_binds_twice() {
        let stmt = pg("SELECT :x, :x", Params::new().with("x", 1_i64)).unwrap();
        assert_eq!(stmt.sql, "SELECT $1, $2");
        assert_eq!(stmt.args.len(), 2);
    }

    #[test]
    fn test_missing_and_empty() {
        assert!(matches!(
            pg("SELECT :nope", Params::new()),
            Err(Error::ParamMissing(name)) if name == "nope"
        ));
        assert!(matches!(
            pg("SELECT :ids", Params::new().with("ids", Vec::<i64>::new())),
            Err(Error::SliceEmpty(name)) if name == "ids"
        ));
        assert!(matches!(
            pg("VALUES :r{a}", Params::new().with_rows("r", Vec::new())),
            Err(Error::RowsEmpty(name)) if name == "r"
        ));
        assert!(matches!(
            pg("VALUES :r{a}", Params::new()),
            Err(Error::ParamMissing(name)) if name == "r"
        ));
    }

    #[test]
    fn test_no_placeholders_is_identity() {
        let sql = "SELECT 'a:b', x::int FROM t -- :c";
        let stmt = pg(sql, Params::new()).unwrap();
        assert_eq!(stmt.sql, sql);
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_row_block_records() {
        let users = [
            User {
                id: 1,
                name: String::from("A"),
            },
            User {
                id: 2,
                name: String::from("B"),
            },
        ];
        let stmt = render(
            Dialect::Sqlite,
            "INSERT INTO u(id,name) VALUES :rows{id,name}",
            &[Input::from(crate::bind::rows(&users))],
            Limits::unlimited(),
        )
        .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO u(id,name) VALUES (?,?),(?,?)");
        assert_eq!(
            stmt.args,
            [
                SqlValue::Int(1),
                SqlValue::Text(String::from("A")),
                SqlValue::Int(2),
                SqlValue::Text(String::from("B")),
            ]
        );
    }

    #[test]
    fn test_row_block_mixed_shapes() {
        let user = User {
            id: 1,
            name: String::from("A"),
        };
        let named = Named {
            name: String::from("B"),
            id: 2,
            extra: true,
        };
        let map = HashMap::from([
            (String::from("id"), SqlValue::Int(3)),
            (String::from("name"), SqlValue::Text(String::from("C"))),
        ]);
        let rows = vec![Row::from(&user), Row::from(&named), Row::from(map)];
        let stmt = render(
            Dialect::SqlServer,
            "VALUES :items{name,id}",
            &[Input::from(Params::new().with_rows("items", rows))],
            Limits::unlimited(),
        )
        .unwrap();
        assert_eq!(stmt.sql, "VALUES (@p1,@p2),(@p3,@p4),(@p5,@p6)");
        assert_eq!(stmt.args[2], SqlValue::Text(String::from("B")));
        assert_eq!(stmt.args[5], SqlValue::Int(3));
    }

    #[test]
    fn test_row_block_missing_column_names_row() {
        let user = User::default();
        let named = Named::default();
        let rows = vec![Row::from(&user), Row::from(&named)];
        let result = render(
            Dialect::Postgres,
            "VALUES :rows{id,extra}",
            &[Input::from(rows)],
            Limits::unlimited(),
        );
        assert!(matches!(
            result,
            Err(Error::ColumnNotFound { column, row: 0, .. }) if column == "extra"
        ));

        let map = HashMap::from([(String::from("id"), SqlValue::Int(1))]);
        let result = pg(
            "VALUES :r{id,name}",
            Params::new().with_rows("r", vec![Row::from(map.clone()), Row::from(map)]),
        );
        assert!(matches!(
            result,
            Err(Error::ColumnNotFound { column, row: 0, .. }) if column == "name"
        ));
    }

    #[test]
    fn test_param_ceiling() {
        let limits = Limits {
            max_params: Some(3),
            max_name_len: None,
        };
        let params = Params::new().with("a", 1_i64).with("ids", vec![1_i64, 2, 3]);
        let result = render(
            Dialect::Postgres,
            "SELECT :a, :ids",
            &[Input::from(params.clone())],
            limits,
        );
        assert!(matches!(
            result,
            Err(Error::TooManyParams {
                requested: 4,
                limit: 3
            })
        ));
        let stmt = render(Dialect::Postgres, "SELECT :ids", &[Input::from(params)], limits).unwrap();
        assert_eq!(stmt.args.len(), 3);
    }

    #[test]
    fn test_row_block_ceiling_counts_rows_times_columns() {
        let users = [User::default(), User::default()];
        let limits = Limits {
            max_params: Some(3),
            max_name_len: None,
        };
        let result = render(
            Dialect::MySql,
            "VALUES :rows{id,name}",
            &[Input::from(crate::bind::rows(&users))],
            limits,
        );
        assert!(matches!(
            result,
            Err(Error::TooManyParams {
                requested: 4,
                limit: 3
            })
        ));
    }

    #[test]
    fn test_render_is_deterministic() {
        let params = Params::new().with("a", 1_i64).with("b", vec!["x", "y"]);
        let inputs = [Input::from(params)];
        let first = render(Dialect::Postgres, "SELECT :b, :a", &inputs, Limits::unlimited());
        let second = render(Dialect::Postgres, "SELECT :b, :a", &inputs, Limits::unlimited());
        assert_eq!(first.unwrap(), second.unwrap());
    }
}
