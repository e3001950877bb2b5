//! Binding inputs.
//!
//! A statement is rendered against an ordered list of [`Input`]s. Each is a
//! named [`Params`] bag, a record, or a bare collection of rows. When two
//! inputs expose the same name, the one supplied last wins.

use std::collections::HashMap;

use crate::record::Record;
use crate::value::{Param, SqlValue, ToParam};

mod resolver;

pub use resolver::{Resolved, Resolver};

/// One row of a `:name{col,...}` block.
#[derive(Debug, Clone)]
pub enum Row<'a> {
    /// A record; columns resolve through its flattened field index.
    Record(&'a dyn Record),
    /// A column to value map.
    Map(HashMap<String, SqlValue>),
}

impl<'a, R: Record> From<&'a R> for Row<'a> {
    fn from(record: &'a R) -> Self {
        Self::Record(record)
    }
}

impl From<HashMap<String, SqlValue>> for Row<'_> {
    fn from(map: HashMap<String, SqlValue>) -> Self {
        Self::Map(map)
    }
}

/// Collects records into rows.
///
/// ```rust
/// use oxide_bind::bind::rows;
/// use oxide_bind_derive::Record;
///
/// #[derive(Debug, Default, Record)]
/// pub struct User {
///     pub id: i64,
/// }
///
/// let users = vec![User { id: 1 }, User { id: 2 }];
/// assert_eq!(rows(&users).len(), 2);
/// ```
pub fn rows<'a, R: Record>(records: impl IntoIterator<Item = &'a R>) -> Vec<Row<'a>> {
    records.into_iter().map(Row::from).collect()
}

/// A named argument inside a [`Params`] bag.
#[derive(Debug, Clone)]
pub enum Arg<'a> {
    /// A value for `:name`.
    Value(Param),
    /// Rows for `:name{col,...}`.
    Rows(Vec<Row<'a>>),
}

/// Ordered name to argument bag. Inserting an existing name replaces it.
#[derive(Debug, Clone, Default)]
pub struct Params<'a> {
    entries: Vec<(String, Arg<'a>)>,
}

impl<'a> Params<'a> {
    /// Creates an empty bag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a value, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToParam) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds rows, builder style.
    #[must_use]
    pub fn with_rows(mut self, name: impl Into<String>, rows: Vec<Row<'a>>) -> Self {
        self.insert_rows(name, rows);
        self
    }

    /// Sets a value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl ToParam) {
        self.put(name.into(), Arg::Value(value.to_param()));
    }

    /// Sets rows.
    pub fn insert_rows(&mut self, name: impl Into<String>, rows: Vec<Row<'a>>) {
        self.put(name.into(), Arg::Rows(rows));
    }

    fn put(&mut self, name: String, arg: Arg<'a>) {
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = arg,
            None => self.entries.push((name, arg)),
        }
    }

    /// Looks up a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arg<'a>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, arg)| arg)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the bag holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arg<'a>)> {
        self.entries.iter().map(|(key, arg)| (key.as_str(), arg))
    }
}

impl<K: Into<String>, V: ToParam> FromIterator<(K, V)> for Params<'_> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

impl From<HashMap<String, SqlValue>> for Params<'_> {
    fn from(map: HashMap<String, SqlValue>) -> Self {
        map.into_iter().collect()
    }
}

/// A source of named values for rendering.
#[derive(Debug, Clone)]
pub enum Input<'a> {
    /// Named values and named row collections.
    Params(Params<'a>),
    /// A record; names resolve through its flattened field index.
    Record(&'a dyn Record),
    /// A bare row collection, reachable as `:rows{...}`.
    Rows(Vec<Row<'a>>),
}

impl<'a> From<Params<'a>> for Input<'a> {
    fn from(params: Params<'a>) -> Self {
        Self::Params(params)
    }
}

impl<'a, R: Record> From<&'a R> for Input<'a> {
    fn from(record: &'a R) -> Self {
        Self::Record(record)
    }
}

impl<'a> From<Vec<Row<'a>>> for Input<'a> {
    fn from(rows: Vec<Row<'a>>) -> Self {
        Self::Rows(rows)
    }
}

impl From<HashMap<String, SqlValue>> for Input<'_> {
    fn from(map: HashMap<String, SqlValue>) -> Self {
        Self::Params(map.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_insert_replaces() {
        let mut params = Params::new().with("a", 1_i64).with("b", "x");
        params.insert("a", 2_i64);
        assert_eq!(params.len(), 2);
        match params.get("a") {
            Some(Arg::Value(p)) => assert_eq!(*p.value(), SqlValue::Int(2)),
            other => panic!("unexpected {other:?}"),
        }
        let names: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_params_from_map() {
        let map = HashMap::from([(String::from("k"), SqlValue::Bool(true))]);
        let params = Params::from(map);
        assert!(matches!(params.get("k"), Some(Arg::Value(_))));
        assert!(params.get("missing").is_none());
    }

    #[test]
    fn test_rows_entry() {
        let row = HashMap::from([(String::from("id"), SqlValue::Int(1))]);
        let params = Params::new().with_rows("items", vec![Row::from(row)]);
        match params.get("items") {
            Some(Arg::Rows(rows)) => assert_eq!(rows.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }
}
