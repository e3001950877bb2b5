//! Name lookup across bound inputs.

use super::{Arg, Input, Params, Row};
use crate::record::{field_index, read_at_path};
use crate::value::Param;

/// Outcome of a scalar lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// The value to bind.
    Value(Param),
    /// The name maps to more than one field of a record.
    Ambiguous,
}

/// Resolves names against inputs, last supplied first.
#[derive(Debug)]
pub struct Resolver<'i, 'a> {
    inputs: Vec<&'i Input<'a>>,
    bag: Option<&'i Params<'a>>,
}

impl<'i, 'a> Resolver<'i, 'a> {
    /// Creates a resolver over inputs in the order they were bound.
    pub fn new(inputs: impl IntoIterator<Item = &'i Input<'a>>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            bag: None,
        }
    }

    /// Adds a bag that takes precedence over every input.
    #[must_use]
    pub const fn with_bag(mut self, bag: &'i Params<'a>) -> Self {
        self.bag = Some(bag);
        self
    }

    /// Finds the value bound to `:name`.
    ///
    /// Row collections are never returned here; they only answer
    /// [`lookup_rows`](Self::lookup_rows).
    #[must_use]
    pub fn lookup_value(&self, name: &str) -> Option<Resolved> {
        self.bag
            .and_then(|bag| bag_value(bag, name))
            .or_else(|| {
                self.inputs
                    .iter()
                    .rev()
                    .find_map(|input| lookup_one(input, name))
            })
    }

    /// Finds the rows bound to `:name{...}`.
    #[must_use]
    pub fn lookup_rows(&self, name: &str) -> Option<&'i [Row<'a>]> {
        self.bag.and_then(|bag| bag_rows(bag, name)).or_else(|| {
            self.inputs.iter().rev().find_map(|input| match input {
                Input::Params(params) => bag_rows(params, name),
                Input::Rows(rows) if name == "rows" => Some(rows.as_slice()),
                Input::Rows(_) | Input::Record(_) => None,
            })
        })
    }
}

fn bag_value(params: &Params<'_>, name: &str) -> Option<Resolved> {
    match params.get(name)? {
        Arg::Value(param) => Some(Resolved::Value(param.clone())),
        Arg::Rows(_) => None,
    }
}

fn bag_rows<'i, 'a>(params: &'i Params<'a>, name: &str) -> Option<&'i [Row<'a>]> {
    match params.get(name)? {
        Arg::Rows(rows) => Some(rows.as_slice()),
        Arg::Value(_) => None,
    }
}

fn lookup_one(input: &Input<'_>, name: &str) -> Option<Resolved> {
    match input {
        Input::Params(params) => bag_value(params, name),
        Input::Record(record) => {
            let index = field_index(record.record_descriptor());
            let info = index.get(name)?;
            if info.ambiguous {
                return Some(Resolved::Ambiguous);
            }
            let param = read_at_path(*record, &info.path)?;
            Some(Resolved::Value(if info.scalar {
                param.into_opaque()
            } else {
                param
            }))
        }
        Input::Rows(_) => None,
    }
}
