//! Flattened column index of a record type.

use std::any::TypeId;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use super::{RecordDescriptor, ShapeKind};
use crate::cache::{GenerationalCache, CACHE_CAPACITY};

/// Where a column lives inside a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field indices from the root record down to the leaf.
    pub path: Vec<usize>,
    /// Bind collections as one argument.
    pub scalar: bool,
    /// Two distinct leaves expose this column. `path` is empty when set.
    pub ambiguous: bool,
}

/// Column name to leaf mapping for one record type.
pub type FieldMap = HashMap<String, FieldInfo>;

static FIELD_INDEX: LazyLock<GenerationalCache<TypeId, Arc<FieldMap>>> =
    LazyLock::new(|| GenerationalCache::new("field_index", CACHE_CAPACITY));

/// Returns the flattened column index of a record type.
///
/// Nested records (directly, through `Option` or through `Box`) are inlined
/// into the parent's namespace. Custom-conversion types and the built-in
/// leaves are never descended into. A record type already being expanded
/// higher up the walk is not re-entered, so recursive types terminate.
///
/// The result is memoized per type.
#[must_use]
pub fn field_index(descriptor: &'static RecordDescriptor) -> Arc<FieldMap> {
    let key = descriptor.id();
    if let Some(map) = FIELD_INDEX.get(&key) {
        return map;
    }
    let map = Arc::new(build(descriptor));
    FIELD_INDEX.insert(key, Arc::clone(&map));
    map
}

fn build(descriptor: &'static RecordDescriptor) -> FieldMap {
    let mut map = FieldMap::with_capacity(descriptor.fields.len());
    let mut path = Vec::new();
    let mut expanding = HashSet::new();
    walk(descriptor, &mut path, &mut expanding, &mut map);
    map
}

fn walk(
    descriptor: &'static RecordDescriptor,
    path: &mut Vec<usize>,
    expanding: &mut HashSet<TypeId>,
    map: &mut FieldMap,
) {
    let id = descriptor.id();
    if !expanding.insert(id) {
        return;
    }

    for (i, field) in descriptor.fields.iter().enumerate() {
        path.push(i);
        match field.shape.kind {
            ShapeKind::Record(nested) => walk(nested(), path, expanding, map),
            ShapeKind::Value | ShapeKind::Convert => match map.entry(field.column.to_owned()) {
                Entry::Occupied(mut entry) => {
                    if !entry.get().ambiguous {
                        entry.insert(FieldInfo {
                            path: Vec::new(),
                            scalar: false,
                            ambiguous: true,
                        });
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(FieldInfo {
                        path: path.clone(),
                        scalar: field.scalar,
                        ambiguous: false,
                    });
                }
            },
        }
        path.pop();
    }

    expanding.remove(&id);
}

#[cfg(test)]
mod tests {
    use oxide_bind_derive::Record;

    use super::*;
    use crate::record::Record as _;

    #[derive(Debug, Default, Record)]
    pub struct Address {
        pub street: String,
        pub city: Option<String>,
    }

    #[derive(Debug, Default, Record)]
    pub struct Person {
        pub id: i64,
        #[column(name = "full_name")]
        pub name: String,
        #[column(scalar)]
        pub tags: Vec<String>,
        #[column(skip)]
        pub cached: String,
        pub home: Option<Address>,
        #[allow(dead_code)]
        secret: String,
    }

    #[derive(Debug, Default, Record)]
    pub struct Twice {
        pub id: i64,
        pub home: Address,
        pub work: Option<Box<Address>>,
    }

    #[derive(Debug, Default, Record)]
    pub struct Node {
        pub value: i32,
        pub next: Option<Box<Node>>,
    }

    #[test]
    fn test_flattens_nested_and_renames() {
        let map = field_index(Person::descriptor());
        let mut names: Vec<_> = map.keys().cloned().collect();
        names.sort();
        assert_eq!(names, ["city", "full_name", "id", "street", "tags"]);
        assert_eq!(map["id"].path, [0]);
        assert_eq!(map["street"].path, [3, 0]);
        assert_eq!(map["city"].path, [3, 1]);
        assert!(map["tags"].scalar);
        assert!(!map["id"].scalar);
    }

    #[test]
    fn test_collisions_are_ambiguous() {
        let map = field_index(Twice::descriptor());
        assert!(!map["id"].ambiguous);
        assert!(map["street"].ambiguous);
        assert!(map["street"].path.is_empty());
        assert!(map["city"].ambiguous);
    }

    #[test]
    fn test_recursive_type_terminates() {
        let map = field_index(Node::descriptor());
        assert_eq!(map.len(), 1);
        assert_eq!(map["value"].path, [0]);
    }

    #[test]
    fn test_index_is_memoized() {
        let a = field_index(Person::descriptor());
        let b = field_index(Person::descriptor());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
