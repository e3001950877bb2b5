//! Reads and writes along flattened field paths.
//!
//! Binding reads leaves through [`read_at_path`]; scanning writes them
//! through [`ensure_path`] and [`assign_at_path`]. Both sides use the same
//! paths produced by [`field_index`](super::field_index).

use super::{Field, FieldDescriptor, Holder, Node, NodeMut, Record, RecordDescriptor, ShapeKind};
use crate::value::Param;

/// Reads the leaf at `path`.
///
/// An absent optional record along the way reads as NULL. Returns `None`
/// when the path does not match the record's structure.
#[must_use]
pub fn read_at_path(root: &dyn Record, path: &[usize]) -> Option<Param> {
    let (last, parents) = path.split_last()?;
    let mut current = root;
    for &index in parents {
        match current.field(index)?.node() {
            Node::Record(record) => current = record,
            Node::Null => return Some(Param::null()),
            Node::Value(_) => return None,
        }
    }
    match current.field(*last)?.node() {
        Node::Value(param) => Some(param),
        Node::Null => Some(Param::null()),
        Node::Record(_) => None,
    }
}

/// Walks to the leaf at `path`, allocating absent optional records on the
/// way. The leaf itself is returned as-is, never allocated.
///
/// Idempotent: calling it twice allocates nothing the second time.
pub fn ensure_path<'a>(root: &'a mut dyn Record, path: &[usize]) -> Option<&'a mut dyn Field> {
    let (last, parents) = path.split_last()?;
    let mut current = root;
    for &index in parents {
        current = match current.field_mut(index)?.node_mut() {
            NodeMut::Record(record) => record,
            NodeMut::Optional(optional) => optional.ensure()?,
            NodeMut::Value(_) => return None,
        };
    }
    current.field_mut(*last)
}

/// Moves the value buffered in `holder` into the leaf at `path`.
///
/// Returns false when the path or the leaf type does not match.
pub fn assign_at_path(root: &mut dyn Record, path: &[usize], holder: &mut dyn Holder) -> bool {
    ensure_path(root, path).is_some_and(|leaf| holder.transfer(leaf))
}

/// Static descriptor of the leaf at `path`.
#[must_use]
pub fn shape_at_path(
    descriptor: &'static RecordDescriptor,
    path: &[usize],
) -> Option<&'static FieldDescriptor> {
    let (last, parents) = path.split_last()?;
    let mut current = descriptor;
    for &index in parents {
        match current.fields.get(index)?.shape.kind {
            ShapeKind::Record(nested) => current = nested(),
            ShapeKind::Value | ShapeKind::Convert => return None,
        }
    }
    current.fields.get(*last)
}

#[cfg(test)]
mod tests {
    use oxide_bind_derive::Record;

    use super::*;
    use crate::record::{field_index, Record as _, Scan};
    use crate::value::SqlValue;

    #[derive(Debug, Default, Record)]
    pub struct Geo {
        pub lat: f64,
    }

    #[derive(Debug, Default, Record)]
    pub struct Place {
        pub label: String,
        pub geo: Option<Box<Geo>>,
    }

    #[derive(Debug, Default, Record)]
    pub struct Event {
        pub id: i64,
        pub note: Option<String>,
        pub place: Option<Place>,
    }

    fn path_of(column: &str) -> Vec<usize> {
        field_index(Event::descriptor())[column].path.clone()
    }

    #[test]
    fn test_read_through_absent_record_is_null() {
        let event = Event {
            id: 7,
            ..Event::default()
        };
        assert_eq!(
            read_at_path(&event, &path_of("id")).map(Param::into_value),
            Some(SqlValue::Int(7))
        );
        assert_eq!(
            read_at_path(&event, &path_of("lat")).map(Param::into_value),
            Some(SqlValue::Null)
        );
        assert_eq!(
            read_at_path(&event, &path_of("note")).map(Param::into_value),
            Some(SqlValue::Null)
        );
    }

    #[test]
    fn test_ensure_allocates_intermediates_only() {
        let mut event = Event::default();
        let path = path_of("lat");
        let leaf = ensure_path(&mut event, &path).unwrap();
        match leaf.node_mut() {
            NodeMut::Value(slot) => slot.scan(SqlValue::Float(1.5)).unwrap(),
            _ => panic!("expected value leaf"),
        }
        let place = event.place.as_ref().unwrap();
        assert_eq!(place.geo.as_ref().unwrap().lat, 1.5);
        assert_eq!(place.label, "");

        // Leaf optional is not allocated ahead of assignment.
        let note = ensure_path(&mut event, &path_of("note")).unwrap();
        assert!(matches!(note.node(), Node::Null));
        assert!(event.note.is_none());
    }

    #[test]
    fn test_assign_moves_holder_value() {
        let mut event = Event::default();
        let mut holder: Box<dyn Holder> = Box::new(None::<String>);
        holder.scan(SqlValue::Text(String::from("hi"))).unwrap();
        assert!(assign_at_path(&mut event, &path_of("note"), holder.as_mut()));
        assert_eq!(event.note.as_deref(), Some("hi"));
    }

    #[test]
    fn test_shape_at_path() {
        let field = shape_at_path(Event::descriptor(), &path_of("lat")).unwrap();
        assert_eq!(field.ident, "lat");
        assert!(!field.shape.optional);
        let field = shape_at_path(Event::descriptor(), &path_of("note")).unwrap();
        assert!(field.shape.optional);
        assert!(shape_at_path(Event::descriptor(), &[9]).is_none());
    }
}
