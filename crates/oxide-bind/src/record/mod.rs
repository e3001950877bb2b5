//! Record metadata and field access.
//!
//! A record is a struct deriving `Record` (see the `oxide-bind-derive`
//! crate). The derive emits a static [`RecordDescriptor`] listing every
//! mapped field with its column name and [`Shape`], plus index-based
//! accessors returning `dyn Field`. Everything else in this crate works on
//! those two pieces: the flattened column index, path reads and writes, and
//! scan plans.
//!
//! ```rust
//! use oxide_bind::record::Record;
//! use oxide_bind_derive::Record;
//!
//! #[derive(Debug, Default, Record)]
//! pub struct User {
//!     pub id: i64,
//!     #[column(name = "user_name")]
//!     pub name: String,
//!     pub email: Option<String>,
//! }
//!
//! let desc = User::descriptor();
//! assert_eq!(desc.fields.len(), 3);
//! assert_eq!(desc.fields[1].column, "user_name");
//! assert!(desc.fields[2].shape.optional);
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use crate::value::{ConvertError, Param, SqlValue};

mod index;
mod leaf;
mod path;

pub use index::{field_index, FieldInfo, FieldMap};
pub use path::{assign_at_path, ensure_path, read_at_path, shape_at_path};

/// A struct whose public fields map to SQL columns.
///
/// Implemented by `#[derive(Record)]`.
pub trait Record: Any {
    /// Static metadata for the type.
    fn descriptor() -> &'static RecordDescriptor
    where
        Self: Sized;

    /// Static metadata for the runtime type of `self`.
    fn record_descriptor(&self) -> &'static RecordDescriptor;

    /// Field at a descriptor index.
    fn field(&self, index: usize) -> Option<&dyn Field>;

    /// Mutable field at a descriptor index.
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Field>;
}

impl fmt::Debug for dyn Record + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({})", self.record_descriptor().name)
    }
}

/// A field slot inside a record: a value leaf, a nested record, or an
/// optional wrapper around either.
pub trait Field: Any {
    /// Read view of the field.
    fn node(&self) -> Node<'_>;

    /// Write view of the field.
    fn node_mut(&mut self) -> NodeMut<'_>;

    /// The concrete field, for typed hand-off from scan holders.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Compile-time shape of a field type.
pub trait FieldDef: Field + Sized {
    /// How the field is bound, flattened and scanned.
    const SHAPE: Shape;
}

/// Read view of a field.
pub enum Node<'a> {
    /// A leaf value.
    Value(Param),
    /// A nested record to descend into.
    Record(&'a dyn Record),
    /// An absent optional value or record.
    Null,
}

/// Write view of a field.
pub enum NodeMut<'a> {
    /// A leaf that accepts a driver value.
    Value(&'a mut dyn Scan),
    /// A nested record.
    Record(&'a mut dyn Record),
    /// An optional nested record, allocated on demand.
    Optional(&'a mut dyn OptionalRecord),
}

/// A leaf that accepts a driver value.
pub trait Scan {
    /// Stores `value` into the leaf.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] when the value does not fit the leaf.
    fn scan(&mut self, value: SqlValue) -> Result<(), ConvertError>;
}

/// Reusable typed buffer for an optional leaf, moved into the record after
/// the row fetch.
pub trait Holder: Scan {
    /// Empties the buffer.
    fn reset(&mut self);

    /// Moves the buffered value into `target`. Returns false when `target`
    /// has a different type.
    fn transfer(&mut self, target: &mut dyn Field) -> bool;
}

/// An optional nested record.
pub trait OptionalRecord {
    /// Returns the record, allocating a default one when absent.
    fn ensure(&mut self) -> Option<&mut dyn Record>;
}

/// What kind of field a type is.
#[derive(Clone, Copy)]
pub enum ShapeKind {
    /// A plain leaf value.
    Value,
    /// A leaf with custom conversion; never flattened or expanded.
    Convert,
    /// A nested record, flattened into the parent's column namespace.
    Record(fn() -> &'static RecordDescriptor),
}

/// Shape of a field type, resolved at compile time.
#[derive(Clone, Copy)]
pub struct Shape {
    /// Leaf or nested record.
    pub kind: ShapeKind,
    /// Whether the field is an `Option`.
    pub optional: bool,
    /// Builds a scan holder for optional plain leaves.
    pub holder: Option<fn() -> Box<dyn Holder>>,
    /// Rust type name, for error messages.
    pub type_name: fn() -> &'static str,
}

impl Shape {
    /// Shape of a plain leaf.
    #[must_use]
    pub const fn value<T>() -> Self {
        Self {
            kind: ShapeKind::Value,
            optional: false,
            holder: None,
            type_name: std::any::type_name::<T>,
        }
    }

    /// Shape of a custom-conversion leaf.
    #[must_use]
    pub const fn convert<T>() -> Self {
        Self {
            kind: ShapeKind::Convert,
            optional: false,
            holder: None,
            type_name: std::any::type_name::<T>,
        }
    }

    /// Shape of a nested record.
    #[must_use]
    pub const fn record<T: Record>() -> Self {
        Self {
            kind: ShapeKind::Record(T::descriptor),
            optional: false,
            holder: None,
            type_name: std::any::type_name::<T>,
        }
    }

    /// The optional form of this shape.
    #[must_use]
    pub const fn optional(
        self,
        holder: fn() -> Box<dyn Holder>,
        type_name: fn() -> &'static str,
    ) -> Self {
        let holder = match self.kind {
            ShapeKind::Value => Some(holder),
            ShapeKind::Convert | ShapeKind::Record(_) => None,
        };
        Self {
            kind: self.kind,
            optional: true,
            holder,
            type_name,
        }
    }

    /// Nested record descriptor, if the shape is a record.
    #[must_use]
    pub fn record_descriptor(&self) -> Option<&'static RecordDescriptor> {
        match self.kind {
            ShapeKind::Record(descriptor) => Some(descriptor()),
            ShapeKind::Value | ShapeKind::Convert => None,
        }
    }

    /// Whether the shape is a custom-conversion leaf.
    #[must_use]
    pub const fn is_convert(&self) -> bool {
        matches!(self.kind, ShapeKind::Convert)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ShapeKind::Value => "value",
            ShapeKind::Convert => "convert",
            ShapeKind::Record(_) => "record",
        };
        f.debug_struct("Shape")
            .field("kind", &kind)
            .field("optional", &self.optional)
            .field("type", &(self.type_name)())
            .finish()
    }
}

/// Static metadata of a record type.
#[derive(Debug)]
pub struct RecordDescriptor {
    /// Struct name.
    pub name: &'static str,
    /// Type identity, used as cache key.
    pub type_id: fn() -> TypeId,
    /// Mapped fields, in declaration order.
    pub fields: &'static [FieldDescriptor],
}

impl RecordDescriptor {
    /// Type identity of the described record.
    #[must_use]
    pub fn id(&self) -> TypeId {
        (self.type_id)()
    }
}

/// Static metadata of one mapped field.
#[derive(Debug)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub ident: &'static str,
    /// Exposed column name.
    pub column: &'static str,
    /// Bind collections as one argument.
    pub scalar: bool,
    /// Field type shape.
    pub shape: Shape,
}

/// Registers a [`SqlConvert`](crate::SqlConvert) type as an opaque leaf.
///
/// Generates the field, scan and parameter impls. Wrapping the type in
/// `Option` additionally requires `Default`.
///
/// ```rust
/// use oxide_bind::{impl_sql_convert, ConvertError, SqlConvert, SqlValue};
///
/// #[derive(Debug, Default, PartialEq)]
/// pub struct Cents(i64);
///
/// impl SqlConvert for Cents {
///     fn to_sql(&self) -> SqlValue {
///         SqlValue::Int(self.0)
///     }
///
///     fn from_sql(value: SqlValue) -> Result<Self, ConvertError> {
///         match value {
///             SqlValue::Int(n) => Ok(Self(n)),
///             other => Err(ConvertError::unexpected("Cents", &other)),
///         }
///     }
/// }
///
/// impl_sql_convert!(Cents);
/// ```
#[macro_export]
macro_rules! impl_sql_convert {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::record::Field for $ty {
            fn node(&self) -> $crate::record::Node<'_> {
                $crate::record::Node::Value($crate::Param::opaque(
                    <$ty as $crate::SqlConvert>::to_sql(self),
                ))
            }

            fn node_mut(&mut self) -> $crate::record::NodeMut<'_> {
                $crate::record::NodeMut::Value(self)
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }

        impl $crate::record::Scan for $ty {
            fn scan(
                &mut self,
                value: $crate::SqlValue,
            ) -> ::std::result::Result<(), $crate::ConvertError> {
                *self = <$ty as $crate::SqlConvert>::from_sql(value)?;
                Ok(())
            }
        }

        impl $crate::record::FieldDef for $ty {
            const SHAPE: $crate::record::Shape = $crate::record::Shape::convert::<$ty>();
        }

        impl $crate::ToParam for $ty {
            fn to_param(&self) -> $crate::Param {
                $crate::Param::opaque(<$ty as $crate::SqlConvert>::to_sql(self))
            }
        }
    )+};
}
