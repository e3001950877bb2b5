//! Field impls for built-in leaf types, `Option` and `Box`.

use std::any::Any;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::{
    Field, FieldDef, Holder, Node, NodeMut, OptionalRecord, Record, Scan, Shape, ShapeKind,
};
use crate::value::{ConvertError, FromSqlValue, Param, SqlValue, ToSqlValue};

macro_rules! impl_leaf {
    ($($t:ty),+ $(,)?) => {$(
        impl Field for $t {
            fn node(&self) -> Node<'_> {
                Node::Value(Param::new(self.to_sql_value()))
            }

            fn node_mut(&mut self) -> NodeMut<'_> {
                NodeMut::Value(self)
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        impl Scan for $t {
            fn scan(&mut self, value: SqlValue) -> Result<(), ConvertError> {
                *self = <$t>::from_sql_value(value)?;
                Ok(())
            }
        }

        impl FieldDef for $t {
            const SHAPE: Shape = Shape::value::<$t>();
        }
    )+};
}

impl_leaf!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    f32,
    f64,
    String,
    Vec<u8>,
    NaiveDateTime,
    NaiveDate,
    DateTime<Utc>,
    Vec<bool>,
    Vec<i8>,
    Vec<i16>,
    Vec<i32>,
    Vec<i64>,
    Vec<u16>,
    Vec<u32>,
    Vec<f32>,
    Vec<f64>,
    Vec<String>,
    Vec<NaiveDateTime>,
    Vec<NaiveDate>,
);

fn new_holder<T: FieldDef + Default>() -> Box<dyn Holder> {
    Box::new(None::<T>)
}

impl<T: FieldDef + Default> Field for Option<T> {
    fn node(&self) -> Node<'_> {
        match self {
            Some(inner) => inner.node(),
            None => Node::Null,
        }
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        if matches!(T::SHAPE.kind, ShapeKind::Record(_)) {
            NodeMut::Optional(self)
        } else {
            NodeMut::Value(self)
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: FieldDef + Default> FieldDef for Option<T> {
    const SHAPE: Shape = T::SHAPE.optional(new_holder::<T>, std::any::type_name::<Self>);
}

impl<T: FieldDef + Default> Scan for Option<T> {
    fn scan(&mut self, value: SqlValue) -> Result<(), ConvertError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        match inner.node_mut() {
            NodeMut::Value(slot) => slot.scan(value)?,
            NodeMut::Record(_) | NodeMut::Optional(_) => {
                return Err(ConvertError::NotAValue(std::any::type_name::<T>()));
            }
        }
        *self = Some(inner);
        Ok(())
    }
}

impl<T: FieldDef + Default> Holder for Option<T> {
    fn reset(&mut self) {
        *self = None;
    }

    fn transfer(&mut self, target: &mut dyn Field) -> bool {
        match target.as_any_mut().downcast_mut::<Self>() {
            Some(slot) => {
                *slot = self.take();
                true
            }
            None => false,
        }
    }
}

impl<T: FieldDef + Default> OptionalRecord for Option<T> {
    fn ensure(&mut self) -> Option<&mut dyn Record> {
        match self.get_or_insert_with(T::default).node_mut() {
            NodeMut::Record(record) => Some(record),
            NodeMut::Optional(inner) => inner.ensure(),
            NodeMut::Value(_) => None,
        }
    }
}

// Owned indirection is transparent.
impl<T: FieldDef> Field for Box<T> {
    fn node(&self) -> Node<'_> {
        (**self).node()
    }

    fn node_mut(&mut self) -> NodeMut<'_> {
        (**self).node_mut()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        (**self).as_any_mut()
    }
}

impl<T: FieldDef> FieldDef for Box<T> {
    const SHAPE: Shape = T::SHAPE;
}
