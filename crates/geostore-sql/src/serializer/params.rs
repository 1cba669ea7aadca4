use super::{Flavor, Formatter, ToSql};

use geostore_core::{driver::TypedValue, Type, Value};

pub trait Params {
    fn push(&mut self, param: &Value, ty: Option<Type>) -> Placeholder;
}

/// Position of a parameter, starting at 1.
pub struct Placeholder(pub usize);

impl Params for Vec<TypedValue> {
    fn push(&mut self, value: &Value, ty: Option<Type>) -> Placeholder {
        self.push(TypedValue {
            value: value.clone(),
            ty,
        });
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: super::Params>(self, f: &mut Formatter<'_, P>) {
        use std::fmt::Write;

        let _ = match f.serializer.flavor {
            Flavor::Postgresql => write!(f.dst, "${}", self.0),
            Flavor::Sqlite => write!(f.dst, "?{}", self.0),
        };
    }
}
