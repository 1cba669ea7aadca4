use crate::{geom::GeometryValue, Error, Result};

use std::cmp::Ordering;

/// Attribute value types understood by geostore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Bytes,
    Geometry,
}

/// An attribute value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Geometry(GeometryValue),
}

impl Type {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Type::I16 | Type::I32 | Type::I64 | Type::F32 | Type::F64
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(self, Type::I16 | Type::I32 | Type::I64)
    }

    pub fn is_geometry(self) -> bool {
        matches!(self, Type::Geometry)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type of the value, or `None` for `Null`.
    pub fn ty(&self) -> Option<Type> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => Type::Bool,
            Value::I16(_) => Type::I16,
            Value::I32(_) => Type::I32,
            Value::I64(_) => Type::I64,
            Value::F32(_) => Type::F32,
            Value::F64(_) => Type::F64,
            Value::String(_) => Type::String,
            Value::Bytes(_) => Type::Bytes,
            Value::Geometry(_) => Type::Geometry,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value as an `i64` if it is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I16(value) => Some(value as i64),
            Value::I32(value) => Some(value as i64),
            Value::I64(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::I16(value) => Some(value as f64),
            Value::I32(value) => Some(value as f64),
            Value::I64(value) => Some(value as f64),
            Value::F32(value) => Some(value as f64),
            Value::F64(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&GeometryValue> {
        match self {
            Value::Geometry(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.ty().is_some_and(Type::is_numeric)
    }

    /// Converts the value to `ty`.
    ///
    /// Numbers convert between widths (failing on overflow), strings parse
    /// into numbers and booleans, and everything except bytes and geometries
    /// renders into a string. `Null` converts to any type.
    pub fn cast(self, ty: Type) -> Result<Value> {
        if self.ty() == Some(ty) || self.is_null() {
            return Ok(self);
        }

        let converted = match ty {
            Type::Bool => match &self {
                Value::String(s) => match s.to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => Some(Value::Bool(true)),
                    "false" | "f" | "0" => Some(Value::Bool(false)),
                    _ => None,
                },
                v => v.as_i64().map(|i| Value::Bool(i != 0)),
            },
            Type::I16 => self.to_i64().and_then(|i| i16::try_from(i).ok()).map(Value::I16),
            Type::I32 => self.to_i64().and_then(|i| i32::try_from(i).ok()).map(Value::I32),
            Type::I64 => self.to_i64().map(Value::I64),
            Type::F32 => self.to_f64().map(|f| Value::F32(f as f32)),
            Type::F64 => self.to_f64().map(Value::F64),
            Type::String => self.to_text().map(Value::String),
            Type::Bytes => match &self {
                Value::String(s) => Some(Value::Bytes(s.clone().into_bytes())),
                _ => None,
            },
            Type::Geometry => None,
        };

        converted.ok_or_else(|| Error::validation(format!("cannot convert {self:?} to {ty:?}")))
    }

    fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::F32(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::F64(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::String(s) => s.trim().parse().ok(),
            v => v.as_i64(),
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Value::String(s) => s.trim().parse().ok(),
            v => v.as_f64(),
        }
    }

    /// Renders scalar values as text.
    pub fn to_text(&self) -> Option<String> {
        Some(match self {
            Value::Bool(b) => b.to_string(),
            Value::I16(i) => i.to_string(),
            Value::I32(i) => i.to_string(),
            Value::I64(i) => i.to_string(),
            Value::F32(f) => f.to_string(),
            Value::F64(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Null | Value::Bytes(_) | Value::Geometry(_) => return None,
        })
    }

    /// Compares two values the way SQL would.
    ///
    /// Returns `None` when either side is `Null` or when the values are not
    /// comparable. Numbers compare across widths, and a string compares with a
    /// number when it parses as one.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Geometry(a), Value::Geometry(b)) => (a == b).then_some(Ordering::Equal),
            (a, b) => {
                if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                    return Some(a.cmp(&b));
                }
                let a = a.to_f64()?;
                let b = b.to_f64()?;
                a.partial_cmp(&b)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::I16(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::F32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<GeometryValue> for Value {
    fn from(value: GeometryValue) -> Self {
        Value::Geometry(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
