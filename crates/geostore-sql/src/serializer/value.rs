use super::{Formatter, Params, ToSql};

use crate::stmt::Literal;
use geostore_core::driver::TypedValue;

impl ToSql for &TypedValue {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let placeholder = f.params.push(&self.value, self.ty);
        fmt!(f, placeholder);
    }
}

impl ToSql for &Literal {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        use std::fmt::Write;

        match self {
            Literal::Null => fmt!(f, "NULL"),
            Literal::Bool(true) => fmt!(f, "TRUE"),
            Literal::Bool(false) => fmt!(f, "FALSE"),
            Literal::Integer(v) => fmt!(f, *v),
            Literal::Float(v) if !v.is_finite() => fmt!(f, "NULL"),
            Literal::Float(v) => {
                let start = f.dst.len();
                let _ = write!(f.dst, "{v}");
                // Floats always carry a fractional part or an exponent.
                if !f.dst[start..].contains(['.', 'e']) {
                    f.dst.push_str(".0");
                }
            }
            Literal::String(v) => {
                f.dst.push('\'');
                for c in v.chars() {
                    if c == '\'' {
                        f.dst.push('\'');
                    }
                    f.dst.push(c);
                }
                f.dst.push('\'');
            }
        }
    }
}
