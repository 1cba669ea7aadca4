use super::{
    like, ArithmeticOp, CompareOp, Expr, ExprArithmetic, ExprFunction, Filter, FilterCompare,
    Func, SpatialOp,
};
use crate::{geom::algorithm, Feature, GeometryValue, Value};

use std::cmp::Ordering;

/// Result of evaluating a filter under SQL's three-valued logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    /// A null operand was involved.
    Unknown,
}

impl Truth {
    pub fn is_true(self) -> bool {
        matches!(self, Truth::True)
    }

    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

impl From<bool> for Truth {
    fn from(value: bool) -> Truth {
        if value {
            Truth::True
        } else {
            Truth::False
        }
    }
}

impl From<Option<bool>> for Truth {
    fn from(value: Option<bool>) -> Truth {
        value.map_or(Truth::Unknown, Truth::from)
    }
}

impl Filter {
    /// Returns `true` if the feature passes the filter. `Unknown` does not
    /// pass, matching a SQL `WHERE` clause.
    pub fn matches(&self, feature: &Feature) -> bool {
        self.evaluate(feature).is_true()
    }

    pub fn evaluate(&self, feature: &Feature) -> Truth {
        match self {
            Filter::Include => Truth::True,
            Filter::Exclude => Truth::False,
            Filter::And(operands) => operands
                .iter()
                .fold(Truth::True, |acc, operand| acc.and(operand.evaluate(feature))),
            Filter::Or(operands) => operands
                .iter()
                .fold(Truth::False, |acc, operand| acc.or(operand.evaluate(feature))),
            Filter::Not(operand) => operand.evaluate(feature).not(),
            Filter::Compare(compare) => compare.evaluate(feature),
            Filter::Between(between) => {
                let value = between.expr.eval(feature);
                let lower = between.lower.eval(feature);
                let upper = between.upper.eval(feature);
                let above = Truth::from(lower.compare(&value).map(Ordering::is_le));
                let below = Truth::from(value.compare(&upper).map(Ordering::is_le));
                above.and(below)
            }
            Filter::Like(filter) => match filter.expr.eval(feature).to_text() {
                Some(text) => like::matches(filter, &text).into(),
                None => Truth::Unknown,
            },
            Filter::IsNull(expr) => expr.eval(feature).is_null().into(),
            Filter::Id(ids) => feature.id.as_ref().is_some_and(|id| ids.contains(id)).into(),
            Filter::Spatial(spatial) => {
                with_geometry(feature.get(&spatial.property), |value| {
                    let (a, b) = (&value.geometry, &spatial.geometry.geometry);
                    match spatial.op {
                        SpatialOp::Intersects => algorithm::intersects(a, b),
                        SpatialOp::Contains => algorithm::contains(a, b),
                        SpatialOp::Within => algorithm::within(a, b),
                        SpatialOp::Disjoint => algorithm::disjoint(a, b),
                        SpatialOp::Equals => algorithm::equals(a, b),
                    }
                })
            }
            Filter::BBox(bbox) => {
                let value = match &bbox.property {
                    Some(property) => feature.get(property),
                    None => feature.default_geometry(),
                };
                let envelope = bbox.envelope.to_geometry();
                with_geometry(value, |value| algorithm::intersects(&value.geometry, &envelope))
            }
            Filter::DWithin(dwithin) => with_geometry(feature.get(&dwithin.property), |value| {
                algorithm::dwithin(
                    &value.geometry,
                    &dwithin.geometry.geometry,
                    dwithin.distance,
                )
            }),
        }
    }
}

fn with_geometry(value: Option<&Value>, f: impl FnOnce(&GeometryValue) -> bool) -> Truth {
    match value {
        Some(Value::Geometry(value)) => f(value).into(),
        _ => Truth::Unknown,
    }
}

impl FilterCompare {
    fn evaluate(&self, feature: &Feature) -> Truth {
        let mut lhs = self.lhs.eval(feature);
        let mut rhs = self.rhs.eval(feature);

        if !self.match_case {
            lhs = fold_case(lhs);
            rhs = fold_case(rhs);
        }

        let Some(ordering) = lhs.compare(&rhs) else {
            return Truth::Unknown;
        };

        match self.op {
            CompareOp::Eq => ordering.is_eq(),
            CompareOp::Ne => ordering.is_ne(),
            CompareOp::Lt => ordering.is_lt(),
            CompareOp::Le => ordering.is_le(),
            CompareOp::Gt => ordering.is_gt(),
            CompareOp::Ge => ordering.is_ge(),
        }
        .into()
    }
}

fn fold_case(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other,
    }
}

impl Expr {
    /// Evaluates the operand against a feature. Missing attributes and
    /// failed operations evaluate to `Null`.
    pub fn eval(&self, feature: &Feature) -> Value {
        match self {
            Expr::Property(name) => feature.get(name).cloned().unwrap_or_default(),
            Expr::Literal(value) => value.clone(),
            Expr::Function(func) => func.eval(feature),
            Expr::Arithmetic(arith) => arith.eval(feature),
        }
    }
}

impl ExprFunction {
    fn eval(&self, feature: &Feature) -> Value {
        let Some(arg) = self.args.first() else {
            return Value::Null;
        };

        match (self.func, arg.eval(feature)) {
            (Func::Lower, Value::String(s)) => Value::String(s.to_lowercase()),
            (Func::Upper, Value::String(s)) => Value::String(s.to_uppercase()),
            (Func::Reverse, Value::String(s)) => Value::String(s.chars().rev().collect()),
            (Func::Length, Value::String(s)) => Value::I64(s.chars().count() as i64),
            (Func::Abs, Value::I16(i)) => i.checked_abs().map(Value::I16).unwrap_or_default(),
            (Func::Abs, Value::I32(i)) => i.checked_abs().map(Value::I32).unwrap_or_default(),
            (Func::Abs, Value::I64(i)) => i.checked_abs().map(Value::I64).unwrap_or_default(),
            (Func::Abs, Value::F32(f)) => Value::F32(f.abs()),
            (Func::Abs, Value::F64(f)) => Value::F64(f.abs()),
            (Func::Area, Value::Geometry(g)) => Value::F64(algorithm::area(&g.geometry)),
            _ => Value::Null,
        }
    }
}

impl ExprArithmetic {
    fn eval(&self, feature: &Feature) -> Value {
        let lhs = self.lhs.eval(feature);
        let rhs = self.rhs.eval(feature);

        if let (Some(a), Some(b)) = (lhs.as_i64(), rhs.as_i64()) {
            let result = match self.op {
                ArithmeticOp::Add => a.checked_add(b),
                ArithmeticOp::Sub => a.checked_sub(b),
                ArithmeticOp::Mul => a.checked_mul(b),
                ArithmeticOp::Div => a.checked_div(b),
            };
            return result.map(Value::I64).unwrap_or_default();
        }

        let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
            return Value::Null;
        };

        match self.op {
            ArithmeticOp::Add => Value::F64(a + b),
            ArithmeticOp::Sub => Value::F64(a - b),
            ArithmeticOp::Mul => Value::F64(a * b),
            ArithmeticOp::Div if b == 0.0 => Value::Null,
            ArithmeticOp::Div => Value::F64(a / b),
        }
    }
}
