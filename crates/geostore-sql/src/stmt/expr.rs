use geostore_core::{driver::TypedValue, Type, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `*`, as in `COUNT(*)`
    Star,

    Column(String),

    /// A bound parameter
    Value(TypedValue),

    /// A constant rendered inline. Used where statements cannot take
    /// parameters, such as DDL.
    Literal(Literal),

    Func(ExprFunc),

    BinaryOp {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },

    And(Vec<Expr>),

    Or(Vec<Expr>),

    Not(Box<Expr>),

    IsNull {
        expr: Box<Expr>,
        negate: bool,
    },

    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        case_insensitive: bool,
        escape: Option<char>,
    },

    Between {
        expr: Box<Expr>,
        lower: Box<Expr>,
        upper: Box<Expr>,
    },

    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
    },

    /// `CAST(expr AS ty)` with a dialect type name
    Cast {
        expr: Box<Expr>,
        ty: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprFunc {
    pub name: &'static str,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    /// Envelope overlap, `&&` in PostGIS
    Overlaps,
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Expr {
        Expr::Column(name.into())
    }

    /// A parameter typed after its value.
    pub fn value(value: impl Into<Value>) -> Expr {
        let value = value.into();
        let ty = value.ty();
        Expr::Value(TypedValue { value, ty })
    }

    pub fn typed_value(value: impl Into<Value>, ty: Type) -> Expr {
        Expr::Value(TypedValue {
            value: value.into(),
            ty: Some(ty),
        })
    }

    pub fn literal(literal: impl Into<Literal>) -> Expr {
        Expr::Literal(literal.into())
    }

    pub fn func(name: &'static str, args: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Func(ExprFunc {
            name,
            args: args.into_iter().collect(),
        })
    }

    pub fn binary_op(lhs: impl Into<Expr>, op: BinaryOp, rhs: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            lhs: Box::new(lhs.into()),
            op,
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::binary_op(lhs, BinaryOp::Eq, rhs)
    }

    /// Conjunction that drops the wrapper for a single operand.
    pub fn and_from_vec(mut operands: Vec<Expr>) -> Expr {
        if operands.len() == 1 {
            operands.swap_remove(0)
        } else {
            Expr::And(operands)
        }
    }

    pub fn or_from_vec(mut operands: Vec<Expr>) -> Expr {
        if operands.len() == 1 {
            operands.swap_remove(0)
        } else {
            Expr::Or(operands)
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: impl Into<Expr>) -> Expr {
        Expr::Not(Box::new(expr.into()))
    }

    pub fn is_null(expr: impl Into<Expr>) -> Expr {
        Expr::IsNull {
            expr: Box::new(expr.into()),
            negate: false,
        }
    }

    pub fn is_not_null(expr: impl Into<Expr>) -> Expr {
        Expr::IsNull {
            expr: Box::new(expr.into()),
            negate: true,
        }
    }

    pub fn cast(expr: impl Into<Expr>, ty: &'static str) -> Expr {
        Expr::Cast {
            expr: Box::new(expr.into()),
            ty,
        }
    }

    pub fn count_star() -> Expr {
        Expr::func("COUNT", [Expr::Star])
    }

    /// A predicate that never holds.
    pub fn false_() -> Expr {
        Expr::eq(Expr::literal(1), Expr::literal(0))
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Expr::Value(_))
    }
}

impl From<ExprFunc> for Expr {
    fn from(value: ExprFunc) -> Expr {
        Expr::Func(value)
    }
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Expr {
        Expr::Literal(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Literal {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Literal {
        Literal::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Literal {
        Literal::Integer(value as i64)
    }
}

impl From<u8> for Literal {
    fn from(value: u8) -> Literal {
        Literal::Integer(value as i64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Literal {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Literal {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Literal {
        Literal::String(value)
    }
}

impl Literal {
    /// Inline form of a scalar value. Binary and geometry values have none.
    pub fn from_value(value: &Value) -> Option<Literal> {
        Some(match value {
            Value::Null => Literal::Null,
            Value::Bool(v) => Literal::Bool(*v),
            Value::I16(v) => Literal::Integer(*v as i64),
            Value::I32(v) => Literal::Integer(*v as i64),
            Value::I64(v) => Literal::Integer(*v),
            Value::F32(v) => Literal::Float(*v as f64),
            Value::F64(v) => Literal::Float(*v),
            Value::String(v) => Literal::String(v.clone()),
            Value::Bytes(_) | Value::Geometry(_) => return None,
        })
    }
}
