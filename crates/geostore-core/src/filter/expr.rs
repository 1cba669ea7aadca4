use crate::Value;

/// An operand of a filter node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The value of a feature attribute.
    Property(String),

    Literal(Value),

    Function(ExprFunction),

    Arithmetic(ExprArithmetic),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Lower,
    Upper,
    /// Character count of a string.
    Length,
    Abs,
    /// Planar area of a geometry.
    Area,
    /// Characters of a string in reverse order.
    Reverse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprFunction {
    pub func: Func,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprArithmetic {
    pub op: ArithmeticOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

impl Expr {
    pub fn property(name: impl Into<String>) -> Expr {
        Expr::Property(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    pub fn function(func: Func, args: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Function(ExprFunction {
            func,
            args: args.into_iter().collect(),
        })
    }

    pub fn arithmetic(op: ArithmeticOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
        Expr::Arithmetic(ExprArithmetic {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        })
    }

    pub fn as_property(&self) -> Option<&str> {
        match self {
            Expr::Property(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expr::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn visit_properties(&self, f: &mut impl FnMut(&str)) {
        match self {
            Expr::Property(name) => f(name),
            Expr::Literal(_) => {}
            Expr::Function(func) => {
                for arg in &func.args {
                    arg.visit_properties(f);
                }
            }
            Expr::Arithmetic(arith) => {
                arith.lhs.visit_properties(f);
                arith.rhs.visit_properties(f);
            }
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Expr {
        Expr::Literal(value)
    }
}

impl Func {
    /// Lower case name, as used in capability function lists.
    pub fn name(self) -> &'static str {
        match self {
            Func::Lower => "lower",
            Func::Upper => "upper",
            Func::Length => "length",
            Func::Abs => "abs",
            Func::Area => "area",
            Func::Reverse => "reverse",
        }
    }

    pub fn arity(self) -> usize {
        1
    }
}

impl core::fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
        })
    }
}
