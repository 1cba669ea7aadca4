use super::{Comma, Delimited, Formatter, Ident, Params, ToSql};

use crate::stmt::{BinaryOp, Expr, ExprFunc, Literal};

/// An operand of a compound expression, parenthesized when it is compound
/// itself.
struct Operand<'a>(&'a Expr);

/// An operand of `AND`. Only disjunctions bind looser.
struct Conjunct<'a>(&'a Expr);

impl ToSql for &Expr {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Expr::Star => fmt!(f, "*"),
            Expr::Column(name) => fmt!(f, Ident(name)),
            Expr::Value(value) => fmt!(f, value),
            Expr::Literal(literal) => fmt!(f, literal),
            Expr::Func(func) => fmt!(f, func),
            Expr::BinaryOp {
                lhs,
                op: BinaryOp::Overlaps,
                rhs,
            } if f.serializer.is_sqlite() => {
                let (lhs, rhs): (&Expr, &Expr) = (lhs, rhs);
                fmt!(f, "ST_EnvIntersects(" lhs ", " rhs ")")
            }
            Expr::BinaryOp { lhs, op, rhs } => {
                fmt!(f, Operand(lhs) " " op " " Operand(rhs))
            }
            Expr::And(operands) => {
                fmt!(f, Delimited(operands.iter().map(Conjunct), " AND "))
            }
            Expr::Or(operands) => {
                fmt!(f, Delimited(operands, " OR "))
            }
            Expr::Not(expr) => {
                let expr: &Expr = expr;
                fmt!(f, "NOT (" expr ")")
            }
            Expr::IsNull { expr, negate } => {
                let op = if *negate { " IS NOT NULL" } else { " IS NULL" };
                fmt!(f, Operand(expr) op)
            }
            Expr::Like {
                expr,
                pattern,
                case_insensitive,
                escape,
            } => {
                match (*case_insensitive, f.serializer.is_postgresql()) {
                    (false, _) => fmt!(f, Operand(expr) " LIKE " Operand(pattern)),
                    (true, true) => fmt!(f, Operand(expr) " ILIKE " Operand(pattern)),
                    (true, false) => {
                        let (expr, pattern): (&Expr, &Expr) = (expr, pattern);
                        fmt!(f, "LOWER(" expr ") LIKE LOWER(" pattern ")")
                    }
                }

                if let Some(escape) = escape {
                    let escape = Literal::String(escape.to_string());
                    let escape = &escape;
                    fmt!(f, " ESCAPE " escape);
                }
            }
            Expr::Between { expr, lower, upper } => {
                fmt!(f, Operand(expr) " BETWEEN " Operand(lower) " AND " Operand(upper))
            }
            Expr::InList { list, .. } if list.is_empty() => fmt!(f, &Expr::false_()),
            Expr::InList { expr, list } => {
                fmt!(f, Operand(expr) " IN (" Comma(list) ")")
            }
            Expr::Cast { expr, ty } => {
                let expr: &Expr = expr;
                fmt!(f, "CAST(" expr " AS " ty ")")
            }
        }
    }
}

impl ToSql for &ExprFunc {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, self.name "(" Comma(&self.args) ")")
    }
}

impl ToSql for &BinaryOp {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push_str(match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Overlaps => "&&",
        })
    }
}

impl ToSql for Operand<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let compound = matches!(
            self.0,
            Expr::BinaryOp { .. }
                | Expr::And(_)
                | Expr::Or(_)
                | Expr::Not(_)
                | Expr::IsNull { .. }
                | Expr::Like { .. }
                | Expr::Between { .. }
                | Expr::InList { .. }
        );

        if compound {
            fmt!(f, "(" self.0 ")")
        } else {
            fmt!(f, self.0)
        }
    }
}

impl ToSql for Conjunct<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        if let Expr::Or(_) = self.0 {
            fmt!(f, "(" self.0 ")")
        } else {
            fmt!(f, self.0)
        }
    }
}
