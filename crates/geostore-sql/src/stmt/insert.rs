use super::{Expr, Statement, TableName};

/// Single row insert.
#[derive(Debug, Clone)]
pub struct Insert {
    pub table: TableName,

    pub columns: Vec<String>,

    /// One expression per column.
    pub values: Vec<Expr>,

    /// Expressions of the `RETURNING` clause. Empty for none.
    pub returning: Vec<Expr>,
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Statement {
        Statement::Insert(value)
    }
}
