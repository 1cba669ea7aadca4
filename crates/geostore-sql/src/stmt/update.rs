use super::{Expr, Statement, TableName};

#[derive(Debug, Clone)]
pub struct Update {
    pub table: TableName,

    /// Column and new value pairs.
    pub assignments: Vec<(String, Expr)>,

    pub filter: Option<Expr>,
}

impl From<Update> for Statement {
    fn from(value: Update) -> Statement {
        Statement::Update(value)
    }
}
