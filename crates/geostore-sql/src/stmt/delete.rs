use super::{Expr, Statement, TableName};

#[derive(Debug, Clone)]
pub struct Delete {
    pub from: TableName,

    pub filter: Option<Expr>,
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Statement {
        Statement::Delete(value)
    }
}
