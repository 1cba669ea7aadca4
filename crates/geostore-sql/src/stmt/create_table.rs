use super::{ColumnDef, Expr, Statement, TableName};

#[derive(Debug, Clone)]
pub struct CreateTable {
    pub name: TableName,

    pub columns: Vec<ColumnDef>,

    /// Table constraints rendered after the columns.
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
pub enum Constraint {
    PrimaryKey(Vec<String>),

    Check { name: String, expr: Expr },
}

impl From<CreateTable> for Statement {
    fn from(value: CreateTable) -> Statement {
        Statement::CreateTable(value)
    }
}
