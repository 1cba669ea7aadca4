use super::{Constraint, Statement, TableName};

/// `ALTER TABLE .. ADD CONSTRAINT`
#[derive(Debug, Clone)]
pub struct AddConstraint {
    pub table: TableName,
    pub constraint: Constraint,
}

impl From<AddConstraint> for Statement {
    fn from(value: AddConstraint) -> Statement {
        Statement::AddConstraint(value)
    }
}
