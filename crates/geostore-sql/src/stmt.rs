mod add_constraint;
pub use add_constraint::AddConstraint;

mod column_def;
pub use column_def::{ColumnDef, ColumnType};

mod create_index;
pub use create_index::CreateIndex;

mod create_table;
pub use create_table::{Constraint, CreateTable};

mod delete;
pub use delete::Delete;

mod expr;
pub use expr::{BinaryOp, Expr, ExprFunc, Literal};

mod insert;
pub use insert::Insert;

mod select;
pub use select::{OrderBy, Select, Source};

mod table_name;
pub use table_name::TableName;

mod update;
pub use update::Update;

#[derive(Debug, Clone)]
pub enum Statement {
    AddConstraint(AddConstraint),
    CreateIndex(CreateIndex),
    CreateTable(CreateTable),
    Delete(Delete),
    Insert(Insert),
    Select(Select),
    Update(Update),
}

impl Statement {
    /// Number of columns in the statement's result rows, if it returns any.
    pub fn returning_len(&self) -> Option<usize> {
        match self {
            Statement::Select(select) => Some(select.columns.len()),
            Statement::Insert(insert) if !insert.returning.is_empty() => {
                Some(insert.returning.len())
            }
            _ => None,
        }
    }

    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            Statement::AddConstraint(_) | Statement::CreateIndex(_) | Statement::CreateTable(_)
        )
    }
}
