use super::{Statement, TableName};

#[derive(Debug, Clone)]
pub struct CreateIndex {
    /// Name of the index
    pub name: String,

    /// Which table to index
    pub on: TableName,

    pub columns: Vec<String>,

    /// Index access method, such as `GIST`
    pub using: Option<&'static str>,
}

impl From<CreateIndex> for Statement {
    fn from(value: CreateIndex) -> Statement {
        Statement::CreateIndex(value)
    }
}
