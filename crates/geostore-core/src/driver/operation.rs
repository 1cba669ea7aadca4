use crate::{Type, Value};

#[derive(Debug)]
pub enum Operation {
    /// Execute a SQL statement
    Query(QuerySql),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}

#[derive(Debug, Clone)]
pub struct QuerySql {
    /// SQL text with flavor specific placeholders
    pub sql: String,

    /// Values bound to the placeholders, in order
    pub params: Vec<TypedValue>,

    /// Column types of the returned rows. `None` for statements that only
    /// report an affected row count.
    pub ret: Option<Vec<Type>>,
}

/// A statement parameter and the type the statement expects for it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub value: Value,

    /// Required for `Null` parameters on backends that type their
    /// placeholders.
    pub ty: Option<Type>,
}

#[derive(Debug)]
pub enum Transaction {
    /// Start a transaction
    Start,

    /// Commit a transaction
    Commit,

    /// Rollback a transaction
    Rollback,
}

impl TypedValue {
    pub fn infer_ty(&self) -> Option<Type> {
        self.ty.or_else(|| self.value.ty())
    }
}

impl From<QuerySql> for Operation {
    fn from(value: QuerySql) -> Operation {
        Operation::Query(value)
    }
}

impl From<Transaction> for Operation {
    fn from(value: Transaction) -> Operation {
        Operation::Transaction(value)
    }
}
