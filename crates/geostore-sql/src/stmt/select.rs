use super::{Expr, ExprFunc, Statement, TableName};

#[derive(Debug, Clone)]
pub struct Select {
    pub columns: Vec<Expr>,

    /// `None` for a select without `FROM`.
    pub from: Option<Source>,

    pub filter: Option<Expr>,

    pub order_by: Vec<OrderBy>,

    pub limit: Option<u64>,

    pub offset: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum Source {
    Table(TableName),

    /// A table valued function, such as SQLite's `pragma_table_info`.
    Func(ExprFunc),
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub expr: Expr,
    pub desc: bool,
}

impl Select {
    pub fn new(columns: Vec<Expr>, from: impl Into<Source>) -> Select {
        Select {
            columns,
            from: Some(from.into()),
            filter: None,
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    /// A select without `FROM`.
    pub fn values(columns: Vec<Expr>) -> Select {
        Select {
            columns,
            from: None,
            filter: None,
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    pub fn filter(mut self, filter: Option<Expr>) -> Select {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, expr: Expr, desc: bool) -> Select {
        self.order_by.push(OrderBy { expr, desc });
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Select {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<u64>) -> Select {
        self.offset = offset;
        self
    }
}

impl From<TableName> for Source {
    fn from(value: TableName) -> Source {
        Source::Table(value)
    }
}

impl From<ExprFunc> for Source {
    fn from(value: ExprFunc) -> Source {
        Source::Func(value)
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Statement {
        Statement::Select(value)
    }
}
