use super::{Comma, Formatter, Ident, Params, Period, ToSql};

use crate::stmt::{
    AddConstraint, Constraint, CreateIndex, CreateTable, Delete, Expr, Insert, OrderBy, Select,
    Source, Statement, TableName, Update,
};

impl ToSql for &Statement {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Statement::AddConstraint(stmt) => stmt.to_sql(f),
            Statement::CreateIndex(stmt) => stmt.to_sql(f),
            Statement::CreateTable(stmt) => stmt.to_sql(f),
            Statement::Delete(stmt) => stmt.to_sql(f),
            Statement::Insert(stmt) => stmt.to_sql(f),
            Statement::Select(stmt) => stmt.to_sql(f),
            Statement::Update(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &TableName {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Period(self.schema.iter().chain([&self.name]).map(Ident)))
    }
}

impl ToSql for &Select {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, "SELECT " Comma(&self.columns));

        if let Some(from) = &self.from {
            fmt!(f, " FROM " from);
        }

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY " Comma(&self.order_by));
        }

        match (self.limit, self.offset) {
            (None, None) => {}
            _ if f.serializer.is_postgresql() => {
                if let Some(offset) = self.offset {
                    fmt!(f, " OFFSET " offset);
                }
                if let Some(limit) = self.limit {
                    fmt!(f, " LIMIT " limit);
                }
            }
            (Some(limit), offset) => {
                fmt!(f, " LIMIT " limit);
                if let Some(offset) = offset {
                    fmt!(f, " OFFSET " offset);
                }
            }
            // SQLite only accepts OFFSET after a LIMIT
            (None, Some(offset)) => fmt!(f, " LIMIT -1 OFFSET " offset),
        }
    }
}

impl ToSql for &Source {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Source::Table(table) => fmt!(f, table),
            Source::Func(func) => fmt!(f, func),
        }
    }
}

impl ToSql for &OrderBy {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let dir = if self.desc { " DESC" } else { " ASC" };
        let expr = &self.expr;
        fmt!(f, expr dir)
    }
}

impl ToSql for &Insert {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let table = &self.table;
        fmt!(f, "INSERT INTO " table);

        if self.columns.is_empty() {
            fmt!(f, " DEFAULT VALUES");
        } else {
            let columns = Comma(self.columns.iter().map(Ident));
            fmt!(f, " (" columns ") VALUES (" Comma(&self.values) ")");
        }

        if !self.returning.is_empty() {
            fmt!(f, " RETURNING " Comma(&self.returning));
        }
    }
}

struct Assignment<'a>(&'a str, &'a Expr);

impl ToSql for Assignment<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, Ident(self.0) " = " self.1)
    }
}

impl ToSql for &Update {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let assignments = Comma(
            self.assignments
                .iter()
                .map(|(column, value)| Assignment(column, value)),
        );
        let table = &self.table;
        fmt!(f, "UPDATE " table " SET " assignments);

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }
    }
}

impl ToSql for &Delete {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let table = &self.from;
        fmt!(f, "DELETE FROM " table);

        if let Some(filter) = &self.filter {
            fmt!(f, " WHERE " filter);
        }
    }
}

impl ToSql for &CreateTable {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let table = &self.name;
        fmt!(f, "CREATE TABLE " table " (");

        for (index, column) in self.columns.iter().enumerate() {
            if index > 0 {
                fmt!(f, ",");
            }
            fmt!(f, "\n    " column);
        }

        for constraint in &self.constraints {
            fmt!(f, ",\n    " constraint);
        }

        fmt!(f, "\n)");
    }
}

impl ToSql for &Constraint {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            Constraint::PrimaryKey(columns) => {
                fmt!(f, "PRIMARY KEY (" Comma(columns.iter().map(Ident)) ")")
            }
            Constraint::Check { name, expr } => {
                fmt!(f, "CONSTRAINT " Ident(name) " CHECK (" expr ")")
            }
        }
    }
}

impl ToSql for &AddConstraint {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let table = &self.table;
        let constraint = &self.constraint;
        fmt!(f, "ALTER TABLE " table " ADD " constraint)
    }
}

impl ToSql for &CreateIndex {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let table = &self.on;
        fmt!(f, "CREATE INDEX " Ident(&self.name) " ON " table);

        if let Some(method) = self.using {
            fmt!(f, " USING " method);
        }

        fmt!(f, " (" Comma(self.columns.iter().map(Ident)) ")");
    }
}
