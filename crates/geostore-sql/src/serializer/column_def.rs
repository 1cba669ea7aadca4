use super::{Formatter, Ident, Params, ToSql};

use crate::stmt::{ColumnDef, ColumnType};
use geostore_core::geom::GeometryKind;

impl ToSql for &ColumnDef {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let ty = &self.ty;
        fmt!(f, Ident(&self.name) " " ty);

        if self.primary_key {
            fmt!(f, " PRIMARY KEY");

            if self.ty == ColumnType::Serial && f.serializer.is_sqlite() {
                fmt!(f, " AUTOINCREMENT");
            }
        }

        if !self.nullable {
            fmt!(f, " NOT NULL");
        }

        if let Some(default) = &self.default {
            fmt!(f, " DEFAULT " default);
        }
    }
}

impl ToSql for &ColumnType {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        use std::fmt::Write;

        let sqlite = f.serializer.is_sqlite();

        match self {
            ColumnType::Boolean => fmt!(f, "BOOLEAN"),
            ColumnType::SmallInt => fmt!(f, "SMALLINT"),
            ColumnType::Integer => fmt!(f, "INTEGER"),
            ColumnType::BigInt => fmt!(f, "BIGINT"),
            ColumnType::Real => fmt!(f, "REAL"),
            ColumnType::DoublePrecision => fmt!(f, "DOUBLE PRECISION"),
            ColumnType::Varchar(len) => {
                let _ = write!(f.dst, "VARCHAR({len})");
            }
            ColumnType::Text => fmt!(f, "TEXT"),
            ColumnType::Binary if sqlite => fmt!(f, "BLOB"),
            ColumnType::Binary => fmt!(f, "BYTEA"),
            // SQLite only auto increments `INTEGER PRIMARY KEY` columns
            ColumnType::Serial if sqlite => fmt!(f, "INTEGER"),
            ColumnType::Serial => fmt!(f, "SERIAL"),
            ColumnType::Geometry { .. } if sqlite => fmt!(f, "GEOMETRY"),
            ColumnType::Geometry {
                kind: GeometryKind::Geometry,
                srid,
                dimension: 2,
            } if !srid.is_known() => fmt!(f, "geometry"),
            ColumnType::Geometry {
                kind,
                srid,
                dimension,
            } => {
                let z = if *dimension == 3 { "Z" } else { "" };
                let _ = write!(f.dst, "geometry({}{z}", kind.name());
                if let Some(code) = srid.known() {
                    let _ = write!(f.dst, ",{code}");
                }
                f.dst.push(')');
            }
        }
    }
}
