//! Catalog queries and the decoding of their rows.

use crate::stmt::{Expr, ExprFunc, Select, Source, TableName};

use geostore_core::{
    driver::{Dialect, Row},
    geom::{GeometryKind, Srid},
    Error, Result, Type, Value,
};

/// A column as reported by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,

    /// Catalog type name, such as `int4` or `VARCHAR(40)`.
    pub type_name: String,

    pub nullable: bool,

    pub length: Option<u32>,

    /// Default expression as written in the catalog.
    pub default: Option<String>,

    /// Position in the primary key, starting at 1. Only SQLite reports it
    /// with the column.
    pub primary_key: Option<u32>,

    /// Values are generated by the store (sequence or identity column).
    pub generated: bool,
}

/// Geometry column metadata from a `geometry_columns` catalog or a sampled
/// row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryInfo {
    pub kind: GeometryKind,
    pub srid: Srid,
    pub dimension: u8,
}

/// Row shape of [`list_tables`].
pub const TABLE_ROW: [Type; 1] = [Type::String];

/// Row shape of [`geometry_column`] and [`geometry_sample`].
pub const GEOMETRY_ROW: [Type; 3] = [Type::I64, Type::I64, Type::String];

/// Names of the catalog tables that are never feature tables.
pub fn is_catalog_table(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "geometry_columns" || name.starts_with("spatial_ref_sys") || name.starts_with("sqlite_")
}

/// Base tables of `schema`.
pub fn list_tables(dialect: Dialect, schema: Option<&str>) -> Select {
    match dialect {
        Dialect::Postgresql => Select::new(
            vec![text(Expr::column("table_name"))],
            TableName::qualified("information_schema", "tables"),
        )
        .filter(Some(Expr::and_from_vec(vec![
            Expr::eq(
                Expr::column("table_schema"),
                Expr::value(schema.unwrap_or("public")),
            ),
            Expr::eq(Expr::column("table_type"), Expr::literal("BASE TABLE")),
        ])))
        .order_by(Expr::column("table_name"), false),
        Dialect::Sqlite => Select::new(vec![Expr::column("name")], TableName::new("sqlite_master"))
            .filter(Some(Expr::and_from_vec(vec![
                Expr::eq(Expr::column("type"), Expr::literal("table")),
                Expr::not(Expr::Like {
                    expr: Box::new(Expr::column("name")),
                    pattern: Box::new(Expr::literal("sqlite\\_%")),
                    case_insensitive: false,
                    escape: Some('\\'),
                }),
            ])))
            .order_by(Expr::column("name"), false),
    }
}

/// Columns of a table in declaration order, with their row shape.
pub fn columns(dialect: Dialect, schema: Option<&str>, table: &str) -> (Select, Vec<Type>) {
    match dialect {
        Dialect::Postgresql => {
            let select = Select::new(
                vec![
                    text(Expr::column("column_name")),
                    text(Expr::column("udt_name")),
                    text(Expr::column("is_nullable")),
                    Expr::cast(Expr::column("character_maximum_length"), "int8"),
                    text(Expr::column("column_default")),
                    text(Expr::column("is_identity")),
                ],
                TableName::qualified("information_schema", "columns"),
            )
            .filter(Some(in_table(schema, table)))
            .order_by(Expr::column("ordinal_position"), false);

            let ret = vec![
                Type::String,
                Type::String,
                Type::String,
                Type::I64,
                Type::String,
                Type::String,
            ];
            (select, ret)
        }
        Dialect::Sqlite => {
            let source = Source::Func(ExprFunc {
                name: "pragma_table_info",
                args: vec![Expr::value(table)],
            });
            let select = Select::new(
                ["name", "type", "notnull", "dflt_value", "pk"]
                    .map(Expr::column)
                    .into(),
                source,
            )
            .order_by(Expr::column("cid"), false);

            let ret = vec![Type::String, Type::String, Type::I64, Type::String, Type::I64];
            (select, ret)
        }
    }
}

/// Decodes one row of [`columns`].
pub fn parse_column(dialect: Dialect, row: Row) -> Result<ColumnInfo> {
    let mut values = row.into_iter();
    let mut next = || values.next().unwrap_or_default();

    let name = string(next(), "column name")?;
    let type_name = string(next(), "column type")?;

    match dialect {
        Dialect::Postgresql => {
            let nullable = next().as_str() != Some("NO");
            let length = next().as_i64().and_then(|len| u32::try_from(len).ok());
            let default = next().as_str().map(str::to_string);
            let identity = next().as_str() == Some("YES");
            let generated = identity
                || default
                    .as_deref()
                    .is_some_and(|default| default.starts_with("nextval("));

            Ok(ColumnInfo {
                name,
                type_name,
                nullable,
                length,
                default,
                primary_key: None,
                generated,
            })
        }
        Dialect::Sqlite => {
            let not_null = next().as_i64().unwrap_or(0) != 0;
            let default = next().to_text();
            let pk = next().as_i64().unwrap_or(0);
            let length = declared_length(&type_name);

            Ok(ColumnInfo {
                name,
                type_name,
                nullable: !not_null,
                length,
                default,
                primary_key: u32::try_from(pk).ok().filter(|pk| *pk > 0),
                generated: false,
            })
        }
    }
}

/// Key columns of a PostgreSQL table: first the primary key constraint name,
/// then its columns in key order with [`primary_key_columns`].
pub fn primary_key_constraint(schema: Option<&str>, table: &str) -> Select {
    Select::new(
        vec![text(Expr::column("constraint_name"))],
        TableName::qualified("information_schema", "table_constraints"),
    )
    .filter(Some(Expr::and_from_vec(vec![
        in_table(schema, table),
        Expr::eq(Expr::column("constraint_type"), Expr::literal("PRIMARY KEY")),
    ])))
}

pub fn primary_key_columns(schema: Option<&str>, table: &str, constraint: &str) -> Select {
    Select::new(
        vec![text(Expr::column("column_name"))],
        TableName::qualified("information_schema", "key_column_usage"),
    )
    .filter(Some(Expr::and_from_vec(vec![
        in_table(schema, table),
        Expr::eq(Expr::column("constraint_name"), Expr::value(constraint)),
    ])))
    .order_by(Expr::column("ordinal_position"), false)
}

/// The `geometry_columns` registration of a column.
pub fn geometry_column(dialect: Dialect, schema: Option<&str>, table: &str, column: &str) -> Select {
    let mut conditions = vec![];
    if dialect == Dialect::Postgresql {
        conditions.push(Expr::eq(
            Expr::column("f_table_schema"),
            Expr::value(schema.unwrap_or("public")),
        ));
    }
    conditions.push(Expr::eq(Expr::column("f_table_name"), Expr::value(table)));
    conditions.push(Expr::eq(
        Expr::column("f_geometry_column"),
        Expr::value(column),
    ));

    Select::new(
        vec![
            Expr::cast(Expr::column("coord_dimension"), "int8"),
            Expr::cast(Expr::column("srid"), "int8"),
            text(Expr::column("type")),
        ],
        TableName::new("geometry_columns"),
    )
    .filter(Some(Expr::and_from_vec(conditions)))
}

/// Reference system, dimension and type of the first non-null geometry.
pub fn geometry_sample(table: TableName, column: &str) -> Select {
    let geometry = || Expr::column(column);

    Select::new(
        vec![
            Expr::cast(Expr::func("ST_NDims", [geometry()]), "int8"),
            Expr::cast(Expr::func("ST_SRID", [geometry()]), "int8"),
            text(Expr::func("GeometryType", [geometry()])),
        ],
        table,
    )
    .filter(Some(Expr::is_not_null(geometry())))
    .limit(Some(1))
}

/// Decodes one row of [`geometry_column`] or [`geometry_sample`].
pub fn parse_geometry(row: Row) -> Result<GeometryInfo> {
    let [dimension, srid, kind] = <[Value; 3]>::try_from(row)
        .map_err(|row| Error::schema(format!("unexpected geometry catalog row {row:?}")))?;

    let dimension = match dimension.as_i64() {
        Some(3) | Some(4) => 3,
        _ => 2,
    };
    let srid = srid
        .as_i64()
        .and_then(|srid| i32::try_from(srid).ok())
        .map_or(Srid::UNKNOWN, Srid::new);
    let kind = kind
        .as_str()
        .and_then(GeometryKind::from_name)
        .unwrap_or(GeometryKind::Geometry);

    Ok(GeometryInfo {
        kind,
        srid,
        dimension,
    })
}

/// Maps a catalog type name to an attribute type. `None` for types geostore
/// does not handle.
pub fn map_type(dialect: Dialect, type_name: &str) -> Option<Type> {
    let lower = type_name.trim().to_ascii_lowercase();

    if GeometryKind::from_name(&lower).is_some() {
        return Some(Type::Geometry);
    }

    match dialect {
        Dialect::Postgresql => Some(match lower.as_str() {
            "bool" => Type::Bool,
            "int2" => Type::I16,
            "int4" => Type::I32,
            "int8" => Type::I64,
            "float4" => Type::F32,
            "float8" | "numeric" => Type::F64,
            "varchar" | "text" | "bpchar" | "char" | "name" => Type::String,
            "bytea" => Type::Bytes,
            _ => return None,
        }),
        // Column affinity rules
        Dialect::Sqlite => {
            let base = lower.split('(').next().unwrap_or_default().trim();
            if base.contains("int") {
                Some(Type::I64)
            } else if base.contains("char") || base.contains("clob") || base.contains("text") {
                Some(Type::String)
            } else if base.is_empty() || base.contains("blob") {
                Some(Type::Bytes)
            } else if base.contains("real") || base.contains("floa") || base.contains("doub") {
                Some(Type::F64)
            } else if base.contains("bool") {
                Some(Type::Bool)
            } else if base.contains("numeric") || base.contains("decimal") {
                Some(Type::F64)
            } else {
                None
            }
        }
    }
}

fn declared_length(type_name: &str) -> Option<u32> {
    let (_, rest) = type_name.split_once('(')?;
    let (len, _) = rest.split_once(')')?;
    len.split(',').next()?.trim().parse().ok()
}

fn in_table(schema: Option<&str>, table: &str) -> Expr {
    Expr::and_from_vec(vec![
        Expr::eq(
            Expr::column("table_schema"),
            Expr::value(schema.unwrap_or("public")),
        ),
        Expr::eq(Expr::column("table_name"), Expr::value(table)),
    ])
}

fn text(expr: Expr) -> Expr {
    Expr::cast(expr, "text")
}

fn string(value: Value, what: &str) -> Result<String> {
    match value {
        Value::String(value) => Ok(value),
        other => Err(Error::schema(format!("unexpected {what} {other:?}"))),
    }
}
