//! Statements computing the bounding box of a geometry column.
//!
//! Every statement returns one row per result with the four envelope
//! coordinates `min_x, min_y, max_x, max_y` as doubles.

use crate::stmt::{Expr, Literal, Select, TableName};

use geostore_core::Type;

/// Row shape of every extent statement.
pub const RETURNING: [Type; 4] = [Type::F64; 4];

/// The bounds of every geometry matching `filter`, from one aggregate.
pub fn exact(table: TableName, column: &str, filter: Option<Expr>) -> Select {
    let columns = envelope_funcs(Expr::column(column))
        .into_iter()
        .zip(["MIN", "MIN", "MAX", "MAX"])
        .map(|(expr, aggregate)| Expr::func(aggregate, [expr]))
        .collect();

    Select::new(columns, table).filter(filter)
}

/// The extent kept in the planner statistics of a PostGIS table.
///
/// Without `schema`, PostGIS looks the table up through the search path.
pub fn estimated(schema: Option<&str>, table: &str, column: &str) -> Select {
    let estimated = Expr::func(
        "ST_EstimatedExtent",
        schema
            .into_iter()
            .chain([table, column])
            .map(|name| Expr::literal(Literal::from(name))),
    );

    Select::values(envelope_funcs(estimated).into())
}

/// One block of per-row envelopes, starting at `offset`.
///
/// Rows are ordered by `order_by` so blocks do not overlap between calls.
pub fn sample(table: TableName, column: &str, order_by: &[&str], offset: u64, limit: u64) -> Select {
    let mut select = Select::new(envelope_funcs(Expr::column(column)).into(), table)
        .filter(Some(Expr::is_not_null(Expr::column(column))))
        .limit(Some(limit))
        .offset(Some(offset));

    for key in order_by {
        select = select.order_by(Expr::column(*key), false);
    }

    select
}

fn envelope_funcs(geometry: Expr) -> [Expr; 4] {
    ["ST_XMin", "ST_YMin", "ST_XMax", "ST_YMax"].map(|name| Expr::func(name, [geometry.clone()]))
}
