//! Serializes statements and runs them on a connection.

use geostore_core::{
    driver::{QuerySql, Row, RowStream, TypedValue},
    Connection, Result, Type,
};
use geostore_sql::{Serializer, Statement};

/// Runs a statement that returns rows shaped like `ret`.
pub(crate) async fn query(
    connection: &mut dyn Connection,
    serializer: Serializer,
    stmt: impl Into<Statement>,
    ret: &[Type],
) -> Result<RowStream> {
    let (sql, params) = serialize(serializer, &stmt.into());
    tracing::debug!(%sql, params = params.len(), "query");

    let response = connection
        .exec(
            QuerySql {
                sql,
                params,
                ret: Some(ret.to_vec()),
            }
            .into(),
        )
        .await?;

    response.rows.into_values()
}

/// Runs a query and buffers every row.
pub(crate) async fn query_all(
    connection: &mut dyn Connection,
    serializer: Serializer,
    stmt: impl Into<Statement>,
    ret: &[Type],
) -> Result<Vec<Row>> {
    query(connection, serializer, stmt, ret)
        .await?
        .collect()
        .await
}

/// Runs a statement and returns the number of affected rows.
pub(crate) async fn execute(
    connection: &mut dyn Connection,
    serializer: Serializer,
    stmt: impl Into<Statement>,
) -> Result<u64> {
    let stmt = stmt.into();
    let (sql, params) = serialize(serializer, &stmt);

    if stmt.is_ddl() {
        tracing::info!(%sql, "ddl");
    } else {
        tracing::debug!(%sql, params = params.len(), "execute");
    }

    let response = connection
        .exec(
            QuerySql {
                sql,
                params,
                ret: None,
            }
            .into(),
        )
        .await?;

    response.rows.into_count()
}

fn serialize(serializer: Serializer, stmt: &Statement) -> (String, Vec<TypedValue>) {
    let mut params = vec![];
    let sql = serializer.serialize(stmt, &mut params);
    (sql, params)
}
