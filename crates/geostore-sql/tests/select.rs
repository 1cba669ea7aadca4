use geostore_core::{driver::TypedValue, geom::WireFormat, Type, Value};
use geostore_sql::{
    geometry,
    stmt::{Expr, Insert, Select, TableName, Update},
    Serializer, Statement,
};
use pretty_assertions::assert_eq;

fn roads_select(table: TableName) -> Select {
    Select::new(
        vec![
            Expr::column("roads_fid"),
            Expr::column("name"),
            geometry::select_expr("geom", WireFormat::Ewkb, false, None),
        ],
        table,
    )
    .filter(Some(Expr::eq(Expr::column("name"), Expr::value("Main"))))
    .order_by(Expr::column("roads_fid"), false)
}

fn serialize(serializer: Serializer, stmt: impl Into<Statement>) -> (String, Vec<TypedValue>) {
    let mut params = vec![];
    let sql = serializer.serialize(&stmt.into(), &mut params);
    (sql, params)
}

#[test]
fn postgresql_puts_offset_before_limit() {
    let select = roads_select(TableName::qualified("public", "roads"))
        .limit(Some(10))
        .offset(Some(20));

    let (sql, params) = serialize(Serializer::postgresql(), select);
    assert_eq!(
        sql,
        r#"SELECT "roads_fid", "name", ST_AsEWKB("geom") FROM "public"."roads" WHERE "name" = $1 ORDER BY "roads_fid" ASC OFFSET 20 LIMIT 10;"#
    );
    assert_eq!(
        params,
        vec![TypedValue {
            value: Value::from("Main"),
            ty: Some(Type::String),
        }]
    );
}

#[test]
fn sqlite_limit_and_offset() {
    let select = roads_select(TableName::new("roads"))
        .limit(Some(10))
        .offset(Some(20));

    let (sql, _) = serialize(Serializer::sqlite(), select);
    assert_eq!(
        sql,
        r#"SELECT "roads_fid", "name", ST_AsEWKB("geom") FROM "roads" WHERE "name" = ?1 ORDER BY "roads_fid" ASC LIMIT 10 OFFSET 20;"#
    );
}

#[test]
fn sqlite_offset_without_limit() {
    let select = roads_select(TableName::new("roads")).offset(Some(5));

    let (sql, _) = serialize(Serializer::sqlite(), select);
    assert_eq!(
        sql,
        r#"SELECT "roads_fid", "name", ST_AsEWKB("geom") FROM "roads" WHERE "name" = ?1 ORDER BY "roads_fid" ASC LIMIT -1 OFFSET 5;"#
    );
}

#[test]
fn identifiers_and_strings_are_escaped() {
    let select = Select::new(vec![Expr::column(r#"we"ird"#)], TableName::new("t"))
        .filter(Some(Expr::eq(Expr::column("a"), Expr::literal("it's"))));

    let (sql, params) = serialize(Serializer::postgresql(), select);
    assert_eq!(sql, r#"SELECT "we""ird" FROM "t" WHERE "a" = 'it''s';"#);
    assert!(params.is_empty());
}

#[test]
fn insert_with_returning() {
    let insert = Insert {
        table: TableName::new("roads"),
        columns: vec!["name".to_string(), "geom".to_string()],
        values: vec![
            Expr::value("Main"),
            Expr::func("ST_GeomFromEWKB", [Expr::value(vec![1u8, 2, 3])]),
        ],
        returning: vec![Expr::column("roads_fid")],
    };

    let (sql, params) = serialize(Serializer::postgresql(), insert);
    assert_eq!(
        sql,
        r#"INSERT INTO "roads" ("name", "geom") VALUES ($1, ST_GeomFromEWKB($2)) RETURNING "roads_fid";"#
    );
    assert_eq!(params.len(), 2);
}

#[test]
fn insert_default_values() {
    let insert = Insert {
        table: TableName::new("roads"),
        columns: vec![],
        values: vec![],
        returning: vec![],
    };

    let (sql, _) = serialize(Serializer::sqlite(), insert);
    assert_eq!(sql, r#"INSERT INTO "roads" DEFAULT VALUES;"#);
}

#[test]
fn update_assignments() {
    let update = Update {
        table: TableName::new("roads"),
        assignments: vec![
            ("name".to_string(), Expr::value("Side")),
            ("lanes".to_string(), Expr::value(Value::I32(1))),
        ],
        filter: Some(Expr::InList {
            expr: Box::new(Expr::column("roads_fid")),
            list: vec![Expr::value(1i64), Expr::value(2i64)],
        }),
    };

    let (sql, params) = serialize(Serializer::sqlite(), update);
    assert_eq!(
        sql,
        r#"UPDATE "roads" SET "name" = ?1, "lanes" = ?2 WHERE "roads_fid" IN (?3, ?4);"#
    );
    assert_eq!(params.len(), 4);
}

#[test]
fn transactions() {
    use geostore_core::driver::Transaction;

    let serializer = Serializer::sqlite();
    assert_eq!(serializer.serialize_transaction(&Transaction::Start), "BEGIN");
    assert_eq!(serializer.serialize_transaction(&Transaction::Commit), "COMMIT");
    assert_eq!(serializer.serialize_transaction(&Transaction::Rollback), "ROLLBACK");
}
