use geostore_core::{
    driver::{Capability, TypedValue},
    filter::{ArithmeticOp, CompareOp, Expr as FExpr, FilterLike, Func},
    geom::{Envelope, Geometry, GeometryCodec, GeometryKind, WireFormat},
    FeatureId, FeatureType, Filter, GeometryValue, Srid, Type, Value,
};
use geostore_sql::{
    stmt::{Select, TableName},
    Serializer, Splitter,
};
use pretty_assertions::assert_eq;

fn roads() -> FeatureType {
    FeatureType::builder("roads")
        .column("name", Type::String)
        .column("lanes", Type::I32)
        .column("width", Type::F64)
        .geometry("geom", GeometryKind::LineString, Srid::new(4326), 2)
        .build()
        .unwrap()
}

/// Renders the `WHERE` clause of a select on `roads`.
fn render(
    splitter: &Splitter<'_>,
    serializer: Serializer,
    filter: &Filter,
) -> (String, Vec<TypedValue>) {
    let split = splitter.split(filter);
    assert!(!split.has_residual(), "unexpected residual {:?}", split.residual);

    let select = Select::new(vec![geostore_sql::stmt::Expr::Star], TableName::new("roads"))
        .filter(splitter.lower(&split.encodable).unwrap());

    let mut params = vec![];
    let sql = serializer.serialize(&select.into(), &mut params);
    let clause = sql
        .strip_prefix(r#"SELECT * FROM "roads" WHERE "#)
        .and_then(|sql| sql.strip_suffix(';'))
        .unwrap_or(&sql)
        .to_string();
    (clause, params)
}

#[test]
fn case_insensitive_compare_and_bbox() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::SQLITE);

    let filter = Filter::and(
        Filter::eq_ignore_case("name", "main"),
        Filter::bbox(Envelope::new(0.0, 0.0, 10.0, 10.0), Srid::new(4326)),
    );

    let (sql, params) = render(&splitter, Serializer::sqlite(), &filter);
    assert_eq!(
        sql,
        r#"LOWER("name") = LOWER(?1) AND ST_Intersects("geom", ST_MakeEnvelope(?2, ?3, ?4, ?5, 4326))"#
    );
    assert_eq!(params.len(), 5);
    assert_eq!(params[3].value, Value::F64(10.0));
}

#[test]
fn loose_bbox_on_postgis() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::POSTGIS).loose_bbox(true);

    let filter = Filter::bbox(Envelope::new(0.0, 0.0, 10.0, 10.0), Srid::UNKNOWN);
    let (sql, _) = render(&splitter, Serializer::postgresql(), &filter);
    assert_eq!(sql, r#""geom" && ST_MakeEnvelope($1, $2, $3, $4, 4326)"#);
}

#[test]
fn loose_bbox_on_sqlite() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::SQLITE).loose_bbox(true);

    let filter = Filter::bbox(Envelope::new(0.0, 0.0, 10.0, 10.0), Srid::new(4326));
    let (sql, _) = render(&splitter, Serializer::sqlite(), &filter);
    assert_eq!(
        sql,
        r#"ST_EnvIntersects("geom", ST_MakeEnvelope(?1, ?2, ?3, ?4, 4326))"#
    );
}

#[test]
fn disjunction_inside_conjunction() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::SQLITE);

    let filter = Filter::and(
        Filter::or(Filter::eq("lanes", 1), Filter::eq("lanes", 2)),
        Filter::not(Filter::lt("width", 3.5)),
    );

    let (sql, _) = render(&splitter, Serializer::sqlite(), &filter);
    assert_eq!(
        sql,
        r#"("lanes" = ?1 OR "lanes" = ?2) AND NOT ("width" < ?3)"#
    );
}

#[test]
fn like_and_between() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::POSTGIS);

    let filter = Filter::and(
        Filter::Like(FilterLike {
            expr: FExpr::property("name"),
            pattern: "Ma*".to_string(),
            wildcard: '*',
            single: '.',
            escape: Some('!'),
            match_case: true,
        }),
        Filter::between(FExpr::property("lanes"), FExpr::literal(1), FExpr::literal(4)),
    );

    let (sql, params) = render(&splitter, Serializer::postgresql(), &filter);
    assert_eq!(
        sql,
        r#""name" LIKE $1 ESCAPE '\' AND "lanes" BETWEEN $2 AND $3"#
    );
    assert_eq!(params[0].value, Value::from("Ma%"));
}

#[test]
fn arithmetic_and_functions() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::POSTGIS);

    let filter = Filter::and(
        Filter::compare(
            CompareOp::Gt,
            FExpr::arithmetic(
                ArithmeticOp::Mul,
                FExpr::property("width"),
                FExpr::property("lanes"),
            ),
            FExpr::literal(10.0),
        ),
        Filter::compare(
            CompareOp::Eq,
            FExpr::function(Func::Length, [FExpr::property("name")]),
            FExpr::literal(4),
        ),
    );

    let (sql, _) = render(&splitter, Serializer::postgresql(), &filter);
    assert_eq!(
        sql,
        r#"("width" * "lanes") > $1 AND LENGTH("name") = $2"#
    );
}

#[test]
fn spatial_literal_in_text() {
    let ty = roads();
    let splitter =
        Splitter::new(&ty, &Capability::POSTGIS).codec(GeometryCodec::new(WireFormat::Wkt));

    let point = GeometryValue::unknown(Geometry::point(1.0, 2.0));
    let (sql, params) = render(&splitter, Serializer::postgresql(), &Filter::within("geom", point));
    assert_eq!(sql, r#"ST_Within("geom", ST_GeomFromText($1, 4326))"#);
    assert_eq!(params[0].value, Value::from("POINT(1 2)"));
}

#[test]
fn spatial_literal_in_other_srid_is_transformed() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::POSTGIS).force_2d(true);

    let point = GeometryValue::new(Geometry::point(1.0, 2.0), Srid::new(3857));
    let (sql, _) = render(&splitter, Serializer::postgresql(), &Filter::dwithin("geom", point, 5.0));
    assert_eq!(
        sql,
        r#"ST_DWithin(ST_Force2D("geom"), ST_Transform(ST_GeomFromEWKB($1), 4326), $2)"#
    );
}

#[test]
fn identifier_sets() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::SQLITE);

    let filter = Filter::ids([
        FeatureId::new("roads", &[Value::I64(3)]),
        FeatureId::new("roads", &[Value::I64(5)]),
    ]);

    let (sql, params) = render(&splitter, Serializer::sqlite(), &filter);
    assert_eq!(sql, r#""roads_fid" IN (?1, ?2)"#);
    assert_eq!(params[0].value, Value::I64(3));
    assert_eq!(params[0].ty, Some(Type::I64));
}

#[test]
fn exclude_renders_false() {
    let ty = roads();
    let splitter = Splitter::new(&ty, &Capability::SQLITE);

    let (sql, _) = render(&splitter, Serializer::sqlite(), &Filter::Exclude);
    assert_eq!(sql, "1 = 0");
}
