use geostore_core::{
    driver::Capability,
    geom::{GeometryKind, Srid},
    schema::{AttributeDescriptor, IdentityMapper, KeyColumn},
    FeatureType, Type, Value,
};
use geostore_sql::{
    ddl,
    serializer::{Params, Placeholder},
    stmt::TableName,
    Serializer,
};
use pretty_assertions::assert_eq;

struct NoParams;

impl Params for NoParams {
    fn push(&mut self, _: &Value, _: Option<Type>) -> Placeholder {
        Placeholder(0)
    }
}

fn roads() -> FeatureType {
    FeatureType::builder("roads")
        .column("name", Type::String)
        .attribute(
            AttributeDescriptor::new("lanes", Type::I32)
                .not_null()
                .default_value(2),
        )
        .geometry("geom", GeometryKind::LineString, Srid::new(4326), 2)
        .build()
        .unwrap()
}

fn serialize(capability: &Capability, ty: &FeatureType, table: TableName) -> Vec<String> {
    let serializer = Serializer::for_capability(capability);
    ddl::create_feature_type(ty, table, capability)
        .unwrap()
        .iter()
        .map(|stmt| serializer.serialize(stmt, &mut NoParams))
        .collect()
}

#[test]
fn create_feature_table_postgresql() {
    let stmts = serialize(
        &Capability::POSTGIS,
        &roads(),
        TableName::qualified("public", "roads"),
    );

    assert_eq!(
        stmts,
        vec![
            r#"CREATE TABLE "public"."roads" (
    "roads_fid" SERIAL PRIMARY KEY NOT NULL,
    "name" VARCHAR(256),
    "lanes" INTEGER NOT NULL DEFAULT 2,
    "geom" geometry(LINESTRING,4326)
);"#,
            r#"ALTER TABLE "public"."roads" ADD CONSTRAINT "enforce_srid_geom" CHECK (ST_SRID("geom") = 4326);"#,
            r#"ALTER TABLE "public"."roads" ADD CONSTRAINT "enforce_dims_geom" CHECK (ST_NDims("geom") = 2);"#,
            r#"ALTER TABLE "public"."roads" ADD CONSTRAINT "enforce_geotype_geom" CHECK (GeometryType("geom") = 'LINESTRING' OR "geom" IS NULL);"#,
            r#"CREATE INDEX "spatial_roads_geom" ON "public"."roads" USING GIST ("geom");"#,
        ]
    );
}

#[test]
fn create_feature_table_sqlite() {
    let stmts = serialize(&Capability::SQLITE, &roads(), TableName::new("roads"));

    assert_eq!(
        stmts,
        vec![
            r#"CREATE TABLE "roads" (
    "roads_fid" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    "name" VARCHAR(256),
    "lanes" INTEGER NOT NULL DEFAULT 2,
    "geom" GEOMETRY,
    CONSTRAINT "enforce_srid_geom" CHECK (ST_SRID("geom") = 4326),
    CONSTRAINT "enforce_dims_geom" CHECK (ST_NDims("geom") = 2),
    CONSTRAINT "enforce_geotype_geom" CHECK (GeometryType("geom") = 'LINESTRING' OR "geom" IS NULL)
);"#,
            r#"DELETE FROM "geometry_columns" WHERE "f_table_name" = ?0 AND "f_geometry_column" = ?0;"#,
            r#"INSERT INTO "geometry_columns" ("f_table_name", "f_geometry_column", "coord_dimension", "srid", "type") VALUES (?0, ?0, ?0, ?0, ?0);"#,
        ]
    );
}

#[test]
fn unknown_srid_and_generic_geometry() {
    let ty = FeatureType::builder("shapes")
        .geometry("shape", GeometryKind::Geometry, Srid::UNKNOWN, 3)
        .build()
        .unwrap();

    let stmts = serialize(&Capability::POSTGIS, &ty, TableName::new("shapes"));
    assert_eq!(
        stmts,
        vec![
            r#"CREATE TABLE "shapes" (
    "shapes_fid" SERIAL PRIMARY KEY NOT NULL,
    "shape" geometry(GEOMETRYZ)
);"#,
            r#"ALTER TABLE "shapes" ADD CONSTRAINT "enforce_dims_shape" CHECK (ST_NDims("shape") = 3);"#,
            r#"CREATE INDEX "spatial_shapes_shape" ON "shapes" USING GIST ("shape");"#,
        ]
    );
}

#[test]
fn assigned_keys_get_a_primary_key_constraint() {
    let ty = FeatureType::builder("parcels")
        .column("region", Type::String)
        .identity(IdentityMapper::assigned(vec![
            KeyColumn::new("region", Type::String),
            KeyColumn::new("seq", Type::I32),
        ]))
        .build()
        .unwrap();

    let stmts = serialize(&Capability::SQLITE, &ty, TableName::new("parcels"));
    assert_eq!(
        stmts,
        vec![
            r#"CREATE TABLE "parcels" (
    "seq" INTEGER NOT NULL,
    "region" VARCHAR(256) NOT NULL,
    PRIMARY KEY ("region", "seq")
);"#
        ]
    );
}

#[test]
fn generated_key_collision_is_rejected() {
    let ty = FeatureType::builder("roads")
        .column("roads_fid", Type::I64)
        .build()
        .unwrap();

    let err = ddl::create_feature_type(&ty, TableName::new("roads"), &Capability::SQLITE)
        .unwrap_err();
    assert!(err.is_schema());
}
