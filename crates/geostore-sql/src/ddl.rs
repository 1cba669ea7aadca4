//! Statements creating the table of a feature type.

use crate::stmt::{
    AddConstraint, ColumnDef, ColumnType, Constraint, CreateIndex, CreateTable, Delete, Expr,
    Insert, Statement, TableName,
};

use geostore_core::{
    driver::Capability,
    geom::GeometryKind,
    schema::{AttributeDescriptor, GeometryDescriptor, KeyStrategy},
    Error, FeatureType, Result,
};

/// Name of the catalog table SQLite stores geometry registrations in.
pub const GEOMETRY_COLUMNS: &str = "geometry_columns";

/// Statements creating `feature_type` in `table`, in execution order: the
/// table itself, geometry constraints the store cannot declare inline, the
/// geometry registration and the spatial index.
pub fn create_feature_type(
    feature_type: &FeatureType,
    table: TableName,
    capability: &Capability,
) -> Result<Vec<Statement>> {
    let identity = &feature_type.identity;

    let mut columns = vec![];
    let mut constraints = vec![];

    for key in &identity.columns {
        if feature_type.attribute(&key.name).is_some() {
            if identity.strategy == KeyStrategy::AutoGenerated {
                return Err(Error::schema(format!(
                    "attribute `{}` of `{}` collides with the generated key column",
                    key.name, feature_type.name
                )));
            }
            continue;
        }

        columns.push(match identity.strategy {
            KeyStrategy::AutoGenerated => ColumnDef::serial_key(&key.name),
            _ => ColumnDef {
                nullable: false,
                ..ColumnDef::new(&key.name, ColumnType::from_type(key.ty, None, capability))
            },
        });
    }

    if identity.strategy == KeyStrategy::Assigned {
        constraints.push(Constraint::PrimaryKey(
            identity.column_names().map(str::to_string).collect(),
        ));
    }

    for attr in &feature_type.attributes {
        let mut column = ColumnDef::from_attribute(attr, capability);
        if identity.is_key_column(&attr.name) && identity.strategy == KeyStrategy::Assigned {
            column.nullable = false;
        }
        columns.push(column);
    }

    let geometry = feature_type
        .geometry()
        .and_then(|attr| attr.geometry.as_ref().map(|geometry| (attr, geometry)));

    let checks = match geometry {
        Some((attr, geometry)) => geometry_checks(attr, geometry, capability),
        None => vec![],
    };

    let mut stmts = vec![];

    if capability.alter_table_add_constraint {
        stmts.push(
            CreateTable {
                name: table.clone(),
                columns,
                constraints,
            }
            .into(),
        );

        for constraint in checks {
            stmts.push(
                AddConstraint {
                    table: table.clone(),
                    constraint,
                }
                .into(),
            );
        }
    } else {
        constraints.extend(checks);
        stmts.push(
            CreateTable {
                name: table.clone(),
                columns,
                constraints,
            }
            .into(),
        );
    }

    let Some((attr, geometry)) = geometry else {
        return Ok(stmts);
    };

    if capability.register_geometry_columns {
        stmts.extend(register_geometry(&table, &attr.name, geometry));
    }

    if let Some(method) = capability.spatial_index_method {
        let name = format!("spatial_{}_{}", table.name, attr.name).to_lowercase();
        stmts.push(
            CreateIndex {
                name: capability.truncate_identifier(&name),
                on: table,
                columns: vec![attr.name.clone()],
                using: Some(method),
            }
            .into(),
        );
    }

    Ok(stmts)
}

/// Replaces the `geometry_columns` row of a column.
pub fn register_geometry(
    table: &TableName,
    column: &str,
    geometry: &GeometryDescriptor,
) -> Vec<Statement> {
    let catalog = TableName::new(GEOMETRY_COLUMNS);

    let delete = Delete {
        from: catalog.clone(),
        filter: Some(Expr::and_from_vec(vec![
            Expr::eq(Expr::column("f_table_name"), Expr::value(table.name.as_str())),
            Expr::eq(Expr::column("f_geometry_column"), Expr::value(column)),
        ])),
    };

    let insert = Insert {
        table: catalog,
        columns: [
            "f_table_name",
            "f_geometry_column",
            "coord_dimension",
            "srid",
            "type",
        ]
        .map(str::to_string)
        .into(),
        values: vec![
            Expr::value(table.name.as_str()),
            Expr::value(column),
            Expr::value(geometry.dimension as i64),
            Expr::value(geometry.srid.code() as i64),
            Expr::value(geometry.kind.name()),
        ],
        returning: vec![],
    };

    vec![delete.into(), insert.into()]
}

fn geometry_checks(
    attr: &AttributeDescriptor,
    geometry: &GeometryDescriptor,
    capability: &Capability,
) -> Vec<Constraint> {
    let column = || Expr::column(&attr.name);
    let name = |prefix: &str| capability.truncate_identifier(&format!("{prefix}_{}", attr.name));

    let mut checks = vec![];

    if let Some(srid) = geometry.srid.known() {
        checks.push(Constraint::Check {
            name: name("enforce_srid"),
            expr: Expr::eq(
                Expr::func("ST_SRID", [column()]),
                Expr::literal(srid as i64),
            ),
        });
    }

    checks.push(Constraint::Check {
        name: name("enforce_dims"),
        expr: Expr::eq(
            Expr::func("ST_NDims", [column()]),
            Expr::literal(geometry.dimension),
        ),
    });

    if geometry.kind != GeometryKind::Geometry {
        checks.push(Constraint::Check {
            name: name("enforce_geotype"),
            expr: Expr::Or(vec![
                Expr::eq(
                    Expr::func("GeometryType", [column()]),
                    Expr::literal(geometry.kind.name()),
                ),
                Expr::is_null(column()),
            ]),
        });
    }

    checks
}
