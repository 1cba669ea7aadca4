//! Discovers feature types from the database catalog.

use crate::exec;

use geostore_core::{
    driver::{Capability, Dialect},
    geom::GeometryKind,
    schema::{AttributeDescriptor, GeometryDescriptor, IdentityMapper, KeyColumn},
    Connection, Error, FeatureType, Result, Srid, Type, Value,
};
use geostore_sql::{
    introspect::{self, ColumnInfo, GeometryInfo, GEOMETRY_ROW, TABLE_ROW},
    stmt::TableName,
    Serializer,
};

/// Reads table metadata and turns it into [`FeatureType`]s.
///
/// Every statement it issues is read only.
#[derive(Debug, Clone)]
pub struct Introspector<'a> {
    capability: &'static Capability,
    schema: Option<&'a str>,
    qualify_tables: bool,
    expose_primary_keys: bool,
}

impl<'a> Introspector<'a> {
    pub fn new(capability: &'static Capability) -> Introspector<'a> {
        Introspector {
            capability,
            schema: None,
            qualify_tables: true,
            expose_primary_keys: false,
        }
    }

    /// Looks tables up in `schema` instead of the store's default schema.
    pub fn schema(mut self, schema: Option<&'a str>) -> Introspector<'a> {
        self.schema = schema;
        self
    }

    pub fn qualify_tables(mut self, qualify_tables: bool) -> Introspector<'a> {
        self.qualify_tables = qualify_tables;
        self
    }

    pub fn expose_primary_keys(mut self, expose_primary_keys: bool) -> Introspector<'a> {
        self.expose_primary_keys = expose_primary_keys;
        self
    }

    /// The schema tables are looked up in, if the store has schemas.
    pub fn schema_name(&self) -> Option<&'a str> {
        if !self.capability.schemas {
            return None;
        }
        self.schema.or(self.capability.default_schema)
    }

    /// The name statements use for the table of `type_name`.
    pub fn table_name(&self, type_name: &str) -> TableName {
        match self.schema_name() {
            Some(schema) if self.qualify_tables => TableName::qualified(schema, type_name),
            _ => TableName::new(type_name),
        }
    }

    /// Names of the feature tables, without catalog tables.
    pub async fn type_names(&self, connection: &mut dyn Connection) -> Result<Vec<String>> {
        let rows = exec::query_all(
            connection,
            self.serializer(),
            introspect::list_tables(self.capability.dialect, self.schema_name()),
            &TABLE_ROW,
        )
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next()?.as_str().map(str::to_string))
            .filter(|name| !introspect::is_catalog_table(name))
            .collect())
    }

    /// Describes the table named `type_name`.
    ///
    /// Fails with a schema error if the table does not exist. Columns of
    /// types geostore cannot represent are skipped.
    pub async fn describe(
        &self,
        connection: &mut dyn Connection,
        type_name: &str,
    ) -> Result<FeatureType> {
        let dialect = self.capability.dialect;
        let (select, ret) = introspect::columns(dialect, self.schema_name(), type_name);

        let columns = exec::query_all(&mut *connection, self.serializer(), select, &ret)
            .await?
            .into_iter()
            .map(|row| introspect::parse_column(dialect, row))
            .collect::<Result<Vec<_>>>()?;

        if columns.is_empty() {
            return Err(Error::schema(format!(
                "table `{type_name}` does not exist or has no columns"
            )));
        }

        let key_names = self
            .primary_key(&mut *connection, type_name, &columns)
            .await?;

        let mut keys = vec![];
        let mut builder = FeatureType::builder(type_name);

        for column in &columns {
            let Some(ty) = introspect::map_type(dialect, &column.type_name) else {
                tracing::warn!(
                    table = type_name,
                    column = %column.name,
                    ty = %column.type_name,
                    "skipping column of unsupported type"
                );
                continue;
            };

            let is_key = key_names.contains(&column.name);
            if is_key {
                keys.push((KeyColumn::new(&column.name, ty), column));
                if !self.expose_primary_keys {
                    continue;
                }
            }

            let attribute = if ty == Type::Geometry {
                let geometry = self
                    .geometry(&mut *connection, type_name, &column.name)
                    .await?;
                AttributeDescriptor {
                    geometry: Some(geometry),
                    ..AttributeDescriptor::new(&column.name, ty)
                }
            } else {
                self.attribute(column, ty)
            };

            builder = builder.attribute(AttributeDescriptor {
                nullable: column.nullable && !is_key,
                ..attribute
            });
        }

        keys.sort_by_key(|(key, _)| key_names.iter().position(|name| *name == key.name));
        builder = builder.identity(self.identity(keys));
        builder.build()
    }

    fn attribute(&self, column: &ColumnInfo, ty: Type) -> AttributeDescriptor {
        let mut attribute = AttributeDescriptor::new(&column.name, ty);
        attribute.length = column.length;
        attribute.default = column
            .default
            .as_deref()
            .and_then(|default| parse_default(default, ty));
        attribute
    }

    /// Picks the identity strategy from the key columns.
    fn identity(&self, keys: Vec<(KeyColumn, &ColumnInfo)>) -> IdentityMapper {
        let generated = match &keys[..] {
            [(key, column)] => {
                key.ty.is_integer()
                    && (column.generated
                        || (self.capability.dialect == Dialect::Sqlite
                            && column.type_name.eq_ignore_ascii_case("integer")))
            }
            _ => false,
        };

        let mut columns: Vec<KeyColumn> = keys.into_iter().map(|(key, _)| key).collect();

        let identity = if columns.is_empty() {
            IdentityMapper::volatile()
        } else if generated {
            IdentityMapper::generated(columns.remove(0))
        } else {
            IdentityMapper::assigned(columns)
        };

        let volatile = identity.is_volatile();
        identity.exposed(self.expose_primary_keys && !volatile)
    }

    /// Names of the primary key columns in key order.
    async fn primary_key(
        &self,
        connection: &mut dyn Connection,
        type_name: &str,
        columns: &[ColumnInfo],
    ) -> Result<Vec<String>> {
        if self.capability.dialect == Dialect::Sqlite {
            let mut keys = columns
                .iter()
                .filter_map(|column| Some((column.primary_key?, column.name.clone())))
                .collect::<Vec<_>>();
            keys.sort();
            return Ok(keys.into_iter().map(|(_, name)| name).collect());
        }

        let schema = self.schema_name();
        let constraint = exec::query_all(
            &mut *connection,
            self.serializer(),
            introspect::primary_key_constraint(schema, type_name),
            &TABLE_ROW,
        )
        .await?
        .into_iter()
        .find_map(|row| row.into_iter().next()?.as_str().map(str::to_string));

        let Some(constraint) = constraint else {
            return Ok(vec![]);
        };

        let rows = exec::query_all(
            connection,
            self.serializer(),
            introspect::primary_key_columns(schema, type_name, &constraint),
            &TABLE_ROW,
        )
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next()?.as_str().map(str::to_string))
            .collect())
    }

    /// Geometry metadata of a column: the `geometry_columns` catalog first,
    /// then a sampled row, then unknown.
    async fn geometry(
        &self,
        connection: &mut dyn Connection,
        type_name: &str,
        column: &str,
    ) -> Result<GeometryDescriptor> {
        let catalog = exec::query_all(
            &mut *connection,
            self.serializer(),
            introspect::geometry_column(
                self.capability.dialect,
                self.schema_name(),
                type_name,
                column,
            ),
            &GEOMETRY_ROW,
        )
        .await;

        // Databases without a catalog table report an error here
        let catalog = match catalog {
            Ok(rows) => rows
                .into_iter()
                .next()
                .map(introspect::parse_geometry)
                .transpose()?,
            Err(err) => {
                tracing::debug!(%err, table = type_name, "geometry catalog unavailable");
                None
            }
        };

        if let Some(info) = catalog.filter(|info| info.srid.is_known()) {
            return Ok(descriptor(info));
        }

        let sample = exec::query_all(
            connection,
            self.serializer(),
            introspect::geometry_sample(self.table_name(type_name), column),
            &GEOMETRY_ROW,
        )
        .await?
        .into_iter()
        .next()
        .map(introspect::parse_geometry)
        .transpose()?;

        let info = match (catalog, sample) {
            // The catalog knows the type, the sample the reference system
            (Some(catalog), Some(sample)) => GeometryInfo {
                srid: sample.srid,
                ..catalog
            },
            (Some(info), None) | (None, Some(info)) => info,
            (None, None) => GeometryInfo {
                kind: GeometryKind::Geometry,
                srid: Srid::UNKNOWN,
                dimension: 2,
            },
        };

        if !info.srid.is_known() {
            tracing::warn!(
                table = type_name,
                column,
                "no reference system found for geometry column; using unknown"
            );
        }

        Ok(descriptor(info))
    }

    fn serializer(&self) -> Serializer {
        Serializer::for_capability(self.capability)
    }
}

fn descriptor(info: GeometryInfo) -> GeometryDescriptor {
    GeometryDescriptor {
        kind: info.kind,
        srid: info.srid,
        dimension: info.dimension,
    }
}

/// Column defaults geostore can represent: plain literals. Anything else
/// (sequences, function calls) stays with the database.
fn parse_default(default: &str, ty: Type) -> Option<Value> {
    let default = default.trim();
    let literal = default.split("::").next().unwrap_or(default).trim();

    let value = if let Some(text) = literal
        .strip_prefix('\'')
        .and_then(|text| text.strip_suffix('\''))
    {
        Value::String(text.replace("''", "'"))
    } else if literal.eq_ignore_ascii_case("null") {
        return None;
    } else if literal.eq_ignore_ascii_case("true") || literal.eq_ignore_ascii_case("false") {
        Value::Bool(literal.eq_ignore_ascii_case("true"))
    } else if literal.parse::<f64>().is_ok() {
        Value::String(literal.to_string())
    } else {
        return None;
    };

    value.cast(ty).ok()
}
