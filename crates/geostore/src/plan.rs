//! Turns a [`Query`] into one `SELECT` plus the work left for the reader.

use geostore_core::{
    driver::{Capability, Row},
    geom::GeometryCodec,
    query::{Direction, Properties, SortBy},
    schema::IdentityMapper,
    Error, Feature, FeatureType, Filter, Query, Result, Srid, Type, Value,
};
use geostore_sql::{
    geometry,
    stmt::{Expr, Select, TableName},
    Split, Splitter,
};

/// Builds the statements reading one feature type.
#[derive(Debug, Clone)]
pub struct Planner<'a> {
    feature_type: &'a FeatureType,
    capability: &'static Capability,
    table: TableName,
    codec: GeometryCodec,
    loose_bbox: bool,
}

/// A planned read.
#[derive(Debug, Clone)]
pub struct Plan {
    pub select: Select,

    /// Row shape of `select`.
    pub ret: Vec<Type>,

    /// The part of the filter the reader evaluates. `Include` when the
    /// store evaluates the whole filter.
    pub residual: Filter,

    /// Features to skip after the residual. Only set when the residual
    /// keeps pagination out of the statement.
    pub skip: u64,

    /// Features to return after the residual, with the same condition.
    pub max: Option<u64>,

    /// Attributes handed to the caller, in order. `None` returns every
    /// fetched attribute.
    pub properties: Option<Vec<String>>,

    decoder: Decoder,
}

/// Maps result rows back to features.
#[derive(Debug, Clone)]
struct Decoder {
    type_name: String,
    identity: IdentityMapper,
    /// Row positions of the key values, in key order.
    keys: Vec<usize>,
    attributes: Vec<Column>,
    geometry_name: Option<String>,
    codec: GeometryCodec,
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    /// Reference system of decoded geometries. `None` for other attributes.
    geometry: Option<Srid>,
}

impl<'a> Planner<'a> {
    pub fn new(feature_type: &'a FeatureType, capability: &'static Capability) -> Planner<'a> {
        Planner {
            feature_type,
            capability,
            table: TableName::new(&feature_type.name),
            codec: GeometryCodec::default(),
            loose_bbox: false,
        }
    }

    pub fn table(mut self, table: TableName) -> Planner<'a> {
        self.table = table;
        self
    }

    pub fn codec(mut self, codec: GeometryCodec) -> Planner<'a> {
        self.codec = codec;
        self
    }

    pub fn loose_bbox(mut self, loose_bbox: bool) -> Planner<'a> {
        self.loose_bbox = loose_bbox;
        self
    }

    pub fn feature_type(&self) -> &'a FeatureType {
        self.feature_type
    }

    pub fn capability(&self) -> &'static Capability {
        self.capability
    }

    pub fn table_name(&self) -> &TableName {
        &self.table
    }

    pub fn geometry_codec(&self) -> GeometryCodec {
        self.codec
    }

    pub fn splitter(&self, force_2d: bool) -> Splitter<'a> {
        Splitter::new(self.feature_type, self.capability)
            .codec(self.codec)
            .loose_bbox(self.loose_bbox)
            .force_2d(force_2d)
    }

    /// Splits `filter` and lowers the encodable part.
    pub fn split(&self, filter: &Filter, force_2d: bool) -> Result<(Split, Option<Expr>)> {
        self.check_filter(filter)?;
        let splitter = self.splitter(force_2d);
        let split = splitter.split(filter);
        let expr = splitter.lower(&split.encodable)?;
        Ok((split, expr))
    }

    /// Plans `query`.
    ///
    /// Fails with a validation error, before anything runs, when the query
    /// names a property the feature type does not have.
    pub fn plan(&self, query: &Query) -> Result<Plan> {
        let ft = self.feature_type;
        let identity = &ft.identity;

        if let Properties::Only(properties) = &query.properties {
            ft.check_properties(properties.iter().map(String::as_str))?;
        }

        let (split, filter) = self.split(&query.filter, query.force_2d)?;

        // Attributes to fetch: the requested ones, then whatever the
        // residual reads, then exposed key columns.
        let mut fetch: Vec<&str> = match &query.properties {
            Properties::All => ft.attribute_names().collect(),
            Properties::Only(properties) => properties.iter().map(String::as_str).collect(),
        };
        split.residual.visit_properties(&mut |name| {
            if let Some(attr) = ft.attribute(name) {
                push_unique(&mut fetch, &attr.name);
            }
        });
        if let Some(geometry) = ft.geometry().filter(|_| split.residual.reads_default_geometry()) {
            push_unique(&mut fetch, &geometry.name);
        }
        if identity.exposed {
            for key in identity.column_names() {
                push_unique(&mut fetch, key);
            }
        }

        let mut columns = vec![];
        let mut ret = vec![];
        let mut keys = vec![];

        if !identity.exposed {
            for key in &identity.columns {
                keys.push(columns.len());
                columns.push(Expr::column(&key.name));
                ret.push(key.ty);
            }
        }

        let mut attributes = vec![];
        for name in &fetch {
            let Some(attr) = ft.attribute(name) else {
                continue;
            };

            let geometry = match &attr.geometry {
                Some(descriptor) => {
                    let reproject = self.reproject(descriptor.srid, query.reproject)?;
                    columns.push(geometry::select_expr(
                        &attr.name,
                        self.codec.format(),
                        query.force_2d,
                        reproject,
                    ));
                    ret.push(self.codec.format().value_type());
                    Some(reproject.unwrap_or(descriptor.srid))
                }
                None => {
                    columns.push(Expr::column(&attr.name));
                    ret.push(attr.ty);
                    None
                }
            };

            attributes.push(Column {
                name: attr.name.clone(),
                geometry,
            });
        }

        if identity.exposed {
            for key in identity.column_names() {
                if let Some(index) = attributes.iter().position(|column| column.name == key) {
                    keys.push(index);
                }
            }
        }

        // Counting a keyless table reads no attribute at all
        if columns.is_empty() {
            columns.push(Expr::literal(1_i64));
            ret.push(Type::I64);
        }

        let mut select = Select::new(columns, self.table.clone()).filter(filter);

        for sort in &query.sort {
            select = match sort {
                SortBy::Property { name, direction } => {
                    let Some(attr) = ft.attribute(name) else {
                        return Err(Error::validation(format!(
                            "cannot sort on `{name}`: not an attribute of `{}`",
                            ft.name
                        )));
                    };
                    if attr.is_geometry() {
                        return Err(Error::validation(format!(
                            "cannot sort on geometry attribute `{name}`"
                        )));
                    }
                    select.order_by(Expr::column(name), *direction == Direction::Desc)
                }
                SortBy::Natural | SortBy::Reverse => {
                    if identity.is_volatile() {
                        return Err(Error::validation(format!(
                            "`{}` has no primary key and therefore no natural order",
                            ft.name
                        )));
                    }
                    let desc = matches!(sort, SortBy::Reverse);
                    identity
                        .column_names()
                        .fold(select, |select, key| select.order_by(Expr::column(key), desc))
                }
            };
        }

        // Without a total order, pages may overlap or skip rows
        if query.is_paginated() && !query.sorts_by_identity() {
            if identity.is_volatile() {
                tracing::warn!(
                    type_name = %ft.name,
                    "paginating a table without a primary key; page contents may shift"
                );
            } else {
                select = identity
                    .column_names()
                    .fold(select, |select, key| select.order_by(Expr::column(key), false));
            }
        }

        let (skip, max) = if split.has_residual() {
            (query.offset.unwrap_or(0), query.max)
        } else {
            select = select.offset(query.offset).limit(query.max);
            (0, None)
        };

        let properties = match &query.properties {
            Properties::All => None,
            Properties::Only(properties) => Some(properties.clone()),
        };

        Ok(Plan {
            select,
            ret,
            residual: split.residual,
            skip,
            max,
            properties,
            decoder: Decoder {
                type_name: ft.name.clone(),
                identity: identity.clone(),
                keys,
                attributes,
                geometry_name: ft.geometry().map(|attr| attr.name.clone()),
                codec: self.codec,
            },
        })
    }

    /// A `SELECT COUNT(*)` for `filter`, or `None` when the store cannot
    /// evaluate the whole filter.
    pub fn count(&self, filter: &Filter) -> Result<Option<Select>> {
        let (split, filter) = self.split(filter, false)?;
        if split.has_residual() {
            return Ok(None);
        }
        Ok(Some(
            Select::new(vec![Expr::count_star()], self.table.clone()).filter(filter),
        ))
    }

    /// Fails if `filter` reads a property the feature type does not have.
    fn check_filter(&self, filter: &Filter) -> Result<()> {
        let mut unknown = None;
        filter.visit_properties(&mut |name| {
            if unknown.is_none() && self.feature_type.attribute(name).is_none() {
                unknown = Some(name.to_string());
            }
        });

        match unknown {
            Some(name) => Err(Error::validation(format!(
                "filter reads `{name}`, which is not an attribute of `{}`",
                self.feature_type.name
            ))),
            None => Ok(()),
        }
    }

    /// The reference system to transform a geometry column into, if any.
    fn reproject(&self, column: Srid, target: Option<Srid>) -> Result<Option<Srid>> {
        let Some(target) = target.filter(|target| target.is_known()) else {
            return Ok(None);
        };

        if !column.is_known() {
            tracing::warn!(
                target = target.code(),
                "geometry column has no reference system; not reprojecting"
            );
            return Ok(None);
        }

        if column == target {
            return Ok(None);
        }

        if !self.capability.transform {
            return Err(Error::validation(format!(
                "the store cannot reproject geometries from SRID {} to SRID {}",
                column.code(),
                target.code()
            )));
        }

        Ok(Some(target))
    }
}

impl Plan {
    /// The feature type the plan reads.
    pub fn type_name(&self) -> &str {
        &self.decoder.type_name
    }

    pub fn has_residual(&self) -> bool {
        !self.residual.is_include()
    }

    /// Decodes one row of `select` into a feature with its identifier.
    pub fn decode(&self, row: Row) -> Result<Feature> {
        let decoder = &self.decoder;

        let key = decoder
            .keys
            .iter()
            .map(|index| row.get(*index).cloned().unwrap_or_default())
            .collect::<Vec<_>>();

        let offset = if decoder.identity.exposed {
            0
        } else {
            decoder.identity.columns.len()
        };

        let mut feature = Feature::with_id(decoder.identity.id_for(&decoder.type_name, &key));
        feature.geometry_name = decoder.geometry_name.clone();

        for (column, value) in decoder.attributes.iter().zip(row.into_iter().skip(offset)) {
            let value = match column.geometry {
                Some(srid) => decoder
                    .codec
                    .decode(&value, srid)?
                    .map_or(Value::Null, Value::Geometry),
                None => value,
            };
            feature.values.insert(column.name.clone(), value);
        }

        Ok(feature)
    }

    /// Trims attributes fetched only for the residual.
    pub fn finish(&self, mut feature: Feature) -> Feature {
        if let Some(properties) = &self.properties {
            feature.retain(properties);
        }
        feature
    }
}

fn push_unique<'a>(names: &mut Vec<&'a str>, name: &'a str) {
    if !names.contains(&name) {
        names.push(name);
    }
}
