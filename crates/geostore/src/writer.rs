//! Inserts, updates and deletes features.
//!
//! Updates and deletes whose filter the store cannot fully evaluate run in
//! two phases: the matching identifiers are read first, then the statement
//! is issued against that identifier set. The same happens while any
//! feature of the type is locked, so every touched row can be checked
//! against the lock table first. The two phases are not atomic; what
//! happens to rows changed in between depends on the store's isolation
//! level.

use crate::{
    exec,
    extent::ExtentEstimator,
    listener,
    lock::{Authorizations, LockManager},
    plan::Planner,
    reader,
};

use geostore_core::{
    schema::{AttributeDescriptor, KeyColumn, KeyStrategy},
    BoundingBox, Connection, Error, Feature, FeatureId, Filter, Query, Result, Value,
};
use geostore_sql::{
    geometry,
    stmt::{Delete, Expr, Insert, Select, Update},
    Serializer,
};

/// Writes the features of one type.
#[derive(Debug)]
pub(crate) struct Writer<'a> {
    planner: Planner<'a>,
    locks: &'a LockManager,
    authorizations: &'a Authorizations,
    track_bounds: bool,
}

/// What a write did.
#[derive(Debug)]
pub(crate) struct Written<T> {
    pub(crate) value: T,

    /// Bounds of the touched geometries. Only computed when asked for.
    pub(crate) bounds: Option<BoundingBox>,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(
        planner: Planner<'a>,
        locks: &'a LockManager,
        authorizations: &'a Authorizations,
    ) -> Writer<'a> {
        Writer {
            planner,
            locks,
            authorizations,
            track_bounds: false,
        }
    }

    /// Computes the bounds of the touched geometries. Costs an extra
    /// aggregate per update or delete.
    pub(crate) fn track_bounds(mut self, track_bounds: bool) -> Writer<'a> {
        self.track_bounds = track_bounds;
        self
    }

    /// Inserts `features` one statement at a time and returns their new
    /// identifiers, in order.
    pub(crate) async fn insert(
        &self,
        connection: &mut dyn Connection,
        features: Vec<Feature>,
    ) -> Result<Written<Vec<FeatureId>>> {
        let mut ids = Vec::with_capacity(features.len());
        let mut bounds = None;

        for feature in features {
            if self.track_bounds {
                let geometry = feature
                    .default_geometry()
                    .and_then(Value::as_geometry)
                    .and_then(|value| value.bounding_box());
                bounds = listener::union(bounds, geometry);
            }
            ids.push(self.insert_one(&mut *connection, feature).await?);
        }

        Ok(Written { value: ids, bounds })
    }

    async fn insert_one(&self, connection: &mut dyn Connection, feature: Feature) -> Result<FeatureId> {
        let ft = self.planner.feature_type();
        let identity = &ft.identity;
        ft.check_properties(feature.values.keys().map(String::as_str))?;

        let mut columns = vec![];
        let mut values = vec![];

        // Assigned keys are chosen here, other keys only go in when the
        // caller set them as attributes.
        let assigned = match identity.strategy {
            KeyStrategy::Assigned => {
                let key = self.assign_key(&mut *connection, &feature).await?;
                for (column, value) in identity.columns.iter().zip(&key) {
                    columns.push(column.name.clone());
                    values.push(Expr::typed_value(value.clone(), column.ty));
                }
                Some(key)
            }
            _ => None,
        };

        for attr in &ft.attributes {
            if assigned.is_some() && identity.is_key_column(&attr.name) {
                continue;
            }
            let Some(value) = feature.get(&attr.name) else {
                continue;
            };
            if value.is_null() && identity.is_key_column(&attr.name) {
                continue;
            }
            columns.push(attr.name.clone());
            values.push(self.value_expr(attr, value)?);
        }

        let auto = identity.strategy == KeyStrategy::AutoGenerated;
        let returning = if auto && self.capability().returning {
            identity.column_names().map(Expr::column).collect()
        } else {
            vec![]
        };

        let stmt = Insert {
            table: self.planner.table_name().clone(),
            columns,
            values,
            returning,
        };

        let id = match (identity.strategy, assigned) {
            (KeyStrategy::Assigned, Some(key)) => {
                exec::execute(&mut *connection, self.serializer(), stmt).await?;
                identity.id_for(&ft.name, &key)
            }
            (KeyStrategy::AutoGenerated, _) if !stmt.returning.is_empty() => {
                let ret = key_types(&identity.columns);
                let row = exec::query_all(&mut *connection, self.serializer(), stmt, &ret)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::read(geostore_core::err!("insert returned no key")))?;
                identity.id_for(&ft.name, &row)
            }
            (KeyStrategy::AutoGenerated, _) => {
                exec::execute(&mut *connection, self.serializer(), stmt).await?;
                let key = self.last_insert_id(&mut *connection).await?;
                identity.id_for(&ft.name, &key)
            }
            _ => {
                exec::execute(&mut *connection, self.serializer(), stmt).await?;
                FeatureId::volatile(&ft.name)
            }
        };

        tracing::trace!(%id, "inserted feature");
        Ok(id)
    }

    /// Sets `assignments` on every feature matching `filter`. Returns the
    /// number of updated rows.
    pub(crate) async fn update(
        &self,
        connection: &mut dyn Connection,
        filter: &Filter,
        assignments: Vec<(String, Value)>,
    ) -> Result<Written<u64>> {
        let ft = self.planner.feature_type();

        let mut exprs = Vec::with_capacity(assignments.len());
        let mut new_bounds = None;
        for (name, value) in &assignments {
            let Some(attr) = ft.attribute(name) else {
                return Err(Error::validation(format!(
                    "cannot update `{name}`: not an attribute of `{}`",
                    ft.name
                )));
            };
            if ft.identity.is_key_column(name) {
                return Err(Error::validation(format!(
                    "cannot update key column `{name}` of `{}`",
                    ft.name
                )));
            }
            if attr.is_geometry() {
                new_bounds = listener::union(
                    new_bounds,
                    value.as_geometry().and_then(|value| value.bounding_box()),
                );
            }
            exprs.push((name.clone(), self.value_expr(attr, value)?));
        }

        if exprs.is_empty() {
            return Ok(Written {
                value: 0,
                bounds: None,
            });
        }

        let Some(target) = self.target(&mut *connection, filter).await? else {
            return Ok(Written {
                value: 0,
                bounds: None,
            });
        };

        let bounds = if self.track_bounds {
            let before = self.bounds(&mut *connection, target.clone()).await?;
            listener::union(before, new_bounds)
        } else {
            None
        };

        let count = exec::execute(
            connection,
            self.serializer(),
            Update {
                table: self.planner.table_name().clone(),
                assignments: exprs,
                filter: target,
            },
        )
        .await?;

        Ok(Written {
            value: count,
            bounds,
        })
    }

    /// Deletes every feature matching `filter`. Returns the number of
    /// deleted rows.
    pub(crate) async fn delete(
        &self,
        connection: &mut dyn Connection,
        filter: &Filter,
    ) -> Result<Written<u64>> {
        let Some(target) = self.target(&mut *connection, filter).await? else {
            return Ok(Written {
                value: 0,
                bounds: None,
            });
        };

        let bounds = if self.track_bounds {
            self.bounds(&mut *connection, target.clone()).await?
        } else {
            None
        };

        let count = exec::execute(
            connection,
            self.serializer(),
            Delete {
                from: self.planner.table_name().clone(),
                filter: target,
            },
        )
        .await?;

        Ok(Written {
            value: count,
            bounds,
        })
    }

    /// Identifiers of the features matching `filter`.
    pub(crate) async fn ids(
        &self,
        connection: &mut dyn Connection,
        filter: &Filter,
    ) -> Result<Vec<FeatureId>> {
        let ft = self.planner.feature_type();
        let query = Query::new(&ft.name)
            .filter(filter.clone())
            .properties(Vec::<String>::new());
        let plan = self.planner.plan(&query)?;

        let mut ids = vec![];
        reader::for_each(connection, self.serializer(), &plan, |feature| {
            ids.extend(feature.id)
        })
        .await?;

        Ok(ids)
    }

    /// The `WHERE` clause a mutation runs with. `None` when nothing can
    /// match, in which case no statement is issued.
    async fn target(
        &self,
        connection: &mut dyn Connection,
        filter: &Filter,
    ) -> Result<Option<Option<Expr>>> {
        let ft = self.planner.feature_type();
        let (split, expr) = self.planner.split(filter, false)?;

        if filter.is_exclude() {
            return Ok(None);
        }

        if !split.has_residual() && !self.locks.has_locks(&ft.name) {
            return Ok(Some(expr));
        }

        if ft.identity.is_volatile() {
            return Err(Error::validation(format!(
                "`{}` has no primary key; the store must evaluate the whole filter of a write",
                ft.name
            )));
        }

        let ids = self.ids(&mut *connection, filter).await?;
        tracing::debug!(
            type_name = %ft.name,
            ids = ids.len(),
            residual = split.has_residual(),
            "resolved write to identifiers"
        );

        for id in &ids {
            self.locks.assert_access(id, self.authorizations)?;
        }

        if ids.is_empty() {
            return Ok(None);
        }

        let (_, expr) = self.planner.split(&Filter::ids(ids), false)?;
        Ok(Some(expr))
    }

    async fn bounds(
        &self,
        connection: &mut dyn Connection,
        target: Option<Expr>,
    ) -> Result<Option<BoundingBox>> {
        ExtentEstimator::new(self.planner.clone())
            .exact(connection, target)
            .await
    }

    /// Key values for a new row of a type with assigned keys: the caller's
    /// identifier, else exposed key attributes, else generated.
    async fn assign_key(&self, connection: &mut dyn Connection, feature: &Feature) -> Result<Vec<Value>> {
        let ft = self.planner.feature_type();
        let identity = &ft.identity;

        if let Some(id) = feature.id.as_ref().filter(|id| !id.is_volatile()) {
            return identity.key_values(&ft.name, id);
        }

        let supplied = identity
            .columns
            .iter()
            .map(|column| match feature.get(&column.name) {
                Some(value) if !value.is_null() => value.clone().cast(column.ty).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Option<Vec<_>>>>()?;
        if let Some(key) = supplied {
            return Ok(key);
        }

        let [column] = identity.columns.as_slice() else {
            return Err(Error::validation(format!(
                "`{}` has a composite key; new features need an identifier",
                ft.name
            )));
        };

        let value = if column.ty.is_integer() {
            let max = exec::query_all(
                connection,
                self.serializer(),
                Select::new(
                    vec![Expr::func("MAX", [Expr::column(&column.name)])],
                    self.planner.table_name().clone(),
                ),
                &[column.ty],
            )
            .await?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .and_then(|value| value.as_i64())
            .unwrap_or(0);

            Value::I64(max + 1).cast(column.ty)?
        } else {
            Value::String(uuid::Uuid::new_v4().to_string()).cast(column.ty)?
        };

        Ok(vec![value])
    }

    async fn last_insert_id(&self, connection: &mut dyn Connection) -> Result<Vec<Value>> {
        let ft = self.planner.feature_type();
        let Some(sql) = self.capability().last_insert_id else {
            return Err(Error::validation(format!(
                "the store reports no generated keys; cannot identify new `{}` features",
                ft.name
            )));
        };

        let ret = key_types(&ft.identity.columns);
        let response = connection
            .exec(
                geostore_core::driver::QuerySql {
                    sql: sql.to_string(),
                    params: vec![],
                    ret: Some(ret),
                }
                .into(),
            )
            .await?;

        response
            .rows
            .collect()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::read(geostore_core::err!("no generated key after insert")))
    }

    /// The expression writing `value` into `attr`.
    fn value_expr(&self, attr: &AttributeDescriptor, value: &Value) -> Result<Expr> {
        let Some(descriptor) = &attr.geometry else {
            return Ok(Expr::typed_value(value.clone().cast(attr.ty)?, attr.ty));
        };

        let geometry = match value {
            Value::Null => None,
            Value::Geometry(geometry) => Some(geometry),
            other => {
                return Err(Error::validation(format!(
                    "attribute `{}` takes a geometry, got {other:?}",
                    attr.name
                )))
            }
        };

        geometry::insert_expr(geometry, descriptor, self.planner.geometry_codec(), self.capability())
    }

    fn capability(&self) -> &'static geostore_core::driver::Capability {
        self.planner.capability()
    }

    fn serializer(&self) -> Serializer {
        Serializer::for_capability(self.capability())
    }
}

fn key_types(columns: &[KeyColumn]) -> Vec<geostore_core::Type> {
    columns.iter().map(|column| column.ty).collect()
}
