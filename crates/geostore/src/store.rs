mod builder;
pub use builder::Builder;

mod config;
pub use config::{PoolConfig, StoreConfig, Timeouts};

mod connect;
pub use connect::Connect;

mod pool;
pub(crate) use pool::{Pool, PoolConnection};

mod transaction;
pub use transaction::Transaction;

use crate::{
    exec,
    extent::ExtentEstimator,
    introspect::Introspector,
    listener::{EventKind, FeatureEvent, FeatureListener, Listeners},
    lock::{Authorizations, BatchResult, FeatureLock, LockManager, LockOwner, TransactionId},
    plan::Planner,
    reader::{self, FeatureStream},
    writer::Writer,
};

use geostore_core::{
    driver::{self, Capability},
    err,
    geom::GeometryCodec,
    BoundingBox, Connection, Error, Feature, FeatureId, FeatureType, Filter, Query, Result, Type,
    Value,
};
use geostore_sql::{ddl, Serializer};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::OwnedMutexGuard;

/// Shared state between all `Store` clones and their transactions.
pub(crate) struct Shared {
    pub(crate) pool: Pool,
    pub(crate) config: StoreConfig,
    codec: GeometryCodec,

    /// Feature types described so far, by name.
    schemas: Mutex<HashMap<String, Arc<FeatureType>>>,

    pub(crate) locks: LockManager,
    pub(crate) listeners: Listeners,
    next_transaction: AtomicU64,
}

/// The connection a read holds for its lifetime.
pub(crate) enum ConnectionRef {
    /// Borrowed from the pool, returned when the read ends.
    Pooled(PoolConnection),

    /// The connection of a transaction. Other operations of the
    /// transaction wait until the read ends.
    Transaction(OwnedMutexGuard<PoolConnection>),
}

/// Handle to a spatial feature store.
///
/// Cloning is cheap; clones share the connection pool, the schema cache,
/// the lock table and the listeners. Every operation borrows a connection
/// for its own duration and, for writes, runs in its own database
/// transaction. Use [`Store::begin`] to group operations.
#[derive(Clone)]
pub struct Store {
    pub(crate) shared: Arc<Shared>,
}

impl ConnectionRef {
    pub(crate) fn get(&mut self) -> &mut dyn Connection {
        match self {
            ConnectionRef::Pooled(connection) => &mut ***connection,
            ConnectionRef::Transaction(guard) => &mut ****guard,
        }
    }
}

impl Store {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Opens a store with default settings plus those in the URL's query.
    pub async fn connect(url: &str) -> Result<Store> {
        Store::builder().connect(url).await
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    pub fn capability(&self) -> &'static Capability {
        self.shared.pool.capability()
    }

    /// The lock table of this store.
    pub fn locks(&self) -> &LockManager {
        &self.shared.locks
    }

    /// Names of the feature types in the store.
    pub async fn type_names(&self) -> Result<Vec<String>> {
        let mut connection = self.shared.pool.get().await?;
        self.shared
            .introspector()
            .type_names(&mut **connection)
            .await
    }

    /// Describes feature type `type_name`. Descriptions are cached for the
    /// life of the store.
    pub async fn schema(&self, type_name: &str) -> Result<Arc<FeatureType>> {
        if let Some(feature_type) = self.shared.cached(type_name) {
            return Ok(feature_type);
        }

        let mut connection = self.shared.pool.get().await?;
        self.shared.feature_type(&mut **connection, type_name).await
    }

    /// Creates the table of `feature_type` and registers its geometry
    /// column.
    ///
    /// Fails with a schema error if the table already exists. All
    /// statements run in one transaction.
    pub async fn create_schema(&self, feature_type: &FeatureType) -> Result<()> {
        let shared = &self.shared;
        let introspector = shared.introspector();

        let mut connection = shared.pool.get().await?;
        let connection: &mut dyn Connection = &mut **connection;

        let existing = introspector.type_names(&mut *connection).await?;
        if existing.iter().any(|name| *name == feature_type.name) {
            return Err(Error::schema(format!(
                "cannot create `{}`: the table already exists",
                feature_type.name
            )));
        }

        let stmts = ddl::create_feature_type(
            feature_type,
            introspector.table_name(&feature_type.name),
            self.capability(),
        )?;

        begin(&mut *connection).await?;
        let mut result = Ok(());
        for stmt in stmts {
            if let Err(err) = exec::execute(&mut *connection, shared.serializer(), stmt).await {
                result = Err(err);
                break;
            }
        }
        finish(connection, result)
            .await
            .map_err(|err| err.context(err!("create schema `{}`", feature_type.name)))?;

        // Described again on first use, with what the database reports
        shared.forget(&feature_type.name);
        Ok(())
    }

    /// Streams the features matching `query`.
    ///
    /// The stream holds a pooled connection until it finishes or is
    /// dropped.
    pub async fn features(&self, query: Query) -> Result<FeatureStream> {
        let feature_type = self.schema(&query.type_name).await?;
        let plan = self
            .shared
            .planner(&feature_type)
            .plan(&query)
            .map_err(|err| err.context(err!("query `{}`", query.type_name)))?;

        let connection = self.shared.pool.get().await?;
        Ok(FeatureStream::new(
            ConnectionRef::Pooled(connection),
            self.shared.serializer(),
            plan,
        ))
    }

    /// Number of features matching `query`.
    pub async fn count(&self, query: Query) -> Result<u64> {
        let feature_type = self.schema(&query.type_name).await?;
        let mut connection = self.shared.pool.get().await?;
        self.shared
            .count(&mut **connection, &feature_type, &query)
            .await
            .map_err(|err| err.context(err!("count `{}`", query.type_name)))
    }

    /// Bounds of the features matching `query`, in the geometry column's
    /// reference system.
    ///
    /// `None` when they cannot be computed without reading every feature;
    /// callers fall back to a full read or treat the bounds as unknown.
    pub async fn bounds(&self, query: Query) -> Result<Option<BoundingBox>> {
        let feature_type = self.schema(&query.type_name).await?;
        let mut connection = self.shared.pool.get().await?;
        self.shared
            .bounds(&mut **connection, &feature_type, &query.filter)
            .await
            .map_err(|err| err.context(err!("bounds of `{}`", query.type_name)))
    }

    /// Inserts `features` and returns their identifiers, in order.
    ///
    /// Either every feature is inserted or none is.
    pub async fn insert(&self, type_name: &str, features: Vec<Feature>) -> Result<Vec<FeatureId>> {
        let feature_type = self.schema(type_name).await?;
        let authorizations = Authorizations::new();
        let writer = self.shared.writer(&feature_type, &authorizations);

        let mut connection = self.shared.pool.get().await?;
        let connection: &mut dyn Connection = &mut **connection;

        begin(&mut *connection).await?;
        let result = writer.insert(&mut *connection, features).await;
        let written = finish(connection, result)
            .await
            .map_err(|err| err.context(err!("insert into `{type_name}`")))?;

        self.shared.notify(
            type_name,
            None,
            EventKind::Added,
            written.value.len() as u64,
            written.bounds,
        );
        Ok(written.value)
    }

    /// Sets `assignments` on every feature matching `filter` and returns
    /// how many were updated.
    pub async fn update(
        &self,
        type_name: &str,
        filter: Filter,
        assignments: Vec<(String, Value)>,
    ) -> Result<u64> {
        let feature_type = self.schema(type_name).await?;
        let authorizations = Authorizations::new();
        let writer = self.shared.writer(&feature_type, &authorizations);

        let mut connection = self.shared.pool.get().await?;
        let connection: &mut dyn Connection = &mut **connection;

        begin(&mut *connection).await?;
        let result = writer.update(&mut *connection, &filter, assignments).await;
        let written = finish(connection, result)
            .await
            .map_err(|err| err.context(err!("update `{type_name}`")))?;

        self.shared
            .notify(type_name, None, EventKind::Changed, written.value, written.bounds);
        Ok(written.value)
    }

    /// Deletes every feature matching `filter` and returns how many were
    /// deleted.
    pub async fn delete(&self, type_name: &str, filter: Filter) -> Result<u64> {
        let feature_type = self.schema(type_name).await?;
        let authorizations = Authorizations::new();
        let writer = self.shared.writer(&feature_type, &authorizations);

        let mut connection = self.shared.pool.get().await?;
        let connection: &mut dyn Connection = &mut **connection;

        begin(&mut *connection).await?;
        let result = writer.delete(&mut *connection, &filter).await;
        let written = finish(connection, result)
            .await
            .map_err(|err| err.context(err!("delete from `{type_name}`")))?;

        self.shared
            .notify(type_name, None, EventKind::Removed, written.value, written.bounds);
        Ok(written.value)
    }

    /// Updates exactly one feature. Fails with a write conflict if `id`
    /// matches no row.
    pub async fn update_by_id(
        &self,
        type_name: &str,
        id: FeatureId,
        assignments: Vec<(String, Value)>,
    ) -> Result<()> {
        let count = self
            .update(type_name, Filter::ids([id.clone()]), assignments)
            .await?;
        expect_one(&id, count)
    }

    /// Deletes exactly one feature. Fails with a write conflict if `id`
    /// matches no row.
    pub async fn delete_by_id(&self, type_name: &str, id: FeatureId) -> Result<()> {
        let count = self.delete(type_name, Filter::ids([id.clone()])).await?;
        expect_one(&id, count)
    }

    /// Locks the features matching `filter`.
    ///
    /// Features locked by someone else are skipped and listed in the
    /// result. Outside a transaction only token locks can be taken.
    pub async fn lock(&self, type_name: &str, filter: Filter, lock: &FeatureLock) -> Result<BatchResult> {
        let feature_type = self.schema(type_name).await?;
        let mut connection = self.shared.pool.get().await?;
        self.shared
            .lock(&mut **connection, &feature_type, &filter, lock, None)
            .await
            .map_err(|err| err.context(err!("lock `{type_name}`")))
    }

    /// Unlocks the features matching `filter` held by `owner`.
    ///
    /// Fails with an authorization error, unlocking nothing, if one of them
    /// is held by another owner.
    pub async fn unlock(&self, type_name: &str, filter: Filter, owner: &LockOwner) -> Result<BatchResult> {
        let feature_type = self.schema(type_name).await?;
        let mut connection = self.shared.pool.get().await?;
        self.shared
            .unlock(&mut **connection, &feature_type, &filter, owner)
            .await
            .map_err(|err| err.context(err!("unlock `{type_name}`")))
    }

    /// Extends every lock of `token`. Returns how many were extended.
    pub fn refresh_lock(&self, token: &str) -> Result<usize> {
        self.shared.locks.refresh(token)
    }

    /// Releases every lock of `token`. Returns how many were released.
    pub fn release_lock(&self, token: &str) -> usize {
        self.shared.locks.release(token)
    }

    /// Starts a transaction on a dedicated connection.
    pub async fn begin(&self) -> Result<Transaction> {
        Transaction::begin(self.shared.clone()).await
    }

    /// Registers `listener` for every successful write through this store.
    pub fn add_listener(&self, listener: impl FeatureListener) {
        self.shared.listeners.add(Arc::new(listener));
    }
}

impl Shared {
    fn new(pool: Pool, config: StoreConfig) -> Shared {
        Shared {
            pool,
            codec: GeometryCodec::new(config.wire_format),
            config,
            schemas: Mutex::new(HashMap::new()),
            locks: LockManager::new(),
            listeners: Listeners::default(),
            next_transaction: AtomicU64::new(1),
        }
    }

    pub(crate) fn capability(&self) -> &'static Capability {
        self.pool.capability()
    }

    pub(crate) fn serializer(&self) -> Serializer {
        Serializer::for_capability(self.capability())
    }

    pub(crate) fn introspector(&self) -> Introspector<'_> {
        Introspector::new(self.capability())
            .schema(self.config.schema.as_deref())
            .qualify_tables(self.config.qualify_tables)
            .expose_primary_keys(self.config.expose_primary_keys)
    }

    pub(crate) fn planner<'a>(&'a self, feature_type: &'a FeatureType) -> Planner<'a> {
        Planner::new(feature_type, self.capability())
            .table(self.introspector().table_name(&feature_type.name))
            .codec(self.codec)
            .loose_bbox(self.config.loose_bbox)
    }

    pub(crate) fn writer<'a>(
        &'a self,
        feature_type: &'a FeatureType,
        authorizations: &'a Authorizations,
    ) -> Writer<'a> {
        Writer::new(self.planner(feature_type), &self.locks, authorizations)
            .track_bounds(!self.listeners.is_empty())
    }

    pub(crate) fn next_transaction(&self) -> TransactionId {
        TransactionId(self.next_transaction.fetch_add(1, Ordering::Relaxed))
    }

    fn cached(&self, type_name: &str) -> Option<Arc<FeatureType>> {
        self.schemas().get(type_name).cloned()
    }

    fn forget(&self, type_name: &str) {
        self.schemas().remove(type_name);
    }

    fn schemas(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<FeatureType>>> {
        self.schemas
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached description of `type_name`, read on `connection` the first
    /// time.
    pub(crate) async fn feature_type(
        &self,
        connection: &mut dyn Connection,
        type_name: &str,
    ) -> Result<Arc<FeatureType>> {
        if let Some(feature_type) = self.cached(type_name) {
            return Ok(feature_type);
        }

        let feature_type = Arc::new(
            self.introspector()
                .describe(connection, type_name)
                .await
                .map_err(|err| err.context(err!("describe `{type_name}`")))?,
        );
        tracing::debug!(
            type_name,
            attributes = feature_type.attributes.len(),
            strategy = ?feature_type.identity.strategy,
            "described feature type"
        );

        // A concurrent describe may have won; both results are equal
        Ok(self
            .schemas()
            .entry(type_name.to_string())
            .or_insert(feature_type)
            .clone())
    }

    pub(crate) async fn count(
        &self,
        connection: &mut dyn Connection,
        feature_type: &FeatureType,
        query: &Query,
    ) -> Result<u64> {
        let planner = self.planner(feature_type);

        if !query.is_paginated() {
            if let Some(select) = planner.count(&query.filter)? {
                let count = exec::query_all(connection, self.serializer(), select, &[Type::I64])
                    .await?
                    .into_iter()
                    .next()
                    .and_then(|row| row.into_iter().next())
                    .and_then(|value| value.as_i64())
                    .ok_or_else(|| Error::read(err!("COUNT(*) returned no row")))?;
                return Ok(count.max(0) as u64);
            }
        }

        let plan = planner.plan(&query.clone().properties(Vec::<String>::new()))?;
        let mut count = 0;
        reader::for_each(connection, self.serializer(), &plan, |_| count += 1).await?;
        Ok(count)
    }

    pub(crate) async fn bounds(
        &self,
        connection: &mut dyn Connection,
        feature_type: &FeatureType,
        filter: &Filter,
    ) -> Result<Option<BoundingBox>> {
        ExtentEstimator::new(self.planner(feature_type))
            .estimated(self.config.estimated_extent)
            .extent(connection, filter)
            .await
    }

    pub(crate) async fn lock(
        &self,
        connection: &mut dyn Connection,
        feature_type: &FeatureType,
        filter: &Filter,
        lock: &FeatureLock,
        transaction: Option<TransactionId>,
    ) -> Result<BatchResult> {
        let (owner, duration) = match lock {
            FeatureLock::Transaction => match transaction {
                Some(id) => (LockOwner::Transaction(id), None),
                None => {
                    return Err(Error::validation(
                        "transaction locks can only be taken inside a transaction",
                    ))
                }
            },
            FeatureLock::Token { token, duration } => {
                (LockOwner::Token(token.clone()), Some(*duration))
            }
        };

        let ids = self.lockable_ids(connection, feature_type, filter).await?;
        Ok(self.locks.lock(ids, &owner, duration))
    }

    pub(crate) async fn unlock(
        &self,
        connection: &mut dyn Connection,
        feature_type: &FeatureType,
        filter: &Filter,
        owner: &LockOwner,
    ) -> Result<BatchResult> {
        let ids = self.lockable_ids(connection, feature_type, filter).await?;
        self.locks.unlock(ids, owner)
    }

    async fn lockable_ids(
        &self,
        connection: &mut dyn Connection,
        feature_type: &FeatureType,
        filter: &Filter,
    ) -> Result<Vec<FeatureId>> {
        if feature_type.identity.is_volatile() {
            return Err(Error::validation(format!(
                "`{}` has no primary key; its features cannot be locked",
                feature_type.name
            )));
        }

        let authorizations = Authorizations::new();
        self.writer(feature_type, &authorizations)
            .ids(connection, filter)
            .await
    }

    /// Tells the listeners about a write. Writes that touched nothing are
    /// not reported.
    pub(crate) fn notify(
        &self,
        type_name: &str,
        transaction: Option<TransactionId>,
        kind: EventKind,
        count: u64,
        bounds: Option<BoundingBox>,
    ) {
        if count == 0 || self.listeners.is_empty() {
            return;
        }

        self.listeners.fire(FeatureEvent {
            type_name: type_name.to_string(),
            transaction,
            kind,
            bounds,
            count,
        });
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("capability", &self.capability().dialect)
            .field("config", &self.shared.config)
            .field("listeners", &self.shared.listeners)
            .finish()
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("pool", &self.pool)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn begin(connection: &mut dyn Connection) -> Result<()> {
    connection.exec(driver::Transaction::Start.into()).await?;
    Ok(())
}

/// Commits if `result` is a success, rolls back otherwise.
async fn finish<T>(connection: &mut dyn Connection, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            connection.exec(driver::Transaction::Commit.into()).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = connection.exec(driver::Transaction::Rollback.into()).await {
                tracing::warn!(%rollback, "rollback failed");
            }
            Err(err)
        }
    }
}

pub(crate) fn expect_one(id: &FeatureId, count: u64) -> Result<()> {
    match count {
        1 => Ok(()),
        0 => Err(Error::write_conflict(format!("feature `{id}` does not exist"))),
        count => Err(Error::write_conflict(format!(
            "feature id `{id}` matched {count} rows"
        ))),
    }
}
