use super::{expect_one, ConnectionRef, PoolConnection, Shared};
use crate::{
    listener::EventKind,
    lock::{Authorizations, BatchResult, FeatureLock, LockOwner, TransactionId},
    reader::FeatureStream,
};

use geostore_core::{
    driver::Transaction as TransactionOp, err, BoundingBox, Connection, Feature, FeatureId,
    FeatureType, Filter, Query, Result, Value,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// A database transaction on one dedicated connection.
///
/// Operations see the transaction's own uncommitted writes. Feature streams
/// borrow the connection; finish or drop a stream before issuing the next
/// operation, or that operation waits for it.
///
/// Dropping a transaction without [`commit`](Transaction::commit) discards
/// its writes: the connection is rolled back before the pool hands it out
/// again. Either way the transaction's locks are released.
pub struct Transaction {
    shared: Arc<Shared>,
    connection: Arc<Mutex<PoolConnection>>,
    id: TransactionId,
    authorizations: Authorizations,
    finished: bool,
}

impl Transaction {
    pub(super) async fn begin(shared: Arc<Shared>) -> Result<Transaction> {
        let mut connection = shared.pool.get().await?;
        connection.exec(TransactionOp::Start.into()).await?;

        let id = shared.next_transaction();
        tracing::debug!(transaction = ?id, "begin");

        Ok(Transaction {
            shared,
            connection: Arc::new(Mutex::new(connection)),
            authorizations: Authorizations::for_transaction(id),
            id,
            finished: false,
        })
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Allows writes to features locked with `token`.
    pub fn add_authorization(&mut self, token: impl Into<String>) {
        self.authorizations.tokens.insert(token.into());
    }

    pub async fn schema(&self, type_name: &str) -> Result<Arc<FeatureType>> {
        let mut connection = self.connection().await;
        self.shared.feature_type(&mut ***connection, type_name).await
    }

    /// Streams the features matching `query`, including uncommitted
    /// changes of this transaction.
    pub async fn features(&self, query: Query) -> Result<FeatureStream> {
        let feature_type = self.schema(&query.type_name).await?;
        let plan = self
            .shared
            .planner(&feature_type)
            .plan(&query)
            .map_err(|err| err.context(err!("query `{}`", query.type_name)))?;

        let connection = self.connection.clone().lock_owned().await;
        Ok(FeatureStream::new(
            ConnectionRef::Transaction(connection),
            self.shared.serializer(),
            plan,
        ))
    }

    pub async fn count(&self, query: Query) -> Result<u64> {
        let feature_type = self.schema(&query.type_name).await?;
        let mut connection = self.connection().await;
        self.shared
            .count(&mut ***connection, &feature_type, &query)
            .await
            .map_err(|err| err.context(err!("count `{}`", query.type_name)))
    }

    pub async fn bounds(&self, query: Query) -> Result<Option<BoundingBox>> {
        let feature_type = self.schema(&query.type_name).await?;
        let mut connection = self.connection().await;
        self.shared
            .bounds(&mut ***connection, &feature_type, &query.filter)
            .await
            .map_err(|err| err.context(err!("bounds of `{}`", query.type_name)))
    }

    pub async fn insert(&self, type_name: &str, features: Vec<Feature>) -> Result<Vec<FeatureId>> {
        let feature_type = self.schema(type_name).await?;
        let mut connection = self.connection().await;

        let written = self
            .shared
            .writer(&feature_type, &self.authorizations)
            .insert(&mut ***connection, features)
            .await
            .map_err(|err| err.context(err!("insert into `{type_name}`")))?;

        self.notify(type_name, EventKind::Added, written.value.len() as u64, written.bounds);
        Ok(written.value)
    }

    pub async fn update(
        &self,
        type_name: &str,
        filter: Filter,
        assignments: Vec<(String, Value)>,
    ) -> Result<u64> {
        let feature_type = self.schema(type_name).await?;
        let mut connection = self.connection().await;

        let written = self
            .shared
            .writer(&feature_type, &self.authorizations)
            .update(&mut ***connection, &filter, assignments)
            .await
            .map_err(|err| err.context(err!("update `{type_name}`")))?;

        self.notify(type_name, EventKind::Changed, written.value, written.bounds);
        Ok(written.value)
    }

    pub async fn delete(&self, type_name: &str, filter: Filter) -> Result<u64> {
        let feature_type = self.schema(type_name).await?;
        let mut connection = self.connection().await;

        let written = self
            .shared
            .writer(&feature_type, &self.authorizations)
            .delete(&mut ***connection, &filter)
            .await
            .map_err(|err| err.context(err!("delete from `{type_name}`")))?;

        self.notify(type_name, EventKind::Removed, written.value, written.bounds);
        Ok(written.value)
    }

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

    pub async fn delete_by_id(&self, type_name: &str, id: FeatureId) -> Result<()> {
        let count = self.delete(type_name, Filter::ids([id.clone()])).await?;
        expect_one(&id, count)
    }

    /// Locks the features matching `filter`. [`FeatureLock::Transaction`]
    /// locks end with this transaction.
    pub async fn lock(&self, type_name: &str, filter: Filter, lock: &FeatureLock) -> Result<BatchResult> {
        let feature_type = self.schema(type_name).await?;
        let mut connection = self.connection().await;
        self.shared
            .lock(&mut ***connection, &feature_type, &filter, lock, Some(self.id))
            .await
            .map_err(|err| err.context(err!("lock `{type_name}`")))
    }

    pub async fn unlock(&self, type_name: &str, filter: Filter, owner: &LockOwner) -> Result<BatchResult> {
        let feature_type = self.schema(type_name).await?;
        let mut connection = self.connection().await;
        self.shared
            .unlock(&mut ***connection, &feature_type, &filter, owner)
            .await
            .map_err(|err| err.context(err!("unlock `{type_name}`")))
    }

    pub async fn commit(mut self) -> Result<()> {
        self.finish(TransactionOp::Commit).await
    }

    pub async fn rollback(mut self) -> Result<()> {
        self.finish(TransactionOp::Rollback).await
    }

    async fn finish(&mut self, op: TransactionOp) -> Result<()> {
        tracing::debug!(transaction = ?self.id, ?op, "finish");
        self.finished = true;

        let result = self.connection().await.exec(op.into()).await;
        self.shared.locks.release_transaction(self.id);
        result.map(|_| ())
    }

    async fn connection(&self) -> MutexGuard<'_, PoolConnection> {
        self.connection.lock().await
    }

    fn notify(&self, type_name: &str, kind: EventKind, count: u64, bounds: Option<BoundingBox>) {
        self.shared
            .notify(type_name, Some(self.id), kind, count, bounds);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(transaction = ?self.id, "dropped without commit; rolling back");
            self.shared.locks.release_transaction(self.id);
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
