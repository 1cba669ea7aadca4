//! Connection pooling for database connections.

use super::PoolConfig;

use geostore_core::{
    driver::{Capability, Driver, Transaction},
    Connection, Error, Result,
};
use std::ops::{Deref, DerefMut};

/// A connection pool that manages database connections.
#[derive(Debug)]
pub(crate) struct Pool {
    inner: deadpool::managed::Pool<Manager>,
    capability: &'static Capability,
}

impl Pool {
    /// Creates a pool for `driver` and opens the configured minimum of
    /// connections.
    pub(crate) async fn new(driver: Box<dyn Driver>, config: &PoolConfig) -> Result<Pool> {
        let capability = driver.capability();
        let max_size = config.max_size(driver.max_connections());

        let inner = deadpool::managed::Pool::builder(Manager {
            driver,
            validate_on_borrow: config.validate_on_borrow,
        })
        .runtime(deadpool::Runtime::Tokio1)
        .max_size(max_size)
        .timeouts(config.timeouts)
        .build()
        .map_err(Error::connectivity)?;

        let pool = Pool { inner, capability };

        let mut warm = Vec::with_capacity(config.min_connections);
        for _ in 0..config.min_connections.min(max_size) {
            warm.push(pool.get().await?);
        }
        tracing::debug!(max_size, warm = warm.len(), "connection pool ready");

        Ok(pool)
    }

    /// Retrieves a connection from the pool.
    pub(crate) async fn get(&self) -> Result<PoolConnection> {
        let connection = self.inner.get().await.map_err(|err| match err {
            deadpool::managed::PoolError::Backend(err) => err,
            err => Error::connectivity(err),
        })?;
        Ok(PoolConnection { inner: connection })
    }

    /// Returns the database driver's capabilities.
    pub(crate) fn capability(&self) -> &'static Capability {
        self.capability
    }
}

#[derive(Debug)]
struct Manager {
    driver: Box<dyn Driver>,
    validate_on_borrow: bool,
}

impl deadpool::managed::Manager for Manager {
    type Type = Box<dyn Connection>;
    type Error = Error;

    async fn create(&self) -> Result<Self::Type> {
        tracing::debug!(url = %self.driver.url(), "opening connection");
        self.driver.connect().await
    }

    async fn recycle(
        &self,
        obj: &mut Self::Type,
        _metrics: &deadpool::managed::Metrics,
    ) -> deadpool::managed::RecycleResult<Self::Error> {
        // A transaction handle dropped without commit or rollback
        if obj.in_transaction() {
            tracing::debug!("rolling back abandoned transaction");
            obj.exec(Transaction::Rollback.into()).await?;
        }

        if self.validate_on_borrow {
            obj.ping().await?;
        }

        Ok(())
    }
}

/// A connection retrieved from a pool.
///
/// When dropped, the connection is returned to the pool for reuse.
#[derive(Debug)]
pub(crate) struct PoolConnection {
    inner: deadpool::managed::Object<Manager>,
}

impl Deref for PoolConnection {
    type Target = Box<dyn Connection>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
