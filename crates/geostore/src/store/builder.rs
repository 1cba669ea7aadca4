use super::{Connect, Pool, Shared, Store, StoreConfig};

use geostore_core::{geom::WireFormat, Driver, Result};
use std::{sync::Arc, time::Duration};
use url::Url;

/// Configures and opens a [`Store`].
#[derive(Debug, Default)]
pub struct Builder {
    config: StoreConfig,
}

impl Builder {
    /// Replaces every setting with `config`.
    pub fn config(&mut self, config: StoreConfig) -> &mut Self {
        self.config = config;
        self
    }

    pub fn wire_format(&mut self, wire_format: WireFormat) -> &mut Self {
        self.config.wire_format = wire_format;
        self
    }

    pub fn loose_bbox(&mut self, loose_bbox: bool) -> &mut Self {
        self.config.loose_bbox = loose_bbox;
        self
    }

    pub fn estimated_extent(&mut self, estimated_extent: bool) -> &mut Self {
        self.config.estimated_extent = estimated_extent;
        self
    }

    pub fn schema(&mut self, schema: impl Into<String>) -> &mut Self {
        self.config.schema = Some(schema.into());
        self
    }

    pub fn qualify_tables(&mut self, qualify_tables: bool) -> &mut Self {
        self.config.qualify_tables = qualify_tables;
        self
    }

    pub fn expose_primary_keys(&mut self, expose_primary_keys: bool) -> &mut Self {
        self.config.expose_primary_keys = expose_primary_keys;
        self
    }

    pub fn max_connections(&mut self, max_connections: usize) -> &mut Self {
        self.config.pool.max_connections = Some(max_connections);
        self
    }

    pub fn min_connections(&mut self, min_connections: usize) -> &mut Self {
        self.config.pool.min_connections = min_connections;
        self
    }

    pub fn validate_on_borrow(&mut self, validate_on_borrow: bool) -> &mut Self {
        self.config.pool.validate_on_borrow = validate_on_borrow;
        self
    }

    /// How long to wait for a free connection before failing.
    pub fn acquire_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config.pool.timeouts.wait = Some(timeout);
        self
    }

    /// Opens a store for `url`, picking the driver from its scheme.
    ///
    /// Query parameters of the URL override settings made on the builder.
    pub async fn connect(&mut self, url: &str) -> Result<Store> {
        self.config.apply_url(&Url::parse(url)?)?;
        self.build(Connect::new(url)?).await
    }

    pub async fn build(&mut self, driver: impl Driver) -> Result<Store> {
        let pool = Pool::new(Box::new(driver), &self.config.pool).await?;
        tracing::debug!(
            wire_format = ?self.config.wire_format,
            loose_bbox = self.config.loose_bbox,
            "store opened"
        );

        Ok(Store {
            shared: Arc::new(Shared::new(pool, self.config.clone())),
        })
    }
}
