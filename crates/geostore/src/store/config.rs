use geostore_core::{geom::WireFormat, Error, Result};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub use deadpool::managed::Timeouts;

/// Per-store settings.
///
/// Every field has a default, so a config can be embedded in an application
/// config file and only name what it changes. The same settings can be
/// passed as query parameters of the connection URL, see
/// [`StoreConfig::apply_url`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How geometries travel between geostore and the store.
    pub wire_format: WireFormat,

    /// Evaluate bounding box filters as envelope overlap instead of exact
    /// intersection. Faster, may return extra features.
    pub loose_bbox: bool,

    /// Answer unfiltered extent requests from table statistics.
    pub estimated_extent: bool,

    /// Database schema holding the feature tables. Defaults to the store's
    /// default schema.
    pub schema: Option<String>,

    /// Qualify table names with the schema in generated SQL.
    pub qualify_tables: bool,

    /// Report primary key columns as ordinary attributes.
    pub expose_primary_keys: bool,

    pub pool: PoolConfig,
}

/// Connection pool settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on open connections. The driver's own limit wins when it
    /// is lower.
    pub max_connections: Option<usize>,

    /// Connections opened when the store is built.
    pub min_connections: usize,

    /// Round trip each connection before handing it out again.
    pub validate_on_borrow: bool,

    #[serde(skip)]
    pub timeouts: Timeouts,
}

impl StoreConfig {
    pub fn new() -> StoreConfig {
        StoreConfig::default()
    }

    /// Overrides settings from the query parameters of `url`.
    ///
    /// Parameters geostore does not know are left for the driver.
    pub fn apply_url(&mut self, url: &Url) -> Result<()> {
        for (key, value) in url.query_pairs() {
            match &*key {
                "wire_format" => self.wire_format = value.parse()?,
                "loose_bbox" => self.loose_bbox = parse_bool(&key, &value)?,
                "estimated_extent" => self.estimated_extent = parse_bool(&key, &value)?,
                "schema" => self.schema = Some(value.into_owned()),
                "qualify_tables" => self.qualify_tables = parse_bool(&key, &value)?,
                "expose_primary_keys" => self.expose_primary_keys = parse_bool(&key, &value)?,
                "max_connections" => {
                    self.pool.max_connections = Some(parse_number(&key, &value)?)
                }
                "min_connections" => self.pool.min_connections = parse_number(&key, &value)?,
                "validate_on_borrow" => self.pool.validate_on_borrow = parse_bool(&key, &value)?,
                "acquire_timeout_ms" => {
                    let millis = parse_number(&key, &value)? as u64;
                    self.pool.timeouts.wait = Some(Duration::from_millis(millis));
                }
                _ => tracing::debug!(%key, "query parameter left to the driver"),
            }
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            wire_format: WireFormat::Ewkb,
            loose_bbox: false,
            estimated_extent: false,
            schema: None,
            qualify_tables: true,
            expose_primary_keys: false,
            pool: PoolConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn new() -> PoolConfig {
        PoolConfig::default()
    }

    /// The pool size for a driver that allows at most `driver_max`
    /// connections.
    pub(crate) fn max_size(&self, driver_max: Option<usize>) -> usize {
        let configured = self
            .max_connections
            .unwrap_or_else(|| deadpool::managed::PoolConfig::default().max_size);

        match driver_max {
            Some(max) => configured.min(max),
            None => configured,
        }
        .max(1)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_connections: None,
            min_connections: 0,
            validate_on_borrow: false,
            timeouts: Timeouts::default(),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_connection_url(format!(
            "`{key}` expects a boolean, found `{value}`"
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<usize> {
    value.parse().map_err(|_| {
        Error::invalid_connection_url(format!("`{key}` expects a number, found `{value}`"))
    })
}
