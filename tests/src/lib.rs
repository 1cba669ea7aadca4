#[macro_use]
mod macros;

pub mod db;
mod geo_test;
mod isolation;

pub use geo_test::GeoTest;

use geostore::{store::Builder, Geometry, GeometryValue, Srid, Store};
use geostore_core::driver::Capability;

#[async_trait::async_trait]
pub trait Setup: Send + Sync + 'static {
    async fn connect(&self, builder: &mut Builder) -> geostore::Result<Store>;

    fn capability(&self) -> &'static Capability;

    /// Prepended to every type name a test creates.
    fn table_prefix(&self) -> String {
        String::new()
    }

    /// Drops the tables created by this setup instance.
    async fn cleanup_my_tables(&self) -> geostore::Result<()> {
        Ok(())
    }
}

/// A WGS84 point.
pub fn point(x: f64, y: f64) -> GeometryValue {
    GeometryValue::new(Geometry::point(x, y), Srid::WGS84)
}
