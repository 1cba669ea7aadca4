use geostore::{store::Builder, Store};
use geostore_core::driver::Capability;

use crate::Setup;

/// Every test gets a private in-memory database.
pub struct SetupSqlite;

#[async_trait::async_trait]
impl Setup for SetupSqlite {
    async fn connect(&self, builder: &mut Builder) -> geostore::Result<Store> {
        builder.connect("sqlite::memory:").await
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }
}
