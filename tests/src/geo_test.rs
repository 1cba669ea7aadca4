use crate::Setup;

use geostore::{store::Builder, FeatureType, Store};
use geostore_core::driver::Capability;
use std::{future::Future, pin::Pin};

/// Runs one test against one backend.
///
/// Tests are plain `#[test]` functions; the runner owns the Tokio runtime so
/// the backend's tables are dropped even when the test panics.
pub struct GeoTest {
    setup: Box<dyn Setup>,
}

impl GeoTest {
    pub fn new(setup: Box<dyn Setup>) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        Self { setup }
    }

    /// Opens a store with the default configuration.
    pub async fn setup_store(&mut self) -> Store {
        self.try_setup_store(&mut Store::builder()).await.unwrap()
    }

    pub async fn try_setup_store(&mut self, builder: &mut Builder) -> geostore::Result<Store> {
        self.setup.connect(builder).await
    }

    /// Opens a store and creates `feature_type` in it.
    pub async fn setup_store_with(&mut self, feature_type: &FeatureType) -> Store {
        let store = self.setup_store().await;
        store.create_schema(feature_type).await.unwrap();
        store
    }

    /// The backend name of a type this test creates.
    pub fn type_name(&self, name: &str) -> String {
        format!("{}{name}", self.setup.table_prefix())
    }

    pub fn capability(&self) -> &'static Capability {
        self.setup.capability()
    }

    pub fn run<F>(mut self, test: F)
    where
        F: for<'a> FnOnce(&'a mut GeoTest) -> Pin<Box<dyn Future<Output = ()> + 'a>>,
    {
        runtime().block_on(test(&mut self));
    }
}

impl Drop for GeoTest {
    fn drop(&mut self) {
        if let Err(err) = runtime().block_on(self.setup.cleanup_my_tables()) {
            eprintln!("cleanup failed: {err}");
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create Tokio runtime")
}
