use geostore::{store::Builder, Store};
use geostore_core::driver::Capability;

use crate::{isolation::TestIsolation, Setup};

pub struct SetupPostGis {
    isolation: TestIsolation,
}

impl SetupPostGis {
    pub fn new() -> Self {
        Self {
            isolation: TestIsolation::new(),
        }
    }
}

impl Default for SetupPostGis {
    fn default() -> Self {
        Self::new()
    }
}

fn url() -> String {
    std::env::var("GEOSTORE_TEST_POSTGIS_URL")
        .unwrap_or_else(|_| "postgresql://localhost:5432/geostore_test".to_string())
}

#[async_trait::async_trait]
impl Setup for SetupPostGis {
    async fn connect(&self, builder: &mut Builder) -> geostore::Result<Store> {
        builder.connect(&url()).await
    }

    fn capability(&self) -> &'static Capability {
        &Capability::POSTGIS
    }

    fn table_prefix(&self) -> String {
        self.isolation.table_prefix()
    }

    async fn cleanup_my_tables(&self) -> geostore::Result<()> {
        cleanup_postgis_tables(&self.isolation)
            .await
            .map_err(|e| geostore::err!("PostGIS cleanup failed: {e}"))
    }
}

async fn cleanup_postgis_tables(
    isolation: &TestIsolation,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tokio_postgres::NoTls;

    let (client, connection) = tokio_postgres::connect(&url(), NoTls).await?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("PostGIS connection error during cleanup: {e}");
        }
    });

    let rows = client
        .query(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = 'public' AND starts_with(table_name, $1)",
            &[&isolation.table_prefix()],
        )
        .await?;

    for row in rows {
        let table_name: String = row.get(0);
        let query = format!("DROP TABLE IF EXISTS \"{table_name}\" CASCADE");
        let _ = client.execute(&query, &[]).await;
    }

    Ok(())
}
