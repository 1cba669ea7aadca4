use geostore_core::{
    async_trait,
    driver::{Capability, Driver},
    Connection, Error, Result,
};
use std::borrow::Cow;
use url::Url;

/// A driver picked from the scheme of a connection URL.
#[derive(Debug)]
pub struct Connect {
    driver: Box<dyn Driver>,
}

impl Connect {
    pub fn new(url: &str) -> Result<Connect> {
        let parsed = Url::parse(url)?;

        let driver = match parsed.scheme() {
            "postgresql" | "postgres" => connect_postgis(url)?,
            "sqlite" => connect_sqlite(url)?,
            scheme => {
                return Err(Error::invalid_connection_url(format!(
                    "unsupported database; scheme={scheme}; url={url}"
                )))
            }
        };

        Ok(Connect { driver })
    }
}

#[async_trait]
impl Driver for Connect {
    fn url(&self) -> Cow<'_, str> {
        self.driver.url()
    }

    fn capability(&self) -> &'static Capability {
        self.driver.capability()
    }

    async fn connect(&self) -> Result<Box<dyn Connection>> {
        self.driver.connect().await
    }

    fn max_connections(&self) -> Option<usize> {
        self.driver.max_connections()
    }
}

#[cfg(feature = "postgis")]
fn connect_postgis(url: &str) -> Result<Box<dyn Driver>> {
    Ok(Box::new(geostore_driver_postgis::PostGis::new(url)?))
}

#[cfg(not(feature = "postgis"))]
fn connect_postgis(_url: &str) -> Result<Box<dyn Driver>> {
    Err(Error::invalid_connection_url("`postgis` feature not enabled"))
}

#[cfg(feature = "sqlite")]
fn connect_sqlite(url: &str) -> Result<Box<dyn Driver>> {
    Ok(Box::new(geostore_driver_sqlite::Sqlite::new(url)?))
}

#[cfg(not(feature = "sqlite"))]
fn connect_sqlite(_url: &str) -> Result<Box<dyn Driver>> {
    Err(Error::invalid_connection_url("`sqlite` feature not enabled"))
}
