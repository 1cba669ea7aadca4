mod functions;

mod value;
pub(crate) use value::Value;

use geostore_core::{
    async_trait,
    driver::{operation::QuerySql, Capability, Driver, Operation, Response},
    Error, Result,
};
use geostore_sql::{ddl::GEOMETRY_COLUMNS, Serializer};
use rusqlite::Connection as RusqliteConnection;
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL.
    ///
    /// `sqlite::memory:` opens a private in-memory database per connection;
    /// anything else is a file path.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str)?;

        if url.scheme() != "sqlite" {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            )));
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else if url.path().is_empty() {
            Err(Error::invalid_connection_url(format!(
                "no database file in connection URL; url={url_str}"
            )))
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

#[async_trait]
impl Driver for Sqlite {
    fn url(&self) -> Cow<'_, str> {
        match self {
            Sqlite::InMemory => Cow::Borrowed("sqlite::memory:"),
            Sqlite::File(path) => Cow::Owned(format!("sqlite:{}", path.display())),
        }
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }

    async fn connect(&self) -> Result<Box<dyn geostore_core::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }

    /// Every in-memory connection sees its own database, so the pool must
    /// hand out the same one.
    fn max_connections(&self) -> Option<usize> {
        matches!(self, Self::InMemory).then_some(1)
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory().map_err(Error::connectivity)?;
        Self::init(connection)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::connectivity)?;
        Self::init(connection)
    }

    /// Registers the spatial functions and creates the geometry catalog.
    fn init(connection: RusqliteConnection) -> Result<Self> {
        functions::register(&connection).map_err(Error::driver)?;

        // LIKE filters carry their own case sensitivity
        connection
            .execute_batch(&format!(
                "PRAGMA case_sensitive_like = ON;
                CREATE TABLE IF NOT EXISTS {GEOMETRY_COLUMNS} (
                    f_table_name TEXT NOT NULL,
                    f_geometry_column TEXT NOT NULL,
                    coord_dimension INTEGER NOT NULL,
                    srid INTEGER,
                    type TEXT NOT NULL,
                    PRIMARY KEY (f_table_name, f_geometry_column)
                );"
            ))
            .map_err(Error::driver)?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl geostore_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        let QuerySql { sql, params, ret } = match op {
            Operation::Query(query) => query,
            Operation::Transaction(op) => {
                let sql = Serializer::sqlite().serialize_transaction(&op);
                tracing::debug!(%sql, "transaction");
                self.connection.execute_batch(&sql).map_err(Error::driver)?;
                return Ok(Response::count(0));
            }
        };

        tracing::trace!(%sql, params = params.len(), "exec");

        let mut stmt = self.connection.prepare_cached(&sql).map_err(Error::driver)?;

        let params = params
            .into_iter()
            .map(|tv| Value::from(tv.value))
            .collect::<Vec<_>>();

        let Some(ret_tys) = ret else {
            let count = stmt
                .execute(rusqlite::params_from_iter(params.iter()))
                .map_err(Error::driver)?;

            return Ok(Response::count(count as _));
        };

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver)?;

        let mut ret = vec![];

        while let Some(row) = rows.next().map_err(Error::driver)? {
            let mut items = Vec::with_capacity(ret_tys.len());

            for (index, ty) in ret_tys.iter().enumerate() {
                items.push(Value::from_sql(row, index, *ty)?.into_inner());
            }

            ret.push(items);
        }

        Ok(Response::row_stream(ret))
    }

    fn in_transaction(&self) -> bool {
        !self.connection.is_autocommit()
    }
}
