mod statement_cache;
use statement_cache::StatementCache;

mod r#type;
use r#type::TypeExt;

mod value;
pub(crate) use value::Value;

use geostore_core::{
    async_trait,
    driver::{
        operation::QuerySql, Capability, Driver, Operation, Response, RowStream, Transaction,
    },
    Error, Result,
};
use geostore_sql::Serializer;
use postgres_types::{ToSql, Type};
use std::borrow::Cow;
use tokio_postgres::{Client, Config, NoTls};
use tokio_stream::StreamExt;
use url::Url;

/// PostgreSQL with the PostGIS extension.
#[derive(Debug)]
pub struct PostGis {
    url: String,
    config: Config,
}

impl PostGis {
    /// Create a new PostGIS driver from a `postgresql://` connection URL.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str)?;

        if !matches!(url.scheme(), "postgresql" | "postgres") {
            return Err(Error::invalid_connection_url(format!(
                "connection URL does not have a `postgresql` scheme; url={url_str}"
            )));
        }

        let host = url.host_str().filter(|host| !host.is_empty()).ok_or_else(|| {
            Error::invalid_connection_url(format!("missing host in connection URL; url={url_str}"))
        })?;

        let dbname = url.path().trim_start_matches('/');
        if dbname.is_empty() {
            return Err(Error::invalid_connection_url(format!(
                "no database specified - missing path in connection URL; url={url_str}"
            )));
        }

        let mut config = Config::new();
        config.host(host);
        config.dbname(dbname);

        if let Some(port) = url.port() {
            config.port(port);
        }

        if !url.username().is_empty() {
            config.user(url.username());
        }

        if let Some(password) = url.password() {
            config.password(password);
        }

        Ok(Self {
            url: url_str,
            config,
        })
    }
}

#[async_trait]
impl Driver for PostGis {
    fn url(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.url)
    }

    fn capability(&self) -> &'static Capability {
        &Capability::POSTGIS
    }

    async fn connect(&self) -> Result<Box<dyn geostore_core::Connection>> {
        let (client, connection) = self
            .config
            .connect(NoTls)
            .await
            .map_err(Error::connectivity)?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(%err, "postgres connection closed");
            }
        });

        Ok(Box::new(Connection::new(client)))
    }
}

#[derive(Debug)]
pub struct Connection {
    client: Client,
    statements: StatementCache,
    in_transaction: bool,
}

impl Connection {
    /// Wraps a client that is already connected.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            statements: StatementCache::default(),
            in_transaction: false,
        }
    }

    async fn transaction(&mut self, op: Transaction) -> Result<Response> {
        let sql = Serializer::postgresql().serialize_transaction(&op);
        tracing::debug!(%sql, "transaction");

        let res = self.client.batch_execute(&sql).await;

        // A failed COMMIT still ends the transaction
        self.in_transaction = match op {
            Transaction::Start => res.is_ok(),
            Transaction::Commit | Transaction::Rollback => false,
        };

        res.map_err(Error::driver)?;
        Ok(Response::count(0))
    }
}

#[async_trait]
impl geostore_core::driver::Connection for Connection {
    async fn exec(&mut self, op: Operation) -> Result<Response> {
        let QuerySql { sql, params, ret } = match op {
            Operation::Query(query) => query,
            Operation::Transaction(op) => return self.transaction(op).await,
        };

        tracing::trace!(%sql, params = params.len(), "exec");

        // Declared types let untyped NULLs and numeric parameters bind
        let types = params
            .iter()
            .map(|param| {
                param
                    .infer_ty()
                    .map_or(Type::TEXT, |ty| ty.to_postgres_type())
            })
            .collect::<Vec<_>>();

        let statement = self
            .statements
            .prepare_typed(&self.client, &sql, &types)
            .await
            .map_err(Error::driver)?;

        let params = params
            .into_iter()
            .map(|tv| Value::from(tv.value))
            .collect::<Vec<_>>();

        let args = params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();

        let Some(ret_tys) = ret else {
            let count = self
                .client
                .execute(&statement, &args)
                .await
                .map_err(Error::driver)?;
            return Ok(Response::count(count));
        };

        let rows = self
            .client
            .query_raw(&statement, args)
            .await
            .map_err(Error::driver)?;

        let rows = rows.map(move |row| {
            let row = row.map_err(Error::driver)?;
            ret_tys
                .iter()
                .enumerate()
                .map(|(index, ty)| Value::from_row(&row, index, *ty).map(Value::into_inner))
                .collect::<Result<Vec<_>>>()
        });

        Ok(Response::row_stream(RowStream::from_stream(rows)))
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}
