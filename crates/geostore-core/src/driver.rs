mod capability;
pub use capability::{Capability, Dialect};

pub mod operation;
pub use operation::{Operation, QuerySql, Transaction, TypedValue};

mod response;
pub use response::{Response, Rows};

mod row_stream;
pub use row_stream::{Row, RowStream};

use crate::{async_trait, Type};

use std::{borrow::Cow, fmt::Debug};

#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Returns the URL this driver is connecting to.
    fn url(&self) -> Cow<'_, str>;

    /// Describes the SQL features of the backing store. The planner, the
    /// predicate translator and the writer consult it instead of branching
    /// on the backend.
    fn capability(&self) -> &'static Capability;

    /// Opens a new connection.
    async fn connect(&self) -> crate::Result<Box<dyn Connection>>;

    /// Upper bound on simultaneous connections, if the backend has one.
    fn max_connections(&self) -> Option<usize> {
        None
    }
}

#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// Executes a database operation.
    async fn exec(&mut self, op: Operation) -> crate::Result<Response>;

    /// Returns `true` while a transaction is open on this connection.
    fn in_transaction(&self) -> bool;

    /// Round trip used to validate pooled connections.
    async fn ping(&mut self) -> crate::Result<()> {
        let response = self
            .exec(
                QuerySql {
                    sql: "SELECT 1".to_string(),
                    params: vec![],
                    ret: Some(vec![Type::I64]),
                }
                .into(),
            )
            .await?;
        response.rows.collect().await?;
        Ok(())
    }
}
