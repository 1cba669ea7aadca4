use postgres_types::Type;
use std::collections::HashMap;
use tokio_postgres::{Client, Error, Statement};

/// Prepared statements of one connection, keyed by SQL text and declared
/// parameter types.
#[derive(Debug, Default)]
pub struct StatementCache {
    statements: HashMap<(String, Vec<Type>), Statement>,
}

impl StatementCache {
    pub async fn prepare_typed(
        &mut self,
        client: &Client,
        sql: &str,
        types: &[Type],
    ) -> Result<Statement, Error> {
        let key = (sql.to_string(), types.to_vec());

        if let Some(statement) = self.statements.get(&key) {
            return Ok(statement.clone());
        }

        let statement = client.prepare_typed(sql, types).await?;
        self.statements.insert(key, statement.clone());
        Ok(statement)
    }

    /// Drops every statement, for when the server side state was lost.
    pub fn clear(&mut self) {
        self.statements.clear();
    }
}
