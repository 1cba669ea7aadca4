use super::{Row, RowStream};
use crate::{err, Result};

#[derive(Debug)]
pub struct Response {
    pub rows: Rows,
}

#[derive(Debug)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Operation result, as a stream of rows
    Values(RowStream),
}

impl Response {
    pub fn count(count: u64) -> Response {
        Response {
            rows: Rows::Count(count),
        }
    }

    pub fn row_stream(rows: impl Into<RowStream>) -> Response {
        Response {
            rows: Rows::Values(rows.into()),
        }
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Rows::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Rows::Values(_))
    }

    pub fn into_count(self) -> Result<u64> {
        match self {
            Rows::Count(count) => Ok(count),
            Rows::Values(_) => Err(err!("expected an affected row count, got rows")),
        }
    }

    pub fn into_values(self) -> Result<RowStream> {
        match self {
            Rows::Values(values) => Ok(values),
            Rows::Count(count) => Err(err!("expected rows, got an affected row count of {count}")),
        }
    }

    /// Drains the rows. A count response collects into no rows.
    pub async fn collect(self) -> Result<Vec<Row>> {
        match self {
            Rows::Count(_) => Ok(vec![]),
            Rows::Values(values) => values.collect().await,
        }
    }
}
