use super::{Error, ErrorKind};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A statement the database rejected or a client library failure.
#[derive(Debug)]
pub(super) struct DriverError {
    pub(super) inner: BoxError,
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "statement failed: {}", self.inner)?;

        // rusqlite and tokio-postgres keep the database message in the source
        let mut cause = self.inner.source();
        while let Some(err) = cause {
            write!(f, ": {err}")?;
            cause = err.source();
        }
        Ok(())
    }
}

impl Error {
    /// Wraps an error of `rusqlite`, `tokio-postgres` or another client
    /// library.
    pub fn driver(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        ErrorKind::Driver(DriverError {
            inner: Box::new(err),
        })
        .into()
    }

    pub fn is_driver(&self) -> bool {
        matches!(self.kind(), ErrorKind::Driver(_))
    }
}
