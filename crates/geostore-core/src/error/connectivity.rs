use super::Error;

/// Error reaching the backing store.
///
/// Covers connect failures, authentication failures, malformed connection
/// URLs and pool exhaustion. These are surfaced immediately and never retried.
#[derive(Debug)]
pub(super) enum ConnectivityError {
    Source(Box<dyn std::error::Error + Send + Sync>),
    Message(Box<str>),
}

impl std::error::Error for ConnectivityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectivityError::Source(inner) => Some(inner.as_ref()),
            ConnectivityError::Message(_) => None,
        }
    }
}

impl core::fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ConnectivityError::Source(inner) => {
                f.write_str("connection failed: ")?;
                core::fmt::Display::fmt(inner, f)?;
                let mut source = inner.source();
                while let Some(err) = source {
                    write!(f, ": {}", err)?;
                    source = err.source();
                }
                Ok(())
            }
            ConnectivityError::Message(message) => {
                write!(f, "invalid connection URL: {message}")
            }
        }
    }
}

impl Error {
    /// Creates a connectivity error from a pool or network error.
    pub fn connectivity(err: impl std::error::Error + Send + Sync + 'static) -> Error {
        Error::from(super::ErrorKind::Connectivity(ConnectivityError::Source(
            Box::new(err),
        )))
    }

    /// Creates a connectivity error for a connection URL that cannot be used.
    pub fn invalid_connection_url(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Connectivity(ConnectivityError::Message(
            message.into().into(),
        )))
    }

    /// Returns `true` if this error is a connectivity error.
    pub fn is_connectivity(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Connectivity(_))
    }
}
