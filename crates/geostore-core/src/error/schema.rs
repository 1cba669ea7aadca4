use super::Error;

/// Error when a feature type cannot be resolved against the store.
///
/// This occurs when:
/// - The table backing a type name does not exist
/// - Geometry metadata is missing or unreadable
/// - A type to be created clashes with an existing table or hidden column
#[derive(Debug)]
pub(super) struct SchemaError {
    message: Box<str>,
}

impl std::error::Error for SchemaError {}

impl core::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "schema error: {}", self.message)
    }
}

impl Error {
    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Schema(SchemaError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a schema error.
    pub fn is_schema(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Schema(_))
    }
}
