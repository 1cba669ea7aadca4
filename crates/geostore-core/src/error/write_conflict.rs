use super::Error;

/// Error when a mutation touches a feature locked by another owner, or when
/// the number of affected rows does not match what was expected.
#[derive(Debug)]
pub(super) struct WriteConflictError {
    message: Box<str>,
}

impl std::error::Error for WriteConflictError {}

impl core::fmt::Display for WriteConflictError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "write conflict: {}", self.message)
    }
}

impl Error {
    /// Creates a write conflict error.
    pub fn write_conflict(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::WriteConflict(WriteConflictError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a write conflict.
    pub fn is_write_conflict(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::WriteConflict(_))
    }
}
