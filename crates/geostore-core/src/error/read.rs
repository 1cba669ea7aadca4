use super::Error;

/// Error while pulling rows from an open cursor.
#[derive(Debug)]
pub(super) struct ReadError;

impl std::error::Error for ReadError {}

impl core::fmt::Display for ReadError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("read failed")
    }
}

impl Error {
    /// Wraps a failure that happened mid-iteration as a read error.
    pub fn read(cause: Error) -> Error {
        cause.context(Error::read_failed())
    }

    /// Creates a read error with no cause attached.
    pub fn read_failed() -> Error {
        Error::from(super::ErrorKind::Read(ReadError))
    }

    /// Returns `true` if this error is a read error.
    pub fn is_read(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Read(_))
    }
}
