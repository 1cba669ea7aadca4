use super::Error;

/// Error when a geometry cannot be decoded from, or encoded to, a wire format.
#[derive(Debug)]
pub(super) struct CodecError {
    message: Box<str>,
}

impl std::error::Error for CodecError {}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid geometry encoding: {}", self.message)
    }
}

impl Error {
    /// Creates a geometry codec error.
    pub fn codec(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Codec(CodecError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a geometry codec error.
    pub fn is_codec(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Codec(_))
    }
}
