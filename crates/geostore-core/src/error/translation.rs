use super::Error;

/// Error when a predicate node reached SQL rendering without being encodable.
///
/// The splitter decides what is encodable before anything is rendered, so
/// seeing this error always indicates a bug in geostore.
#[derive(Debug)]
pub(super) struct TranslationError {
    message: Box<str>,
}

impl std::error::Error for TranslationError {}

impl core::fmt::Display for TranslationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "predicate translation failed: {}", self.message)
    }
}

impl Error {
    /// Creates a predicate translation error.
    pub fn translation(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Translation(TranslationError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is a predicate translation error.
    pub fn is_translation(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Translation(_))
    }
}
