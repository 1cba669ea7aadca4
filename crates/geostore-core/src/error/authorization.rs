use super::Error;

/// Error when an owner tries to release or use a lock it does not hold.
#[derive(Debug)]
pub(super) struct AuthorizationError {
    message: Box<str>,
}

impl std::error::Error for AuthorizationError {}

impl core::fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "not authorized: {}", self.message)
    }
}

impl Error {
    /// Creates an authorization error.
    ///
    /// Raised by `unlock` when the caller is not the owner of the lock. This
    /// is distinct from the benign "already locked by someone else" outcome
    /// of a lock request, which is reported through a batch result.
    pub fn authorization(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Authorization(AuthorizationError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an authorization error.
    pub fn is_authorization(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Authorization(_))
    }
}
