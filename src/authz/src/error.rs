//! Error types for the authorization core

use thiserror::Error;

/// Authorization core errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Caller lacks authority over the requested target
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed or out-of-contract input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Directory store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    /// HTTP-style status code for the transport layer
    pub fn code(&self) -> u16 {
        match self {
            AuthzError::Forbidden(_) => 403,
            AuthzError::Validation(_) => 400,
            AuthzError::NotFound(_) => 404,
            AuthzError::Store(_) | AuthzError::Internal(_) => 500,
        }
    }

    /// Whether this error denies authority rather than reporting a fault
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AuthzError::Forbidden(_))
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthzError::Forbidden("no".into()).code(), 403);
        assert_eq!(AuthzError::Validation("bad".into()).code(), 400);
        assert_eq!(AuthzError::NotFound("gone".into()).code(), 404);
        assert_eq!(AuthzError::Store("down".into()).code(), 500);
        assert_eq!(AuthzError::Internal("bug".into()).code(), 500);
    }

    #[test]
    fn test_error_display() {
        let err = AuthzError::Forbidden("cannot manage organization org-7".into());
        assert_eq!(err.to_string(), "Forbidden: cannot manage organization org-7");
        assert!(err.is_forbidden());
    }
}
