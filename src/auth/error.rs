//! Authentication and authorization errors.

use crate::error::OrgwardError;
use thiserror::Error;

/// Why a credential or permission check failed.
///
/// The variants exist for logs and tests. Converting into [`OrgwardError`]
/// collapses every check failure into the same `Unauthorized` response.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No session cookie and no bearer header.
    #[error("missing credential")]
    MissingCredential,

    /// Bad signature, undecodable payload, wrong issuer or token type, or expired.
    #[error("invalid token")]
    InvalidToken,

    /// Token has no organization, or is scoped to a different one.
    #[error("token is not scoped to organization {requested}")]
    WrongOrganization {
        /// The organization the request asked for.
        requested: String,
    },

    /// A required action grant is missing or too weak.
    #[error("insufficient permission for action {action}")]
    InsufficientPermission {
        /// The first action that failed the check.
        action: String,
    },

    /// Signing failed. Only possible with a broken key.
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl AuthError {
    pub fn wrong_organization(requested: impl Into<String>) -> Self {
        Self::WrongOrganization {
            requested: requested.into(),
        }
    }

    pub fn insufficient_permission(action: impl Into<String>) -> Self {
        Self::InsufficientPermission {
            action: action.into(),
        }
    }
}

impl From<AuthError> for OrgwardError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Encoding(msg) => OrgwardError::internal(msg),
            other => OrgwardError::unauthorized(other.to_string()),
        }
    }
}

/// Result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_failures_map_to_unauthorized() {
        let errors = [
            AuthError::MissingCredential,
            AuthError::InvalidToken,
            AuthError::wrong_organization("abcde"),
            AuthError::insufficient_permission("admin"),
        ];

        for err in errors {
            let mapped: OrgwardError = err.into();
            assert!(matches!(mapped, OrgwardError::Unauthorized(_)));
            assert_eq!(mapped.safe_message(), "Unauthorized");
        }
    }

    #[test]
    fn test_encoding_failure_is_internal() {
        let mapped: OrgwardError = AuthError::Encoding("bad key".into()).into();
        assert!(matches!(mapped, OrgwardError::Internal(_)));
    }
}
