//! Organization error types.

use crate::error::OrgwardError;
use thiserror::Error;

/// Errors from organization workflows.
#[derive(Debug, Error)]
pub enum OrganizationError {
    #[error("Organization not found: {org_id}")]
    NotFound {
        org_id: String,
    },

    #[error("User is not a member of this organization")]
    NotMember,

    #[error("Only the organization owner can do this")]
    NotOwner,

    /// Ownership must be transferred first.
    #[error("Cannot remove organization owner")]
    CannotRemoveOwner,

    #[error("User is already a member of this organization")]
    AlreadyMember,

    /// Never existed, expired, or already used. Deliberately indistinguishable.
    #[error("Invitation not found")]
    InvitationNotFound,

    #[error("Could not allocate an organization id after {attempts} attempts")]
    IdCollision {
        attempts: u32,
    },

    #[error("Invalid organization name")]
    InvalidName,

    #[error("Storage error: {0}")]
    Storage(#[from] OrgwardError),
}

impl OrganizationError {
    pub fn not_found(org_id: impl Into<String>) -> Self {
        Self::NotFound {
            org_id: org_id.into(),
        }
    }
}

impl From<OrganizationError> for OrgwardError {
    fn from(err: OrganizationError) -> Self {
        match err {
            OrganizationError::NotFound { .. }
            | OrganizationError::NotMember
            | OrganizationError::InvitationNotFound => OrgwardError::not_found(err.to_string()),
            OrganizationError::NotOwner => OrgwardError::unauthorized(err.to_string()),
            OrganizationError::CannotRemoveOwner
            | OrganizationError::AlreadyMember
            | OrganizationError::IdCollision { .. } => OrgwardError::conflict(err.to_string()),
            OrganizationError::InvalidName => OrgwardError::bad_request(err.to_string()),
            OrganizationError::Storage(inner) => inner,
        }
    }
}

/// Result type for organization operations.
pub type Result<T> = std::result::Result<T, OrganizationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (OrganizationError::not_found("abcde"), StatusCode::NOT_FOUND),
            (OrganizationError::InvitationNotFound, StatusCode::NOT_FOUND),
            (OrganizationError::CannotRemoveOwner, StatusCode::CONFLICT),
            (OrganizationError::AlreadyMember, StatusCode::CONFLICT),
            (OrganizationError::NotOwner, StatusCode::UNAUTHORIZED),
            (OrganizationError::InvalidName, StatusCode::BAD_REQUEST),
        ];

        for (err, status) in cases {
            assert_eq!(OrgwardError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_storage_error_passes_through() {
        let err = OrganizationError::from(OrgwardError::transaction_failed("commit"));
        assert!(matches!(
            OrgwardError::from(err),
            OrgwardError::TransactionFailed(_)
        ));
    }
}
