//! Membership manager.
//!
//! Handles member removal and per-action permission grants. Callers are
//! expected to have authorized the request through the session pipeline.

use super::error::{OrganizationError, Result};
use super::storage::MembershipStore;
use crate::UserId;
use crate::error::OrgwardError;
use crate::permissions::{ActionPermissions, Permission};
use tracing::{debug, info, instrument};

/// Membership manager - handles member operations.
///
/// # Example
///
/// ```rust,ignore
/// use orgward::organizations::MembershipManager;
/// use orgward::permissions::Permission;
///
/// let manager = MembershipManager::new(store);
/// manager.set_permission("abcde", 7, "billing", Permission::READ).await?;
/// manager.revoke_permission("abcde", 7, "billing").await?;
/// ```
pub struct MembershipManager<M>
where
    M: MembershipStore,
{
    membership_store: M,
}

impl<M> MembershipManager<M>
where
    M: MembershipStore,
{
    #[must_use]
    pub fn new(membership_store: M) -> Self {
        Self { membership_store }
    }

    pub fn membership_store(&self) -> &M {
        &self.membership_store
    }

    /// Remove a user and all of their grants from an organization.
    ///
    /// The current owner cannot be removed; transfer ownership first.
    #[instrument(skip(self))]
    pub async fn remove_user_from_org(&self, org_id: &str, user_id: UserId) -> Result<()> {
        self.membership_store
            .remove_user_from_org(org_id, user_id)
            .await
            .map_err(|e| match e {
                OrgwardError::Conflict(_) => OrganizationError::CannotRemoveOwner,
                OrgwardError::NotFound(_) => OrganizationError::NotMember,
                other => other.into(),
            })?;

        info!(org_id, user_id, "Member removed");
        Ok(())
    }

    /// Grant `permission` on `action`, replacing any previous grant.
    #[instrument(skip(self))]
    pub async fn set_permission(
        &self,
        org_id: &str,
        user_id: UserId,
        action: &str,
        permission: Permission,
    ) -> Result<()> {
        self.membership_store
            .set_permission(org_id, user_id, action, permission)
            .await
            .map_err(|e| match e {
                OrgwardError::NotFound(_) => OrganizationError::NotMember,
                other => other.into(),
            })
    }

    /// Remove one action grant. Returns `false` when there was nothing to remove.
    #[instrument(skip(self))]
    pub async fn revoke_permission(
        &self,
        org_id: &str,
        user_id: UserId,
        action: &str,
    ) -> Result<bool> {
        let revoked = self
            .membership_store
            .revoke_permission(org_id, user_id, action)
            .await?;
        if !revoked {
            debug!(org_id, user_id, action, "No grant to revoke");
        }
        Ok(revoked)
    }

    pub async fn permissions(&self, org_id: &str, user_id: UserId) -> Result<ActionPermissions> {
        self.membership_store
            .permissions(org_id, user_id)
            .await
            .map_err(Into::into)
    }

    pub async fn is_member(&self, org_id: &str, user_id: UserId) -> Result<bool> {
        self.membership_store
            .is_member(org_id, user_id)
            .await
            .map_err(Into::into)
    }
}

impl<M: MembershipStore> std::fmt::Debug for MembershipManager<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipManager").finish_non_exhaustive()
    }
}
