//! Membership and permission-grant storage trait.

use crate::UserId;
use crate::error::Result;
use crate::permissions::{ActionPermissions, Permission};
use async_trait::async_trait;

/// Memberships and per-action grants.
///
/// Membership is independent of grants: a member may hold none. Grants are
/// keyed by (organization, user, action), so granting an action twice
/// overwrites.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn is_member(&self, org_id: &str, user_id: UserId) -> Result<bool>;

    /// Every grant `user_id` holds in `org_id`. Empty for non-members.
    async fn permissions(&self, org_id: &str, user_id: UserId) -> Result<ActionPermissions>;

    /// Upsert one grant. `NotFound` if the user is not a member.
    async fn set_permission(
        &self,
        org_id: &str,
        user_id: UserId,
        action: &str,
        permission: Permission,
    ) -> Result<()>;

    /// Remove one grant. Returns whether a grant existed.
    async fn revoke_permission(&self, org_id: &str, user_id: UserId, action: &str) -> Result<bool>;

    /// Delete the membership and all of the user's grants in the organization,
    /// atomically.
    ///
    /// `Conflict` if the user is the owner, `NotFound` if the organization or
    /// membership does not exist. Either way nothing changes.
    async fn remove_user_from_org(&self, org_id: &str, user_id: UserId) -> Result<()>;
}
