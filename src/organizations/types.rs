//! Organization domain types.

use crate::UserId;
use crate::permissions::ActionPermissions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action name granted [`Permission::ALL`](crate::permissions::Permission::ALL)
/// to the owner.
pub const OWNER_ACTION: &str = "owner";

/// Action name granted `ALL` to the creator of an organization.
pub const ADMIN_ACTION: &str = "admin";

/// Conflict message when an ownership change targets a non-member.
pub const NEW_OWNER_NOT_MEMBER: &str = "new owner is not a member";

/// A tenant. Exactly one owner at all times.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub owner_user_id: UserId,
    pub billing_plan_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Organization {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_user_id == user_id
    }
}

/// Input to [`OrganizationStore::create_organization`](super::OrganizationStore::create_organization).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrganization {
    pub id: String,
    pub name: String,
    pub owner_user_id: UserId,
}

/// A pending invitation. Consumed by acceptance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invite {
    pub organization_id: String,
    pub user_id: UserId,
    /// Grants applied on acceptance.
    pub perms: ActionPermissions,
    /// The single-use capability emailed to the invitee.
    pub otp: String,
    /// Unix seconds.
    pub expires_at: u64,
}

/// What an accepted invite granted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedInvite {
    pub organization_id: String,
    pub user_id: UserId,
    pub perms: ActionPermissions,
}

/// An organization as seen by one of its members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub organization_id: String,
    pub name: String,
    pub perms: ActionPermissions,
    pub is_owner: bool,
}

/// What happens to the previous owner's `owner` grant on ownership change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerGrantPolicy {
    /// Leave it in place. Cleanup is a separate `revoke_permission` call.
    #[default]
    KeepPrevious,
    /// Revoke it in the same transaction.
    RevokePrevious,
}
