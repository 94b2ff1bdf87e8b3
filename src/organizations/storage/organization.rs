//! Organization storage trait.

use crate::UserId;
use crate::error::Result;
use crate::organizations::types::{
    NewOrganization, Organization, OrganizationSummary, OwnerGrantPolicy,
};
use async_trait::async_trait;

/// Organization records and ownership.
///
/// # Important: Id Uniqueness
///
/// Organization ids are short and random, so collisions happen. The
/// implementation must enforce a unique constraint on the id and report a
/// duplicate as [`OrgwardError::Conflict`](crate::OrgwardError::Conflict);
/// the manager retries with a fresh id.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Insert the organization, the owner's membership, and `ALL` grants for
    /// `admin` and `owner`, atomically.
    async fn create_organization(&self, org: &NewOrganization) -> Result<Organization>;

    async fn find_by_id(&self, org_id: &str) -> Result<Option<Organization>>;

    /// Point the owner field at `new_owner` and grant them `owner = ALL`,
    /// atomically. The previous owner's grant is handled per `policy`.
    ///
    /// `NotFound` when the organization does not exist. `Conflict` when
    /// `new_owner` is not a member; membership is checked inside the same
    /// transaction, with the organization row locked against concurrent
    /// removals.
    async fn set_organization_owner(
        &self,
        org_id: &str,
        new_owner: UserId,
        policy: OwnerGrantPolicy,
    ) -> Result<()>;

    /// Live organizations `user_id` belongs to, with that user's grants.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrganizationSummary>>;
}
