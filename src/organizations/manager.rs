//! Organization manager.
//!
//! Handles organization creation, lookup, and ownership transfer on top of
//! the storage traits, with id generation, business rules, and tracing.

use super::config::OrgConfig;
use super::error::{OrganizationError, Result};
use super::storage::{MembershipStore, OrganizationStore};
use super::types::{NewOrganization, Organization, OrganizationSummary};
use crate::UserId;
use crate::error::OrgwardError;
use crate::utils::generate_org_id;
use tracing::{debug, info, instrument, warn};

/// Organization manager, generic over store implementations.
///
/// # Example
///
/// ```rust,ignore
/// use orgward::organizations::{InMemoryOrgStore, OrgConfig, OrganizationManager};
///
/// let store = InMemoryOrgStore::new();
/// let manager = OrganizationManager::new(store.clone(), store, OrgConfig::default());
///
/// let org = manager.create_organization(42, "Acme").await?;
/// assert_eq!(org.id.len(), 5);
/// ```
pub struct OrganizationManager<O, M>
where
    O: OrganizationStore,
    M: MembershipStore,
{
    org_store: O,
    membership_store: M,
    config: OrgConfig,
}

impl<O, M> OrganizationManager<O, M>
where
    O: OrganizationStore,
    M: MembershipStore,
{
    #[must_use]
    pub fn new(org_store: O, membership_store: M, config: OrgConfig) -> Self {
        Self {
            org_store,
            membership_store,
            config,
        }
    }

    pub fn org_store(&self) -> &O {
        &self.org_store
    }

    pub fn membership_store(&self) -> &M {
        &self.membership_store
    }

    pub fn config(&self) -> &OrgConfig {
        &self.config
    }

    /// Create an organization owned by `owner_user_id`.
    ///
    /// The owner becomes a member with `admin` and `owner` set to
    /// [`Permission::ALL`](crate::permissions::Permission::ALL). Id collisions are
    /// retried with a fresh id up to `max_id_attempts` times.
    #[instrument(skip(self), fields(org.name = %name))]
    pub async fn create_organization(
        &self,
        owner_user_id: UserId,
        name: &str,
    ) -> Result<Organization> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OrganizationError::InvalidName);
        }

        let attempts = self.config.max_id_attempts.max(1);
        for attempt in 1..=attempts {
            let new = NewOrganization {
                id: generate_org_id(self.config.org_id_len),
                name: name.to_string(),
                owner_user_id,
            };

            match self.org_store.create_organization(&new).await {
                Ok(org) => {
                    info!(org_id = %org.id, owner_user_id, "Organization created");
                    return Ok(org);
                }
                Err(OrgwardError::Conflict(_)) => {
                    warn!(org_id = %new.id, attempt, "Organization id collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(OrganizationError::IdCollision { attempts })
    }

    /// Get organization by ID.
    #[instrument(skip(self))]
    pub async fn find_organization(&self, org_id: &str) -> Result<Option<Organization>> {
        self.org_store.find_by_id(org_id).await.map_err(Into::into)
    }

    /// Get organization by ID, returning an error if it does not exist.
    #[instrument(skip(self))]
    pub async fn get_organization(&self, org_id: &str) -> Result<Organization> {
        self.org_store
            .find_by_id(org_id)
            .await?
            .ok_or_else(|| OrganizationError::not_found(org_id))
    }

    /// Organizations the user belongs to, with their grants in each.
    #[instrument(skip(self))]
    pub async fn list_user_organizations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrganizationSummary>> {
        self.org_store
            .list_for_user(user_id)
            .await
            .map_err(Into::into)
    }

    /// Make `new_owner` the owner of the organization.
    ///
    /// The new owner must already be a member. Whether the previous owner keeps
    /// their `owner` grant follows [`OrgConfig::owner_grant_policy`].
    #[instrument(skip(self))]
    pub async fn set_organization_owner(&self, org_id: &str, new_owner: UserId) -> Result<()> {
        // Membership is checked by the store, in the same transaction.
        self.org_store
            .set_organization_owner(org_id, new_owner, self.config.owner_grant_policy)
            .await
            .map_err(|e| match e {
                OrgwardError::NotFound(_) => OrganizationError::not_found(org_id),
                OrgwardError::Conflict(_) => {
                    debug!(org_id, new_owner, "New owner is not a member");
                    OrganizationError::NotMember
                }
                other => other.into(),
            })?;

        info!(org_id, new_owner, "Organization owner set");
        Ok(())
    }

    /// Transfer ownership on behalf of `actor_id`, who must be the current owner.
    #[instrument(skip(self))]
    pub async fn transfer_ownership(
        &self,
        actor_id: UserId,
        org_id: &str,
        new_owner: UserId,
    ) -> Result<()> {
        let org = self.get_organization(org_id).await?;
        if !org.is_owned_by(actor_id) {
            debug!(org_id, actor_id, "Transfer requested by non-owner");
            return Err(OrganizationError::NotOwner);
        }

        self.set_organization_owner(org_id, new_owner).await
    }

    /// Check if a user is a member of an organization.
    pub async fn is_member(&self, org_id: &str, user_id: UserId) -> Result<bool> {
        self.membership_store
            .is_member(org_id, user_id)
            .await
            .map_err(Into::into)
    }
}

impl<O, M> std::fmt::Debug for OrganizationManager<O, M>
where
    O: OrganizationStore,
    M: MembershipStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganizationManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
