//! In-memory organization store.
//!
//! Implements all three storage traits over one lock, so every workflow is
//! atomic with respect to every other. Used by tests and local development.

use super::storage::{InvitationStore, MembershipStore, OrganizationStore};
use super::types::{
    ADMIN_ACTION, AcceptedInvite, Invite, NEW_OWNER_NOT_MEMBER, NewOrganization, OWNER_ACTION,
    Organization, OrganizationSummary, OwnerGrantPolicy,
};
use crate::UserId;
use crate::error::{OrgwardError, Result};
use crate::permissions::{ActionPermissions, Permission};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    orgs: HashMap<String, Organization>,
    members: HashSet<(String, UserId)>,
    grants: HashMap<(String, UserId), ActionPermissions>,
    invites: HashMap<String, Invite>,
}

/// In-memory store implementing all organization storage traits.
///
/// Cloning shares the same underlying data.
#[derive(Clone, Default)]
pub struct InMemoryOrgStore {
    inner: Arc<RwLock<State>>,
}

impl InMemoryOrgStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding invites, expired or not.
    pub fn invite_count(&self) -> usize {
        self.read().map(|state| state.invites.len()).unwrap_or(0)
    }

    /// Mark an organization deleted (test setup).
    pub fn soft_delete(&self, org_id: &str) -> Result<()> {
        let mut state = self.write()?;
        let org = state
            .orgs
            .get_mut(org_id)
            .ok_or_else(|| OrgwardError::not_found(format!("organization {}", org_id)))?;
        org.deleted_at = Some(Utc::now());
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| OrgwardError::internal("organization store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| OrgwardError::internal("organization store lock poisoned"))
    }
}

impl std::fmt::Debug for InMemoryOrgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryOrgStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl OrganizationStore for InMemoryOrgStore {
    async fn create_organization(&self, new: &NewOrganization) -> Result<Organization> {
        let mut state = self.write()?;
        if state.orgs.contains_key(&new.id) {
            return Err(OrgwardError::conflict(format!(
                "organization id {} already exists",
                new.id
            )));
        }

        let org = Organization {
            id: new.id.clone(),
            name: new.name.clone(),
            owner_user_id: new.owner_user_id,
            billing_plan_id: None,
            created_at: Utc::now(),
            deleted_at: None,
        };
        let key = (new.id.clone(), new.owner_user_id);

        state.orgs.insert(new.id.clone(), org.clone());
        state.members.insert(key.clone());
        state.grants.insert(
            key,
            ActionPermissions::new()
                .with(ADMIN_ACTION, Permission::ALL)
                .with(OWNER_ACTION, Permission::ALL),
        );

        Ok(org)
    }

    async fn find_by_id(&self, org_id: &str) -> Result<Option<Organization>> {
        Ok(self.read()?.orgs.get(org_id).cloned())
    }

    async fn set_organization_owner(
        &self,
        org_id: &str,
        new_owner: UserId,
        policy: OwnerGrantPolicy,
    ) -> Result<()> {
        let mut state = self.write()?;
        if !state.orgs.contains_key(org_id) {
            return Err(OrgwardError::not_found(format!("organization {}", org_id)));
        }
        if !state.members.contains(&(org_id.to_string(), new_owner)) {
            return Err(OrgwardError::conflict(NEW_OWNER_NOT_MEMBER));
        }
        let org = state
            .orgs
            .get_mut(org_id)
            .ok_or_else(|| OrgwardError::not_found(format!("organization {}", org_id)))?;
        let previous = org.owner_user_id;
        org.owner_user_id = new_owner;

        state
            .grants
            .entry((org_id.to_string(), new_owner))
            .or_default()
            .grant(OWNER_ACTION, Permission::ALL);

        if policy == OwnerGrantPolicy::RevokePrevious && previous != new_owner {
            if let Some(grants) = state.grants.get_mut(&(org_id.to_string(), previous)) {
                grants.revoke(OWNER_ACTION);
            }
        }

        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrganizationSummary>> {
        let state = self.read()?;
        let mut summaries: Vec<OrganizationSummary> = state
            .members
            .iter()
            .filter(|(_, member)| *member == user_id)
            .filter_map(|(org_id, _)| state.orgs.get(org_id))
            .filter(|org| org.deleted_at.is_none())
            .map(|org| OrganizationSummary {
                organization_id: org.id.clone(),
                name: org.name.clone(),
                perms: state
                    .grants
                    .get(&(org.id.clone(), user_id))
                    .cloned()
                    .unwrap_or_default(),
                is_owner: org.is_owned_by(user_id),
            })
            .collect();
        summaries.sort_by(|a, b| a.organization_id.cmp(&b.organization_id));
        Ok(summaries)
    }
}

#[async_trait]
impl MembershipStore for InMemoryOrgStore {
    async fn is_member(&self, org_id: &str, user_id: UserId) -> Result<bool> {
        Ok(self
            .read()?
            .members
            .contains(&(org_id.to_string(), user_id)))
    }

    async fn permissions(&self, org_id: &str, user_id: UserId) -> Result<ActionPermissions> {
        Ok(self
            .read()?
            .grants
            .get(&(org_id.to_string(), user_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn set_permission(
        &self,
        org_id: &str,
        user_id: UserId,
        action: &str,
        permission: Permission,
    ) -> Result<()> {
        let mut state = self.write()?;
        let key = (org_id.to_string(), user_id);
        if !state.members.contains(&key) {
            return Err(OrgwardError::not_found("membership"));
        }
        state.grants.entry(key).or_default().grant(action, permission);
        Ok(())
    }

    async fn revoke_permission(&self, org_id: &str, user_id: UserId, action: &str) -> Result<bool> {
        let mut state = self.write()?;
        Ok(state
            .grants
            .get_mut(&(org_id.to_string(), user_id))
            .and_then(|grants| grants.revoke(action))
            .is_some())
    }

    async fn remove_user_from_org(&self, org_id: &str, user_id: UserId) -> Result<()> {
        let mut state = self.write()?;
        let org = state
            .orgs
            .get(org_id)
            .ok_or_else(|| OrgwardError::not_found(format!("organization {}", org_id)))?;
        if org.is_owned_by(user_id) {
            return Err(OrgwardError::conflict("cannot remove the organization owner"));
        }

        let key = (org_id.to_string(), user_id);
        if !state.members.remove(&key) {
            return Err(OrgwardError::not_found("membership"));
        }
        state.grants.remove(&key);
        Ok(())
    }
}

#[async_trait]
impl InvitationStore for InMemoryOrgStore {
    async fn create_invite(&self, invite: &Invite) -> Result<()> {
        let mut state = self.write()?;
        if state.invites.contains_key(&invite.otp) {
            return Err(OrgwardError::conflict("invite otp already exists"));
        }
        state.invites.insert(invite.otp.clone(), invite.clone());
        Ok(())
    }

    async fn accept_invite(&self, otp: &str, now: u64) -> Result<AcceptedInvite> {
        let mut state = self.write()?;
        let invite = match state.invites.get(otp) {
            Some(invite) if invite.expires_at > now => invite.clone(),
            _ => return Err(OrgwardError::not_found("invitation")),
        };
        let org_live = state
            .orgs
            .get(&invite.organization_id)
            .is_some_and(|org| org.deleted_at.is_none());
        if !org_live {
            return Err(OrgwardError::not_found("invitation"));
        }

        let key = (invite.organization_id.clone(), invite.user_id);
        if state.members.contains(&key) {
            return Err(OrgwardError::conflict("user is already a member"));
        }

        state.members.insert(key.clone());
        let grants = state.grants.entry(key).or_default();
        for (action, permission) in invite.perms.iter() {
            grants.grant(action, permission);
        }
        state.invites.remove(otp);

        Ok(AcceptedInvite {
            organization_id: invite.organization_id,
            user_id: invite.user_id,
            perms: invite.perms,
        })
    }

    async fn delete_expired_invites(&self, now: u64) -> Result<u64> {
        let mut state = self.write()?;
        let before = state.invites.len();
        state.invites.retain(|_, invite| invite.expires_at > now);
        Ok((before - state.invites.len()) as u64)
    }
}
