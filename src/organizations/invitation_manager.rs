//! Invitation manager.
//!
//! Handles invitation creation, acceptance, and the expiry sweep.

use super::config::OrgConfig;
use super::error::{OrganizationError, Result};
use super::storage::{InvitationStore, OrganizationStore};
use super::types::{AcceptedInvite, Invite};
use crate::email::Notifier;
use crate::error::OrgwardError;
use crate::permissions::ActionPermissions;
use crate::traits::{EmailRecipient, User};
use crate::utils::{current_timestamp, generate_otp};
use tracing::{debug, info, instrument};

/// Invitation manager - handles the invitation lifecycle.
///
/// Invites are delivered by email through an optional [`Notifier`]. Delivery
/// runs in the background and never affects the outcome of the call.
///
/// # Example
///
/// ```rust,ignore
/// use orgward::organizations::{InvitationManager, OrgConfig};
/// use orgward::permissions::{ActionPermissions, Permission};
///
/// let manager = InvitationManager::new(store.clone(), store, OrgConfig::default())
///     .with_notifier(notifier);
///
/// let perms = ActionPermissions::new().with("admin", Permission::READ_WRITE);
/// let invite = manager.create_invite("abcde", &invitee, perms).await?;
///
/// // Later, from the link in the email:
/// let accepted = manager.accept_invite(&otp).await?;
/// ```
pub struct InvitationManager<I, O>
where
    I: InvitationStore,
    O: OrganizationStore,
{
    invitation_store: I,
    org_store: O,
    notifier: Option<Notifier>,
    config: OrgConfig,
}

impl<I, O> InvitationManager<I, O>
where
    I: InvitationStore,
    O: OrganizationStore,
{
    #[must_use]
    pub fn new(invitation_store: I, org_store: O, config: OrgConfig) -> Self {
        Self {
            invitation_store,
            org_store,
            notifier: None,
            config,
        }
    }

    /// Send invite emails through `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn invitation_store(&self) -> &I {
        &self.invitation_store
    }

    pub fn config(&self) -> &OrgConfig {
        &self.config
    }

    /// Invite `invitee` into the organization with `perms`.
    ///
    /// Calling this twice creates two outstanding invites.
    #[instrument(skip(self, invitee, perms), fields(invitee.id = invitee.id))]
    pub async fn create_invite(
        &self,
        org_id: &str,
        invitee: &User,
        perms: ActionPermissions,
    ) -> Result<Invite> {
        let org = self
            .org_store
            .find_by_id(org_id)
            .await?
            .filter(|org| org.deleted_at.is_none())
            .ok_or_else(|| OrganizationError::not_found(org_id))?;

        let invite = Invite {
            organization_id: org.id.clone(),
            user_id: invitee.id,
            perms,
            otp: generate_otp(self.config.otp_len),
            expires_at: current_timestamp().saturating_add(self.config.invite_ttl.as_secs()),
        };
        self.invitation_store.create_invite(&invite).await?;

        info!(org_id, invitee = invitee.id, expires_at = invite.expires_at, "Invitation created");

        if let Some(notifier) = &self.notifier {
            notifier.organization_invite(
                EmailRecipient::new(&invitee.email, invitee.display_name()),
                invite.otp.clone(),
                org.name,
            );
        }

        Ok(invite)
    }

    /// Accept an invite by its OTP.
    ///
    /// Unknown and expired OTPs are indistinguishable. An invite for a user
    /// who is already a member fails with [`OrganizationError::AlreadyMember`]
    /// and stays outstanding.
    #[instrument(skip(self, otp))]
    pub async fn accept_invite(&self, otp: &str) -> Result<AcceptedInvite> {
        let accepted = self
            .invitation_store
            .accept_invite(otp, current_timestamp())
            .await
            .map_err(|e| match e {
                OrgwardError::NotFound(_) => OrganizationError::InvitationNotFound,
                OrgwardError::Conflict(_) => OrganizationError::AlreadyMember,
                other => other.into(),
            })?;

        info!(
            org_id = %accepted.organization_id,
            user_id = accepted.user_id,
            "Invitation accepted"
        );
        Ok(accepted)
    }

    /// Delete every invite that has expired. Safe to run concurrently.
    #[instrument(skip(self))]
    pub async fn delete_expired_invites(&self) -> Result<u64> {
        let deleted = self
            .invitation_store
            .delete_expired_invites(current_timestamp())
            .await?;
        debug!(deleted, "Expired invitations swept");
        Ok(deleted)
    }
}

impl<I, O> std::fmt::Debug for InvitationManager<I, O>
where
    I: InvitationStore,
    O: OrganizationStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvitationManager")
            .field("notifier", &self.notifier)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
