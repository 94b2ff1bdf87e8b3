//! Invitation storage trait.

use crate::error::Result;
use crate::organizations::types::{AcceptedInvite, Invite};
use async_trait::async_trait;

/// Pending invitations, keyed by OTP.
#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Persist an invite. Creating two invites for the same user is allowed.
    async fn create_invite(&self, invite: &Invite) -> Result<()>;

    /// Consume an unexpired invite: insert the membership, apply its grants
    /// and delete it, atomically.
    ///
    /// `NotFound` when no live invite matches, whether the OTP never existed,
    /// expired or was already used. `Conflict` when the user is already a
    /// member; the invite is left in place.
    async fn accept_invite(&self, otp: &str, now: u64) -> Result<AcceptedInvite>;

    /// Delete invites with `expires_at <= now`. Returns how many were removed.
    async fn delete_expired_invites(&self, now: u64) -> Result<u64>;
}
