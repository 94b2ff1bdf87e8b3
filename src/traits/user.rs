//! User store abstraction.
//!
//! The core needs only ids, email, names, the password hash and avatar.
//! Everything else about a user lives in the application.

use crate::UserId;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A local account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// PHC string, or the OAuth sentinel for accounts without a local password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Fields for an account created from an OAuth login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOAuthUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub provider: String,
    pub provider_user_id: String,
}

/// Persistent user accounts.
///
/// Email addresses are unique. Implementations must enforce that with a
/// storage-level constraint and report violations as
/// [`OrgwardError::Conflict`](crate::OrgwardError::Conflict).
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Create the user and its OAuth link in one transaction.
    async fn create_oauth_user(&self, user: &NewOAuthUser) -> Result<User>;

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<()>;

    async fn update_avatar_url(&self, id: UserId, avatar_url: &str) -> Result<()>;
}

/// A password signup waiting for its emailed OTP.
///
/// Only the SHA-256 digest of the OTP is stored. The record becomes a
/// [`User`] through [`UnconfirmedUserStore::confirm_unconfirmed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnconfirmedUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub otp_hash: String,
    /// Unix seconds.
    pub expires_at: u64,
}

/// Signups that have not confirmed their email yet.
///
/// At most one pending signup exists per email. A record is live while
/// `expires_at > now`.
#[async_trait]
pub trait UnconfirmedUserStore: Send + Sync {
    /// Store the signup, replacing any pending one for the same email.
    ///
    /// Fails with `Conflict` when an account already uses the email. The
    /// check and the write happen in one transaction.
    async fn upsert_unconfirmed(&self, user: &UnconfirmedUser) -> Result<()>;

    /// Turn the live signup matching `otp_hash` into an account and delete
    /// the signup, in one transaction.
    ///
    /// `NotFound` when no live signup matches. `Conflict` when the email was
    /// taken since the signup was stored.
    async fn confirm_unconfirmed(&self, otp_hash: &str, now: u64) -> Result<User>;

    /// Delete signups with `expires_at <= now`. Returns how many went.
    async fn delete_expired_unconfirmed(&self, now: u64) -> Result<u64>;
}
