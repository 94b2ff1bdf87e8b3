//! OAuth identity resolution.
//!
//! Links an OAuth login to the local account with the same email address,
//! creating the account on first login. OAuth-created accounts have no local
//! password until one is set through the reset flow.

use crate::auth::password::UNUSABLE_PASSWORD_HASH;
use crate::error::{OrgwardError, Result};
use crate::traits::{NewOAuthUser, User, UserStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Identity returned by an OAuth provider after a successful callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthIdentity {
    /// Provider name, e.g. `"google"`.
    pub provider: String,
    pub provider_user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

/// Lowercased, trimmed email used for every account lookup.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Resolves OAuth identities to local users.
#[derive(Clone, Debug)]
pub struct IdentityResolver<U: UserStore> {
    users: U,
}

impl<U: UserStore> IdentityResolver<U> {
    #[must_use]
    pub fn new(users: U) -> Self {
        Self { users }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    /// Find or create the local user for `identity`.
    ///
    /// Returns the user and whether it was created by this call. A concurrent
    /// signup for the same email surfaces as [`OrgwardError::Conflict`]; use
    /// [`resolve_oauth`](Self::resolve_oauth) to retry the lookup instead.
    #[instrument(skip(self, identity), fields(provider = %identity.provider))]
    pub async fn login_oauth(&self, identity: &OAuthIdentity) -> Result<(User, bool)> {
        let email = normalize_email(&identity.email);
        if email.is_empty() {
            return Err(OrgwardError::bad_request("OAuth identity has no email"));
        }

        if let Some(user) = self.users.find_by_email(&email).await? {
            let user = self.backfill_avatar(user, identity).await?;
            debug!(user_id = user.id, "OAuth login linked to existing user");
            return Ok((user, false));
        }

        let user = self
            .users
            .create_oauth_user(&NewOAuthUser {
                email,
                first_name: identity.first_name.clone(),
                last_name: identity.last_name.clone(),
                password_hash: UNUSABLE_PASSWORD_HASH.to_string(),
                avatar_url: identity.avatar_url.clone(),
                provider: identity.provider.clone(),
                provider_user_id: identity.provider_user_id.clone(),
            })
            .await?;

        info!(
            target: "auth.oauth.user_created",
            user_id = user.id,
            provider = %identity.provider,
            "User created from OAuth login"
        );
        Ok((user, true))
    }

    /// [`login_oauth`](Self::login_oauth), retrying the lookup once when a
    /// concurrent signup won the race for the email.
    pub async fn resolve_oauth(&self, identity: &OAuthIdentity) -> Result<(User, bool)> {
        match self.login_oauth(identity).await {
            Err(OrgwardError::Conflict(_)) => {
                debug!("Concurrent OAuth signup, retrying lookup");
                let user = self
                    .users
                    .find_by_email(&normalize_email(&identity.email))
                    .await?
                    .ok_or_else(|| OrgwardError::conflict("user missing after signup conflict"))?;
                Ok((user, false))
            }
            other => other,
        }
    }

    async fn backfill_avatar(&self, mut user: User, identity: &OAuthIdentity) -> Result<User> {
        if user.avatar_url.is_some() {
            return Ok(user);
        }
        if let Some(avatar_url) = &identity.avatar_url {
            self.users.update_avatar_url(user.id, avatar_url).await?;
            user.avatar_url = Some(avatar_url.clone());
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryUserStore;

    fn identity(email: &str) -> OAuthIdentity {
        OAuthIdentity {
            provider: "google".into(),
            provider_user_id: "g-123".into(),
            email: email.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            avatar_url: Some("https://img.example.com/ada.png".into()),
        }
    }

    #[tokio::test]
    async fn test_creates_once() {
        let resolver = IdentityResolver::new(InMemoryUserStore::new());

        let (first, created) = resolver.login_oauth(&identity("Ada@Example.com ")).await.unwrap();
        assert!(created);
        assert_eq!(first.email, "ada@example.com");
        assert_eq!(first.password_hash, UNUSABLE_PASSWORD_HASH);

        let (second, created) = resolver.login_oauth(&identity("ada@example.com")).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(resolver.users().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_password_user_is_linked() {
        let users = InMemoryUserStore::new();
        let existing = users.insert("ada@example.com", "Ada", "L", "$argon2id$stub");
        let resolver = IdentityResolver::new(users);

        let (user, created) = resolver.login_oauth(&identity("ada@example.com")).await.unwrap();
        assert!(!created);
        assert_eq!(user.id, existing.id);
        assert_eq!(user.password_hash, "$argon2id$stub");
        assert_eq!(user.avatar_url.as_deref(), Some("https://img.example.com/ada.png"));
    }

    #[tokio::test]
    async fn test_conflict_retries_lookup() {
        let users = InMemoryUserStore::new();
        users.fail_next_create_with_conflict("ada@example.com");
        let resolver = IdentityResolver::new(users);

        let (user, created) = resolver.resolve_oauth(&identity("ada@example.com")).await.unwrap();
        assert!(!created);
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_missing_email_rejected() {
        let resolver = IdentityResolver::new(InMemoryUserStore::new());
        assert!(matches!(
            resolver.login_oauth(&identity("  ")).await,
            Err(OrgwardError::BadRequest(_))
        ));
    }
}
