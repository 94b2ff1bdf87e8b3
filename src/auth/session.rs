//! Session workflows: password login, OAuth login, switching the active
//! organization, password signup confirmation and the password reset handoff.
//!
//! This module emits tracing events for security monitoring:
//! - `auth.login.succeeded` / `auth.login.failed`
//! - `auth.register.requested` / `auth.register.confirmed` /
//!   `auth.register.failed`
//! - `auth.session.org_switched`
//! - `auth.password.reset_requested` / `auth.password.reset_completed` /
//!   `auth.password.reset_failed`

use crate::auth::claims::{SessionClaims, SessionSubject};
use crate::auth::codec::{IssuedSession, TokenCodec};
use crate::auth::password::{PasswordHasher, PasswordPolicy};
use crate::config::AuthConfig;
use crate::email::Notifier;
use crate::error::{OrgwardError, Result};
use crate::identity::{IdentityResolver, OAuthIdentity, normalize_email};
use crate::organizations::MembershipStore;
use crate::traits::{
    EmailRecipient, PasswordResetRecord, PasswordResetStore, UnconfirmedUser, UnconfirmedUserStore,
    User, UserStore,
};
use crate::utils::{current_timestamp, generate_otp, hash_otp};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Outcome of an OAuth login.
#[derive(Debug, Clone)]
pub struct OAuthLogin {
    pub session: IssuedSession,
    pub user: User,
    /// `true` only for the login that created the account.
    pub created: bool,
}

/// Issues sessions for users and runs the password reset flow.
///
/// # Example
///
/// ```rust,ignore
/// use orgward::auth::SessionService;
///
/// let sessions = SessionService::from_config(&config.auth, users, org_store, resets)?
///     .with_notifier(notifier);
///
/// let session = sessions.login("ada@example.com", "correct horse").await?;
/// let scoped = sessions.set_active_organization(&session.claims, "abcde").await?;
/// ```
pub struct SessionService<U, M, R>
where
    U: UserStore,
    M: MembershipStore,
    R: PasswordResetStore,
{
    codec: TokenCodec,
    identity: IdentityResolver<U>,
    memberships: M,
    resets: R,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    notifier: Option<Notifier>,
    otp_len: usize,
    confirmation_ttl: Duration,
}

impl<U, M, R> SessionService<U, M, R>
where
    U: UserStore,
    M: MembershipStore,
    R: PasswordResetStore,
{
    #[must_use]
    pub fn new(codec: TokenCodec, users: U, memberships: M, resets: R) -> Self {
        Self {
            codec,
            identity: IdentityResolver::new(users),
            memberships,
            resets,
            hasher: PasswordHasher::default(),
            policy: PasswordPolicy::default(),
            notifier: None,
            otp_len: 128,
            confirmation_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }

    /// Build the codec from `config` and take the OTP length and signup
    /// confirmation window from it.
    pub fn from_config(config: &AuthConfig, users: U, memberships: M, resets: R) -> Result<Self> {
        let codec = TokenCodec::new(config)?;
        Ok(Self::new(codec, users, memberships, resets)
            .with_otp_len(config.otp_len)
            .with_confirmation_ttl(config.confirmation_ttl()))
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn with_password_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_otp_len(mut self, len: usize) -> Self {
        self.otp_len = len;
        self
    }

    #[must_use]
    pub fn with_confirmation_ttl(mut self, ttl: Duration) -> Self {
        self.confirmation_ttl = ttl;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn users(&self) -> &U {
        self.identity.users()
    }

    /// Password login. The session has no active organization.
    ///
    /// Unknown email and wrong password fail identically.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession> {
        let email = normalize_email(email);

        let user = match self.users().find_by_email(&email).await? {
            Some(user) => user,
            None => {
                // Hash anyway so response time does not reveal unknown emails.
                let _ = self.hasher.hash("dummy");
                warn!(target: "auth.login.failed", reason = "unknown_email", "Login failed");
                return Err(OrgwardError::unauthorized(INVALID_CREDENTIALS));
            }
        };

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(target: "auth.login.failed", user_id = user.id, reason = "bad_password", "Login failed");
            return Err(OrgwardError::unauthorized(INVALID_CREDENTIALS));
        }

        let session = self
            .codec
            .issue_session(SessionSubject::new(user.id, &user.email))?;
        info!(target: "auth.login.succeeded", user_id = user.id, "Login succeeded");
        Ok(session)
    }

    /// OAuth login: link or create the local user and start a session.
    ///
    /// The account-created email is sent only for the login that created it.
    #[instrument(skip(self, identity), fields(provider = %identity.provider))]
    pub async fn login_oauth(&self, identity: &OAuthIdentity) -> Result<OAuthLogin> {
        let (user, created) = self.identity.resolve_oauth(identity).await?;

        if created {
            if let Some(notifier) = &self.notifier {
                notifier.account_created(EmailRecipient::new(&user.email, user.display_name()));
            }
        }

        let session = self
            .codec
            .issue_session(SessionSubject::new(user.id, &user.email))?;
        info!(target: "auth.login.succeeded", user_id = user.id, created, "OAuth login succeeded");

        Ok(OAuthLogin {
            session,
            user,
            created,
        })
    }

    /// Mint a new session scoped to `org_id` carrying the caller's current grants.
    #[instrument(skip(self, claims), fields(user_id = claims.user_id))]
    pub async fn set_active_organization(
        &self,
        claims: &SessionClaims,
        org_id: &str,
    ) -> Result<IssuedSession> {
        if !self.memberships.is_member(org_id, claims.user_id).await? {
            debug!(org_id, "Refusing to scope session to non-member organization");
            return Err(OrgwardError::unauthorized("not a member of this organization"));
        }

        let perms = self.memberships.permissions(org_id, claims.user_id).await?;
        let session = self.codec.issue_session(
            SessionSubject::new(claims.user_id, &claims.email).with_organization(org_id, perms),
        )?;

        info!(target: "auth.session.org_switched", user_id = claims.user_id, org_id, "Active organization set");
        Ok(session)
    }

    /// Claims with grants re-read for the claims' organization.
    ///
    /// Handlers that change the caller's own grants put the result in the
    /// response extensions for the reauthorize middleware to sign.
    #[instrument(skip(self, claims), fields(user_id = claims.user_id))]
    pub async fn refresh_claims(&self, claims: &SessionClaims) -> Result<SessionClaims> {
        let Some(org_id) = claims.organization_id.as_deref() else {
            return Ok(claims.clone());
        };

        if !self.memberships.is_member(org_id, claims.user_id).await? {
            return Err(OrgwardError::unauthorized("no longer a member of this organization"));
        }

        let perms = self.memberships.permissions(org_id, claims.user_id).await?;
        Ok(SessionClaims {
            perms,
            ..claims.clone()
        })
    }

    /// Start a password reset for `email`.
    ///
    /// Always succeeds for unknown emails, without sending anything, so
    /// addresses cannot be enumerated.
    #[instrument(skip(self))]
    pub async fn begin_password_reset(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);

        let Some(user) = self.users().find_by_email(&email).await? else {
            info!(
                target: "auth.password.reset_requested",
                user_found = false,
                "Password reset requested for unknown email"
            );
            return Ok(());
        };

        let otp = generate_otp(self.otp_len);
        let ttl = self.codec.reset_ttl();
        self.resets
            .create_reset(&PasswordResetRecord {
                user_id: user.id,
                otp_hash: hash_otp(&otp),
                expires_at: current_timestamp().saturating_add(ttl.as_secs()),
            })
            .await?;

        if let Some(notifier) = &self.notifier {
            notifier.password_reset(EmailRecipient::new(&user.email, user.display_name()), otp);
        }

        info!(
            target: "auth.password.reset_requested",
            user_id = user.id,
            user_found = true,
            expires_in_secs = ttl.as_secs(),
            "Password reset OTP issued"
        );
        Ok(())
    }

    /// Exchange the emailed OTP for a reset token.
    ///
    /// Unknown and expired OTPs are indistinguishable.
    #[instrument(skip(self, otp))]
    pub async fn exchange_reset_otp(&self, otp: &str) -> Result<String> {
        let record = self
            .resets
            .find_live(&hash_otp(otp), current_timestamp())
            .await?
            .ok_or_else(|| OrgwardError::not_found("password reset"))?;

        let token = self.codec.issue_reset_token_with(record.user_id, true)?;
        debug!(user_id = record.user_id, "Reset OTP exchanged");
        Ok(token)
    }

    /// Set a new password using a reset token.
    ///
    /// The token is honoured only while the user still has a live reset
    /// record. Completing the reset deletes the records, so the same token
    /// cannot be used twice.
    #[instrument(skip_all)]
    pub async fn complete_password_reset(&self, reset_token: &str, new_password: &str) -> Result<()> {
        let claims = self.codec.parse_reset_token(reset_token).map_err(|e| {
            warn!(target: "auth.password.reset_failed", reason = "invalid_token", "Password reset failed");
            OrgwardError::from(e)
        })?;

        if !claims.allowed {
            warn!(target: "auth.password.reset_failed", user_id = claims.user_id, reason = "not_allowed", "Password reset failed");
            return Err(OrgwardError::unauthorized("reset not allowed"));
        }

        if !self
            .resets
            .has_live_reset(claims.user_id, current_timestamp())
            .await?
        {
            warn!(target: "auth.password.reset_failed", user_id = claims.user_id, reason = "no_live_reset", "Password reset failed");
            return Err(OrgwardError::unauthorized("reset no longer valid"));
        }

        if let Err(e) = self.policy.check(new_password) {
            info!(target: "auth.password.reset_failed", user_id = claims.user_id, reason = "weak_password", "Password reset failed");
            return Err(e);
        }

        let password_hash = self.hasher.hash(new_password)?;
        self.users()
            .update_password_hash(claims.user_id, &password_hash)
            .await?;
        self.resets.delete_for_user(claims.user_id).await?;

        info!(target: "auth.password.reset_completed", user_id = claims.user_id, "Password reset completed");
        Ok(())
    }

    /// Sweep expired reset records.
    pub async fn delete_expired_resets(&self) -> Result<u64> {
        self.resets.delete_expired(current_timestamp()).await
    }
}

impl<U, M, R> SessionService<U, M, R>
where
    U: UserStore + UnconfirmedUserStore,
    M: MembershipStore,
    R: PasswordResetStore,
{
    /// Start a password signup. The account exists only once the emailed OTP
    /// is confirmed.
    ///
    /// Signing up again before confirming replaces the pending signup, so only
    /// the latest OTP works. Fails with `Conflict` when an account already
    /// uses the email.
    #[instrument(skip(self, password, first_name, last_name))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<()> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(OrgwardError::bad_request("invalid email"));
        }
        if let Err(e) = self.policy.check(password) {
            info!(target: "auth.register.failed", reason = "weak_password", "Registration failed");
            return Err(e);
        }
        if self.users().find_by_email(&email).await?.is_some() {
            info!(target: "auth.register.failed", reason = "email_taken", "Registration failed");
            return Err(OrgwardError::conflict("email already registered"));
        }

        let otp = generate_otp(self.otp_len);
        let pending = UnconfirmedUser {
            email,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            password_hash: self.hasher.hash(password)?,
            otp_hash: hash_otp(&otp),
            expires_at: current_timestamp().saturating_add(self.confirmation_ttl.as_secs()),
        };
        self.users().upsert_unconfirmed(&pending).await?;

        if let Some(notifier) = &self.notifier {
            let name = format!("{} {}", pending.first_name, pending.last_name);
            notifier.email_confirmation(EmailRecipient::new(&pending.email, name.trim()), otp);
        }

        info!(
            target: "auth.register.requested",
            expires_in_secs = self.confirmation_ttl.as_secs(),
            "Confirmation OTP issued"
        );
        Ok(())
    }

    /// Create the account for the pending signup the OTP belongs to.
    ///
    /// Each OTP confirms once. Unknown and expired OTPs both fail with
    /// `NotFound`.
    #[instrument(skip_all)]
    pub async fn confirm_registration(&self, otp: &str) -> Result<User> {
        let user = self
            .users()
            .confirm_unconfirmed(&hash_otp(otp), current_timestamp())
            .await
            .inspect_err(|e| {
                warn!(target: "auth.register.failed", error = %e, reason = "confirm", "Registration failed");
            })?;

        info!(target: "auth.register.confirmed", user_id = user.id, "Registration confirmed");
        Ok(user)
    }

    /// Sweep signups whose OTP expired.
    pub async fn delete_expired_registrations(&self) -> Result<u64> {
        self.users()
            .delete_expired_unconfirmed(current_timestamp())
            .await
    }
}

impl<U, M, R> std::fmt::Debug for SessionService<U, M, R>
where
    U: UserStore,
    M: MembershipStore,
    R: PasswordResetStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("codec", &self.codec)
            .field("otp_len", &self.otp_len)
            .field("confirmation_ttl", &self.confirmation_ttl)
            .finish_non_exhaustive()
    }
}
