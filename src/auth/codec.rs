//! Signing and verification of session and password-reset tokens.
//!
//! Tokens are compact HS256 JWTs. Verification pins the algorithm, the
//! issuer and the token type, and applies no clock leeway.

use super::claims::{PasswordResetClaims, SessionClaims, SessionSubject, TokenType};
use super::error::{AuthError, Result};
use crate::UserId;
use crate::config::{AuthConfig, validate_auth};
use crate::permissions::{PERMISSIONS_FORMAT_VERSION, check_version};
use crate::utils::{current_timestamp, generate_jti};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// A freshly signed session token with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

/// Issues and verifies tokens with the process-wide signing secret.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct TokenCodec {
    keys: Arc<Keys>,
    issuer: String,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenCodec {
    /// Build a codec from validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`crate::OrgwardError::Fatal`] for a missing or short secret.
    pub fn new(config: &AuthConfig) -> crate::Result<Self> {
        validate_auth(config)?;

        let secret = config.jwt_secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[config.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        Ok(Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                validation,
            }),
            issuer: config.issuer().to_string(),
            session_ttl: config.session_ttl(),
            reset_ttl: config.password_reset_ttl(),
        })
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn reset_ttl(&self) -> Duration {
        self.reset_ttl
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Mint a session token for `subject`, expiring one session TTL from now.
    pub fn issue_session(&self, subject: SessionSubject) -> Result<IssuedSession> {
        let now = current_timestamp();
        let claims = SessionClaims {
            user_id: subject.user_id,
            email: subject.email,
            organization_id: subject.organization_id,
            perms: subject.perms,
            perms_version: PERMISSIONS_FORMAT_VERSION,
            issuer: self.issuer.clone(),
            issued_at: now,
            expires_at: now.saturating_add(self.session_ttl.as_secs()),
            jti: generate_jti(),
            token_type: TokenType::Session,
        };
        let token = self.sign(&claims)?;
        Ok(IssuedSession { token, claims })
    }

    /// Re-sign existing claims with a fresh expiry.
    pub fn renew(&self, claims: &SessionClaims) -> Result<IssuedSession> {
        let claims = claims.refreshed(
            current_timestamp(),
            self.session_ttl.as_secs(),
            generate_jti(),
        );
        let token = self.sign(&claims)?;
        Ok(IssuedSession { token, claims })
    }

    /// Verify a session token and return its claims.
    ///
    /// Every failure is reported as [`AuthError::InvalidToken`]. The cause is
    /// logged at debug level only.
    pub fn parse_session(&self, token: &str) -> Result<SessionClaims> {
        let claims: SessionClaims = self.verify(token)?;

        if claims.token_type != TokenType::Session {
            tracing::debug!(typ = ?claims.token_type, "rejected token of wrong type");
            return Err(AuthError::InvalidToken);
        }
        if let Err(e) = check_version(claims.perms_version) {
            tracing::debug!(error = %e, "rejected token with unreadable permissions");
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Mint a password-reset token. `allowed` starts out false.
    pub fn issue_reset_token(&self, user_id: UserId) -> Result<String> {
        self.issue_reset_token_with(user_id, false)
    }

    /// Mint a password-reset token with an explicit `allowed` flag.
    pub fn issue_reset_token_with(&self, user_id: UserId, allowed: bool) -> Result<String> {
        let now = current_timestamp();
        let claims = PasswordResetClaims {
            user_id,
            allowed,
            issuer: self.issuer.clone(),
            issued_at: now,
            expires_at: now.saturating_add(self.reset_ttl.as_secs()),
            token_type: TokenType::PasswordReset,
        };
        self.sign(&claims)
    }

    /// Verify a password-reset token. Session tokens are rejected.
    pub fn parse_reset_token(&self, token: &str) -> Result<PasswordResetClaims> {
        let claims: PasswordResetClaims = self.verify(token)?;
        if claims.token_type != TokenType::PasswordReset {
            tracing::debug!(typ = ?claims.token_type, "rejected token of wrong type");
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }

    /// `true` when less than half the session TTL remains.
    pub fn needs_renewal(&self, claims: &SessionClaims, now: u64) -> bool {
        claims.remaining_secs(now) < self.session_ttl.as_secs() / 2
    }

    pub(crate) fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.keys.encoding)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        decode::<T>(token, &self.keys.decoding, &self.keys.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token verification failed");
                AuthError::InvalidToken
            })
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("session_ttl", &self.session_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .finish_non_exhaustive()
    }
}
