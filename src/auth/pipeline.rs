//! Request-level authentication and organization authorization.
//!
//! The checks run in a fixed order: credential present, token valid,
//! token scoped to the requested organization, every required grant held.
//! Each failure is a distinct [`AuthError`] for logging, and all of them
//! surface to clients as the same `Unauthorized`.

use super::claims::SessionClaims;
use super::codec::{IssuedSession, TokenCodec};
use super::error::{AuthError, Result};
use crate::permissions::ActionPermissions;
use crate::utils::current_timestamp;

/// Outcome of a successful authentication.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub claims: SessionClaims,
    /// Replacement token, present when the presented one passed half its lifetime.
    pub renewed: Option<IssuedSession>,
}

/// Verifies session credentials and organization grants.
#[derive(Debug, Clone)]
pub struct AuthPipeline {
    codec: TokenCodec,
}

impl AuthPipeline {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify a session credential, renewing it when it is close to expiry.
    pub fn authenticate(&self, credential: Option<&str>) -> Result<Authenticated> {
        let token = credential.ok_or(AuthError::MissingCredential)?;
        let claims = self.codec.parse_session(token)?;

        let renewed = if self.codec.needs_renewal(&claims, current_timestamp()) {
            let issued = self.codec.renew(&claims)?;
            tracing::debug!(user_id = claims.user_id, "renewing session token");
            Some(issued)
        } else {
            None
        };

        Ok(Authenticated { claims, renewed })
    }

    /// Check that `claims` are scoped to `org_id` and hold every grant in `required`.
    pub fn check_organization(
        &self,
        claims: &SessionClaims,
        org_id: &str,
        required: &ActionPermissions,
    ) -> Result<()> {
        if !claims.is_scoped_to(org_id) {
            return Err(AuthError::wrong_organization(org_id));
        }

        if let Some(action) = claims.perms.first_unsatisfied(required) {
            return Err(AuthError::insufficient_permission(action));
        }

        Ok(())
    }

    /// [`authenticate`](Self::authenticate) then [`check_organization`](Self::check_organization).
    pub fn authorize_for_organization(
        &self,
        credential: Option<&str>,
        org_id: &str,
        required: &ActionPermissions,
    ) -> Result<Authenticated> {
        let authenticated = self.authenticate(credential)?;
        self.check_organization(&authenticated.claims, org_id, required)?;
        Ok(authenticated)
    }

    /// Mint a fresh token carrying the same claims.
    pub fn reauthorize(&self, claims: &SessionClaims) -> Result<IssuedSession> {
        self.codec.renew(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::SessionSubject;
    use crate::config::AuthConfig;
    use crate::permissions::Permission;

    fn pipeline() -> AuthPipeline {
        let codec = TokenCodec::new(&AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            ..AuthConfig::default()
        })
        .unwrap();
        AuthPipeline::new(codec)
    }

    fn admin_rw() -> ActionPermissions {
        ActionPermissions::new().with("admin", Permission::READ_WRITE)
    }

    fn token_for(pipeline: &AuthPipeline, org: Option<&str>, perms: ActionPermissions) -> String {
        let mut subject = SessionSubject::new(1, "a@example.com");
        if let Some(org) = org {
            subject = subject.with_organization(org, perms);
        }
        pipeline.codec().issue_session(subject).unwrap().token
    }

    #[test]
    fn test_missing_credential() {
        assert!(matches!(
            pipeline().authenticate(None),
            Err(AuthError::MissingCredential)
        ));
    }

    #[test]
    fn test_garbage_credential() {
        assert!(matches!(
            pipeline().authenticate(Some("not-a-jwt")),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_fresh_token_not_renewed() {
        let pipeline = pipeline();
        let token = token_for(&pipeline, None, ActionPermissions::new());
        let authenticated = pipeline.authenticate(Some(&token)).unwrap();
        assert!(authenticated.renewed.is_none());
    }

    #[test]
    fn test_token_past_half_life_renewed() {
        let pipeline = pipeline();
        let mut claims = pipeline
            .codec()
            .issue_session(SessionSubject::new(1, "a@example.com"))
            .unwrap()
            .claims;
        claims.expires_at = current_timestamp() + 600;
        let token = pipeline.codec().sign(&claims).unwrap();

        let authenticated = pipeline.authenticate(Some(&token)).unwrap();
        let renewed = authenticated.renewed.expect("token should be renewed");
        assert_eq!(renewed.claims.user_id, 1);
        assert!(renewed.claims.expires_at > claims.expires_at);
    }

    #[test]
    fn test_authorized_for_scoped_org() {
        let pipeline = pipeline();
        let token = token_for(&pipeline, Some("abcde"), admin_rw());
        let required = ActionPermissions::new().with("admin", Permission::WRITE);

        assert!(
            pipeline
                .authorize_for_organization(Some(&token), "abcde", &required)
                .is_ok()
        );
    }

    #[test]
    fn test_other_org_rejected_even_with_grants() {
        let pipeline = pipeline();
        let token = token_for(&pipeline, Some("abcde"), admin_rw());

        let result = pipeline.authorize_for_organization(
            Some(&token),
            "zzzzz",
            &ActionPermissions::new(),
        );
        assert!(matches!(result, Err(AuthError::WrongOrganization { .. })));
    }

    #[test]
    fn test_unscoped_token_rejected_for_org_route() {
        let pipeline = pipeline();
        let token = token_for(&pipeline, None, ActionPermissions::new());

        let result =
            pipeline.authorize_for_organization(Some(&token), "abcde", &ActionPermissions::new());
        assert!(matches!(result, Err(AuthError::WrongOrganization { .. })));
    }

    #[test]
    fn test_insufficient_grant_rejected() {
        let pipeline = pipeline();
        let token = token_for(
            &pipeline,
            Some("abcde"),
            ActionPermissions::new().with("admin", Permission::READ),
        );
        let required = ActionPermissions::new().with("admin", Permission::WRITE);

        let result = pipeline.authorize_for_organization(Some(&token), "abcde", &required);
        assert!(matches!(
            result,
            Err(AuthError::InsufficientPermission { action }) if action == "admin"
        ));
    }

    #[test]
    fn test_all_required_actions_checked() {
        let pipeline = pipeline();
        let token = token_for(&pipeline, Some("abcde"), admin_rw());
        let required = ActionPermissions::new()
            .with("admin", Permission::READ)
            .with("billing", Permission::READ);

        assert!(
            pipeline
                .authorize_for_organization(Some(&token), "abcde", &required)
                .is_err()
        );
    }

    #[test]
    fn test_reauthorize_keeps_claims() {
        let pipeline = pipeline();
        let token = token_for(&pipeline, Some("abcde"), admin_rw());
        let claims = pipeline.authenticate(Some(&token)).unwrap().claims;

        let issued = pipeline.reauthorize(&claims).unwrap();
        assert_eq!(issued.claims.perms, claims.perms);
        assert!(issued.claims.is_scoped_to("abcde"));
    }
}
