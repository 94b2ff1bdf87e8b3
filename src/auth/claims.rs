//! Session and password-reset token payloads.

use crate::UserId;
use crate::permissions::{ActionPermissions, PERMISSIONS_FORMAT_VERSION};
use serde::{Deserialize, Serialize};

/// Distinguishes the two token kinds so neither is accepted in place of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// General API access.
    Session,
    /// Single-purpose credential for completing a password reset.
    PasswordReset,
}

/// Claims carried by a session token.
///
/// Immutable once minted. Switching organization or picking up new grants
/// means minting a new token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "uid")]
    pub user_id: UserId,
    pub email: String,
    /// Active organization, if one has been selected.
    #[serde(rename = "org", default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    /// Grants for `organization_id` at the time of issuance.
    #[serde(default)]
    pub perms: ActionPermissions,
    /// Format version of `perms`.
    #[serde(rename = "pv", default = "current_permissions_version")]
    pub perms_version: u16,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "iat")]
    pub issued_at: u64,
    #[serde(rename = "exp")]
    pub expires_at: u64,
    pub jti: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
}

impl SessionClaims {
    /// `true` when the token is scoped to exactly `org_id`.
    pub fn is_scoped_to(&self, org_id: &str) -> bool {
        self.organization_id.as_deref() == Some(org_id)
    }

    /// Seconds left before expiry, zero once expired.
    pub fn remaining_secs(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    /// Copy of these claims with a fresh issue time and expiry.
    pub(crate) fn refreshed(&self, now: u64, ttl_secs: u64, jti: String) -> Self {
        Self {
            issued_at: now,
            expires_at: now.saturating_add(ttl_secs),
            jti,
            ..self.clone()
        }
    }
}

/// Who a new session is for. The codec stamps issuer and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSubject {
    pub user_id: UserId,
    pub email: String,
    pub organization_id: Option<String>,
    pub perms: ActionPermissions,
}

impl SessionSubject {
    /// A session with no active organization.
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            organization_id: None,
            perms: ActionPermissions::new(),
        }
    }

    /// Scope the session to `org_id` with the given grants.
    #[must_use]
    pub fn with_organization(mut self, org_id: impl Into<String>, perms: ActionPermissions) -> Self {
        self.organization_id = Some(org_id.into());
        self.perms = perms;
        self
    }
}

impl From<&SessionClaims> for SessionSubject {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email.clone(),
            organization_id: claims.organization_id.clone(),
            perms: claims.perms.clone(),
        }
    }
}

/// Claims carried by a password-reset token.
///
/// Deliberately has no email, organization or permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetClaims {
    #[serde(rename = "uid")]
    pub user_id: UserId,
    pub allowed: bool,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "iat")]
    pub issued_at: u64,
    #[serde(rename = "exp")]
    pub expires_at: u64,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
}

fn current_permissions_version() -> u16 {
    PERMISSIONS_FORMAT_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permission;

    fn sample_claims() -> SessionClaims {
        SessionClaims {
            user_id: 7,
            email: "a@example.com".into(),
            organization_id: Some("abcde".into()),
            perms: ActionPermissions::new().with("admin", Permission::READ_WRITE),
            perms_version: PERMISSIONS_FORMAT_VERSION,
            issuer: "orgward".into(),
            issued_at: 1_000,
            expires_at: 2_800,
            jti: "j1".into(),
            token_type: TokenType::Session,
        }
    }

    #[test]
    fn test_compact_wire_names() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(json["uid"], 7);
        assert_eq!(json["org"], "abcde");
        assert_eq!(json["perms"]["admin"], 3);
        assert_eq!(json["pv"], 1);
        assert_eq!(json["typ"], "session");
    }

    #[test]
    fn test_org_omitted_when_absent() {
        let mut claims = sample_claims();
        claims.organization_id = None;
        let json = serde_json::to_value(claims).unwrap();
        assert!(json.get("org").is_none());
    }

    #[test]
    fn test_scope_and_remaining() {
        let claims = sample_claims();
        assert!(claims.is_scoped_to("abcde"));
        assert!(!claims.is_scoped_to("zzzzz"));
        assert_eq!(claims.remaining_secs(2_200), 600);
        assert_eq!(claims.remaining_secs(9_999), 0);
    }

    #[test]
    fn test_refreshed_keeps_identity_and_perms() {
        let claims = sample_claims();
        let renewed = claims.refreshed(2_200, 1_800, "j2".into());

        assert_eq!(renewed.user_id, claims.user_id);
        assert_eq!(renewed.organization_id, claims.organization_id);
        assert_eq!(renewed.perms, claims.perms);
        assert_eq!(renewed.issued_at, 2_200);
        assert_eq!(renewed.expires_at, 4_000);
    }
}
