//! Organization workflow configuration.

use super::types::OwnerGrantPolicy;
use crate::config::AuthConfig;
use std::time::Duration;

/// Settings for organization, invite and ownership workflows.
///
/// # Example
///
/// ```rust
/// use orgward::organizations::{OrgConfig, OwnerGrantPolicy};
///
/// let config = OrgConfig::new()
///     .with_owner_grant_policy(OwnerGrantPolicy::RevokePrevious)
///     .with_otp_len(64);
/// ```
#[derive(Clone, Debug)]
pub struct OrgConfig {
    pub invite_ttl: Duration,
    pub otp_len: usize,
    /// Length of generated organization ids.
    pub org_id_len: usize,
    /// Attempts before giving up on id collisions.
    pub max_id_attempts: u32,
    pub owner_grant_policy: OwnerGrantPolicy,
}

impl Default for OrgConfig {
    fn default() -> Self {
        Self {
            invite_ttl: Duration::from_secs(15 * 24 * 60 * 60),
            otp_len: 128,
            org_id_len: 5,
            max_id_attempts: 3,
            owner_grant_policy: OwnerGrantPolicy::KeepPrevious,
        }
    }
}

impl OrgConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invite TTL and OTP length from the auth settings.
    #[must_use]
    pub fn from_auth_config(auth: &AuthConfig) -> Self {
        Self {
            invite_ttl: auth.invite_ttl(),
            otp_len: auth.otp_len,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_invite_ttl(mut self, ttl: Duration) -> Self {
        self.invite_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_otp_len(mut self, len: usize) -> Self {
        self.otp_len = len;
        self
    }

    #[must_use]
    pub fn with_org_id_len(mut self, len: usize) -> Self {
        self.org_id_len = len;
        self
    }

    #[must_use]
    pub fn with_max_id_attempts(mut self, attempts: u32) -> Self {
        self.max_id_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_owner_grant_policy(mut self, policy: OwnerGrantPolicy) -> Self {
        self.owner_grant_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_auth_config() {
        let auth = AuthConfig {
            invite_ttl_days: 2,
            otp_len: 32,
            ..AuthConfig::default()
        };
        let config = OrgConfig::from_auth_config(&auth);

        assert_eq!(config.invite_ttl, Duration::from_secs(2 * 86400));
        assert_eq!(config.otp_len, 32);
        assert_eq!(config.org_id_len, 5);
        assert_eq!(config.owner_grant_policy, OwnerGrantPolicy::KeepPrevious);
    }
}
