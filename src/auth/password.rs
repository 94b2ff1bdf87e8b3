//! Argon2id password hashing and the minimum password policy.
//!
//! Accounts created through OAuth carry [`UNUSABLE_PASSWORD_HASH`] and can
//! never log in with a password until one is set through the reset flow.

use crate::error::{OrgwardError, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as Argon2Hasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};

/// Stored in place of a hash for accounts without a local password.
///
/// Not valid PHC syntax, so no input can verify against it.
pub const UNUSABLE_PASSWORD_HASH: &str = "!oauth";

/// Argon2id cost parameters.
#[derive(Clone, Debug)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP minimum for Argon2id
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    /// Cheap settings for tests and local development. Not for production.
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies passwords with Argon2id.
#[derive(Clone, Debug, Default)]
pub struct PasswordHasher {
    config: PasswordConfig,
}

impl PasswordHasher {
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    /// PHC-formatted hash with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| OrgwardError::internal(format!("Password hashing failed: {}", e)))
    }

    /// Constant-time check of `password` against `hash`.
    ///
    /// The OAuth sentinel never verifies.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        if hash == UNUSABLE_PASSWORD_HASH {
            return Ok(false);
        }

        let parsed = PasswordHash::new(hash)
            .map_err(|e| OrgwardError::internal(format!("Invalid password hash format: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            None,
        )
        .map_err(|e| OrgwardError::internal(format!("Invalid Argon2 params: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Length bounds for new passwords.
#[derive(Clone, Debug)]
pub struct PasswordPolicy {
    pub min_length: usize,
    /// Upper bound keeps hashing cost bounded.
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    /// `BadRequest` when the password is out of bounds.
    pub fn check(&self, password: &str) -> Result<()> {
        let len = password.chars().count();
        if len < self.min_length {
            return Err(OrgwardError::bad_request(format!(
                "Password must be at least {} characters",
                self.min_length
            )));
        }
        if len > self.max_length {
            return Err(OrgwardError::bad_request(format!(
                "Password must be at most {} characters",
                self.max_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordConfig::fast())
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct-horse-battery-staple").unwrap();

        assert!(hasher.verify("correct-horse-battery-staple", &hash).unwrap());
        assert!(!hasher.verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = fast_hasher();
        let first = hasher.hash("same-password").unwrap();
        let second = hasher.hash("same-password").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("same-password", &second).unwrap());
    }

    #[test]
    fn test_sentinel_never_verifies() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("", UNUSABLE_PASSWORD_HASH).unwrap());
        assert!(!hasher.verify("!oauth", UNUSABLE_PASSWORD_HASH).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_error() {
        assert!(fast_hasher().verify("pw", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_policy_bounds() {
        let policy = PasswordPolicy::default();
        assert!(policy.check("short").is_err());
        assert!(policy.check("long enough").is_ok());
        assert!(policy.check(&"a".repeat(200)).is_err());
    }
}
