use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{OrgwardError, Result};
use crate::utils::{get_env_parsed, get_env_with_prefix};

/// Smallest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Main configuration for orgward.
///
/// Built once at startup and passed to the codec, cookie settings and
/// managers. Nothing reads the environment after [`ConfigBuilder::build`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Token, cookie and OTP settings.
#[derive(Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HMAC signing secret. Never serialized.
    #[serde(skip_serializing, default)]
    pub jwt_secret: String,
    /// Used as token issuer and cookie name prefix.
    #[serde(default = "default_project_name")]
    pub project_name: String,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_invite_ttl_days")]
    pub invite_ttl_days: u64,
    #[serde(default = "default_password_reset_ttl_days")]
    pub password_reset_ttl_days: u64,
    /// How long a password signup waits for its confirmation OTP.
    #[serde(default = "default_confirmation_ttl_days")]
    pub confirmation_ttl_days: u64,
    #[serde(default = "default_otp_len")]
    pub otp_len: usize,
    /// Mark cookies `Secure`. Enable in production.
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default)]
    pub cookie_domain: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn invite_ttl(&self) -> Duration {
        days(self.invite_ttl_days)
    }

    pub fn password_reset_ttl(&self) -> Duration {
        days(self.password_reset_ttl_days)
    }

    pub fn confirmation_ttl(&self) -> Duration {
        days(self.confirmation_ttl_days)
    }

    /// Token issuer claim.
    pub fn issuer(&self) -> &str {
        &self.project_name
    }

    pub fn session_cookie_name(&self) -> String {
        format!("{}_jwt", self.project_name)
    }

    pub fn reset_cookie_name(&self) -> String {
        format!("{}_pwreset_jwt", self.project_name)
    }
}

fn days(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(24 * 60 * 60))
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            project_name: default_project_name(),
            session_ttl_secs: default_session_ttl_secs(),
            invite_ttl_days: default_invite_ttl_days(),
            password_reset_ttl_days: default_password_reset_ttl_days(),
            confirmation_ttl_days: default_confirmation_ttl_days(),
            otp_len: default_otp_len(),
            cookie_secure: false,
            cookie_domain: None,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[redacted]")
            .field("project_name", &self.project_name)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("invite_ttl_days", &self.invite_ttl_days)
            .field("password_reset_ttl_days", &self.password_reset_ttl_days)
            .field("confirmation_ttl_days", &self.confirmation_ttl_days)
            .field("otp_len", &self.otp_len)
            .field("cookie_secure", &self.cookie_secure)
            .field("cookie_domain", &self.cookie_domain)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

fn default_project_name() -> String {
    "orgward".to_string()
}

fn default_session_ttl_secs() -> u64 {
    30 * 60
}

fn default_invite_ttl_days() -> u64 {
    15
}

fn default_password_reset_ttl_days() -> u64 {
    1
}

fn default_confirmation_ttl_days() -> u64 {
    1
}

fn default_otp_len() -> usize {
    128
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.jwt_secret = secret.into();
        self
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.config.auth.project_name = name.into();
        self
    }

    pub fn with_session_ttl_secs(mut self, secs: u64) -> Self {
        self.config.auth.session_ttl_secs = secs;
        self
    }

    pub fn with_invite_ttl_days(mut self, days: u64) -> Self {
        self.config.auth.invite_ttl_days = days;
        self
    }

    pub fn with_password_reset_ttl_days(mut self, days: u64) -> Self {
        self.config.auth.password_reset_ttl_days = days;
        self
    }

    pub fn with_confirmation_ttl_days(mut self, days: u64) -> Self {
        self.config.auth.confirmation_ttl_days = days;
        self
    }

    pub fn with_otp_len(mut self, len: usize) -> Self {
        self.config.auth.otp_len = len;
        self
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.config.auth.cookie_secure = secure;
        self
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.auth.cookie_domain = Some(domain.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    /// Load configuration from environment variables with ORGWARD_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(secret) = get_env_with_prefix("JWT_SECRET") {
            self.config.auth.jwt_secret = secret;
        }
        if let Some(name) = get_env_with_prefix("PROJECT_NAME") {
            self.config.auth.project_name = name;
        }
        if let Some(secs) = get_env_parsed("SESSION_TTL_SECS") {
            self.config.auth.session_ttl_secs = secs;
        }
        if let Some(days) = get_env_parsed("INVITE_TTL_DAYS") {
            self.config.auth.invite_ttl_days = days;
        }
        if let Some(days) = get_env_parsed("PASSWORD_RESET_TTL_DAYS") {
            self.config.auth.password_reset_ttl_days = days;
        }
        if let Some(days) = get_env_parsed("CONFIRMATION_TTL_DAYS") {
            self.config.auth.confirmation_ttl_days = days;
        }
        if let Some(len) = get_env_parsed("OTP_LEN") {
            self.config.auth.otp_len = len;
        }
        if let Some(secure) = get_env_parsed("COOKIE_SECURE") {
            self.config.auth.cookie_secure = secure;
        }
        if let Some(domain) = get_env_with_prefix("COOKIE_DOMAIN") {
            let domain = domain.trim();
            self.config.auth.cookie_domain = (!domain.is_empty()).then(|| domain.to_string());
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_parsed("LOG_JSON") {
            self.config.logging.json = json;
        }
        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns [`OrgwardError::Fatal`] when:
    /// - the signing secret is missing or shorter than [`MIN_SECRET_LEN`]
    /// - the project name is empty
    /// - any TTL is zero
    /// - the OTP length is below 16
    /// - the log level is unknown
    pub fn build(self) -> Result<Config> {
        validate_auth(&self.config.auth)?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(OrgwardError::fatal(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Startup checks shared by [`ConfigBuilder::build`] and the token codec.
pub(crate) fn validate_auth(auth: &AuthConfig) -> Result<()> {
    if auth.jwt_secret.is_empty() {
        return Err(OrgwardError::fatal("JWT_SECRET is not set"));
    }
    if auth.jwt_secret.len() < MIN_SECRET_LEN {
        return Err(OrgwardError::fatal(format!(
            "JWT_SECRET must be at least {} bytes",
            MIN_SECRET_LEN
        )));
    }
    if auth.project_name.trim().is_empty() {
        return Err(OrgwardError::fatal("PROJECT_NAME must not be empty"));
    }
    if auth.session_ttl_secs == 0 {
        return Err(OrgwardError::fatal("SESSION_TTL_SECS must be greater than 0"));
    }
    if auth.invite_ttl_days == 0 {
        return Err(OrgwardError::fatal("INVITE_TTL_DAYS must be greater than 0"));
    }
    if auth.password_reset_ttl_days == 0 {
        return Err(OrgwardError::fatal(
            "PASSWORD_RESET_TTL_DAYS must be greater than 0",
        ));
    }
    if auth.confirmation_ttl_days == 0 {
        return Err(OrgwardError::fatal(
            "CONFIRMATION_TTL_DAYS must be greater than 0",
        ));
    }
    if auth.otp_len < 16 {
        return Err(OrgwardError::fatal("OTP_LEN must be at least 16"));
    }
    Ok(())
}
