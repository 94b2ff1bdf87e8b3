//! Email sender that writes notifications to the tracing log.
//!
//! For local development. OTPs are redacted unless full output is enabled,
//! since logs are often shipped off-host.

use crate::error::Result;
use crate::traits::{EmailRecipient, EmailSender};
use async_trait::async_trait;

/// Logs each notification instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct LogEmailSender {
    show_full_content: bool,
}

impl LogEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include OTPs in the log output.
    ///
    /// Anyone with log access can then accept invites and reset passwords.
    #[must_use]
    pub fn with_full_output(mut self, enabled: bool) -> Self {
        if enabled {
            tracing::warn!(
                "LogEmailSender: full output enabled - one-time passwords will be visible in logs. \
                 Do not use in production!"
            );
        }
        self.show_full_content = enabled;
        self
    }

    fn otp<'a>(&self, otp: &'a str) -> &'a str {
        if self.show_full_content {
            otp
        } else {
            "[REDACTED]"
        }
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_organization_invite(
        &self,
        to: &EmailRecipient,
        otp: &str,
        organization_name: &str,
    ) -> Result<()> {
        tracing::info!(
            to = %to.email,
            name = %to.name,
            organization = %organization_name,
            otp = %self.otp(otp),
            "email: organization invite"
        );
        Ok(())
    }

    async fn send_password_reset(&self, to: &EmailRecipient, otp: &str) -> Result<()> {
        tracing::info!(
            to = %to.email,
            name = %to.name,
            otp = %self.otp(otp),
            "email: password reset"
        );
        Ok(())
    }

    async fn send_account_confirmation(&self, to: &EmailRecipient, otp: &str) -> Result<()> {
        tracing::info!(
            to = %to.email,
            name = %to.name,
            otp = %self.otp(otp),
            "email: account confirmation"
        );
        Ok(())
    }

    async fn send_account_created(&self, to: &EmailRecipient) -> Result<()> {
        tracing::info!(to = %to.email, name = %to.name, "email: account created");
        Ok(())
    }
}
