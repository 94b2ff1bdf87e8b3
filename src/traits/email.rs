//! Outbound notification abstraction.

use crate::error::Result;
use async_trait::async_trait;

/// Who a notification goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecipient {
    pub email: String,
    pub name: String,
}

impl EmailRecipient {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// Delivers the emails the auth and organization workflows trigger.
///
/// Delivery runs off the request path. A failure is logged and never changes
/// the outcome of the operation that caused it.
///
/// # Example
///
/// ```rust,ignore
/// use orgward::traits::{EmailRecipient, EmailSender};
///
/// struct Postmark { /* ... */ }
///
/// #[async_trait::async_trait]
/// impl EmailSender for Postmark {
///     async fn send_organization_invite(&self, to: &EmailRecipient, otp: &str, org: &str) -> orgward::Result<()> {
///         // render template, call provider
///         Ok(())
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_organization_invite(
        &self,
        to: &EmailRecipient,
        otp: &str,
        organization_name: &str,
    ) -> Result<()>;

    async fn send_password_reset(&self, to: &EmailRecipient, otp: &str) -> Result<()>;

    /// OTP that confirms a password signup.
    async fn send_account_confirmation(&self, to: &EmailRecipient, otp: &str) -> Result<()>;

    /// Welcome mail for an account created through OAuth.
    async fn send_account_created(&self, to: &EmailRecipient) -> Result<()>;
}
