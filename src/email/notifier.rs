//! Fire-and-forget delivery on top of an [`EmailSender`].

use crate::traits::{EmailRecipient, EmailSender};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Sends notifications on background tasks so callers never wait on delivery.
///
/// Failures are logged at warn level and otherwise ignored. The returned
/// handles exist for tests and graceful shutdown.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }

    pub fn organization_invite(
        &self,
        to: EmailRecipient,
        otp: String,
        organization_name: String,
    ) -> JoinHandle<()> {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if let Err(e) = sender
                .send_organization_invite(&to, &otp, &organization_name)
                .await
            {
                tracing::warn!(error = %e, to = %to.email, "failed to send organization invite");
            }
        })
    }

    pub fn password_reset(&self, to: EmailRecipient, otp: String) -> JoinHandle<()> {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if let Err(e) = sender.send_password_reset(&to, &otp).await {
                tracing::warn!(error = %e, to = %to.email, "failed to send password reset");
            }
        })
    }

    pub fn email_confirmation(&self, to: EmailRecipient, otp: String) -> JoinHandle<()> {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if let Err(e) = sender.send_account_confirmation(&to, &otp).await {
                tracing::warn!(error = %e, to = %to.email, "failed to send email confirmation");
            }
        })
    }

    pub fn account_created(&self, to: EmailRecipient) -> JoinHandle<()> {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if let Err(e) = sender.send_account_created(&to).await {
                tracing::warn!(error = %e, to = %to.email, "failed to send welcome email");
            }
        })
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OrgwardError, Result};
    use async_trait::async_trait;

    struct Failing;

    #[async_trait]
    impl EmailSender for Failing {
        async fn send_organization_invite(&self, _: &EmailRecipient, _: &str, _: &str) -> Result<()> {
            Err(OrgwardError::internal("smtp down"))
        }
        async fn send_password_reset(&self, _: &EmailRecipient, _: &str) -> Result<()> {
            Err(OrgwardError::internal("smtp down"))
        }
        async fn send_account_confirmation(&self, _: &EmailRecipient, _: &str) -> Result<()> {
            Err(OrgwardError::internal("smtp down"))
        }
        async fn send_account_created(&self, _: &EmailRecipient) -> Result<()> {
            Err(OrgwardError::internal("smtp down"))
        }
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_propagate() {
        let notifier = Notifier::new(Arc::new(Failing));
        let to = EmailRecipient::new("a@example.com", "A");

        assert!(notifier.password_reset(to.clone(), "otp".into()).await.is_ok());
        assert!(notifier.email_confirmation(to.clone(), "otp".into()).await.is_ok());
        assert!(notifier.account_created(to).await.is_ok());
    }
}
