//! Email sender that records what it was asked to send.

use crate::error::Result;
use crate::traits::{EmailRecipient, EmailSender};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentEmailKind {
    OrganizationInvite { organization_name: String },
    PasswordReset,
    AccountConfirmation,
    AccountCreated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: SentEmailKind,
    pub to: EmailRecipient,
    pub otp: Option<String>,
}

/// Records every notification. Cloning shares the record.
#[derive(Clone, Debug, Default)]
pub struct RecordingEmailSender {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl RecordingEmailSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` emails were recorded.
    ///
    /// Notifications are sent from spawned tasks, so tests wait for them
    /// rather than asserting immediately. Panics after one second.
    pub async fn wait_for(&self, count: usize) -> Vec<SentEmail> {
        for _ in 0..100 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} emails, got {:?}", count, self.sent());
    }

    fn record(&self, kind: SentEmailKind, to: &EmailRecipient, otp: Option<&str>) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentEmail {
                kind,
                to: to.clone(),
                otp: otp.map(str::to_string),
            });
        }
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send_organization_invite(
        &self,
        to: &EmailRecipient,
        otp: &str,
        organization_name: &str,
    ) -> Result<()> {
        self.record(
            SentEmailKind::OrganizationInvite {
                organization_name: organization_name.to_string(),
            },
            to,
            Some(otp),
        );
        Ok(())
    }

    async fn send_password_reset(&self, to: &EmailRecipient, otp: &str) -> Result<()> {
        self.record(SentEmailKind::PasswordReset, to, Some(otp));
        Ok(())
    }

    async fn send_account_confirmation(&self, to: &EmailRecipient, otp: &str) -> Result<()> {
        self.record(SentEmailKind::AccountConfirmation, to, Some(otp));
        Ok(())
    }

    async fn send_account_created(&self, to: &EmailRecipient) -> Result<()> {
        self.record(SentEmailKind::AccountCreated, to, None);
        Ok(())
    }
}
