//! Server-side password reset records.

use crate::UserId;
use crate::error::Result;
use async_trait::async_trait;

/// A pending reset. Only the hash of the emailed OTP is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetRecord {
    pub user_id: UserId,
    pub otp_hash: String,
    /// Unix seconds.
    pub expires_at: u64,
}

/// Persistent reset records.
///
/// A reset token is only honoured while a live record exists for its user,
/// so deleting the records ends every outstanding reset for that user.
#[async_trait]
pub trait PasswordResetStore: Send + Sync {
    async fn create_reset(&self, record: &PasswordResetRecord) -> Result<()>;

    /// The unexpired record matching `otp_hash`, if any.
    async fn find_live(&self, otp_hash: &str, now: u64) -> Result<Option<PasswordResetRecord>>;

    async fn has_live_reset(&self, user_id: UserId, now: u64) -> Result<bool>;

    /// Remove every record for `user_id`. Returns how many were removed.
    async fn delete_for_user(&self, user_id: UserId) -> Result<u64>;

    /// Sweep expired records. Returns how many were removed.
    async fn delete_expired(&self, now: u64) -> Result<u64>;
}
