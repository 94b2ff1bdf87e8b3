//! In-memory password reset store.

use crate::UserId;
use crate::error::{OrgwardError, Result};
use crate::traits::{PasswordResetRecord, PasswordResetStore};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// [`PasswordResetStore`] over a vector.
#[derive(Clone, Debug, Default)]
pub struct InMemoryResetStore {
    records: Arc<RwLock<Vec<PasswordResetRecord>>>,
}

impl InMemoryResetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired or not.
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<PasswordResetRecord> {
        self.records.read().unwrap().clone()
    }

    fn lock_err() -> OrgwardError {
        OrgwardError::internal("reset store lock poisoned")
    }
}

#[async_trait]
impl PasswordResetStore for InMemoryResetStore {
    async fn create_reset(&self, record: &PasswordResetRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Self::lock_err())?;
        if records.iter().any(|r| r.otp_hash == record.otp_hash) {
            return Err(OrgwardError::conflict("reset otp already exists"));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find_live(&self, otp_hash: &str, now: u64) -> Result<Option<PasswordResetRecord>> {
        let records = self.records.read().map_err(|_| Self::lock_err())?;
        Ok(records
            .iter()
            .find(|r| r.otp_hash == otp_hash && r.expires_at > now)
            .cloned())
    }

    async fn has_live_reset(&self, user_id: UserId, now: u64) -> Result<bool> {
        let records = self.records.read().map_err(|_| Self::lock_err())?;
        Ok(records
            .iter()
            .any(|r| r.user_id == user_id && r.expires_at > now))
    }

    async fn delete_for_user(&self, user_id: UserId) -> Result<u64> {
        let mut records = self.records.write().map_err(|_| Self::lock_err())?;
        let before = records.len();
        records.retain(|r| r.user_id != user_id);
        Ok((before - records.len()) as u64)
    }

    async fn delete_expired(&self, now: u64) -> Result<u64> {
        let mut records = self.records.write().map_err(|_| Self::lock_err())?;
        let before = records.len();
        records.retain(|r| r.expires_at > now);
        Ok((before - records.len()) as u64)
    }
}
