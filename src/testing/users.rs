//! In-memory user store, including pending signups.

use crate::UserId;
use crate::error::{OrgwardError, Result};
use crate::traits::{NewOAuthUser, UnconfirmedUser, UnconfirmedUserStore, User, UserStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct UserState {
    users: BTreeMap<UserId, User>,
    /// (provider, provider user id, local user id)
    oauth_links: Vec<(String, String, UserId)>,
    next_id: UserId,
    /// Pending signups by email.
    unconfirmed: BTreeMap<String, UnconfirmedUser>,
    /// Simulates a concurrent signup that wins the race for this email.
    conflict_on_create: Option<String>,
}

impl UserState {
    fn insert(&mut self, mut user: User) -> User {
        self.next_id += 1;
        user.id = self.next_id;
        self.users.insert(user.id, user.clone());
        user
    }

    fn email_taken(&self, email: &str) -> bool {
        self.users.values().any(|u| u.email == email)
    }
}

/// [`UserStore`] over a map, with unique emails.
///
/// Cloning shares the same underlying data.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    inner: Arc<RwLock<UserState>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user directly. Ids are assigned from 1 upwards.
    pub fn insert(&self, email: &str, first_name: &str, last_name: &str, password_hash: &str) -> User {
        self.inner.write().unwrap().insert(User {
            id: 0,
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password_hash: password_hash.to_string(),
            avatar_url: None,
        })
    }

    /// Make the next `create_oauth_user` for `email` lose a race: another user
    /// with that email appears and the call fails with `Conflict`.
    pub fn fail_next_create_with_conflict(&self, email: &str) {
        self.inner.write().unwrap().conflict_on_create = Some(email.to_string());
    }

    /// Number of signups awaiting confirmation, expired ones included.
    pub fn unconfirmed_len(&self) -> usize {
        self.inner.read().unwrap().unconfirmed.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// OAuth links recorded for `user_id` as (provider, provider user id).
    pub fn oauth_links(&self, user_id: UserId) -> Vec<(String, String)> {
        self.inner
            .read()
            .unwrap()
            .oauth_links
            .iter()
            .filter(|(_, _, id)| *id == user_id)
            .map(|(provider, subject, _)| (provider.clone(), subject.clone()))
            .collect()
    }

    fn lock_err() -> OrgwardError {
        OrgwardError::internal("user store lock poisoned")
    }
}

impl std::fmt::Debug for InMemoryUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryUserStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.inner.read().map_err(|_| Self::lock_err())?;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let state = self.inner.read().map_err(|_| Self::lock_err())?;
        Ok(state.users.get(&id).cloned())
    }

    async fn create_oauth_user(&self, new: &NewOAuthUser) -> Result<User> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;

        if state.conflict_on_create.as_deref() == Some(new.email.as_str()) {
            state.conflict_on_create = None;
            state.insert(User {
                id: 0,
                email: new.email.clone(),
                first_name: new.first_name.clone(),
                last_name: new.last_name.clone(),
                password_hash: new.password_hash.clone(),
                avatar_url: None,
            });
        }

        if state.email_taken(&new.email) {
            return Err(OrgwardError::conflict("email already registered"));
        }

        let user = state.insert(User {
            id: 0,
            email: new.email.clone(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            password_hash: new.password_hash.clone(),
            avatar_url: new.avatar_url.clone(),
        });
        state
            .oauth_links
            .push((new.provider.clone(), new.provider_user_id.clone(), user.id));
        Ok(user)
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<()> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| OrgwardError::not_found("user"))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_avatar_url(&self, id: UserId, avatar_url: &str) -> Result<()> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| OrgwardError::not_found("user"))?;
        user.avatar_url = Some(avatar_url.to_string());
        Ok(())
    }
}

#[async_trait]
impl UnconfirmedUserStore for InMemoryUserStore {
    async fn upsert_unconfirmed(&self, user: &UnconfirmedUser) -> Result<()> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;
        if state.email_taken(&user.email) {
            return Err(OrgwardError::conflict("email already registered"));
        }
        state.unconfirmed.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn confirm_unconfirmed(&self, otp_hash: &str, now: u64) -> Result<User> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;
        let email = state
            .unconfirmed
            .values()
            .find(|u| u.otp_hash == otp_hash && u.expires_at > now)
            .map(|u| u.email.clone())
            .ok_or_else(|| OrgwardError::not_found("pending registration"))?;

        if state.email_taken(&email) {
            return Err(OrgwardError::conflict("email already registered"));
        }

        let Some(pending) = state.unconfirmed.remove(&email) else {
            return Err(OrgwardError::not_found("pending registration"));
        };
        Ok(state.insert(User {
            id: 0,
            email: pending.email,
            first_name: pending.first_name,
            last_name: pending.last_name,
            password_hash: pending.password_hash,
            avatar_url: None,
        }))
    }

    async fn delete_expired_unconfirmed(&self, now: u64) -> Result<u64> {
        let mut state = self.inner.write().map_err(|_| Self::lock_err())?;
        let before = state.unconfirmed.len();
        state.unconfirmed.retain(|_, u| u.expires_at > now);
        Ok((before - state.unconfirmed.len()) as u64)
    }
}
