use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::domain::errors::AuthError;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::NewUser;
use crate::domain::identity::models::User;
use crate::domain::identity::models::UserId;
use crate::domain::ports::AuthStore;
use crate::domain::ports::StoreTx;
use crate::domain::verification::models::EmailVerification;

/// In-memory store used by the domain service tests.
///
/// `begin` takes a global lock and snapshots the state; writes land on the
/// snapshot and are copied back on commit. Dropping the transaction
/// discards the snapshot, which gives the same rollback semantics the
/// Postgres adapter gets from its transactions, and the lock serializes
/// transactions completely.
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
}

#[derive(Clone)]
struct MemState {
    next_user_id: i64,
    users: HashMap<i64, User>,
    verifications: HashMap<String, EmailVerification>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemState {
                next_user_id: 1,
                users: HashMap::new(),
                verifications: HashMap::new(),
            })),
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemTx {
    guard: OwnedMutexGuard<MemState>,
    work: MemState,
}

#[async_trait]
impl AuthStore for MemStore {
    type Tx = MemTx;

    async fn begin(&self) -> Result<MemTx, AuthError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = (*guard).clone();
        Ok(MemTx { guard, work })
    }
}

#[async_trait]
impl StoreTx for MemTx {
    async fn commit(mut self) -> Result<(), AuthError> {
        *self.guard = self.work;
        Ok(())
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .work
            .users
            .values()
            .find(|user| user.email.as_str() == email)
            .cloned())
    }

    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.work.users.get(&id.0).cloned())
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User, AuthError> {
        if self
            .work
            .users
            .values()
            .any(|existing| existing.email == user.email)
        {
            return Err(AuthError::DuplicateEmail(user.email.as_str().to_string()));
        }

        let id = self.work.next_user_id;
        self.work.next_user_id += 1;

        let user = User {
            id: UserId(id),
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            refresh_token: None,
            profile: user.profile,
            created_at: Utc::now(),
        };
        self.work.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_refresh_token(
        &mut self,
        id: UserId,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .work
            .users
            .get_mut(&id.0)
            .ok_or(AuthError::UserNotFound)?;
        user.refresh_token = Some(refresh_token.to_string());
        Ok(())
    }

    async fn update_credentials(
        &mut self,
        id: UserId,
        password_hash: &str,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .work
            .users
            .get_mut(&id.0)
            .ok_or(AuthError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        user.refresh_token = Some(refresh_token.to_string());
        Ok(())
    }

    async fn update_email(
        &mut self,
        id: UserId,
        email: &str,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        if self
            .work
            .users
            .values()
            .any(|other| other.id != id && other.email.as_str() == email)
        {
            return Err(AuthError::DuplicateEmail(email.to_string()));
        }

        let new_email = EmailAddress::new(email.to_string())?;
        let user = self
            .work
            .users
            .get_mut(&id.0)
            .ok_or(AuthError::UserNotFound)?;
        user.email = new_email;
        user.refresh_token = Some(refresh_token.to_string());
        Ok(())
    }

    async fn update_profile(
        &mut self,
        id: UserId,
        profile: &serde_json::Value,
    ) -> Result<(), AuthError> {
        let user = self
            .work
            .users
            .get_mut(&id.0)
            .ok_or(AuthError::UserNotFound)?;
        user.profile = profile.clone();
        Ok(())
    }

    async fn find_verification(
        &mut self,
        email: &str,
    ) -> Result<Option<EmailVerification>, AuthError> {
        Ok(self.work.verifications.get(email).cloned())
    }

    async fn insert_verification(&mut self, record: EmailVerification) -> Result<(), AuthError> {
        if self.work.verifications.contains_key(&record.email) {
            return Err(AuthError::DuplicateEmail(record.email));
        }
        self.work.verifications.insert(record.email.clone(), record);
        Ok(())
    }

    async fn mark_verified(&mut self, email: &str) -> Result<(), AuthError> {
        if let Some(record) = self.work.verifications.get_mut(email) {
            record.verified = true;
        }
        Ok(())
    }

    async fn delete_verification(&mut self, email: &str) -> Result<(), AuthError> {
        self.work.verifications.remove(email);
        Ok(())
    }

    async fn consume_verification(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        let consumable = self
            .work
            .verifications
            .get(email)
            .map(|record| record.verified && !record.is_expired(now))
            .unwrap_or(false);

        if consumable {
            self.work.verifications.remove(email);
        }
        Ok(consumable)
    }

    async fn delete_expired_verifications(&mut self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let before = self.work.verifications.len();
        self.work
            .verifications
            .retain(|_, record| !record.is_expired(now));
        Ok((before - self.work.verifications.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use auth::Role;
    use chrono::Duration;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: EmailAddress::new(email.to_string()).unwrap(),
            password_hash: "$argon2id$test_hash".to_string(),
            roles: vec![Role::User],
            profile: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_rollback_on_drop() {
        let store = MemStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(new_user("a@example.com")).await.unwrap();
            // Dropped without commit.
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_user_by_email("a@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let store = MemStore::new();

        let mut tx = store.begin().await.unwrap();
        let first = tx.insert_user(new_user("a@example.com")).await.unwrap();
        let second = tx.insert_user(new_user("b@example.com")).await.unwrap();
        tx.commit().await.unwrap();

        assert!(second.id.0 > first.id.0);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_user(new_user("a@example.com")).await.unwrap();
        let result = tx.insert_user(new_user("a@example.com")).await;
        assert!(matches!(result, Err(AuthError::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_consume_requires_verified_and_unexpired() {
        let store = MemStore::new();
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        tx.insert_verification(EmailVerification::issued(
            "a@example.com".to_string(),
            "123456".to_string(),
            now,
            now + Duration::minutes(5),
        ))
        .await
        .unwrap();

        // Unverified: not consumable.
        assert!(!tx.consume_verification("a@example.com", now).await.unwrap());

        tx.mark_verified("a@example.com").await.unwrap();

        // Expired: not consumable.
        assert!(!tx
            .consume_verification("a@example.com", now + Duration::minutes(6))
            .await
            .unwrap());

        // Verified and fresh: consumed exactly once.
        assert!(tx.consume_verification("a@example.com", now).await.unwrap());
        assert!(!tx.consume_verification("a@example.com", now).await.unwrap());
    }
}
