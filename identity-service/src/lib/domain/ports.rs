use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::errors::AuthError;
use crate::domain::errors::MailError;
use crate::domain::identity::models::NewUser;
use crate::domain::identity::models::User;
use crate::domain::identity::models::UserId;
use crate::domain::verification::models::EmailVerification;

/// Transactional persistence for users and verification records.
///
/// Every domain operation runs inside exactly one transaction obtained
/// from `begin`. Dropping the transaction without `commit` rolls it back,
/// so any early error return leaves no partial writes behind.
#[async_trait]
pub trait AuthStore: Send + Sync + 'static {
    type Tx: StoreTx;

    /// Open a transaction.
    ///
    /// # Errors
    /// * `Infrastructure` - Connection acquisition failed
    async fn begin(&self) -> Result<Self::Tx, AuthError>;
}

/// Operations available inside one open transaction.
///
/// User rows returned by the `find_user_*` methods are locked for the
/// remainder of the transaction, which serializes credential writes per
/// user and `verify`/`consume` per email.
#[async_trait]
pub trait StoreTx: Send {
    /// Make the transaction's writes durable.
    ///
    /// # Errors
    /// * `Infrastructure` - Commit failed; no writes are visible
    async fn commit(self) -> Result<(), AuthError>;

    /// Look up a user by email, locking the row.
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError>;

    /// Look up a user by id, locking the row.
    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, AuthError>;

    /// Persist a new user; the store assigns the id.
    ///
    /// # Errors
    /// * `DuplicateEmail` - Email uniqueness violated
    async fn insert_user(&mut self, user: NewUser) -> Result<User, AuthError>;

    /// Overwrite the stored refresh token.
    ///
    /// # Errors
    /// * `UserNotFound` - No such user
    async fn update_refresh_token(
        &mut self,
        id: UserId,
        refresh_token: &str,
    ) -> Result<(), AuthError>;

    /// Overwrite password hash and refresh token in one write.
    ///
    /// # Errors
    /// * `UserNotFound` - No such user
    async fn update_credentials(
        &mut self,
        id: UserId,
        password_hash: &str,
        refresh_token: &str,
    ) -> Result<(), AuthError>;

    /// Overwrite email and refresh token in one write.
    ///
    /// # Errors
    /// * `UserNotFound` - No such user
    /// * `DuplicateEmail` - Email uniqueness violated
    async fn update_email(
        &mut self,
        id: UserId,
        email: &str,
        refresh_token: &str,
    ) -> Result<(), AuthError>;

    /// Replace the opaque profile blob.
    ///
    /// # Errors
    /// * `UserNotFound` - No such user
    async fn update_profile(
        &mut self,
        id: UserId,
        profile: &serde_json::Value,
    ) -> Result<(), AuthError>;

    /// Look up a verification record by email, locking it.
    async fn find_verification(
        &mut self,
        email: &str,
    ) -> Result<Option<EmailVerification>, AuthError>;

    /// Persist a fresh verification record.
    ///
    /// # Errors
    /// * `DuplicateEmail` - A record for this email already exists
    async fn insert_verification(&mut self, record: EmailVerification) -> Result<(), AuthError>;

    /// Flip a record to verified.
    async fn mark_verified(&mut self, email: &str) -> Result<(), AuthError>;

    /// Remove a record unconditionally.
    async fn delete_verification(&mut self, email: &str) -> Result<(), AuthError>;

    /// Atomic check-and-delete: removes the record if and only if it is
    /// verified and not expired at `now`.
    ///
    /// # Returns
    /// True when a record was consumed
    async fn consume_verification(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError>;

    /// Remove every record whose expiry lies before `now`.
    ///
    /// # Returns
    /// Number of records removed
    async fn delete_expired_verifications(&mut self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// Outbound mail capability.
///
/// Success means the transport accepted the message for delivery; a later
/// network-level reject is not reported back.
#[async_trait]
pub trait MailTransport: Send + Sync + 'static {
    /// Hand one message to the transport.
    ///
    /// # Errors
    /// * `Transport` - The message was not accepted
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError>;
}
