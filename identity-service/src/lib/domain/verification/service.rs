use std::sync::Arc;

use auth::Clock;
use chrono::Duration;

use crate::domain::errors::AuthError;
use crate::domain::identity::models::EmailAddress;
use crate::domain::ports::AuthStore;
use crate::domain::ports::MailTransport;
use crate::domain::ports::StoreTx;
use crate::domain::verification::code::CodeGenerator;
use crate::domain::verification::models::EmailVerification;

const MAIL_SUBJECT: &str = "[GoodSpace] Email verification code";

/// Email verification engine.
///
/// Owns the pending-verification records: issues one-time codes, delivers
/// them over the mail transport, and flips records to verified. Consuming
/// a verified record is part of the identity operations and happens inside
/// their transactions.
pub struct VerificationService<S>
where
    S: AuthStore,
{
    store: Arc<S>,
    mailer: Arc<dyn MailTransport>,
    clock: Arc<dyn Clock>,
    codes: CodeGenerator,
    ttl: Duration,
}

impl<S> VerificationService<S>
where
    S: AuthStore,
{
    /// Create a new verification engine with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Transactional persistence
    /// * `mailer` - Outbound mail capability
    /// * `clock` - Time source for issuance and expiry
    /// * `code_length` - Number of digits per one-time code
    /// * `ttl_minutes` - Record lifetime
    pub fn new(
        store: Arc<S>,
        mailer: Arc<dyn MailTransport>,
        clock: Arc<dyn Clock>,
        code_length: usize,
        ttl_minutes: i64,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            codes: CodeGenerator::new(code_length),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a code for an email and hand it to the mail transport.
    ///
    /// The record only commits once the transport accepted the message;
    /// a transport failure rolls the insert back, so no orphan records
    /// exist for codes that were never sent.
    ///
    /// # Errors
    /// * `DuplicateEmail` - A user or a live verification already holds this email
    /// * `Infrastructure` - Store or mail transport failed
    pub async fn send_code(&self, email: &EmailAddress) -> Result<(), AuthError> {
        let mut tx = self.store.begin().await?;

        if tx.find_user_by_email(email.as_str()).await?.is_some() {
            return Err(AuthError::DuplicateEmail(email.as_str().to_string()));
        }

        let now = self.clock.now();
        if let Some(existing) = tx.find_verification(email.as_str()).await? {
            if !existing.is_expired(now) {
                return Err(AuthError::DuplicateEmail(email.as_str().to_string()));
            }
            // Expired leftover: superseded by this issuance.
            tx.delete_verification(email.as_str()).await?;
        }

        let code = self.codes.generate();
        let record = EmailVerification::issued(
            email.as_str().to_string(),
            code.clone(),
            now,
            now + self.ttl,
        );
        tx.insert_verification(record).await?;

        self.mailer
            .send(email.as_str(), MAIL_SUBJECT, &self.render_body(&code))
            .await?;
        tx.commit().await?;

        tracing::info!(email = %email, "Verification code issued");
        Ok(())
    }

    /// Mark the record for `email` verified if `code` matches.
    ///
    /// An expired record is left in place; it will be superseded by a
    /// later issuance or removed by the sweep.
    ///
    /// # Errors
    /// * `EmailNotFound` - No record exists for this email
    /// * `Expired` - The record's lifetime has ended
    /// * `IllegalCode` - The code does not match
    pub async fn verify(&self, email: &str, code: &str) -> Result<(), AuthError> {
        let mut tx = self.store.begin().await?;

        let record = tx
            .find_verification(email)
            .await?
            .ok_or(AuthError::EmailNotFound)?;

        if record.is_expired(self.clock.now()) {
            return Err(AuthError::Expired);
        }
        if !record.has_code(code) {
            return Err(AuthError::IllegalCode);
        }

        tx.mark_verified(email).await?;
        tx.commit().await?;

        Ok(())
    }

    /// Remove every expired record.
    ///
    /// # Returns
    /// Number of records removed
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let mut tx = self.store.begin().await?;
        let removed = tx.delete_expired_verifications(self.clock.now()).await?;
        tx.commit().await?;

        if removed > 0 {
            tracing::debug!(removed, "Purged expired verification records");
        }
        Ok(removed)
    }

    fn render_body(&self, code: &str) -> String {
        format!(
            "Your GoodSpace verification code is {}.\n\
             It expires in {} minutes.",
            code,
            self.ttl.num_minutes()
        )
    }
}
