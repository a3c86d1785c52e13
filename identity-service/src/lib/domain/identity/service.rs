use std::sync::Arc;

use auth::Clock;
use auth::PasswordHasher;
use auth::PasswordPolicy;
use auth::Role;
use auth::TokenIssuer;
use auth::TokenPair;
use auth::TokenType;

use crate::domain::errors::AuthError;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::NewUser;
use crate::domain::identity::models::SignUpCommand;
use crate::domain::identity::models::User;
use crate::domain::identity::models::UserId;
use crate::domain::ports::AuthStore;
use crate::domain::ports::StoreTx;

/// Identity orchestrator.
///
/// The only component that creates or mutates user records in ways that
/// touch credentials. Every operation runs inside one store transaction;
/// an error on any step rolls the whole operation back.
pub struct IdentityService<S>
where
    S: AuthStore,
{
    store: Arc<S>,
    issuer: Arc<TokenIssuer>,
    clock: Arc<dyn Clock>,
    policy: PasswordPolicy,
    hasher: PasswordHasher,
}

impl<S> IdentityService<S>
where
    S: AuthStore,
{
    /// Create a new identity service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Transactional persistence
    /// * `issuer` - Token issuance and verification
    /// * `clock` - Time source for verification consumption
    pub fn new(store: Arc<S>, issuer: Arc<TokenIssuer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            issuer,
            clock,
            policy: PasswordPolicy::default(),
            hasher: PasswordHasher::new(),
        }
    }

    /// Register a user whose email holds a verified, unexpired record.
    ///
    /// Consumes the verification record, persists the user with a hashed
    /// password and role USER, stores a fresh refresh token and returns
    /// the token pair.
    ///
    /// # Errors
    /// * `NotVerified` - No verified, unexpired record for this email
    /// * `IllegalPassword` - Password fails the policy
    /// * `DuplicateEmail` - A user with this email already exists
    pub async fn sign_up(&self, command: SignUpCommand) -> Result<TokenPair, AuthError> {
        let mut tx = self.store.begin().await?;

        if !tx
            .consume_verification(command.email.as_str(), self.clock.now())
            .await?
        {
            return Err(AuthError::NotVerified);
        }
        if !self.policy.is_legal(&command.password) {
            return Err(AuthError::IllegalPassword);
        }

        let password_hash = self.hasher.hash(&command.password)?;
        let user = tx
            .insert_user(NewUser {
                email: command.email,
                password_hash,
                roles: vec![Role::User],
                profile: command.profile,
            })
            .await?;

        let pair = self.issuer.issue_pair(user.id.0, &user.roles)?;
        tx.update_refresh_token(user.id, &pair.refresh_token).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(pair)
    }

    /// Authenticate by email and password, rotating the refresh token.
    ///
    /// A missing user and a wrong password fail identically, so the error
    /// surface does not reveal which emails are registered.
    ///
    /// # Errors
    /// * `SignInFailed` - Unknown email or wrong password
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let mut tx = self.store.begin().await?;

        let user = tx
            .find_user_by_email(email)
            .await?
            .ok_or(AuthError::SignInFailed)?;
        if !self.hasher.matches(password, &user.password_hash)? {
            return Err(AuthError::SignInFailed);
        }

        let pair = self.issuer.issue_pair(user.id.0, &user.roles)?;
        tx.update_refresh_token(user.id, &pair.refresh_token).await?;
        tx.commit().await?;

        Ok(pair)
    }

    /// Replace the password, rotating the refresh token.
    ///
    /// # Errors
    /// * `UserNotFound` - No such user
    /// * `WrongPassword` - Previous password does not match
    /// * `IllegalPassword` - New password fails the policy
    pub async fn update_password(
        &self,
        id: UserId,
        prev_password: &str,
        new_password: &str,
    ) -> Result<String, AuthError> {
        let mut tx = self.store.begin().await?;

        let user = tx
            .find_user_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !self.hasher.matches(prev_password, &user.password_hash)? {
            return Err(AuthError::WrongPassword);
        }
        if !self.policy.is_legal(new_password) {
            return Err(AuthError::IllegalPassword);
        }

        let password_hash = self.hasher.hash(new_password)?;
        let refresh_token = self.issuer.issue(user.id.0, TokenType::Refresh, &user.roles)?;
        tx.update_credentials(id, &password_hash, &refresh_token)
            .await?;
        tx.commit().await?;

        Ok(refresh_token)
    }

    /// Move the user to a new, verified email, rotating the refresh token.
    ///
    /// # Errors
    /// * `NotVerified` - No verified, unexpired record for the new email
    /// * `UserNotFound` - No such user
    /// * `DuplicateEmail` - Another user already holds the new email
    pub async fn update_email(
        &self,
        id: UserId,
        new_email: &EmailAddress,
    ) -> Result<String, AuthError> {
        let mut tx = self.store.begin().await?;

        if !tx
            .consume_verification(new_email.as_str(), self.clock.now())
            .await?
        {
            return Err(AuthError::NotVerified);
        }
        let user = tx
            .find_user_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let refresh_token = self.issuer.issue(user.id.0, TokenType::Refresh, &user.roles)?;
        tx.update_email(id, new_email.as_str(), &refresh_token)
            .await?;
        tx.commit().await?;

        Ok(refresh_token)
    }

    /// Exchange the current refresh token for a fresh pair.
    ///
    /// Only the refresh token most recently stored on the user is
    /// accepted; rotation fences out every earlier one.
    ///
    /// # Errors
    /// * `InvalidToken` - Bad signature, wrong class, unknown subject, or superseded token
    /// * `ExpiredToken` - Refresh token lifetime has ended
    pub async fn reissue(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.issuer.verify(refresh_token)?;
        if claims.class != TokenType::Refresh {
            return Err(AuthError::InvalidToken);
        }

        let mut tx = self.store.begin().await?;

        // An unknown subject reports the same error as a bad token.
        let user = tx
            .find_user_by_id(UserId(claims.subject))
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if user.refresh_token.as_deref() != Some(refresh_token) {
            return Err(AuthError::InvalidToken);
        }

        let pair = self.issuer.issue_pair(user.id.0, &user.roles)?;
        tx.update_refresh_token(user.id, &pair.refresh_token).await?;
        tx.commit().await?;

        Ok(pair)
    }

    /// Read the user's email and profile blob.
    ///
    /// # Errors
    /// * `UserNotFound` - No such user
    pub async fn my_page(&self, id: UserId) -> Result<User, AuthError> {
        let mut tx = self.store.begin().await?;
        tx.find_user_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Replace the user's profile blob.
    ///
    /// # Errors
    /// * `UserNotFound` - No such user
    pub async fn update_my_page(
        &self,
        id: UserId,
        profile: serde_json::Value,
    ) -> Result<(), AuthError> {
        let mut tx = self.store.begin().await?;
        tx.update_profile(id, &profile).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert the bootstrap admin account unless its email is taken.
    ///
    /// Idempotent: an existing row is left untouched, and losing an
    /// insert race to a concurrent bootstrap is not an error.
    pub async fn bootstrap_admin(
        &self,
        email: &EmailAddress,
        raw_password: &str,
    ) -> Result<(), AuthError> {
        let mut tx = self.store.begin().await?;

        if tx.find_user_by_email(email.as_str()).await?.is_some() {
            return Ok(());
        }

        let password_hash = self.hasher.hash(raw_password)?;
        let inserted = tx
            .insert_user(NewUser {
                email: email.clone(),
                password_hash,
                roles: vec![Role::User, Role::Admin],
                profile: serde_json::json!({}),
            })
            .await;

        match inserted {
            Ok(user) => {
                tx.commit().await?;
                tracing::info!(user_id = %user.id, "Admin account created");
                Ok(())
            }
            Err(AuthError::DuplicateEmail(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use auth::ManualClock;
    use chrono::DateTime;
    use chrono::Duration;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::domain::verification::models::EmailVerification;
    use crate::outbound::store::memory::MemStore;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";
    const PASSWORD: &str = "P@ssw0rd1";

    struct Fixture {
        service: IdentityService<MemStore>,
        store: Arc<MemStore>,
        clock: Arc<ManualClock>,
        issuer: Arc<TokenIssuer>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let issuer = Arc::new(TokenIssuer::new(
            SECRET,
            Duration::minutes(30),
            Duration::days(14),
            clock.clone(),
        ));
        let service = IdentityService::new(store.clone(), issuer.clone(), clock.clone());
        Fixture {
            service,
            store,
            clock,
            issuer,
        }
    }

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::new(raw.to_string()).unwrap()
    }

    fn sign_up_command(raw_email: &str) -> SignUpCommand {
        SignUpCommand::new(email(raw_email), PASSWORD.to_string(), json!({}))
    }

    async fn seed_verification(store: &MemStore, raw_email: &str, now: DateTime<Utc>) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_verification(EmailVerification {
            email: raw_email.to_string(),
            code: "123456".to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(5),
            verified: true,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    async fn stored_user(store: &MemStore, raw_email: &str) -> Option<User> {
        let mut tx = store.begin().await.unwrap();
        tx.find_user_by_email(raw_email).await.unwrap()
    }

    async fn stored_verification(store: &MemStore, raw_email: &str) -> Option<EmailVerification> {
        let mut tx = store.begin().await.unwrap();
        tx.find_verification(raw_email).await.unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_success_consumes_verification() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;

        let pair = f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();

        let claims = f.issuer.verify(&pair.access_token).unwrap();
        assert_eq!(claims.class, TokenType::Access);
        assert_eq!(claims.roles, vec![Role::User]);

        let user = stored_user(&f.store, "a@example.com").await.unwrap();
        assert_eq!(user.id.0, claims.subject);
        assert_eq!(user.refresh_token.as_deref(), Some(pair.refresh_token.as_str()));
        assert_ne!(user.password_hash, PASSWORD);

        // The consumed record is gone.
        assert!(stored_verification(&f.store, "a@example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_without_verification() {
        let f = fixture();
        let result = f.service.sign_up(sign_up_command("a@example.com")).await;
        assert_eq!(result.unwrap_err(), AuthError::NotVerified);
    }

    #[tokio::test]
    async fn test_sign_up_with_unverified_record() {
        let f = fixture();
        let now = f.clock.now();

        let mut tx = f.store.begin().await.unwrap();
        tx.insert_verification(EmailVerification::issued(
            "a@example.com".to_string(),
            "123456".to_string(),
            now,
            now + Duration::minutes(5),
        ))
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let result = f.service.sign_up(sign_up_command("a@example.com")).await;
        assert_eq!(result.unwrap_err(), AuthError::NotVerified);

        // The unverified record survives the failed attempt.
        assert!(stored_verification(&f.store, "a@example.com").await.is_some());
    }

    #[tokio::test]
    async fn test_sign_up_with_expired_verification() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;

        f.clock.advance(Duration::minutes(6));
        let result = f.service.sign_up(sign_up_command("a@example.com")).await;
        assert_eq!(result.unwrap_err(), AuthError::NotVerified);
    }

    #[tokio::test]
    async fn test_sign_up_illegal_password_rolls_back_consume() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;

        let command = SignUpCommand::new(email("a@example.com"), "short".to_string(), json!({}));
        let result = f.service.sign_up(command).await;
        assert_eq!(result.unwrap_err(), AuthError::IllegalPassword);

        // The consume is rolled back with the rest of the transaction.
        assert!(stored_verification(&f.store, "a@example.com").await.is_some());
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email_rolls_back_consume() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();

        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        let result = f.service.sign_up(sign_up_command("a@example.com")).await;
        assert!(matches!(result, Err(AuthError::DuplicateEmail(_))));

        assert!(stored_verification(&f.store, "a@example.com").await.is_some());
    }

    #[tokio::test]
    async fn test_sign_in_rotates_refresh_token() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        let signup_pair = f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();

        f.clock.advance(Duration::seconds(1));
        let signin_pair = f.service.sign_in("a@example.com", PASSWORD).await.unwrap();
        assert_ne!(signin_pair.refresh_token, signup_pair.refresh_token);

        let user = stored_user(&f.store, "a@example.com").await.unwrap();
        assert_eq!(
            user.refresh_token.as_deref(),
            Some(signin_pair.refresh_token.as_str())
        );
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_uniform() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();

        let missing = f.service.sign_in("missing@example.com", "anything").await;
        let wrong = f.service.sign_in("a@example.com", "wrong_password").await;

        // Unknown email and wrong password are indistinguishable.
        assert_eq!(missing.unwrap_err(), AuthError::SignInFailed);
        assert_eq!(wrong.unwrap_err(), AuthError::SignInFailed);
    }

    #[tokio::test]
    async fn test_update_password_rotates_refresh_token() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        let pair = f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();
        let user = stored_user(&f.store, "a@example.com").await.unwrap();

        f.clock.advance(Duration::seconds(1));
        let new_refresh = f
            .service
            .update_password(user.id, PASSWORD, "N3w!Passw0rd")
            .await
            .unwrap();

        let updated = stored_user(&f.store, "a@example.com").await.unwrap();
        assert_eq!(updated.refresh_token.as_deref(), Some(new_refresh.as_str()));
        assert_ne!(new_refresh, pair.refresh_token);
        assert_ne!(updated.password_hash, user.password_hash);

        // The old refresh token is no longer accepted.
        let result = f.service.reissue(&pair.refresh_token).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);

        // The new password signs in; the old one does not.
        f.service.sign_in("a@example.com", "N3w!Passw0rd").await.unwrap();
        let result = f.service.sign_in("a@example.com", PASSWORD).await;
        assert_eq!(result.unwrap_err(), AuthError::SignInFailed);
    }

    #[tokio::test]
    async fn test_update_password_wrong_previous() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();
        let user = stored_user(&f.store, "a@example.com").await.unwrap();

        let result = f
            .service
            .update_password(user.id, "not_the_password", "N3w!Passw0rd")
            .await;
        assert_eq!(result.unwrap_err(), AuthError::WrongPassword);
    }

    #[tokio::test]
    async fn test_update_password_illegal_new_password() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();
        let user = stored_user(&f.store, "a@example.com").await.unwrap();

        let result = f.service.update_password(user.id, PASSWORD, "short").await;
        assert_eq!(result.unwrap_err(), AuthError::IllegalPassword);
    }

    #[tokio::test]
    async fn test_update_password_unknown_user() {
        let f = fixture();
        let result = f
            .service
            .update_password(UserId(999), PASSWORD, "N3w!Passw0rd")
            .await;
        assert_eq!(result.unwrap_err(), AuthError::UserNotFound);
    }

    #[tokio::test]
    async fn test_update_email_consumes_verification() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();
        let user = stored_user(&f.store, "a@example.com").await.unwrap();

        seed_verification(&f.store, "b@example.com", f.clock.now()).await;
        let refresh = f
            .service
            .update_email(user.id, &email("b@example.com"))
            .await
            .unwrap();

        assert!(stored_user(&f.store, "a@example.com").await.is_none());
        let moved = stored_user(&f.store, "b@example.com").await.unwrap();
        assert_eq!(moved.id, user.id);
        assert_eq!(moved.refresh_token.as_deref(), Some(refresh.as_str()));
        assert!(stored_verification(&f.store, "b@example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_update_email_requires_verification() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();
        let user = stored_user(&f.store, "a@example.com").await.unwrap();

        let result = f.service.update_email(user.id, &email("b@example.com")).await;
        assert_eq!(result.unwrap_err(), AuthError::NotVerified);
    }

    #[tokio::test]
    async fn test_update_email_duplicate_rolls_back_consume() {
        let f = fixture();
        for addr in ["a@example.com", "b@example.com"] {
            seed_verification(&f.store, addr, f.clock.now()).await;
            f.service.sign_up(sign_up_command(addr)).await.unwrap();
        }
        let user = stored_user(&f.store, "a@example.com").await.unwrap();

        seed_verification(&f.store, "b@example.com", f.clock.now()).await;
        let result = f.service.update_email(user.id, &email("b@example.com")).await;
        assert!(matches!(result, Err(AuthError::DuplicateEmail(_))));

        // Rollback keeps the verification record and the original email.
        assert!(stored_verification(&f.store, "b@example.com").await.is_some());
        assert!(stored_user(&f.store, "a@example.com").await.is_some());
    }

    #[tokio::test]
    async fn test_reissue_rotates_pair() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        let pair = f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();

        f.clock.advance(Duration::seconds(1));
        let next = f.service.reissue(&pair.refresh_token).await.unwrap();
        assert_ne!(next.refresh_token, pair.refresh_token);

        // The superseded token is rejected from now on.
        let result = f.service.reissue(&pair.refresh_token).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);

        // The fresh one keeps working.
        f.clock.advance(Duration::seconds(1));
        f.service.reissue(&next.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_reissue_rejects_access_token() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        let pair = f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();

        let result = f.service.reissue(&pair.access_token).await;
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn test_reissue_rejects_expired_refresh_token() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        let pair = f.service.sign_up(sign_up_command("a@example.com")).await.unwrap();

        f.clock.advance(Duration::days(15));
        let result = f.service.reissue(&pair.refresh_token).await;
        assert_eq!(result.unwrap_err(), AuthError::ExpiredToken);
    }

    #[tokio::test]
    async fn test_my_page_round_trip() {
        let f = fixture();
        seed_verification(&f.store, "a@example.com", f.clock.now()).await;
        let command = SignUpCommand::new(
            email("a@example.com"),
            PASSWORD.to_string(),
            json!({"nickname": "nicola"}),
        );
        f.service.sign_up(command).await.unwrap();
        let user = stored_user(&f.store, "a@example.com").await.unwrap();

        let page = f.service.my_page(user.id).await.unwrap();
        assert_eq!(page.profile, json!({"nickname": "nicola"}));

        f.service
            .update_my_page(user.id, json!({"nickname": "nico"}))
            .await
            .unwrap();
        let page = f.service.my_page(user.id).await.unwrap();
        assert_eq!(page.profile, json!({"nickname": "nico"}));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let f = fixture();
        let admin = email("admin@example.com");

        f.service.bootstrap_admin(&admin, "Adm1n!pass").await.unwrap();
        let first = stored_user(&f.store, "admin@example.com").await.unwrap();
        assert_eq!(first.roles, vec![Role::User, Role::Admin]);
        assert_ne!(first.password_hash, "Adm1n!pass");

        f.service.bootstrap_admin(&admin, "Adm1n!pass").await.unwrap();
        let second = stored_user(&f.store, "admin@example.com").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.password_hash, first.password_hash);
    }
}
