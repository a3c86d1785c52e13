use async_trait::async_trait;
use auth::Role;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::Row;
use sqlx::Transaction;

use crate::domain::errors::AuthError;
use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::NewUser;
use crate::domain::identity::models::User;
use crate::domain::identity::models::UserId;
use crate::domain::ports::AuthStore;
use crate::domain::ports::StoreTx;
use crate::domain::verification::models::EmailVerification;

const USERS_EMAIL_KEY: &str = "users_email_key";
const VERIFICATIONS_EMAIL_KEY: &str = "email_verifications_email_key";

/// Postgres-backed store.
///
/// Each `begin` checks a connection out of the pool for one transaction;
/// dropping the transaction without commit rolls it back. Single-row
/// lookups use `FOR UPDATE`, so verify/consume on one email and
/// credential writes on one user are serialized by row locks.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AuthStore for PgStore {
    type Tx = PgStoreTx;

    async fn begin(&self) -> Result<PgStoreTx, AuthError> {
        let tx = self.pool.begin().await.map_err(infra)?;
        Ok(PgStoreTx { tx })
    }
}

fn infra(e: sqlx::Error) -> AuthError {
    AuthError::Infrastructure(e.to_string())
}

fn duplicate_email_on(constraint: &str, email: &str, e: sqlx::Error) -> AuthError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() && db_err.constraint() == Some(constraint) {
            return AuthError::DuplicateEmail(email.to_string());
        }
    }
    infra(e)
}

fn user_from_row(row: &PgRow) -> Result<User, AuthError> {
    let roles: Vec<String> = row.try_get("roles").map_err(infra)?;
    let roles = roles
        .iter()
        .map(|role| role.parse::<Role>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AuthError::Infrastructure(e.to_string()))?;

    Ok(User {
        id: UserId(row.try_get("id").map_err(infra)?),
        email: EmailAddress::new(row.try_get("email").map_err(infra)?)?,
        password_hash: row.try_get("password_hash").map_err(infra)?,
        roles,
        refresh_token: row.try_get("refresh_token").map_err(infra)?,
        profile: row.try_get("profile").map_err(infra)?,
        created_at: row.try_get("created_at").map_err(infra)?,
    })
}

fn verification_from_row(row: &PgRow) -> Result<EmailVerification, AuthError> {
    Ok(EmailVerification {
        email: row.try_get("email").map_err(infra)?,
        code: row.try_get("code").map_err(infra)?,
        created_at: row.try_get("created_at").map_err(infra)?,
        expires_at: row.try_get("expires_at").map_err(infra)?,
        verified: row.try_get("verified").map_err(infra)?,
    })
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn commit(self) -> Result<(), AuthError> {
        self.tx.commit().await.map_err(infra)
    }

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, roles, refresh_token, profile, created_at
            FROM users
            WHERE email = $1
            FOR UPDATE
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(infra)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&mut self, id: UserId) -> Result<Option<User>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, roles, refresh_token, profile, created_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(infra)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User, AuthError> {
        let roles: Vec<String> = user
            .roles
            .iter()
            .map(|role| role.as_str().to_string())
            .collect();

        let row = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, roles, profile)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&roles)
        .bind(&user.profile)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| duplicate_email_on(USERS_EMAIL_KEY, user.email.as_str(), e))?;

        Ok(User {
            id: UserId(row.try_get("id").map_err(infra)?),
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            refresh_token: None,
            profile: user.profile,
            created_at: row.try_get("created_at").map_err(infra)?,
        })
    }

    async fn update_refresh_token(
        &mut self,
        id: UserId,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $2
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(refresh_token)
        .execute(&mut *self.tx)
        .await
        .map_err(infra)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn update_credentials(
        &mut self,
        id: UserId,
        password_hash: &str,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, refresh_token = $3
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(password_hash)
        .bind(refresh_token)
        .execute(&mut *self.tx)
        .await
        .map_err(infra)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn update_email(
        &mut self,
        id: UserId,
        email: &str,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, refresh_token = $3
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(email)
        .bind(refresh_token)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| duplicate_email_on(USERS_EMAIL_KEY, email, e))?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn update_profile(
        &mut self,
        id: UserId,
        profile: &serde_json::Value,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET profile = $2
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(profile)
        .execute(&mut *self.tx)
        .await
        .map_err(infra)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn find_verification(
        &mut self,
        email: &str,
    ) -> Result<Option<EmailVerification>, AuthError> {
        let row = sqlx::query(
            r#"
            SELECT email, code, created_at, expires_at, verified
            FROM email_verifications
            WHERE email = $1
            FOR UPDATE
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(infra)?;

        row.as_ref().map(verification_from_row).transpose()
    }

    async fn insert_verification(&mut self, record: EmailVerification) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO email_verifications (email, code, created_at, expires_at, verified)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.email)
        .bind(&record.code)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.verified)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| duplicate_email_on(VERIFICATIONS_EMAIL_KEY, &record.email, e))?;

        Ok(())
    }

    async fn mark_verified(&mut self, email: &str) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE email_verifications
            SET verified = TRUE
            WHERE email = $1
            "#,
        )
        .bind(email)
        .execute(&mut *self.tx)
        .await
        .map_err(infra)?;

        Ok(())
    }

    async fn delete_verification(&mut self, email: &str) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            DELETE FROM email_verifications
            WHERE email = $1
            "#,
        )
        .bind(email)
        .execute(&mut *self.tx)
        .await
        .map_err(infra)?;

        Ok(())
    }

    async fn consume_verification(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
            DELETE FROM email_verifications
            WHERE email = $1 AND verified = TRUE AND expires_at >= $2
            "#,
        )
        .bind(email)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(infra)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_verifications(&mut self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query(
            r#"
            DELETE FROM email_verifications
            WHERE expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(infra)?;

        Ok(result.rows_affected())
    }
}
