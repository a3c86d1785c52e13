use std::sync::Arc;
use std::sync::Mutex;

use chrono::Duration;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::claims::Role;
use super::claims::TokenClaims;
use super::claims::TokenType;
use super::errors::TokenError;
use crate::clock::Clock;

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies signed bearer tokens.
///
/// Uses HS256 (HMAC with SHA-256); the signing secret is held by the
/// process and never appears in a token. Expiry is checked against the
/// injected clock rather than ambient system time.
///
/// # Security Notes
/// - The secret should be at least 256 bits (32 bytes) for HS256
/// - Store secrets in environment variables or secure vaults, never in code
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
    // Guards non-decreasing issued-at across sequential issuance.
    last_issued_at: Mutex<f64>,
}

impl TokenIssuer {
    /// Create a new token issuer.
    ///
    /// # Arguments
    /// * `secret` - Signing key for HS256
    /// * `access_ttl` - Lifetime of access tokens
    /// * `refresh_ttl` - Lifetime of refresh tokens
    /// * `clock` - Time source for issued-at and expiry
    ///
    /// # Returns
    /// Configured TokenIssuer instance
    pub fn new(
        secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            access_ttl,
            refresh_ttl,
            clock,
            last_issued_at: Mutex::new(0.0),
        }
    }

    /// Issue a single token.
    ///
    /// # Arguments
    /// * `subject` - User id the token is issued for
    /// * `class` - Token class (access or refresh)
    /// * `roles` - Roles to carry in the token
    ///
    /// # Returns
    /// Signed token string
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue(
        &self,
        subject: i64,
        class: TokenType,
        roles: &[Role],
    ) -> Result<String, TokenError> {
        let ttl = match class {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };

        let issued_at = self.next_issued_at();
        let claims = Claims {
            sub: subject.to_string(),
            typ: class,
            roles: roles.to_vec(),
            iat: issued_at,
            exp: issued_at as i64 + ttl.num_seconds(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Issue an access/refresh pair for the same subject and roles.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue_pair(&self, subject: i64, roles: &[Role]) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(subject, TokenType::Access, roles)?,
            refresh_token: self.issue(subject, TokenType::Refresh, roles)?,
        })
    }

    /// Verify a token's signature and expiry, returning its claims.
    ///
    /// # Arguments
    /// * `token` - Signed token string
    ///
    /// # Returns
    /// Verified claims
    ///
    /// # Errors
    /// * `Invalid` - Signature mismatch, malformed token, or unparseable subject
    /// * `Expired` - Token expiry lies before the clock's current instant
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        // Expiry is checked against the injected clock below, not here.
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Invalid)?;
        let claims = data.claims;

        let subject: i64 = claims.sub.parse().map_err(|_| TokenError::Invalid)?;

        if claims.exp < self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(TokenClaims {
            subject,
            class: claims.typ,
            roles: claims.roles,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }

    fn next_issued_at(&self) -> f64 {
        let now = self.clock.now().timestamp_micros() as f64 / 1_000_000.0;

        let mut last = self
            .last_issued_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let issued_at = if now > *last { now } else { *last };
        *last = issued_at;

        issued_at
    }
}
