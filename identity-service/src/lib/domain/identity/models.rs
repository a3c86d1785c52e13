use std::fmt;
use std::str::FromStr;

use auth::Role;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::errors::AuthError;

/// User aggregate entity.
///
/// Carries everything the identity operations touch; product-facing
/// profile data rides along as an opaque JSON blob.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub refresh_token: Option<String>,
    pub profile: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// User unique identifier type.
///
/// Numeric, monotonic, assigned by the store on first persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Arguments
    /// * `email` - Raw email string
    ///
    /// # Returns
    /// Validated EmailAddress value object
    ///
    /// # Errors
    /// * `InvalidEmail` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, AuthError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| AuthError::InvalidEmail(e.to_string()))
    }

    /// Get email as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user about to be persisted for the first time.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: EmailAddress,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub profile: serde_json::Value,
}

/// Command to register a new user with a verified email.
#[derive(Debug)]
pub struct SignUpCommand {
    pub email: EmailAddress,
    pub password: String,
    pub profile: serde_json::Value,
}

impl SignUpCommand {
    /// Construct a new sign-up command.
    ///
    /// # Arguments
    /// * `email` - Validated email address
    /// * `password` - Plain text password (policy-checked and hashed by the service)
    /// * `profile` - Opaque profile blob stored alongside the credentials
    pub fn new(email: EmailAddress, password: String, profile: serde_json::Value) -> Self {
        Self {
            email,
            password,
            profile,
        }
    }
}
