//! Credential building blocks for the GoodSpace backend
//!
//! Provides the pure pieces the identity service is assembled from:
//! - Password policy enforcement and hashing (Argon2id)
//! - Signed access/refresh token issuance and verification
//! - A clock capability so expiry behavior is deterministic under test
//!
//! Nothing in this crate performs I/O; services wire these into their own
//! domain logic and own all persistence and transport concerns.
//!
//! # Examples
//!
//! ## Password policy and hashing
//! ```
//! use auth::PasswordHasher;
//! use auth::PasswordPolicy;
//!
//! let policy = PasswordPolicy::default();
//! assert!(policy.is_legal("S3cret!pw"));
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("S3cret!pw").unwrap();
//! assert!(hasher.matches("S3cret!pw", &hash).unwrap());
//! ```
//!
//! ## Token issuance
//! ```
//! use std::sync::Arc;
//!
//! use auth::Role;
//! use auth::SystemClock;
//! use auth::TokenIssuer;
//! use auth::TokenType;
//! use chrono::Duration;
//!
//! let issuer = TokenIssuer::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     Duration::minutes(30),
//!     Duration::days(14),
//!     Arc::new(SystemClock),
//! );
//!
//! let token = issuer.issue(42, TokenType::Access, &[Role::User]).unwrap();
//! let claims = issuer.verify(&token).unwrap();
//! assert_eq!(claims.subject, 42);
//! assert_eq!(claims.class, TokenType::Access);
//! ```

pub mod clock;
pub mod password;
pub mod token;

// Re-export commonly used items
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use password::PasswordPolicy;
pub use token::Role;
pub use token::TokenClaims;
pub use token::TokenError;
pub use token::TokenIssuer;
pub use token::TokenPair;
pub use token::TokenType;
