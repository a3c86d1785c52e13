use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

/// Authorization role carried inside tokens.
///
/// Closed set; every user holds at least `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    /// Canonical storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Error for role parsing failures.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

/// Token class marker.
///
/// Access tokens authenticate requests; refresh tokens only gate
/// re-issuance. The two differ solely in this marker and their lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "ACCESS")]
    Access,
    #[serde(rename = "REFRESH")]
    Refresh,
}

/// Serialized claim set.
///
/// `sub` holds the numeric user id as a string per JWT convention; `typ`
/// is the token class; `iat` carries fractional seconds so tokens issued
/// in quick succession still order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub(crate) struct Claims {
    pub sub: String,
    pub typ: TokenType,
    pub roles: Vec<Role>,
    pub iat: f64,
    pub exp: i64,
}

/// Verified view of a token's claims.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenClaims {
    /// Numeric user id the token was issued for
    pub subject: i64,
    /// Token class
    pub class: TokenType,
    /// Roles held at issuance time
    pub roles: Vec<Role>,
    /// Issuance instant, fractional Unix seconds
    pub issued_at: f64,
    /// Expiry instant, Unix seconds
    pub expires_at: i64,
}
