use auth::PasswordError;
use auth::TokenError;
use thiserror::Error;

/// Closed error sum for every authentication, authorization and
/// email-verification operation.
///
/// Variants are what callers are allowed to observe; anything internal
/// (store, mail, hashing machinery) collapses into `Infrastructure` and is
/// logged rather than surfaced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Password does not satisfy the password policy")]
    IllegalPassword,

    #[error("Verification code does not match")]
    IllegalCode,

    #[error("Sign in failed")]
    SignInFailed,

    #[error("Previous password does not match")]
    WrongPassword,

    #[error("Token is invalid")]
    InvalidToken,

    #[error("Token is expired")]
    ExpiredToken,

    #[error("Email is not verified")]
    NotVerified,

    #[error("User not found")]
    UserNotFound,

    #[error("No verification exists for this email")]
    EmailNotFound,

    #[error("Verification is expired")]
    Expired,

    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),
}

impl AuthError {
    /// Locale-neutral code surfaced to clients.
    pub fn wire_code(&self) -> &'static str {
        match self {
            AuthError::IllegalPassword => "ILLEGAL_PASSWORD",
            AuthError::IllegalCode => "ILLEGAL_CODE",
            AuthError::SignInFailed => "SIGN_IN_FAILED",
            AuthError::WrongPassword => "WRONG_PASSWORD",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::ExpiredToken => "EXPIRED_TOKEN",
            AuthError::NotVerified => "NOT_VERIFIED",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::EmailNotFound => "EMAIL_NOT_FOUND",
            AuthError::Expired => "EXPIRED",
            AuthError::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            AuthError::InvalidEmail(_) => "INVALID_EMAIL",
            AuthError::Infrastructure(_) => "INTERNAL",
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        // MalformedHash included; a corrupt stored hash is never a client error.
        AuthError::Infrastructure(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::EncodingFailed(msg) => AuthError::Infrastructure(msg),
        }
    }
}

impl From<MailError> for AuthError {
    fn from(err: MailError) -> Self {
        AuthError::Infrastructure(err.to_string())
    }
}

/// Error for outbound mail operations.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(String),
}
