use chrono::DateTime;
use chrono::Utc;

/// Pending email-to-code binding.
///
/// At most one record exists per email at any instant. The record moves
/// issued -> verified -> consumed (deleted); expired records linger until
/// superseded or swept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerification {
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
}

impl EmailVerification {
    /// Create a freshly issued record.
    pub fn issued(
        email: String,
        code: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            code,
            created_at,
            expires_at,
            verified: false,
        }
    }

    /// Whether the record's lifetime has ended at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the presented code matches the issued one.
    pub fn has_code(&self, code: &str) -> bool {
        self.code == code
    }
}
