/// Password shape validation.
///
/// Pure and deterministic: the same input always yields the same verdict.
/// The maximum length bounds what may reach the hasher.
pub struct PasswordPolicy {
    min_length: usize,
    max_length: usize,
    symbols: &'static str,
}

impl PasswordPolicy {
    const MIN_LENGTH: usize = 8;
    const MAX_LENGTH: usize = 64;
    const SYMBOLS: &'static str = "!@#$%^&*()-_=+[]{};:,.<>?/";

    /// Create a policy with custom length bounds.
    ///
    /// # Arguments
    /// * `min_length` - Minimum password length in bytes
    /// * `max_length` - Maximum password length in bytes
    ///
    /// # Returns
    /// PasswordPolicy with the default symbol set
    pub fn with_length_bounds(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
            symbols: Self::SYMBOLS,
        }
    }

    /// Check whether a raw password satisfies the policy.
    ///
    /// Requires: length within bounds, at least one letter, at least one
    /// digit, at least one symbol from the configured set, no whitespace.
    ///
    /// # Arguments
    /// * `raw` - Plaintext password candidate
    ///
    /// # Returns
    /// True if the password is acceptable
    pub fn is_legal(&self, raw: &str) -> bool {
        if raw.len() < self.min_length || raw.len() > self.max_length {
            return false;
        }
        if raw.chars().any(char::is_whitespace) {
            return false;
        }

        let has_letter = raw.chars().any(char::is_alphabetic);
        let has_digit = raw.chars().any(|c| c.is_ascii_digit());
        let has_symbol = raw.chars().any(|c| self.symbols.contains(c));

        has_letter && has_digit && has_symbol
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::with_length_bounds(Self::MIN_LENGTH, Self::MAX_LENGTH)
    }
}
