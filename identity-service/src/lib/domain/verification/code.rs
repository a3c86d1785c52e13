use rand::rngs::OsRng;
use rand::Rng;

/// One-time code generation.
///
/// Digits only, so a human can read the code out of a mail client and
/// type it back. Draws from the operating system RNG.
pub struct CodeGenerator {
    length: usize,
}

impl CodeGenerator {
    /// Create a generator producing codes of the given length.
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    /// Generate one code.
    pub fn generate(&self) -> String {
        let mut rng = OsRng;
        (0..self.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generates_requested_length() {
        let generator = CodeGenerator::new(6);
        assert_eq!(generator.generate().len(), 6);

        let generator = CodeGenerator::new(8);
        assert_eq!(generator.generate().len(), 8);
    }

    #[test]
    fn test_generates_digits_only() {
        let generator = CodeGenerator::new(6);
        for _ in 0..32 {
            assert!(generator.generate().chars().all(|c| c.is_ascii_digit()));
        }
    }
}
