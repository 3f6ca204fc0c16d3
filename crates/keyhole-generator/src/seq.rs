use crate::CodeGenerator;
use keyhole_core::{GeneratorError, ShortCode, CODE_ALPHABET, CODE_LENGTH};
use std::sync::atomic::{AtomicU64, Ordering};

/// Deterministic generator for tests and local experiments.
///
/// Encodes a monotonically increasing counter in base 62, left-padded to
/// the fixed code length, so the produced sequence is predictable:
/// `AAAAAAAA`, `AAAAAAAB`, ...
#[derive(Debug, Default)]
pub struct SeqGenerator {
    counter: AtomicU64,
}

impl SeqGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the counter at `n` instead of zero.
    pub fn starting_at(n: u64) -> Self {
        Self {
            counter: AtomicU64::new(n),
        }
    }
}

impl CodeGenerator for SeqGenerator {
    fn generate(&self) -> Result<ShortCode, GeneratorError> {
        let mut n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut symbols = [CODE_ALPHABET[0]; CODE_LENGTH];
        let mut i = CODE_LENGTH;
        while n > 0 && i > 0 {
            i -= 1;
            symbols[i] = CODE_ALPHABET[(n % 62) as usize];
            n /= 62;
        }
        let code: String = symbols.iter().map(|&b| b as char).collect();
        Ok(ShortCode::new_unchecked(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_predictable() {
        let generator = SeqGenerator::new();
        assert_eq!(generator.generate().unwrap().as_str(), "AAAAAAAA");
        assert_eq!(generator.generate().unwrap().as_str(), "AAAAAAAB");
        assert_eq!(generator.generate().unwrap().as_str(), "AAAAAAAC");
    }

    #[test]
    fn counter_carries_between_positions() {
        let generator = SeqGenerator::starting_at(62);
        assert_eq!(generator.generate().unwrap().as_str(), "AAAAAABA");
    }

    #[test]
    fn codes_are_valid_short_codes() {
        let generator = SeqGenerator::starting_at(u64::MAX / 2);
        let code = generator.generate().unwrap();
        assert!(ShortCode::parse(code.as_str()).is_ok());
    }
}
