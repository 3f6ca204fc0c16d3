//! Short-code generation.
//!
//! Generators are pure: they never talk to storage. Uniqueness is enforced
//! at the storage boundary and resolved by the service's retry loop, never
//! assumed satisfied by the generator alone.

pub mod seq;

use keyhole_core::{GeneratorError, ShortCode, CODE_ALPHABET, CODE_LENGTH};
use rand::rngs::OsRng;
use rand::RngCore;

pub use seq::SeqGenerator;

/// Trait for producing fresh short codes.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Produces one code of [`CODE_LENGTH`] symbols from [`CODE_ALPHABET`].
    ///
    /// Fails only when the entropy source is unavailable, which is fatal
    /// and never retried.
    fn generate(&self) -> Result<ShortCode, GeneratorError>;
}

/// Generator drawing uniformly-distributed symbols from the OS CSPRNG.
///
/// Codes must not be guessable, so this uses `OsRng` rather than a seeded
/// statistical PRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

// Bytes at or above 4 * 62 are rejected so `byte % 62` stays uniform.
const REJECTION_BOUND: u8 = 248;

impl CodeGenerator for RandomGenerator {
    fn generate(&self) -> Result<ShortCode, GeneratorError> {
        let mut code = String::with_capacity(CODE_LENGTH);
        let mut buf = [0u8; 16];
        while code.len() < CODE_LENGTH {
            OsRng
                .try_fill_bytes(&mut buf)
                .map_err(|e| GeneratorError::EntropyUnavailable(e.to_string()))?;
            for byte in buf {
                if byte < REJECTION_BOUND && code.len() < CODE_LENGTH {
                    code.push(CODE_ALPHABET[(byte % 62) as usize] as char);
                }
            }
        }
        Ok(ShortCode::new_unchecked(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_have_fixed_length() {
        let generator = RandomGenerator::new();
        for _ in 0..100 {
            let code = generator.generate().unwrap();
            assert_eq!(code.as_str().len(), CODE_LENGTH);
        }
    }

    #[test]
    fn codes_stay_inside_the_alphabet() {
        let generator = RandomGenerator::new();
        for _ in 0..100 {
            let code = generator.generate().unwrap();
            assert!(ShortCode::parse(code.as_str()).is_ok());
        }
    }

    #[test]
    fn codes_are_distinct_in_practice() {
        let generator = RandomGenerator::new();
        let codes: HashSet<String> = (0..1000)
            .map(|_| generator.generate().unwrap().as_str().to_owned())
            .collect();
        // 62^8 values; 1000 draws colliding would point at a broken source.
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn every_alphabet_symbol_shows_up() {
        let generator = RandomGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            for b in generator.generate().unwrap().as_str().bytes() {
                seen.insert(b);
            }
        }
        assert_eq!(seen.len(), CODE_ALPHABET.len());
    }
}
