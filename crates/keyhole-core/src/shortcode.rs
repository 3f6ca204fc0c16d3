use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Symbols a short code may contain.
pub const CODE_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Fixed length of every short code.
pub const CODE_LENGTH: usize = 8;

/// A validated short-code identifier for a shortened URL.
///
/// Codes are exactly [`CODE_LENGTH`] characters drawn from [`CODE_ALPHABET`]
/// and never change or get reused once handed out, even after soft delete.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Creates a `ShortCode` after validating the input.
    pub fn parse(code: impl Into<String>) -> Result<Self, ServiceError> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources (the
    /// generator, or a backend returning values it stored earlier).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Joins the code onto the public base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> Result<(), ServiceError> {
        if code.len() != CODE_LENGTH {
            return Err(ServiceError::InvalidShortCode(format!(
                "length must be {}, got {}",
                CODE_LENGTH,
                code.len()
            )));
        }
        if !code.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
            return Err(ServiceError::InvalidShortCode(format!(
                "must contain only alphanumeric characters: '{}'",
                code
            )));
        }
        Ok(())
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
