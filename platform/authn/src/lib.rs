//! Platform authentication helpers.
//!
//! Credentials are stored as argon2 PHC strings. Token issuance is out of
//! scope: a successful [`verify_password`] is the whole login handshake.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthnError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("stored password hash is malformed")]
    MalformedHash,
    #[error("password does not meet policy: {0}")]
    WeakPassword(String),
}

pub fn hash_password(password: &str) -> Result<String, AuthnError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthnError::Hash(err.to_string()))
}

/// Returns `Ok(false)` on mismatch; errors only when the stored hash is unusable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthnError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| AuthnError::MalformedHash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Password rules sourced from the security section of system settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_special_chars: bool,
    pub require_numbers: bool,
    pub require_uppercase: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_special_chars: true,
            require_numbers: true,
            require_uppercase: true,
        }
    }
}

impl PasswordPolicy {
    pub fn check(&self, password: &str) -> Result<(), AuthnError> {
        let mut problems = Vec::new();
        if password.chars().count() < self.min_length {
            problems.push(format!("at least {} characters", self.min_length));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            problems.push("an uppercase letter".to_string());
        }
        if self.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
            problems.push("a digit".to_string());
        }
        if self.require_special_chars && password.chars().all(|c| c.is_alphanumeric()) {
            problems.push("a special character".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            tracing::debug!(violations = problems.len(), "password rejected by policy");
            Err(AuthnError::WeakPassword(format!(
                "requires {}",
                problems.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_and_are_salted() {
        let first = hash_password("Sup3r$ecret").unwrap();
        let second = hash_password("Sup3r$ecret").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2"));
        assert!(verify_password("Sup3r$ecret", &first).unwrap());
        assert!(!verify_password("wrong", &first).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert_eq!(
            verify_password("anything", "plaintext"),
            Err(AuthnError::MalformedHash)
        );
    }

    #[test]
    fn default_policy_lists_every_violation() {
        let policy = PasswordPolicy::default();
        assert!(policy.check("Abcdef1!").is_ok());
        let err = policy.check("abc").unwrap_err();
        let AuthnError::WeakPassword(message) = err else {
            panic!("unexpected error {err:?}");
        };
        assert!(message.contains("at least 8 characters"));
        assert!(message.contains("an uppercase letter"));
        assert!(message.contains("a digit"));
        assert!(message.contains("a special character"));
    }

    #[test]
    fn relaxed_policy_only_checks_length() {
        let policy = PasswordPolicy {
            min_length: 6,
            require_special_chars: false,
            require_numbers: false,
            require_uppercase: false,
        };
        assert!(policy.check("simple").is_ok());
        assert!(policy.check("short").is_err());
    }
}
