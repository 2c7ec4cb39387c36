//! Credential hashing and verification.
//!
//! Passwords are hashed with Argon2id and stored as PHC strings; the salt
//! travels inside the string, so verification needs no extra state.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::auth::error::AuthError;

/// Hashes a password into a PHC-format Argon2id string.
pub fn hash(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hashed| hashed.to_string())
        .map_err(|e| AuthError::CryptoError(e.to_string()))
}

/// Verifies a password against a stored PHC string.
///
/// A malformed stored hash is a crypto error; a well-formed hash that does
/// not match is simply `false`.
pub fn verify(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::CryptoError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash("correct horse battery staple").unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify("correct horse battery staple", &hashed).unwrap());
        assert!(!verify("incorrect horse", &hashed).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash("pw1").unwrap();
        let second = hash("pw1").unwrap();
        assert_ne!(first, second);
        assert!(verify("pw1", &first).unwrap());
        assert!(verify("pw1", &second).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify("pw1", "not-a-phc-string").is_err());
    }
}
