//! Argon2id password hashing for admin accounts and the `HashPassword`
//! form processor.
//!
//! Hashes are stored in PHC string format, so parameters and salt travel
//! with the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{CoreError, CoreResult};

/// Minimum length accepted for bootstrap and newly set admin passwords.
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Hash a plaintext password with a random salt.
pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::Internal(format!("password hashing failed: {e}")))
}

/// Check a plaintext password against a stored PHC hash.
///
/// A malformed stored hash is an internal error, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> CoreResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| CoreError::Internal(format!("stored password hash is malformed: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CoreError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

/// Whether a form value already looks like a PHC argon2 hash, so editing a
/// record does not hash the hash again.
pub fn is_password_hash(value: &str) -> bool {
    value.starts_with("$argon2")
}

pub fn validate_password_strength(password: &str, min_length: usize) -> CoreResult<()> {
    if password.chars().count() < min_length {
        return Err(CoreError::Validation(format!(
            "Password must be at least {min_length} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("open-sesame").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(is_password_hash(&hash));
        assert!(verify_password("open-sesame", &hash).unwrap());
        assert!(!verify_password("open-barley", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert_matches!(
            verify_password("x", "plaintext"),
            Err(CoreError::Internal(_))
        );
    }

    #[test]
    fn strength_counts_characters() {
        assert_matches!(
            validate_password_strength("abc", MIN_PASSWORD_LENGTH),
            Err(CoreError::Validation(msg)) if msg.contains("at least 5")
        );
        assert!(validate_password_strength("admin", MIN_PASSWORD_LENGTH).is_ok());
    }
}
