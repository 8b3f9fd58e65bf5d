//! Argon2id password hashing.
//!
//! Length rules live in [`super::validation`]; this module only produces
//! and checks PHC strings. A stored hash carries its own parameters, so
//! accounts hashed under older settings keep verifying, and
//! [`needs_rehash`] tells login when one should be upgraded.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;

/// Memory cost in KiB.
const MEMORY_COST_KIB: u32 = 19456;

/// Number of passes over memory.
const TIME_COST: u32 = 2;

/// Degree of parallelism.
const PARALLELISM: u32 = 1;

/// Password hashing errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// The hasher rejected its input or parameters.
    #[error("password hashing failed: {0}")]
    Hash(String),

    /// The stored hash is not a PHC string.
    #[error("stored password hash is malformed")]
    InvalidHash,

    /// The password does not match the stored hash.
    #[error("password does not match")]
    Mismatch,
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    // Parameters come from the stored hash
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}

/// Whether a stored hash was made with anything other than the current
/// algorithm and cost parameters.
///
/// Unparseable hashes report `true`.
pub fn needs_rehash(hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return true;
    };
    if !matches!(Algorithm::try_from(parsed.algorithm), Ok(Algorithm::Argon2id)) {
        return true;
    }

    match Params::try_from(&parsed) {
        Ok(params) => {
            params.m_cost() != MEMORY_COST_KIB
                || params.t_cost() != TIME_COST
                || params.p_cost() != PARALLELISM
        }
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_hash(password: &str) -> String {
        let params = Params::new(8192, 1, 1, None).unwrap();
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_hash_format() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=19456,t=2,p=1"));
        assert_ne!(hash, hash_password("correct horse").unwrap());
    }

    #[test]
    fn test_verify() {
        let hash = hash_password("pässwörd123").unwrap();

        assert!(verify_password("pässwörd123", &hash).is_ok());
        assert!(matches!(
            verify_password("passwOrd123", &hash),
            Err(PasswordError::Mismatch)
        ));
        assert!(matches!(
            verify_password("pässwörd123", "not a hash"),
            Err(PasswordError::InvalidHash)
        ));
    }

    #[test]
    fn test_legacy_hash_verifies_and_needs_rehash() {
        let hash = legacy_hash("old-account-pw");

        assert!(verify_password("old-account-pw", &hash).is_ok());
        assert!(needs_rehash(&hash));
        assert!(!needs_rehash(&hash_password("old-account-pw").unwrap()));
        assert!(needs_rehash("plaintext"));
    }
}
