//! services/api/src/adapters/passwords.rs
//!
//! Argon2 password hashing shared by the identity adapters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use memory_wall_core::ports::{PortError, PortResult};
use tracing::error;
use uuid::Uuid;

pub fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

/// Checks `password` against a stored PHC hash string.
pub fn verify_password(password: &str, stored_hash: &str) -> PortResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        PortError::Unexpected("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// A fresh opaque token for sessions and mailed links.
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("pw").unwrap();
        assert!(verify_password("pw", &hash).unwrap());
        assert!(!verify_password("other", &hash).unwrap());
        assert!(verify_password("pw", "not-a-hash").is_err());
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(new_token(), new_token());
    }
}
