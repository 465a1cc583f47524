//! Password hashing and API token generation.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::RngCore;
use rand::rngs::OsRng;

use crate::domain::error::PortfolioError;

/// Length in bytes of a token key before hex encoding.
const TOKEN_BYTES: usize = 20;

pub fn hash_password(password: &str) -> Result<String, PortfolioError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default());
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PortfolioError::PasswordHash {
            reason: e.to_string(),
        })
}

/// An unparsable stored hash never verifies.
pub fn verify_password(password_hash: &str, candidate: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

/// 40 hex characters of OS randomness.
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
