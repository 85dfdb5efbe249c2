use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

/// Argon2 hashing used for caregiver passwords and invitation PINs alike.
/// Verification goes through the parsed hash, so the comparison is not
/// attacker-observable.
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|err| anyhow!(err))?
        .to_string())
}

pub fn verify_secret(secret: &str, secret_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(secret_hash).map_err(|err| anyhow!(err))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}
