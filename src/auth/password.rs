//! Argon2id password hashing.
//!
//! Digests are PHC strings (`$argon2id$v=19$...`) that embed their own salt
//! and parameters, so verification needs nothing but the stored string.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash, PasswordHasher,
    PasswordVerifier, Version,
};
use rand::rngs::OsRng;

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// Hash a plaintext password with a fresh random salt.
///
/// # Errors
///
/// Returns an error if Argon2 rejects the input (e.g. absurdly long passwords).
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = hasher()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|_| anyhow!("failed to hash password"))?
        .to_string();
    Ok(digest)
}

/// Check `plaintext` against a stored digest. A digest that does not parse
/// simply fails verification.
#[must_use]
pub fn verify(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    hasher()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Run [`hash`] on the blocking pool.
///
/// # Errors
///
/// Returns an error if hashing fails or the blocking task panics.
pub async fn hash_blocking(plaintext: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash(&plaintext))
        .await
        .map_err(|err| anyhow!("password hashing task failed: {err}"))?
}

/// Run [`verify`] on the blocking pool.
///
/// # Errors
///
/// Returns an error only if the blocking task panics.
pub async fn verify_blocking(plaintext: String, digest: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify(&plaintext, &digest))
        .await
        .map_err(|err| anyhow!("password verification task failed: {err}"))
}
