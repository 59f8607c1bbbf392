//! Password hashing and access-token issuance.
//!
//! Passwords are hashed with argon2id and stored as PHC strings (salt
//! included). Access tokens are HS256 JWTs carrying the username as the
//! subject claim; they are stateless: nothing is persisted server-side
//! and there is no revocation.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// JWT claims: subject (username) and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC-string hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Issue a signed access token for `username` with the configured expiry.
pub fn create_access_token(username: &str, config: &AuthConfig) -> Result<String> {
    let exp = chrono::Utc::now().timestamp() + config.token_expiry_mins * 60;
    let claims = Claims {
        sub: username.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| anyhow!("Failed to sign access token: {}", e))
}

/// Decode and validate an access token, returning its claims.
pub fn decode_access_token(token: &str, config: &AuthConfig) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("Invalid access token: {}", e))?;
    Ok(data.claims)
}
