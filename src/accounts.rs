//! Account service: signup and login over the SQLite user store.
//!
//! Failure messages are fixed strings. Login reports the same message
//! whether the username is unknown or the password is wrong, so the API
//! never leaks which usernames exist.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::auth;
use crate::config::AuthConfig;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Account already exists")]
    Conflict,

    #[error("Username or password is incorrect")]
    InvalidCredentials,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AccountError {
    fn from(e: sqlx::Error) -> Self {
        AccountError::Internal(e.into())
    }
}

/// Successful login result: a signed token and the account's username.
#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    pub username: String,
}

/// Create an account.
///
/// Fails with [`AccountError::Conflict`] if the username **or** the
/// email is already taken.
pub async fn signup(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), AccountError> {
    let existing = sqlx::query("SELECT id FROM users WHERE username = ? OR email = ?")
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Err(AccountError::Conflict);
    }

    let password_hash = auth::hash_password(password)?;
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Verify credentials and issue an access token.
///
/// Unknown username and wrong password both fail with
/// [`AccountError::InvalidCredentials`].
pub async fn login(
    pool: &SqlitePool,
    auth_config: &AuthConfig,
    username: &str,
    password: &str,
) -> Result<LoginOutcome, AccountError> {
    let row = sqlx::query("SELECT username, password_hash FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Err(AccountError::InvalidCredentials);
    };

    let stored_hash: String = row.get("password_hash");
    if !auth::verify_password(password, &stored_hash) {
        return Err(AccountError::InvalidCredentials);
    }

    let account_username: String = row.get("username");
    let access_token = auth::create_access_token(&account_username, auth_config)?;

    Ok(LoginOutcome {
        access_token,
        username: account_username,
    })
}
