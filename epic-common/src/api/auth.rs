//! API authentication via per-user tokens
//!
//! # Architecture
//!
//! - Users log in once with username + password (`POST /api/token-auth`)
//!   and receive a token key
//! - Every further API request carries `Authorization: Token <key>`
//! - Passwords are stored as iterated, salted SHA-256 digests
//! - One token per user, created on first login and reused afterwards
//!
//! # Pure Functions
//!
//! This module contains ONLY pure functions and database operations.
//! No HTTP framework dependencies (Axum, etc.) - those are in the server crate.

use rand::RngCore;
use sha2::{Digest, Sha256};

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// Number of SHA-256 rounds applied to salted passwords
pub const PASSWORD_HASH_ROUNDS: u32 = 10_000;

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone)]
pub enum ApiAuthError {
    /// `Authorization` header absent
    MissingToken,

    /// Header present but not of the form `Token <key>`
    MalformedHeader(String),

    /// Token key not known
    InvalidToken,

    /// Username/password pair rejected
    InvalidCredentials,

    /// Database error while checking credentials
    DatabaseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::MissingToken => write!(f, "Authentication credentials were not provided"),
            ApiAuthError::MalformedHeader(reason) => {
                write!(f, "Invalid token header: {}", reason)
            }
            ApiAuthError::InvalidToken => write!(f, "Invalid token"),
            ApiAuthError::InvalidCredentials => {
                write!(f, "Unable to log in with provided credentials")
            }
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

// ========================================
// Passwords
// ========================================

/// Generate a random 16-byte salt as 32 hex characters
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// Hash a password with its salt
///
/// # Examples
///
/// ```
/// use epic_common::api::auth::hash_password;
///
/// let hash = hash_password("secret", "0011");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_password("secret", "0011"));
/// assert_ne!(hash, hash_password("secret", "0012"));
/// ```
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();

    for _ in 1..PASSWORD_HASH_ROUNDS {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(salt.as_bytes())
            .finalize();
    }

    format!("{:x}", digest)
}

/// Check a password against a stored salt + hash
///
/// Accounts with an empty stored hash can never log in.
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    if stored_hash.is_empty() {
        return false;
    }

    let calculated = hash_password(password, salt);
    constant_time_eq(calculated.as_bytes(), stored_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// ========================================
// Tokens
// ========================================

/// Generate a new token key (32 hex characters)
pub fn generate_token_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Extract the key from an `Authorization` header value
///
/// Accepts `Token <key>` and `Bearer <key>`.
///
/// # Examples
///
/// ```
/// use epic_common::api::auth::parse_authorization_header;
///
/// assert_eq!(parse_authorization_header("Token abc123").unwrap(), "abc123");
/// assert!(parse_authorization_header("Basic abc123").is_err());
/// ```
pub fn parse_authorization_header(value: &str) -> Result<&str, ApiAuthError> {
    let mut parts = value.split_whitespace();

    let scheme = parts
        .next()
        .ok_or_else(|| ApiAuthError::MalformedHeader("empty header".to_string()))?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiAuthError::MalformedHeader(format!(
            "unsupported scheme '{}'",
            scheme
        )));
    }

    let key = parts
        .next()
        .ok_or_else(|| ApiAuthError::MalformedHeader("no credentials provided".to_string()))?;
    if parts.next().is_some() {
        return Err(ApiAuthError::MalformedHeader(
            "token string should not contain spaces".to_string(),
        ));
    }

    Ok(key)
}

// ========================================
// Database Operations
// ========================================

/// Check credentials and return the user id
#[cfg(feature = "sqlx")]
pub async fn authenticate_credentials(
    db: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<i64, ApiAuthError> {
    let row: Option<(i64, String, String)> = sqlx::query_as(
        "SELECT id, password_salt, password_hash FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(db)
    .await
    .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match row {
        Some((id, salt, hash)) if verify_password(password, &salt, &hash) => Ok(id),
        _ => Err(ApiAuthError::InvalidCredentials),
    }
}

/// Return the user's token key, creating one if needed
#[cfg(feature = "sqlx")]
pub async fn get_or_create_token(db: &SqlitePool, user_id: i64) -> Result<String, ApiAuthError> {
    let existing: Option<String> = sqlx::query_scalar("SELECT key FROM auth_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    if let Some(key) = existing {
        return Ok(key);
    }

    let key = generate_token_key();
    sqlx::query("INSERT INTO auth_tokens (key, user_id) VALUES (?, ?)")
        .bind(&key)
        .bind(user_id)
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(key)
}

/// Resolve a token key to its user id
#[cfg(feature = "sqlx")]
pub async fn user_id_for_token(db: &SqlitePool, key: &str) -> Result<i64, ApiAuthError> {
    sqlx::query_scalar("SELECT user_id FROM auth_tokens WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?
        .ok_or(ApiAuthError::InvalidToken)
}

// ========================================
// Tests
// ========================================
