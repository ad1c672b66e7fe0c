//! Credential lookup and password verification.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::pool::DbPool;
use crate::db::schema::{user_roles, users};
use crate::error::ApiError;
use crate::models::user::{Identity, User};

/// Abstraction over the store that resolves usernames to identities.
///
/// Backed by Postgres in production and an in-memory map in tests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up the unique non-deleted identity for `username`, with its
    /// deduplicated role set. A missing user is `Ok(None)`, not an error —
    /// typos and unregistered names are an expected outcome.
    ///
    /// The lookup is exact: no case folding, no trimming.
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, ApiError>;
}

// ---------------------------------------------------------------------------
// Postgres implementation
// ---------------------------------------------------------------------------

pub struct DbCredentials {
    pool: DbPool,
}

impl DbCredentials {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for DbCredentials {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, ApiError> {
        let mut conn = self.pool.get().await?;

        let user: Option<User> = users::table
            .filter(users::username.eq(username))
            .filter(users::is_deleted.eq(false))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        let Some(user) = user else {
            return Ok(None);
        };

        let roles: Vec<String> = user_roles::table
            .filter(user_roles::user_id.eq(&user.id))
            .select(user_roles::role)
            .load(&mut conn)
            .await?;

        Ok(Some(Identity {
            id: user.id,
            username: user.username,
            password_hash: user.password_hash,
            roles: roles.into_iter().collect(),
        }))
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation (for tests)
// ---------------------------------------------------------------------------

pub struct MemoryCredentials {
    users: std::sync::Mutex<HashMap<String, Identity>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self {
            users: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, identity: Identity) {
        self.users
            .lock()
            .unwrap()
            .insert(identity.username.clone(), identity);
    }
}

impl Default for MemoryCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentials {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, ApiError> {
        Ok(self.users.lock().unwrap().get(username).cloned())
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Argon2 hash verified when the username does not resolve, so that the
/// not-found path does the same amount of work as a wrong password.
const FALLBACK_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

/// Verify `password` against the credential store.
///
/// Unknown username and wrong password both fail with the same
/// invalid-credentials error; nothing in the response (or its timing)
/// reveals which one it was. The submitted password is never logged.
pub async fn authenticate(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<Identity, ApiError> {
    let identity = store.find_by_username(username).await?;

    let hash = identity
        .as_ref()
        .map(|i| i.password_hash.as_str())
        .unwrap_or(FALLBACK_HASH);
    verify_password(password, hash)?;

    identity.ok_or_else(ApiError::invalid_credentials)
}

/// Verify a password against an Argon2 PHC hash string.
fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
    use argon2::Argon2;
    use password_hash::{PasswordHash, PasswordVerifier};

    let parsed = PasswordHash::new(hash).map_err(|_| ApiError::internal("invalid hash format"))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::invalid_credentials())
}
