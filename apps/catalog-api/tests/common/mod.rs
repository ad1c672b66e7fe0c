use std::sync::Arc;

use axum::Router;
use catalog_api::auth::credentials::MemoryCredentials;
use catalog_api::config::Config;
use catalog_api::models::user::{Identity, ADMIN_ROLE, USER_ROLE};
use catalog_api::session::store::SessionStore;
use catalog_api::AppState;

/// Hash a password with Argon2id (same as the real registration flow).
pub fn hash_password(password: &str) -> String {
    use argon2::Argon2;
    use password_hash::rand_core::OsRng;
    use password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("argon2 hash")
        .to_string()
}

/// Build an [`Identity`] with a freshly hashed password.
pub fn identity(username: &str, password: &str, roles: &[&str]) -> Identity {
    Identity {
        id: storefront_common::id::prefixed_ulid(storefront_common::id::prefix::USER),
        username: username.to_string(),
        password_hash: hash_password(password),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

/// Build an [`AppState`] backed by in-memory credentials.
///
/// The database pool is constructed lazily and never draws a connection in
/// these tests, so no Postgres is needed.
pub async fn test_state(credentials: MemoryCredentials) -> AppState {
    let config = Config {
        database_url: "postgres://localhost/unused".to_string(),
        port: 0,
        upload_dir: std::env::temp_dir().join("catalog-api-test-uploads"),
        upload_url: "http://localhost/uploads/".to_string(),
    };

    AppState {
        db: catalog_api::db::pool::connect(&config.database_url).await,
        credentials: Arc::new(credentials),
        sessions: Arc::new(SessionStore::new()),
        config: Arc::new(config),
    }
}

/// Build the full application [`Router`] with two seeded accounts:
/// `admin` (ADMIN + USER roles) and `user` (USER role).
pub async fn test_app() -> (Router, AppState) {
    let credentials = MemoryCredentials::new();
    credentials.insert(identity("admin", "Admin1", &[ADMIN_ROLE, USER_ROLE]));
    credentials.insert(identity("user", "User1234", &[USER_ROLE]));

    let state = test_state(credentials).await;
    let app = catalog_api::app(state.clone());
    (app, state)
}
