//! Authenticator behavior: credential verification and the uniform
//! invalid-credentials failure.

mod common;

use catalog_api::auth::credentials::{authenticate, MemoryCredentials};
use catalog_api::models::user::{ADMIN_ROLE, USER_ROLE};

fn seeded_store() -> MemoryCredentials {
    let store = MemoryCredentials::new();
    store.insert(common::identity("admin", "Admin1", &[ADMIN_ROLE, USER_ROLE]));
    store.insert(common::identity("user", "User1234", &[USER_ROLE]));
    store
}

#[tokio::test]
async fn valid_credentials_return_the_identity_with_its_roles() {
    let store = seeded_store();

    let identity = authenticate(&store, "admin", "Admin1").await.unwrap();

    assert_eq!(identity.username, "admin");
    assert!(identity.id.starts_with("usr_"));
    assert_eq!(identity.roles.len(), 2);
    assert!(identity.roles.contains(ADMIN_ROLE));
    assert!(identity.roles.contains(USER_ROLE));
    assert!(identity.is_admin());
}

#[tokio::test]
async fn a_single_role_identity_is_not_admin() {
    let store = seeded_store();

    let identity = authenticate(&store, "user", "User1234").await.unwrap();

    assert_eq!(identity.roles.len(), 1);
    assert!(!identity.is_admin());
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let store = seeded_store();

    let err = authenticate(&store, "admin", "not-the-password")
        .await
        .unwrap_err();

    assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    assert_eq!(err.code, "UNAUTHORIZED");
    assert_eq!(err.message, "Invalid credentials");
}

#[tokio::test]
async fn unknown_username_is_rejected_with_the_identical_error() {
    let store = seeded_store();

    let unknown = authenticate(&store, "ghost", "whatever").await.unwrap_err();
    let wrong_pw = authenticate(&store, "admin", "whatever").await.unwrap_err();

    // Nothing in the failure may reveal whether the username exists.
    assert_eq!(unknown.status, wrong_pw.status);
    assert_eq!(unknown.code, wrong_pw.code);
    assert_eq!(unknown.message, wrong_pw.message);
}

#[tokio::test]
async fn username_lookup_is_case_sensitive() {
    let store = seeded_store();

    let err = authenticate(&store, "Admin", "Admin1").await.unwrap_err();

    assert_eq!(err.message, "Invalid credentials");
}

#[tokio::test]
async fn empty_password_never_authenticates() {
    let store = seeded_store();

    assert!(authenticate(&store, "admin", "").await.is_err());
}
