//! HTTP-level tests: cookie-backed sessions, the login round-trip, and the
//! admin gate. Run against in-memory credentials; no database needed.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

async fn test_server() -> TestServer {
    let (app, _state) = common::test_app().await;
    let mut server = TestServer::new(app).expect("test server");
    server.do_save_cookies();
    server
}

// ---------------------------------------------------------------------------
// Session bootstrap
// ---------------------------------------------------------------------------

#[tokio::test]
async fn a_first_request_starts_a_guest_session() {
    let server = test_server().await;

    let res = server.get("/api/v1/auth/session").await;
    res.assert_status_ok();

    let body: Value = res.json();
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["username"], "guest");
    assert_eq!(body["visits"], 1);
    assert!(body.get("login_at").is_none() || body["login_at"].is_null());
}

#[tokio::test]
async fn the_session_cookie_is_reused_across_requests() {
    let server = test_server().await;

    server.get("/api/v1/auth/session").await;
    let res = server.get("/api/v1/auth/session").await;

    assert_eq!(res.json::<Value>()["visits"], 2);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn admin_login_round_trip() {
    let server = test_server().await;

    let res = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "admin", "password": "Admin1" }))
        .await;
    res.assert_status_ok();

    let body: Value = res.json();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["username"], "admin");
    assert!(body["user_id"].as_str().unwrap().starts_with("usr_"));
    assert!(body["login_at"].is_string());

    // The authenticated state sticks to the session.
    let res = server.get("/api/v1/auth/session").await;
    let body: Value = res.json();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["username"], "admin");
    assert_eq!(body["visits"], 2);
}

#[tokio::test]
async fn non_admin_login_is_authenticated_without_admin() {
    let server = test_server().await;

    let res = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "user", "password": "User1234" }))
        .await;
    res.assert_status_ok();

    let body: Value = res.json();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn bad_credentials_fail_identically() {
    let server = test_server().await;

    let wrong_pw = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "admin", "password": "nope" }))
        .await;
    let unknown = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "ghost", "password": "nope" }))
        .await;

    wrong_pw.assert_status(StatusCode::UNAUTHORIZED);
    unknown.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw.json::<Value>()["error"], unknown.json::<Value>()["error"]);
}

#[tokio::test]
async fn blank_fields_fail_validation() {
    let server = test_server().await;

    let res = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "  ", "password": "" }))
        .await;

    res.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_resets_the_session() {
    let server = test_server().await;

    server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "admin", "password": "Admin1" }))
        .await
        .assert_status_ok();

    let res = server.post("/api/v1/auth/logout").await;
    res.assert_status(StatusCode::NO_CONTENT);

    // The follow-up request starts over as a fresh guest session.
    let res = server.get("/api/v1/auth/session").await;
    let body: Value = res.json();
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["username"], "guest");
    assert_eq!(body["visits"], 1);
}

#[tokio::test]
async fn logout_of_a_guest_session_is_harmless() {
    let server = test_server().await;

    let res = server.post("/api/v1/auth/logout").await;
    res.assert_status(StatusCode::NO_CONTENT);
}

// ---------------------------------------------------------------------------
// Admin gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn guests_cannot_reach_admin_routes() {
    let server = test_server().await;

    let res = server
        .post("/api/v1/products")
        .json(&json!({
            "brand": "Acme",
            "model": "X1",
            "description": "A widget",
            "price": 9.99,
            "stock": 3,
            "category_id": "cat_missing"
        }))
        .await;

    res.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>()["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn non_admin_users_are_forbidden() {
    let server = test_server().await;

    server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "user", "password": "User1234" }))
        .await
        .assert_status_ok();

    let res = server.delete("/api/v1/products/prd_anything").await;

    res.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(res.json::<Value>()["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn the_gate_reopens_after_logout() {
    let server = test_server().await;

    server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "admin", "password": "Admin1" }))
        .await
        .assert_status_ok();
    server.post("/api/v1/auth/logout").await;

    let res = server.delete("/api/v1/products/prd_anything").await;

    res.assert_status(StatusCode::UNAUTHORIZED);
}
