//! Auth routes: login, logout, and session introspection.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::credentials;
use crate::auth::middleware::CurrentSession;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::session::store::SessionView;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session_info))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// What the client sees of its session. Mirrors the session queries:
/// identity when logged in, the guest label and zeroed fields otherwise.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub username: String,
    pub visits: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_at: Option<DateTime<Utc>>,
}

impl From<SessionView> for SessionResponse {
    fn from(v: SessionView) -> Self {
        Self {
            authenticated: v.authenticated,
            is_admin: v.is_admin,
            user_id: v.user_id,
            username: v.username,
            visits: v.visits,
            login_at: v.login_at,
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/login
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = SessionResponse),
        (status = 400, description = "Missing fields", body = ApiErrorBody),
        (status = 401, description = "Invalid credentials", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    session: CurrentSession,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let mut errors: Vec<FieldError> = Vec::new();
    if body.username.trim().is_empty() {
        errors.push(FieldError {
            field: "username".into(),
            message: "Username is required".into(),
        });
    }
    if body.password.is_empty() {
        errors.push(FieldError {
            field: "password".into(),
            message: "Password is required".into(),
        });
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let identity =
        credentials::authenticate(state.credentials.as_ref(), &body.username, &body.password)
            .await?;

    // Credential checking is done; bind the verified identity to the
    // session. A previous login on this session is simply replaced.
    state.sessions.login(&session.token, &identity);

    tracing::info!(user_id = %identity.id, username = %identity.username, "user logged in");

    Ok(Json(state.sessions.view(&session.token).into()))
}

// ---------------------------------------------------------------------------
// POST /api/v1/auth/logout
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses((status = 204, description = "Session destroyed")),
)]
pub async fn logout(State(state): State<AppState>, session: CurrentSession) -> StatusCode {
    // Idempotent: destroying an already-guest session is a no-op. The next
    // request starts over with a fresh session and visit count.
    state.sessions.logout(&session.token);
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// GET /api/v1/auth/session
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    tag = "Auth",
    responses((status = 200, description = "Current session state", body = SessionResponse)),
)]
pub async fn session_info(session: CurrentSession) -> Json<SessionResponse> {
    Json(session.view.into())
}
