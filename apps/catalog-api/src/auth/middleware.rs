use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::session::middleware::SessionToken;
use crate::session::store::SessionView;
use crate::AppState;

/// The current request's session, resolved by the session middleware.
///
/// Use as an Axum extractor in any handler that reads or mutates session
/// state:
///
/// ```ignore
/// async fn handler(session: CurrentSession) -> impl IntoResponse { ... }
/// ```
///
/// Extraction never touches the store's side effects — the per-request
/// resume already happened in the middleware.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub view: SessionView,
}

/// Authenticated administrator, extracted from the current session.
///
/// Rejects with 401 when the session is not authenticated (which includes
/// sessions silently reset by inactivity expiration) and 403 when the
/// logged-in user lacks the `ADMIN` role. Declaring this extractor is how a
/// handler marks itself admin-only.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
    pub username: String,
}

/// Rejection returned when a session or role requirement is not met.
pub struct AuthError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
}

impl AuthError {
    fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHORIZED",
            message: "Not authenticated",
        }
    }

    fn not_admin() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: "FORBIDDEN",
            message: "Administrator access required",
        }
    }

    fn missing_session() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: "Session middleware not installed",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(AuthError::missing_session)?;

        let view = state.sessions.view(&token);
        Ok(CurrentSession { token, view })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = parts
            .extensions
            .get::<SessionToken>()
            .cloned()
            .ok_or_else(AuthError::missing_session)?;

        let auth = state
            .sessions
            .auth_snapshot(&token)
            .ok_or_else(AuthError::unauthenticated)?;

        if !auth.is_admin {
            return Err(AuthError::not_admin());
        }

        Ok(AdminUser {
            user_id: auth.user_id,
            username: auth.username,
        })
    }
}
