//! Per-request session resumption.
//!
//! Every request passes through [`attach_session`] before reaching a
//! handler: the session behind the client's cookie is resumed (or a fresh
//! Guest session is created) exactly once, and the resolved token is made
//! available to extractors through request extensions.

use axum::extract::{Request, State};
use axum::http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::Response;

use crate::AppState;

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "sid";

/// Session token resolved for the current request.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Resume or create the request's session and stash the token in extensions.
///
/// When a fresh record was created (first visit, stale token, or inactivity
/// reset) the response carries a `Set-Cookie` replacing the client's token.
pub async fn attach_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let presented = cookie_value(req.headers(), SESSION_COOKIE);
    let resumed = state.sessions.resume_or_create(presented.as_deref());

    let set_cookie = if resumed.fresh {
        session_cookie(&resumed.token)
    } else {
        None
    };
    req.extensions_mut().insert(SessionToken(resumed.token));

    let mut res = next.run(req).await;
    if let Some(cookie) = set_cookie {
        res.headers_mut().append(SET_COOKIE, cookie);
    }
    res
}

fn session_cookie(token: &str) -> Option<HeaderValue> {
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    HeaderValue::from_str(&cookie).ok()
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    header
        .split(';')
        .map(str::trim)
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
