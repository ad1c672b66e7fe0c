pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::Router;

use auth::credentials::CredentialStore;
use config::Config;
use db::pool::DbPool;
use session::store::SessionStore;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

/// Build the application router with the session layer attached.
///
/// The session middleware must wrap every route so that each request
/// resumes (or creates) its session exactly once before any handler runs.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::middleware::attach_session,
        ))
        // Added after the session layer: image fetches don't count as
        // session activity.
        .nest_service(
            "/uploads",
            tower_http::services::ServeDir::new(&state.config.upload_dir),
        )
        .with_state(state)
}
