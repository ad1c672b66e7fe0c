//! Process-wide session registry keyed by the opaque client token.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;

use crate::models::user::Identity;

/// Seconds of inactivity after which a session is discarded on next touch.
pub const INACTIVITY_WINDOW_SECS: i64 = 3600;

/// Username reported for sessions that are not authenticated.
pub const GUEST_USERNAME: &str = "guest";

/// Identity data captured once at login and held for the session's lifetime.
///
/// `is_admin` is derived from the role set at login time; later role changes
/// on the server are not observed until the user logs in again.
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub user_id: String,
    pub username: String,
    pub is_admin: bool,
    pub login_at: DateTime<Utc>,
}

/// Per-token session state. `auth` is `Some` exactly while authenticated.
struct SessionRecord {
    last_activity: DateTime<Utc>,
    visits: u64,
    auth: Option<AuthSnapshot>,
}

impl SessionRecord {
    fn view(&self) -> SessionView {
        SessionView {
            authenticated: self.auth.is_some(),
            is_admin: self.auth.as_ref().is_some_and(|a| a.is_admin),
            user_id: self.auth.as_ref().map(|a| a.user_id.clone()),
            username: self
                .auth
                .as_ref()
                .map_or_else(|| GUEST_USERNAME.to_string(), |a| a.username.clone()),
            visits: self.visits,
            login_at: self.auth.as_ref().map(|a| a.login_at),
        }
    }
}

/// Read-only snapshot of a session, taken after the request's touch.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub authenticated: bool,
    pub is_admin: bool,
    pub user_id: Option<String>,
    pub username: String,
    pub visits: u64,
    pub login_at: Option<DateTime<Utc>>,
}

impl SessionView {
    fn guest() -> Self {
        Self {
            authenticated: false,
            is_admin: false,
            user_id: None,
            username: GUEST_USERNAME.to_string(),
            visits: 0,
            login_at: None,
        }
    }
}

/// Outcome of the per-request session resumption.
pub struct ResumedSession {
    /// Token the rest of the request addresses the session by. Differs from
    /// the presented token when a fresh record was created.
    pub token: String,
    /// True when a new record was created this request (first visit, stale
    /// token, or inactivity reset) and the client needs the cookie updated.
    pub fresh: bool,
    pub view: SessionView,
}

/// Shared registry of all live sessions.
///
/// Uses `DashMap` for shard-level concurrency and `parking_lot::Mutex` per
/// entry so that two requests racing on the same token serialize instead of
/// losing visit/activity updates.
pub struct SessionStore {
    sessions: DashMap<String, Mutex<SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Resume the session behind `token`, or create a fresh Guest session.
    ///
    /// Called exactly once per request, before any handler. The inactivity
    /// check runs against the previous `last_activity` BEFORE this request's
    /// bookkeeping overwrites it; an expired record is destroyed outright and
    /// replaced by a brand-new Guest session under a new token.
    pub fn resume_or_create(&self, token: Option<&str>) -> ResumedSession {
        self.resume_or_create_at(token, Utc::now())
    }

    /// [`SessionStore::resume_or_create`] with an explicit timestamp.
    pub fn resume_or_create_at(&self, token: Option<&str>, now: DateTime<Utc>) -> ResumedSession {
        if let Some(tok) = token {
            let mut expired = false;
            if let Some(entry) = self.sessions.get(tok) {
                let mut rec = entry.lock();
                if (now - rec.last_activity).num_seconds() > INACTIVITY_WINDOW_SECS {
                    expired = true;
                } else {
                    rec.visits += 1;
                    rec.last_activity = now;
                    return ResumedSession {
                        token: tok.to_string(),
                        fresh: false,
                        view: rec.view(),
                    };
                }
            }
            if expired {
                self.sessions.remove(tok);
            }
        }

        let tok = generate_session_token();
        let rec = SessionRecord {
            last_activity: now,
            visits: 1,
            auth: None,
        };
        let view = rec.view();
        self.sessions.insert(tok.clone(), Mutex::new(rec));
        ResumedSession {
            token: tok,
            fresh: true,
            view,
        }
    }

    /// Bind an already-verified identity to the session.
    ///
    /// The caller must have authenticated `identity` first; no credential
    /// checking happens here. Any prior authenticated state is overwritten.
    pub fn login(&self, token: &str, identity: &Identity) {
        self.login_at(token, identity, Utc::now());
    }

    /// [`SessionStore::login`] with an explicit timestamp.
    pub fn login_at(&self, token: &str, identity: &Identity, now: DateTime<Utc>) {
        if let Some(entry) = self.sessions.get(token) {
            let mut rec = entry.lock();
            rec.auth = Some(AuthSnapshot {
                user_id: identity.id.clone(),
                username: identity.username.clone(),
                is_admin: identity.is_admin(),
                login_at: now,
            });
        }
    }

    /// Destroy the session. Idempotent; the next touch under this client
    /// starts a brand-new Guest session.
    pub fn logout(&self, token: &str) {
        self.sessions.remove(token);
    }

    /// Snapshot the session; a missing token reads as a Guest default.
    pub fn view(&self, token: &str) -> SessionView {
        self.sessions
            .get(token)
            .map(|entry| entry.lock().view())
            .unwrap_or_else(SessionView::guest)
    }

    /// The cached identity, when the session is authenticated.
    pub fn auth_snapshot(&self, token: &str) -> Option<AuthSnapshot> {
        self.sessions
            .get(token)
            .and_then(|entry| entry.lock().auth.clone())
    }

    pub fn is_authenticated(&self, token: &str) -> bool {
        self.auth_snapshot(token).is_some()
    }

    /// False whenever the session is not authenticated.
    pub fn is_admin(&self, token: &str) -> bool {
        self.auth_snapshot(token).is_some_and(|a| a.is_admin)
    }

    pub fn username(&self, token: &str) -> String {
        self.view(token).username
    }

    pub fn visits(&self, token: &str) -> u64 {
        self.view(token).visits
    }

    pub fn login_time(&self, token: &str) -> Option<DateTime<Utc>> {
        self.auth_snapshot(token).map(|a| a.login_at)
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an opaque random session token (`ses_` prefix).
fn generate_session_token() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    let mut buf = [0u8; 32];
    rand::thread_rng().fill(&mut buf[..]);
    format!(
        "{}_{}",
        storefront_common::id::prefix::SESSION,
        URL_SAFE_NO_PAD.encode(buf)
    )
}
