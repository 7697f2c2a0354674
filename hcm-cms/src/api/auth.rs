//! Admin session gate
//!
//! One shared credential. A successful login issues a random token in the
//! `hcm_session` cookie; every admin route except login/logout requires a
//! live token. The gate only answers "is this an admin"; it is not meant to
//! be a hardened auth design.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "hcm_session";

/// Name used for `created_by` when a session carries no user
pub const DEFAULT_ADMIN_NAME: &str = "admin";

/// Authenticated admin, inserted into request extensions by the gate
#[derive(Debug, Clone)]
pub struct AdminUser(pub String);

impl AdminUser {
    pub fn name(&self) -> &str {
        if self.0.is_empty() {
            DEFAULT_ADMIN_NAME
        } else {
            &self.0
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    user: String,
    expires: Instant,
}

/// In-memory session table; sessions do not survive a restart
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create(&self, user: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        sessions.retain(|_, s| s.expires > now);
        sessions.insert(
            token.clone(),
            Session {
                user: user.to_string(),
                expires: now + self.ttl,
            },
        );
        token
    }

    /// User of a live session, if any
    pub async fn lookup(&self, token: &str) -> Option<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|s| s.expires > Instant::now())
            .map(|s| s.user.clone())
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }
}

/// Value of the session cookie, if the request carries one
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn session_cookie(token: &str, max_age: Duration) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        max_age.as_secs()
    ))
    .map_err(|e| ApiError::BadRequest(format!("invalid session cookie: {}", e)))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if form.username != state.admin_user || form.password != state.admin_pass {
        warn!("Rejected admin login for '{}'", form.username);
        return Err(ApiError::Unauthorized(
            "Wrong username or password".to_string(),
        ));
    }

    let token = state.sessions.create(&form.username).await;
    let cookie = session_cookie(&token, state.sessions.ttl())?;
    info!("Admin '{}' logged in", form.username);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "user": form.username })),
    )
        .into_response())
}

/// POST /admin/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        state.sessions.remove(&token).await;
    }
    let cookie = session_cookie("", Duration::ZERO)?;

    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "success": true }))).into_response())
}

/// Gate for protected admin routes
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match session_token(request.headers()) {
        Some(token) => state.sessions.lookup(&token).await,
        None => None,
    };

    match user {
        Some(user) => {
            request.extensions_mut().insert(AdminUser(user));
            next.run(request).await
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": {
                    "code": "UNAUTHORIZED",
                    "message": "Admin login required",
                }
            })),
        )
            .into_response(),
    }
}
