//! Single-user gate: a session cookie or HTTP Basic credentials.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{debug, warn};

use super::{ApiResponse, AppState};
use crate::config::{AppConfig, SESSION_COOKIE};

/// Session cookie lifetime: 30 days.
pub const SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;
const REALM: &str = "Basic realm=\"Restricted\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub username: String,
    pub password: String,
    pub session_token: String,
}

impl AuthSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            session_token: config.session_token.clone(),
        }
    }

    fn has_session(&self, headers: &HeaderMap) -> bool {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == SESSION_COOKIE && value == self.session_token)
    }

    fn basic_credentials_match(&self, headers: &HeaderMap) -> bool {
        let Some(header) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let Some((scheme, encoded)) = header.split_once(' ') else {
            return false;
        };
        if !scheme.eq_ignore_ascii_case("Basic") {
            return false;
        }
        let Ok(decoded) = BASE64.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        match decoded.split_once(':') {
            Some((user, password)) => user == self.username && password == self.password,
            None => false,
        }
    }

    fn session_cookie(&self) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly",
            SESSION_COOKIE, self.session_token, SESSION_MAX_AGE_SECS
        )
    }
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let auth = &state.auth;
    if auth.has_session(request.headers()) {
        return next.run(request).await;
    }
    if auth.basic_credentials_match(request.headers()) {
        debug!("basic credentials accepted; issuing session cookie");
        let cookie = auth.session_cookie();
        let mut response = next.run(request).await;
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
        return response;
    }
    warn!(path = %request.uri().path(), "unauthenticated request rejected");
    unauthorized()
}

fn unauthorized() -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error("authentication required")),
    )
        .into_response();
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
    response
}
