//! Single-user HTTP Basic authentication.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// The one username/password pair allowed in.
pub(crate) struct Credentials {
    username: String,
    password_digest: [u8; 32],
}

impl Credentials {
    pub(crate) fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password_digest: digest(password),
        }
    }

    /// Checks an `Authorization` header value. Passwords are compared as
    /// SHA-256 digests so the comparison time does not depend on the secret.
    pub(crate) fn verify_header(&self, header: Option<&str>) -> bool {
        let Some(encoded) = header.and_then(|h| h.strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(pair) = String::from_utf8(decoded) else {
            return false;
        };
        let Some((username, password)) = pair.split_once(':') else {
            return false;
        };
        let password_ok = digest(password) == self.password_digest;
        username == self.username && password_ok
    }
}

fn digest(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Rejects requests without valid credentials. `/health` stays open.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if state.credentials.verify_header(header) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "rejected unauthenticated request");
    let mut response =
        ApiError::new(StatusCode::UNAUTHORIZED, "Invalid username or password").into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"career-monitor\""),
    );
    response
}
