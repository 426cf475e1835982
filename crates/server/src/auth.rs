//! API key authentication middleware
//!
//! Checks `Authorization: Bearer <api_key>` against
//! `server.auth.api_key`; paths listed in `server.auth.public_paths` bypass
//! the check.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aicc_config::Settings;

static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

enum AuthCheck {
    Disabled,
    PublicPath,
    ConfigError(&'static str),
    CheckKey(String),
}

/// Read everything needed from the config without holding the guard
/// across an await
fn check_auth_config(config: &RwLock<Settings>, path: &str) -> AuthCheck {
    let config_guard = config.read();
    let auth_config = &config_guard.server.auth;

    if !auth_config.enabled {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "API authentication is disabled. Set AICC__SERVER__AUTH__ENABLED=true for production."
            );
        }
        return AuthCheck::Disabled;
    }

    if auth_config.public_paths.iter().any(|p| path.starts_with(p.as_str())) {
        return AuthCheck::PublicPath;
    }

    match &auth_config.api_key {
        Some(key) if !key.is_empty() => AuthCheck::CheckKey(key.clone()),
        _ => AuthCheck::ConfigError("Auth is enabled but no API key is configured"),
    }
}

/// Reject requests without a valid bearer token
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let config = match request.extensions().get::<Arc<RwLock<Settings>>>() {
        Some(cfg) => cfg.clone(),
        None => {
            tracing::error!("Config extension not found in request");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error").into_response();
        }
    };

    let path = request.uri().path().to_string();
    match check_auth_config(&config, &path) {
        AuthCheck::Disabled | AuthCheck::PublicPath => next.run(request).await,
        AuthCheck::ConfigError(msg) => {
            tracing::error!("{}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server authentication not configured")
                .into_response()
        }
        AuthCheck::CheckKey(expected_key) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            match auth_header.as_deref().map(|h| h.strip_prefix("Bearer ")) {
                Some(Some(provided)) => {
                    if constant_time_compare(provided.as_bytes(), expected_key.as_bytes()) {
                        next.run(request).await
                    } else {
                        tracing::warn!(path = %path, "Invalid API key");
                        (StatusCode::UNAUTHORIZED, "Invalid API key").into_response()
                    }
                }
                Some(None) => (
                    StatusCode::BAD_REQUEST,
                    "Invalid Authorization header format. Expected: Bearer <token>",
                )
                    .into_response(),
                None => (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response(),
            }
        }
    }
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
