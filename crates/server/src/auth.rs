//! API key authentication middleware (spec §6 "Authentication").
//!
//! Grounded on the teacher's `auth_middleware`/`constant_time_compare` shape:
//! config is read synchronously (no lock guard held across an `.await`),
//! and the key comparison runs in constant time regardless of key length.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::atomic::{AtomicBool, Ordering};
use thaisearch_core::error::ProxyError;

use crate::state::AppState;

static AUTH_DISABLED_WARNED: AtomicBool = AtomicBool::new(false);

/// Paths reachable without an API key even when one is configured
/// (spec §6: "every non-`/health` request must present it").
const PUBLIC_PATHS: &[&str] = &["/health"];

enum AuthCheck {
    Disabled,
    PublicPath,
    Missing,
    Mismatched,
    Ok,
}

fn check(state: &AppState, path: &str, presented: Option<&str>) -> AuthCheck {
    let snapshot = state.config.snapshot();

    if !snapshot.api_key_required {
        if !AUTH_DISABLED_WARNED.swap(true, Ordering::Relaxed) {
            tracing::warn!("API key auth is disabled; every request is accepted unauthenticated");
        }
        return AuthCheck::Disabled;
    }

    if PUBLIC_PATHS.iter().any(|p| path.starts_with(p)) {
        return AuthCheck::PublicPath;
    }

    let expected = match &snapshot.index_engine_api_key {
        Some(key) if !key.is_empty() => key,
        _ => {
            tracing::error!("api_key_required is set but no API key is configured");
            return AuthCheck::Missing;
        }
    };

    match presented {
        Some(key) if constant_time_compare(key.as_bytes(), expected.as_bytes()) => AuthCheck::Ok,
        Some(_) => AuthCheck::Mismatched,
        None => AuthCheck::Missing,
    }
}

/// Extracts the presented key from `X-API-Key` or `Authorization: Bearer`,
/// preferring the former (spec §6 lists it first).
fn presented_key(request: &Request) -> Option<String> {
    request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        })
}

pub async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let presented = presented_key(&request);

    match check(&state, &path, presented.as_deref()) {
        AuthCheck::Disabled | AuthCheck::PublicPath | AuthCheck::Ok => next.run(request).await,
        AuthCheck::Missing => crate::error_response(ProxyError::Unauthorized),
        AuthCheck::Mismatched => crate::error_response(ProxyError::Forbidden),
    }
}

/// O(n) comparison that always inspects every byte, preventing a timing
/// side-channel on how many leading bytes matched.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_compare_true() {
        assert!(constant_time_compare(b"secret", b"secret"));
    }

    #[test]
    fn different_lengths_compare_false() {
        assert!(!constant_time_compare(b"short", b"longer-key"));
    }

    #[test]
    fn same_length_different_bytes_compare_false() {
        assert!(!constant_time_compare(b"secretA", b"secretB"));
    }
}
