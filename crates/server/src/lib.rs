//! Thai Search Proxy HTTP server: binds the Search Proxy Service (C10) to
//! the external API described in spec §6.

pub mod auth;
pub mod http;
pub mod state;

pub use http::create_router;
pub use state::AppState;

use axum::response::{IntoResponse, Response};
use axum::Json;
use thaisearch_core::error::ProxyError;

/// Maps a `ProxyError` onto the `{error, message, details?, timestamp}`
/// response shape and HTTP status from spec §6/§7, and records it in
/// metrics by tag.
pub fn error_response(err: ProxyError) -> Response {
    thaisearch_metrics::record_error(err.error_tag());
    let status = axum::http::StatusCode::from_u16(err.status_code()).unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    let body = Json(serde_json::json!({
        "error": err.error_tag(),
        "message": err.to_string(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }));
    (status, body).into_response()
}
