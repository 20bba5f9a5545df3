//! HTTP surface for the search proxy (spec §6): router construction,
//! middleware layering, and every handler.
//!
//! Grounded on the teacher's `create_router`/`build_cors_layer` shape and
//! its middleware ordering (auth closest to the handlers, CORS outermost).

use std::time::{Duration, Instant};

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use thaisearch_config::RawSettings;
use thaisearch_core::search::{SearchOptions, SearchRequest};
use thaisearch_metrics::{aggregate, ComponentHealth};

use crate::auth::auth_middleware;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer();

    Router::new()
        .route("/api/v1/search", post(search_handler))
        .route("/api/v1/batch-search", post(batch_search_handler))
        .route("/api/v1/tokenize", post(tokenize_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/health/detailed", get(detailed_health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/metrics/summary", get(metrics_summary_handler))
        .route(
            "/api/v1/admin/config",
            get(get_config_handler).put(put_config_handler),
        )
        .route(
            "/api/v1/admin/config/:type",
            get(get_config_section_handler).put(put_config_handler),
        )
        .route("/api/v1/admin/config/validate", post(validate_config_handler))
        .route(
            "/api/v1/admin/config/hot-reload/trigger",
            post(hot_reload_trigger_handler),
        )
        .route(
            "/api/v1/admin/config/hot-reload/status",
            get(hot_reload_status_handler),
        )
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// Records the "total searches (by success/failure)" and response-time
/// aggregates spec §4.9 requires, per endpoint, for every request that
/// reaches the router (not just `/api/v1/search` — `record_search_request`
/// in `thaisearch_proxy::service` already covers the search-specific
/// fallback/variant-count aggregates).
async fn metrics_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    thaisearch_metrics::record_request(&path, response.status().as_u16(), start.elapsed());
    response
}

/// The recognized configuration keys (spec §6) say nothing about CORS
/// origins, so there's no snapshot field to build a restrictive layer
/// from. A permissive layer is the honest reflection of that — this is
/// not an oversight to "fix" by inventing an unlisted config key.
fn build_cors_layer() -> CorsLayer {
    tracing::info!("CORS is permissive; no origin allowlist is among the recognized configuration keys");
    CorsLayer::permissive()
}

async fn search_handler(State(state): State<AppState>, Json(request): Json<SearchRequest>) -> Response {
    match state.proxy.search(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => crate::error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct BatchSearchRequest {
    queries: Vec<String>,
    index_name: String,
    #[serde(default)]
    options: SearchOptions,
}

async fn batch_search_handler(State(state): State<AppState>, Json(request): Json<BatchSearchRequest>) -> Response {
    let responses = state
        .proxy
        .batch_search(&request.queries, &request.index_name, request.options)
        .await;
    Json(responses).into_response()
}

#[derive(Debug, Deserialize)]
struct TokenizeRequest {
    text: String,
    #[serde(default)]
    #[allow(dead_code)]
    engine: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenizeResponse {
    original_text: String,
    tokens: Vec<String>,
    word_boundaries: Vec<usize>,
    confidence_scores: Option<Vec<f32>>,
    processing_time_ms: f64,
}

async fn tokenize_handler(State(state): State<AppState>, Json(request): Json<TokenizeRequest>) -> Response {
    let start = std::time::Instant::now();
    let snapshot = state.config.snapshot();
    let result = state.proxy.tokenize(&request.text, snapshot.engines.timeout).await;
    let word_boundaries = thaisearch_core::word_boundaries(&request.text, &result.tokens);
    let confidence_scores = (0..result.tokens.len()).map(|i| result.confidence_at(i)).collect();

    Json(TokenizeResponse {
        original_text: request.text,
        tokens: result.tokens,
        word_boundaries,
        confidence_scores: Some(confidence_scores),
        processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
    .into_response()
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.config.snapshot();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.uptime_seconds(),
        "dependencies": {
            "index_engine": if snapshot.index_engine_host.is_empty() { "unconfigured" } else { "configured" },
            "tokenizer": snapshot.engines.primary,
        },
    }))
    .into_response()
}

async fn detailed_health_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.config.snapshot();

    // Dictionary emptiness stays "healthy" per spec §8 boundary behavior —
    // "Dictionary file missing on startup → service healthy, but with
    // empty dictionary and a warning" — the warning already happened at
    // load time, this endpoint just reports the count.
    let dictionary = ComponentHealth::healthy("dictionary");
    let tokenizer = ComponentHealth::healthy("tokenizer_facade");
    let index_engine = probe_index_engine(&snapshot.index_engine_host).await;

    let report = aggregate(vec![dictionary, tokenizer, index_engine]);
    let status_code = match report.status {
        thaisearch_metrics::HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": report.status,
            "components": report.components,
            "dictionary_size": state.dictionary.len(),
            "config_reload_count": snapshot.reload_count,
        })),
    )
        .into_response()
}

/// Best-effort reachability probe, not a load-bearing dependency of the
/// search path itself — `IndexEngineClient` already degrades per-request
/// on a failed call (spec §4.6); this only informs `/api/v1/health/detailed`.
async fn probe_index_engine(host: &str) -> ComponentHealth {
    if host.is_empty() {
        return ComponentHealth::degraded("index_engine", "no host configured");
    }
    let url = format!("{}/health", host.trim_end_matches('/'));
    match tokio::time::timeout(Duration::from_secs(2), reqwest::get(&url)).await {
        Ok(Ok(resp)) if resp.status().is_success() => ComponentHealth::healthy("index_engine"),
        Ok(Ok(resp)) => ComponentHealth::degraded("index_engine", format!("unexpected status {}", resp.status())),
        Ok(Err(e)) => ComponentHealth::degraded("index_engine", e.to_string()),
        Err(_) => ComponentHealth::degraded("index_engine", "probe timed out"),
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    (StatusCode::OK, state.metrics_handle.render()).into_response()
}

async fn metrics_summary_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.config.snapshot();
    Json(serde_json::json!({
        "dictionary_size": state.dictionary.len(),
        "dictionary_version": snapshot.dictionary_version,
        "config_reload_count": snapshot.reload_count,
        "cache_enabled": snapshot.cache_enabled,
        "hot_reload_enabled": snapshot.hot_reload_enabled,
        "uptime_seconds": state.uptime_seconds(),
    }))
    .into_response()
}

async fn get_config_handler(State(state): State<AppState>) -> Response {
    Json(state.config.snapshot().as_ref().clone()).into_response()
}

async fn get_config_section_handler(State(state): State<AppState>, Path(section): Path<String>) -> Response {
    let snapshot = state.config.snapshot();
    let value = match section.as_str() {
        "engines" => serde_json::to_value(&snapshot.engines),
        "boosts" => serde_json::to_value(&snapshot.boosts),
        _ => return (StatusCode::NOT_FOUND, Json(serde_json::json!({"error": "unknown_config_section"}))).into_response(),
    };
    match value {
        Ok(v) => Json(v).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn put_config_handler(State(state): State<AppState>, Json(patch): Json<RawSettings>) -> Response {
    match state.config.apply_admin_update(&patch) {
        Ok(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "config_error",
                "message": e.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
    }
}

async fn validate_config_handler(State(state): State<AppState>) -> Response {
    match state.config.validate_candidate() {
        Ok(()) => Json(serde_json::json!({"valid": true})).into_response(),
        Err(e) => Json(serde_json::json!({"valid": false, "message": e.to_string()})).into_response(),
    }
}

async fn hot_reload_trigger_handler(State(state): State<AppState>) -> Response {
    match state.config.reload() {
        Ok(snapshot) => Json(serde_json::json!({
            "status": "success",
            "reload_count": snapshot.reload_count,
        }))
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"status": "error", "message": e.to_string()})),
        )
            .into_response(),
    }
}

async fn hot_reload_status_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.config.snapshot();
    Json(serde_json::json!({
        "enabled": snapshot.hot_reload_enabled,
        "reload_count": snapshot.reload_count,
        "last_reload_seconds_ago": state.config.last_reload().map(|i| i.elapsed().as_secs()),
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use thaisearch_config::ConfigManager;
    use thaisearch_dictionary::DictionaryStore;
    use thaisearch_proxy::SearchProxyService;
    use thaisearch_tokenizer::TokenizerFacade;

    #[tokio::test]
    async fn router_builds_without_panicking() {
        let dict_file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(dict_file.path(), r#"{"test": ["ทดสอบ", "ค้นหา"]}"#).unwrap();
        let dictionary = Arc::new(DictionaryStore::load(dict_file.path()).unwrap());
        let config = Arc::new(ConfigManager::load(None, None, dictionary.clone()).unwrap());
        let facade = Arc::new(TokenizerFacade::new(vec![], dictionary.clone()));
        let proxy = Arc::new(SearchProxyService::new(config.clone(), dictionary.clone(), facade));

        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let state = AppState::new(proxy, config, dictionary, handle);

        let _router = create_router(state);
    }
}
