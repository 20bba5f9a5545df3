//! Counters and histograms for the request-lifecycle aggregates the
//! `/api/v1/metrics/summary` endpoint reports on (spec §4.9).

use std::time::Duration;

use metrics::{counter, histogram};

/// One inbound HTTP request completed.
pub fn record_request(endpoint: &str, status: u16, duration: Duration) {
    let endpoint = endpoint.to_string();
    counter!("thaisearch_requests_total", "endpoint" => endpoint.clone(), "status" => status.to_string()).increment(1);
    histogram!("thaisearch_request_duration_seconds", "endpoint" => endpoint).record(duration.as_secs_f64());
}

/// One tokenization call, successful or not, against a specific engine.
pub fn record_tokenization(engine_id: &str, duration: Duration, success: bool) {
    let engine_id = engine_id.to_string();
    counter!(
        "thaisearch_tokenization_total",
        "engine" => engine_id.clone(),
        "success" => success.to_string()
    )
    .increment(1);
    histogram!("thaisearch_tokenization_duration_seconds", "engine" => engine_id)
        .record(duration.as_secs_f64());
}

/// One variant's round trip to the index engine.
pub fn record_search_call(variant_type: &str, duration: Duration, error: bool) {
    let variant_type = variant_type.to_string();
    counter!(
        "thaisearch_search_calls_total",
        "variant" => variant_type.clone(),
        "error" => error.to_string()
    )
    .increment(1);
    histogram!("thaisearch_search_call_duration_seconds", "variant" => variant_type)
        .record(duration.as_secs_f64());
}

/// One completed search request, after ranking.
pub fn record_search_request(fallback_used: bool, variant_count: usize, duration: Duration) {
    counter!("thaisearch_search_requests_total", "fallback_used" => fallback_used.to_string())
        .increment(1);
    histogram!("thaisearch_query_variants_used").record(variant_count as f64);
    histogram!("thaisearch_search_total_duration_seconds").record(duration.as_secs_f64());
}

/// One cache lookup, hit or miss.
pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!("thaisearch_cache_hits_total").increment(1);
    } else {
        counter!("thaisearch_cache_misses_total").increment(1);
    }
}

/// One error surfaced to a client, tagged by `ProxyError::error_tag()`.
pub fn record_error(error_tag: &str) {
    counter!("thaisearch_errors_total", "error" => error_tag.to_string()).increment(1);
}

/// One config reload, successful or rejected at validation.
pub fn record_config_reload(success: bool) {
    counter!("thaisearch_config_reloads_total", "success" => success.to_string()).increment(1);
}
