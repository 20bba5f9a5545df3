//! Maps a `QueryVariant` to the index engine's wire search contract and
//! back into an `EngineSearchResult` (spec §3, §4.5).

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use thaisearch_core::query::QueryVariant;
use thaisearch_core::search::{EngineSearchResult, RawHit, SearchCallContext, SearchOptions};

use crate::client::IndexEngineClient;
use crate::error::IndexEngineError;

#[derive(Debug, Serialize)]
struct WireSearchRequest<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sort: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes_to_retrieve: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes_to_highlight: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crop_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    crop_marker: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matching_strategy: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct WireSearchResponse {
    hits: Vec<WireHit>,
    #[serde(alias = "estimatedTotalHits", alias = "totalHits", default)]
    total_hits: u64,
}

#[derive(Debug, Deserialize)]
struct WireHit {
    #[serde(alias = "id", alias = "_id")]
    document_id: String,
    #[serde(alias = "_score", default)]
    score: f32,
    #[serde(alias = "_formatted", default)]
    highlight: Option<serde_json::Value>,
    #[serde(flatten)]
    payload: serde_json::Value,
}

/// Runs one variant's search call against `index`, returning a usable or
/// failed `EngineSearchResult` — never an error, since the executor treats
/// a failed variant as just one less contributor to the fused result
/// (spec §4.6).
pub async fn search_variant(
    client: &IndexEngineClient,
    ctx: &SearchCallContext,
    variant: QueryVariant,
    options: &SearchOptions,
    timeout: Duration,
) -> EngineSearchResult {
    let start = Instant::now();

    let request = WireSearchRequest {
        q: &variant.text,
        limit: options.limit,
        offset: options.offset,
        filter: options.filters.as_deref(),
        sort: options.sort.clone(),
        attributes_to_retrieve: options.attributes_to_retrieve.clone(),
        attributes_to_highlight: options.attributes_to_highlight.clone(),
        crop_length: options.crop_length,
        crop_marker: options.crop_marker.as_deref(),
        matching_strategy: options.matching_strategy.as_deref(),
    };

    let path = format!("/indexes/{}/search", ctx.index);
    let result: Result<WireSearchResponse, IndexEngineError> =
        client.post_json(&path, &request, timeout).await;

    match result {
        Ok(wire) => {
            let hits = wire
                .hits
                .into_iter()
                .map(|h| RawHit {
                    document_id: h.document_id,
                    engine_score: h.score,
                    payload: h.payload,
                    highlight: h.highlight.map(|v| v.to_string()),
                })
                .collect::<Vec<_>>();
            let total_hits = if wire.total_hits > 0 {
                wire.total_hits
            } else {
                hits.len() as u64
            };
            EngineSearchResult {
                variant,
                hits,
                total_hits,
                latency: start.elapsed(),
                error: false,
                error_reason: None,
            }
        }
        Err(e) => {
            tracing::warn!(variant = %variant.text, error = %e, "variant search failed");
            EngineSearchResult::failed(variant, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_request_omits_absent_optional_fields() {
        let options = SearchOptions::default();
        let request = WireSearchRequest {
            q: "ข้าว",
            limit: options.limit,
            offset: options.offset,
            filter: options.filters.as_deref(),
            sort: options.sort.clone(),
            attributes_to_retrieve: options.attributes_to_retrieve.clone(),
            attributes_to_highlight: options.attributes_to_highlight.clone(),
            crop_length: options.crop_length,
            crop_marker: options.crop_marker.as_deref(),
            matching_strategy: options.matching_strategy.as_deref(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("limit"));
        assert!(json.contains("ข้าว"));
    }
}
