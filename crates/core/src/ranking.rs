//! Ranker output and the external SearchResponse contract (spec §3, §4.7, §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::query::VariantType;

/// A deduplicated, re-scored result.
///
/// Invariant: final score is monotone non-increasing with list position
/// (enforced by the ranker, not by this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedHit {
    pub document_id: String,
    pub score: f32,
    pub best_variant: VariantType,
    /// Per-variant contribution, keyed by variant-type tag for the JSON
    /// contract (spec doesn't require an ordered map).
    pub contributions: HashMap<String, f32>,
    pub payload: serde_json::Value,
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
    pub total_hits: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizationInfo {
    pub primary_engine: String,
    pub tokens: Vec<String>,
    pub compound_words_detected: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInfoSummary {
    pub original_query: String,
    pub processed_query: String,
    pub thai_content_detected: bool,
    pub mixed_content: bool,
    pub query_variants_used: usize,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenization_info: Option<TokenizationInfo>,
}

/// The external contract returned from `/api/v1/search` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<RankedHit>,
    pub total_hits: u64,
    pub processing_time_ms: f64,
    pub query_info: QueryInfoSummary,
    pub pagination: Pagination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    /// Empty response used by every degrade-don't-fail path (spec §7):
    /// deadline exceeded before any variant returned, all variants failed
    /// after the bare fallback attempt, zero hits overall.
    pub fn empty(original_query: &str, offset: u32, limit: u32, fallback_used: bool) -> Self {
        Self {
            hits: Vec::new(),
            total_hits: 0,
            processing_time_ms: 0.0,
            query_info: QueryInfoSummary {
                original_query: original_query.to_string(),
                processed_query: original_query.to_string(),
                thai_content_detected: false,
                mixed_content: false,
                query_variants_used: 0,
                fallback_used,
                tokenization_info: None,
            },
            pagination: Pagination {
                offset,
                limit,
                total_hits: 0,
                has_next_page: false,
                has_previous_page: offset > 0,
            },
            error: None,
        }
    }

    /// Used by the batch driver for a slot whose request failed outright
    /// (spec §4.10 batch driver).
    pub fn with_error(original_query: &str, error: impl Into<String>) -> Self {
        let mut r = Self::empty(original_query, 0, 0, false);
        r.error = Some(error.into());
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_has_no_hits() {
        let r = SearchResponse::empty("q", 0, 20, true);
        assert!(r.hits.is_empty());
        assert_eq!(r.total_hits, 0);
        assert!(r.query_info.fallback_used);
    }
}
