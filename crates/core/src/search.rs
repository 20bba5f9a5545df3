//! Index engine call contracts (spec §3, §4.5).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::QueryVariant;

/// A single hit as returned by the index engine, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawHit {
    pub document_id: String,
    pub engine_score: f32,
    pub payload: serde_json::Value,
    pub highlight: Option<String>,
}

/// Options accompanying a search request (spec §6 `/api/v1/search`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(default)]
    pub filters: Option<String>,
    #[serde(default)]
    pub sort: Vec<String>,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default)]
    pub attributes_to_retrieve: Vec<String>,
    #[serde(default)]
    pub attributes_to_highlight: Vec<String>,
    #[serde(default)]
    pub crop_length: Option<u32>,
    #[serde(default)]
    pub crop_marker: Option<String>,
    #[serde(default)]
    pub matching_strategy: Option<String>,
}

/// A raw hit collection returned by one variant's search.
///
/// Invariant: engine-scores are comparable only within the same
/// `EngineSearchResult` — normalization (spec §4.7 Step 1) happens before
/// any cross-variant comparison.
#[derive(Debug, Clone)]
pub struct EngineSearchResult {
    pub variant: QueryVariant,
    pub hits: Vec<RawHit>,
    pub total_hits: u64,
    pub latency: Duration,
    pub error: bool,
    pub error_reason: Option<String>,
}

impl EngineSearchResult {
    pub fn failed(variant: QueryVariant, reason: impl Into<String>) -> Self {
        Self {
            variant,
            hits: Vec::new(),
            total_hits: 0,
            latency: Duration::ZERO,
            error: true,
            error_reason: Some(reason.into()),
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.error
    }
}

/// Per-request identifiers carried through the transport layer for
/// observability (spec §4.5).
#[derive(Debug, Clone)]
pub struct SearchCallContext {
    pub request_id: uuid::Uuid,
    pub index: String,
}

/// Extra metadata the executor attaches when it performs the "one bare
/// retry" fallback (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct FallbackAttempt {
    pub attempted: bool,
    pub used: bool,
}

pub type Metadata = HashMap<String, String>;

/// External contract for `POST /api/v1/search` (spec §6). Owned by `core`
/// rather than the HTTP layer since the batch driver and the single-request
/// flow both construct and consume it directly, without going through JSON.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub index_name: String,
    #[serde(default)]
    pub options: SearchOptions,
    #[serde(default)]
    pub include_tokenization_info: bool,
}
