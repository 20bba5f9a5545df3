//! Search Proxy Service (C10): orchestrates the Query Processor, Search
//! Executor, and Result Ranker per request under one `ConfigSnapshot`,
//! plus the cache and the batch driver (spec §3, §4.10).
//!
//! Grounded on `agent::agent::DomainAgent`'s role as the top-level
//! orchestrator composing config/retrieval/tools into one call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use thaisearch_config::ConfigManager;
use thaisearch_core::config::ConfigSnapshot;
use thaisearch_core::error::ProxyError;
use thaisearch_core::query::VariantType;
use thaisearch_core::ranking::{QueryInfoSummary, TokenizationInfo};
use thaisearch_core::search::{SearchCallContext, SearchRequest};
use thaisearch_core::{RequestContext, SearchResponse};
use thaisearch_dictionary::DictionaryStore;
use thaisearch_executor::SearchExecutor;
use thaisearch_query::QueryProcessor;
use thaisearch_tokenizer::TokenizerFacade;

use crate::cache::{fingerprint, SearchCache};
use crate::clients::ClientRegistry;

/// Longest query the proxy will tokenize/search. Not one of the named
/// `RawSettings` keys in spec §6 — it is an ambient input-validation
/// bound (spec §8 "Query longer than the configured maximum → 422"),
/// recorded as a constant rather than invented as a config key the
/// original never named.
pub const MAX_QUERY_CHARS: usize = 2048;

/// The number of requests allowed to be mid-flight across the whole
/// process before new ones fail fast (spec §5 "Backpressure"). Bounds the
/// admission slot, distinct from `max_concurrent_searches`'s per-request
/// variant fan-out limit.
const ADMISSION_SLOTS: usize = 256;

pub struct SearchProxyService {
    config: Arc<ConfigManager>,
    dictionary: Arc<DictionaryStore>,
    facade: Arc<TokenizerFacade>,
    query_processor: QueryProcessor,
    cache: SearchCache,
    clients: ClientRegistry,
    admission: Arc<Semaphore>,
}

impl SearchProxyService {
    pub fn new(config: Arc<ConfigManager>, dictionary: Arc<DictionaryStore>, facade: Arc<TokenizerFacade>) -> Self {
        Self {
            config,
            dictionary,
            query_processor: QueryProcessor::new(facade.clone()),
            facade,
            cache: SearchCache::new(),
            clients: ClientRegistry::new(),
            admission: Arc::new(Semaphore::new(ADMISSION_SLOTS)),
        }
    }

    pub fn config(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    pub fn dictionary(&self) -> &Arc<DictionaryStore> {
        &self.dictionary
    }

    /// Runs the single-request flow (spec §4.10):
    /// acquire snapshot → validate → admission slot → cache check → Query
    /// Processor → Search Executor → Result Ranker → build response →
    /// cache put → metrics.
    ///
    /// Backpressure is the one failure mode that is an immediate error
    /// rather than a degraded response (spec §6/§8: "fails fast ... rather
    /// than queueing unboundedly") — every other partial failure downstream
    /// of admission still returns a well-formed, possibly-empty
    /// `SearchResponse`.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ProxyError> {
        let start = Instant::now();
        let snapshot = self.config.snapshot();

        let trimmed = request.query.trim();
        if trimmed.is_empty() {
            thaisearch_metrics::record_search_request(false, 0, start.elapsed());
            return Ok(SearchResponse::empty(
                &request.query,
                request.options.offset.unwrap_or(0),
                request.options.limit.unwrap_or(20),
                false,
            ));
        }
        if request.query.chars().count() > MAX_QUERY_CHARS {
            return Err(ProxyError::Validation(format!(
                "query exceeds maximum length of {MAX_QUERY_CHARS} characters"
            )));
        }

        let _permit = match tokio::time::timeout(snapshot.admission_wait, self.admission.acquire()).await {
            Ok(Ok(permit)) => permit,
            _ => {
                tracing::warn!("admission slot unavailable, rejecting request");
                return Err(ProxyError::Backpressure(
                    "too many concurrent searches in flight".to_string(),
                ));
            }
        };

        let key = fingerprint(&request.query, &request.index_name, &request.options);
        let cache_enabled = snapshot.cache_enabled;

        let (response, cache_hit) = if cache_enabled {
            self.cache
                .get_or_compute(key, snapshot.cache_ttl, || {
                    self.execute_uncached(request, snapshot.clone())
                })
                .await
        } else {
            (self.execute_uncached(request, snapshot.clone()).await, false)
        };

        thaisearch_metrics::record_cache_lookup(cache_hit);
        let mut response = response;
        response.processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        thaisearch_metrics::record_search_request(
            response.query_info.fallback_used,
            response.query_info.query_variants_used,
            start.elapsed(),
        );
        Ok(response)
    }

    /// The actual pipeline, run once per cache miss.
    async fn execute_uncached(&self, request: &SearchRequest, snapshot: Arc<ConfigSnapshot>) -> SearchResponse {
        // One `RequestContext` captured here and threaded through the
        // Search Executor and Result Ranker: every downstream read of the
        // snapshot or the deadline comes from this value, not a fresh
        // `config.snapshot()` call, so the whole request observes one
        // snapshot end-to-end (spec §5).
        let request_ctx = RequestContext::new(snapshot.clone(), snapshot.search_timeout);

        let processed = self
            .query_processor
            .process(&request.query, snapshot.engines.timeout, snapshot.max_query_variants)
            .await;

        let client = self.clients.get_or_build(&snapshot);
        let executor = SearchExecutor::new(client);
        let call_ctx = SearchCallContext {
            request_id: request_ctx.request_id,
            index: request.index_name.clone(),
        };

        let outcome = executor
            .execute(
                &call_ctx,
                processed.variants.clone(),
                &request.options,
                snapshot.max_concurrent_searches,
                snapshot.search_timeout,
                request_ctx.remaining(),
            )
            .await;

        let limit = request.options.limit.unwrap_or(20).min(100);
        let offset = request.options.offset.unwrap_or(0);
        let (hits, pagination) = thaisearch_ranker::rank(
            &outcome.results,
            &snapshot.boosts,
            processed.language.thai_detected,
            snapshot.min_score_threshold,
            offset,
            limit,
        );

        let tokenization_info = request.include_tokenization_info.then(|| {
            processed
                .primary_tokenization
                .as_ref()
                .map(|t| TokenizationInfo {
                    primary_engine: t.engine_id.clone(),
                    tokens: t.tokens.clone(),
                    compound_words_detected: processed.compound_words_detected(),
                })
        }).flatten();

        SearchResponse {
            total_hits: pagination.total_hits,
            hits,
            processing_time_ms: 0.0,
            query_info: QueryInfoSummary {
                original_query: request.query.clone(),
                processed_query: processed
                    .variants
                    .iter()
                    .find(|v| v.variant_type == VariantType::Tokenized)
                    .map(|v| v.text.clone())
                    .unwrap_or_else(|| request.query.clone()),
                thai_content_detected: processed.language.thai_detected,
                mixed_content: processed.language.mixed_content,
                query_variants_used: processed.variants.len(),
                fallback_used: outcome.fallback_used,
                tokenization_info,
            },
            pagination,
            error: None,
        }
    }

    /// Batch driver (spec §4.10): runs each query through the
    /// single-request flow with bounded outer concurrency, returning
    /// results in input order. A per-slot failure never aborts the batch.
    pub async fn batch_search(&self, queries: &[String], index_name: &str, options: thaisearch_core::SearchOptions) -> Vec<SearchResponse> {
        let snapshot = self.config.snapshot();
        let semaphore = Arc::new(Semaphore::new(snapshot.batch_concurrency.max(1)));

        let futures = queries.iter().map(|query| {
            let semaphore = semaphore.clone();
            let request = SearchRequest {
                query: query.clone(),
                index_name: index_name.to_string(),
                options: options.clone(),
                include_tokenization_info: false,
            };
            async move {
                let _permit = semaphore.acquire().await.ok();
                match self.search(&request).await {
                    Ok(response) => response,
                    Err(e) => SearchResponse::with_error(&request.query, e.to_string()),
                }
            }
        });

        futures::future::join_all(futures).await
    }

    /// `POST /api/v1/tokenize` (spec §6): tokenizes one string without
    /// running it through the query/search/ranking pipeline.
    pub async fn tokenize(&self, text: &str, timeout: Duration) -> thaisearch_core::TokenizationResult {
        self.facade.tokenize(text, timeout).await
    }
}
