//! Search Executor: bounded-concurrency fan-out across query variants,
//! with a global deadline and the "bare retry" fallback ladder (spec §3,
//! §4.6).

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use thaisearch_core::query::{QueryVariant, VariantType};
use thaisearch_core::search::{EngineSearchResult, SearchCallContext, SearchOptions};
use thaisearch_transport::{search_variant, IndexEngineClient};

pub struct ExecutionOutcome {
    /// One result per variant that got to run before the deadline, plus
    /// the bare retry result if the fallback path fired. Order is not
    /// meaningful — the Result Ranker re-sorts by score, not arrival.
    pub results: Vec<EngineSearchResult>,
    /// Set when either every variant failed outright (transport errors)
    /// or every variant that did run returned zero hits (spec §4.6).
    pub fallback_used: bool,
}

fn record_search_call(result: &EngineSearchResult) {
    let tag = serde_json::to_value(result.variant.variant_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "UNKNOWN".to_string());
    thaisearch_metrics::record_search_call(&tag, result.latency, result.error);
}

pub struct SearchExecutor {
    client: Arc<IndexEngineClient>,
}

impl SearchExecutor {
    pub fn new(client: Arc<IndexEngineClient>) -> Self {
        Self { client }
    }

    /// Fans variants out with at most `max_concurrent` in flight at once,
    /// each bounded by `per_call_timeout` (further clamped to whatever
    /// time is left under `remaining_deadline`). Whatever hasn't completed
    /// when the deadline expires is simply dropped — its contribution is
    /// one fewer usable result, not a hard failure.
    pub async fn execute(
        &self,
        ctx: &SearchCallContext,
        variants: Vec<QueryVariant>,
        options: &SearchOptions,
        max_concurrent: usize,
        per_call_timeout: Duration,
        remaining_deadline: Duration,
    ) -> ExecutionOutcome {
        let original_variant = variants
            .iter()
            .find(|v| v.variant_type == VariantType::Original)
            .cloned();

        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
        let deadline = Instant::now() + remaining_deadline;

        let mut futs = FuturesUnordered::new();
        for variant in variants {
            let sem = semaphore.clone();
            let client = self.client.clone();
            let ctx = ctx.clone();
            let options = options.clone();
            futs.push(async move {
                let _permit = sem.acquire_owned().await.ok();
                let remaining = deadline.saturating_duration_since(Instant::now());
                let call_timeout = remaining.min(per_call_timeout);
                search_variant(&client, &ctx, variant, &options, call_timeout).await
            });
        }

        let mut results = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!("search executor deadline exceeded with tasks still outstanding");
                break;
            }
            tokio::select! {
                biased;
                maybe = futs.next() => {
                    match maybe {
                        Some(result) => {
                            record_search_call(&result);
                            results.push(result);
                        }
                        None => break,
                    }
                }
                _ = tokio::time::sleep(remaining) => break,
            }
        }

        let usable: Vec<&EngineSearchResult> = results.iter().filter(|r| r.is_usable()).collect();
        let mut fallback_used = false;

        if usable.is_empty() {
            fallback_used = true;
            if let Some(variant) = original_variant {
                tracing::warn!("all variants failed, attempting bare original query");
                let bare_timeout = deadline.saturating_duration_since(Instant::now()).max(Duration::from_millis(1));
                let bare = search_variant(&self.client, ctx, variant, options, bare_timeout).await;
                record_search_call(&bare);
                results.push(bare);
            }
        } else if usable.iter().all(|r| r.hits.is_empty()) {
            fallback_used = true;
        }

        ExecutionOutcome {
            results,
            fallback_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaisearch_transport::IndexEngineClientConfig;
    use uuid::Uuid;

    fn ctx() -> SearchCallContext {
        SearchCallContext {
            request_id: Uuid::new_v4(),
            index: "products".to_string(),
        }
    }

    fn client() -> Arc<IndexEngineClient> {
        Arc::new(
            IndexEngineClient::new(IndexEngineClientConfig {
                host: "http://127.0.0.1:1".to_string(),
                api_key: None,
                connection_pool_size: 1,
                retry_attempts: 0,
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn all_variants_failing_triggers_bare_retry_and_fallback_flag() {
        let executor = SearchExecutor::new(client());
        let variants = vec![QueryVariant::original("ข้าว")];
        let outcome = executor
            .execute(
                &ctx(),
                variants,
                &SearchOptions::default(),
                4,
                Duration::from_millis(50),
                Duration::from_millis(500),
            )
            .await;

        assert!(outcome.fallback_used);
        // one original attempt + one bare retry attempt
        assert_eq!(outcome.results.len(), 2);
    }

    #[tokio::test]
    async fn empty_variants_produce_no_results_and_no_fallback_attempt() {
        let executor = SearchExecutor::new(client());
        let outcome = executor
            .execute(
                &ctx(),
                vec![],
                &SearchOptions::default(),
                4,
                Duration::from_millis(50),
                Duration::from_millis(200),
            )
            .await;

        // no ORIGINAL variant present to retry with
        assert!(outcome.results.is_empty());
        assert!(outcome.fallback_used);
    }
}
