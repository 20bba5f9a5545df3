//! Result cache with put-if-absent dogpile prevention (spec §3, §4.10,
//! §5 "Result cache ... put-if-absent for dogpile prevention").
//!
//! Grounded on the teacher's `SessionStore` shape (a `DashMap`-backed,
//! TTL-aware store behind a trait), repurposed here for cached
//! `SearchResponse`s keyed by request fingerprint instead of session id.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::OnceCell;

use thaisearch_core::SearchResponse;

type Slot = Arc<OnceCell<(SearchResponse, Instant)>>;

/// Fingerprint a search request per spec §4.10:
/// `hash(query ∥ index ∥ relevant-options)`. Options that don't affect the
/// result set (e.g. `include_tokenization_info`, which only changes the
/// query_info payload) are deliberately excluded so semantically identical
/// searches still share a cache entry.
pub fn fingerprint(query: &str, index: &str, options: &thaisearch_core::SearchOptions) -> String {
    format!(
        "{query}\u{1}{index}\u{1}{:?}\u{1}{:?}\u{1}{:?}\u{1}{}\u{1}{:?}\u{1}{:?}\u{1}{:?}\u{1}{:?}\u{1}{:?}",
        options.limit,
        options.offset,
        options.filters,
        options.highlight,
        options.sort,
        options.attributes_to_retrieve,
        options.attributes_to_highlight,
        options.crop_length,
        options.crop_marker,
        options.matching_strategy,
    )
}

/// A cached `SearchResponse`, shared across every request racing to
/// populate the same key.
pub struct SearchCache {
    slots: DashMap<String, Slot>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Returns the cached response for `key` if present and unexpired,
    /// computing it via `compute` otherwise. Concurrent callers for the
    /// same key share one `compute` invocation (spec §5 dogpile
    /// prevention) rather than each fanning out to the index engine.
    ///
    /// Returns `(response, was_cache_hit)`.
    pub async fn get_or_compute<F, Fut>(&self, key: String, ttl: Duration, compute: F) -> (SearchResponse, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SearchResponse>,
    {
        loop {
            let slot = self
                .slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();

            if let Some((response, expires_at)) = slot.get() {
                if Instant::now() < *expires_at {
                    return (response.clone(), true);
                }
                // Expired: drop the stale slot and retry with a fresh one.
                // A racing thread may beat us to re-insert; that's fine,
                // `entry().or_insert_with()` above will just reuse it.
                self.slots.remove_if(&key, |_, s| Arc::ptr_eq(s, &slot));
                continue;
            }

            let (response, _) = slot
                .get_or_init(|| async {
                    let response = compute().await;
                    (response, Instant::now() + ttl)
                })
                .await
                .clone();
            return (response, false);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new()
    }
}
