//! Application state shared across all handlers (spec §3, §6).
//!
//! Mirrors the teacher's `AppState { config: Arc<RwLock<Settings>>, .. }`
//! shape: one `#[derive(Clone)]` struct of cheaply-cloneable `Arc` handles,
//! built once at startup and handed to every handler via `.with_state`.

use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;

use thaisearch_config::ConfigManager;
use thaisearch_dictionary::DictionaryStore;
use thaisearch_proxy::SearchProxyService;

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<SearchProxyService>,
    pub config: Arc<ConfigManager>,
    pub dictionary: Arc<DictionaryStore>,
    pub metrics_handle: PrometheusHandle,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        proxy: Arc<SearchProxyService>,
        config: Arc<ConfigManager>,
        dictionary: Arc<DictionaryStore>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            proxy,
            config,
            dictionary,
            metrics_handle,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
