//! Thai Search Proxy server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use thaisearch_config::{spawn_hot_reload, ConfigManager, DEFAULT_DEBOUNCE};
use thaisearch_dictionary::DictionaryStore;
use thaisearch_proxy::SearchProxyService;
use thaisearch_server::{create_router, AppState};
use thaisearch_tokenizer::{HttpTokenizerEngine, NewmmTokenizer, TokenizerFacade};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting thaisearch-server");

    let env = std::env::var("THAISEARCH_ENV").ok();
    let dictionary_path =
        std::env::var("THAISEARCH_DICTIONARY_PATH").unwrap_or_else(|_| "config/dictionary.json".to_string());

    // `DictionaryStore::load` already degrades a missing file to an empty,
    // healthy dictionary (spec §8); a malformed one is a genuine startup
    // failure and propagates.
    let dictionary = Arc::new(DictionaryStore::load(&dictionary_path)?);
    tracing::info!(size = dictionary.len(), version = dictionary.version(), "dictionary loaded");

    let env_file = std::env::var("THAISEARCH_ENV_FILE").ok().map(PathBuf::from);
    let config = Arc::new(ConfigManager::load(env.as_deref(), env_file, dictionary.clone())?);
    let snapshot = config.snapshot();
    tracing::info!(
        primary_engine = %snapshot.engines.primary,
        fallbacks = ?snapshot.engines.fallbacks,
        hot_reload = snapshot.hot_reload_enabled,
        "configuration loaded"
    );

    let facade = Arc::new(build_tokenizer_facade(&snapshot, dictionary.clone()));

    // Held for the process lifetime: dropping either the join handle or the
    // `RecommendedWatcher` tears down the filesystem watch.
    let _hot_reload = if snapshot.hot_reload_enabled {
        let watch_paths = vec![PathBuf::from("config/default.yaml"), PathBuf::from(&dictionary_path)];
        match spawn_hot_reload(config.clone(), watch_paths, DEFAULT_DEBOUNCE) {
            Ok(handle) => {
                tracing::info!("hot-reload watcher started");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to start hot-reload watcher, continuing without it");
                None
            }
        }
    } else {
        None
    };

    let metrics_handle = thaisearch_metrics::init_metrics();
    tracing::info!("prometheus metrics installed at /metrics");

    let proxy = Arc::new(SearchProxyService::new(config.clone(), dictionary.clone(), facade));
    let state = AppState::new(proxy, config, dictionary, metrics_handle);

    let app = create_router(state);

    let port: u16 = std::env::var("THAISEARCH_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Builds the fallback ladder (spec §4.3): `newmm` runs in-process against
/// the shared dictionary; every other configured engine is a remote HTTP
/// tokenizer reached at `THAISEARCH_ENGINE_<NAME>_URL`.
fn build_tokenizer_facade(snapshot: &thaisearch_core::config::ConfigSnapshot, dictionary: Arc<DictionaryStore>) -> TokenizerFacade {
    let mut engines: Vec<Arc<dyn thaisearch_tokenizer::Tokenizer>> = Vec::new();

    for name in snapshot.engines.priority_order() {
        if name == "newmm" {
            engines.push(Arc::new(NewmmTokenizer::new(dictionary.clone())));
            continue;
        }
        let env_key = format!("THAISEARCH_ENGINE_{}_URL", name.to_uppercase());
        let endpoint = std::env::var(&env_key).unwrap_or_else(|_| format!("http://127.0.0.1:8500/{name}"));
        engines.push(Arc::new(HttpTokenizerEngine::new(name.clone(), endpoint)));
    }

    TokenizerFacade::new(engines, dictionary)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "thaisearch=info,tower_http=info".into());

    let json = std::env::var("THAISEARCH_LOG_JSON").map(|v| v == "1" || v == "true").unwrap_or(false);
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}
