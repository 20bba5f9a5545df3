//! Layered settings loading (spec §4.8, §6 recognized configuration keys).
//!
//! Priority, highest to lowest: environment-file `KEY=VALUE` overrides,
//! process environment (`THAISEARCH__` prefix), `config/{env}.yaml`,
//! `config/default.yaml`, then `ConfigSnapshot::default()`.

use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use thaisearch_core::config::{ConfigSnapshot, RawConfigMap};

use crate::error::ConfigError;

/// Mirrors the recognized configuration keys, all optional so an absent
/// key falls through to the running snapshot's current value rather than
/// clobbering it with a type default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    pub primary_engine: Option<String>,
    pub fallback_engines: Option<Vec<String>>,
    pub tokenizer_timeout_ms: Option<u64>,
    pub max_concurrent_searches: Option<usize>,
    pub max_query_variants: Option<usize>,
    pub search_timeout_ms: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub boost_exact: Option<f32>,
    pub boost_tokenized: Option<f32>,
    pub boost_compound: Option<f32>,
    pub boost_thai: Option<f32>,
    pub min_score_threshold: Option<f32>,
    pub cache_enabled: Option<bool>,
    pub cache_ttl_seconds: Option<u64>,
    pub enable_hot_reload: Option<bool>,
    pub api_key_required: Option<bool>,
    pub index_engine_host: Option<String>,
    pub index_engine_api_key: Option<String>,
    pub dictionary_path: Option<String>,
}

impl RawSettings {
    /// Applies every present field onto `base`, leaving absent fields
    /// untouched. `dictionary_version` and `reload_count` are supplied by
    /// the caller, not loaded from a file.
    pub fn apply_onto(&self, mut base: ConfigSnapshot) -> ConfigSnapshot {
        if let Some(primary) = &self.primary_engine {
            base.engines.primary = primary.clone();
        }
        if let Some(fallbacks) = &self.fallback_engines {
            base.engines.fallbacks = fallbacks.clone();
        }
        if let Some(ms) = self.tokenizer_timeout_ms {
            base.engines.timeout = Duration::from_millis(ms);
        }
        if let Some(v) = self.max_concurrent_searches {
            base.max_concurrent_searches = v;
        }
        if let Some(v) = self.max_query_variants {
            base.max_query_variants = v;
        }
        if let Some(ms) = self.search_timeout_ms {
            base.search_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = self.retry_attempts {
            base.retry_attempts = v;
        }
        if let Some(v) = self.boost_exact {
            base.boosts.exact = v;
        }
        if let Some(v) = self.boost_tokenized {
            base.boosts.tokenized = v;
        }
        if let Some(v) = self.boost_compound {
            base.boosts.compound_split = v;
        }
        if let Some(v) = self.boost_thai {
            base.boosts.thai_or_english_only = v;
        }
        if let Some(v) = self.min_score_threshold {
            base.min_score_threshold = v;
        }
        if let Some(v) = self.cache_enabled {
            base.cache_enabled = v;
        }
        if let Some(secs) = self.cache_ttl_seconds {
            base.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = self.enable_hot_reload {
            base.hot_reload_enabled = v;
        }
        if let Some(v) = self.api_key_required {
            base.api_key_required = v;
        }
        if let Some(v) = &self.index_engine_host {
            base.index_engine_host = v.clone();
        }
        if let Some(v) = &self.index_engine_api_key {
            base.index_engine_api_key = Some(v.clone());
        }
        if let Some(v) = &self.dictionary_path {
            base.dictionary_path = v.clone();
        }
        base
    }
}

/// Loads `config/default.{yaml,json}`, optionally layered with
/// `config/{env}.{yaml,json}`, then process environment variables
/// prefixed `THAISEARCH__` (double underscore separator, matching the
/// `config` crate's nested-key convention).
pub fn load_layered(env: Option<&str>) -> Result<RawSettings, ConfigError> {
    let mut builder = Config::builder().add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("THAISEARCH")
            .separator("__")
            .try_parsing(true),
    );

    let built = builder.build()?;
    let settings: RawSettings = built.try_deserialize()?;
    Ok(settings)
}

/// Parses the spec's `KEY=VALUE` environment-file format (spec §6
/// "Persisted state"). Blank lines and lines starting with `#` are
/// skipped; recognized keys are mapped onto `RawSettings` fields, every
/// other key is ignored rather than rejected — forward compatible with
/// keys a newer deployment might carry that this binary doesn't know.
pub fn parse_env_file(contents: &str) -> RawConfigMap {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Merges a parsed environment-file map onto `RawSettings`, overriding
/// anything already loaded from files or the process environment — this
/// is the highest-priority layer (spec §4.8).
pub fn apply_env_map(mut settings: RawSettings, map: &RawConfigMap) -> RawSettings {
    if let Some(v) = map.get("PRIMARY_ENGINE") {
        settings.primary_engine = Some(v.clone());
    }
    if let Some(v) = map.get("FALLBACK_ENGINES") {
        settings.fallback_engines = Some(v.split(',').map(|s| s.trim().to_string()).collect());
    }
    if let Some(v) = map.get("TOKENIZER_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        settings.tokenizer_timeout_ms = Some(v);
    }
    if let Some(v) = map.get("MAX_CONCURRENT_SEARCHES").and_then(|v| v.parse().ok()) {
        settings.max_concurrent_searches = Some(v);
    }
    if let Some(v) = map.get("MAX_QUERY_VARIANTS").and_then(|v| v.parse().ok()) {
        settings.max_query_variants = Some(v);
    }
    if let Some(v) = map.get("SEARCH_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        settings.search_timeout_ms = Some(v);
    }
    if let Some(v) = map.get("RETRY_ATTEMPTS").and_then(|v| v.parse().ok()) {
        settings.retry_attempts = Some(v);
    }
    if let Some(v) = map.get("BOOST_EXACT").and_then(|v| v.parse().ok()) {
        settings.boost_exact = Some(v);
    }
    if let Some(v) = map.get("BOOST_TOKENIZED").and_then(|v| v.parse().ok()) {
        settings.boost_tokenized = Some(v);
    }
    if let Some(v) = map.get("BOOST_COMPOUND").and_then(|v| v.parse().ok()) {
        settings.boost_compound = Some(v);
    }
    if let Some(v) = map.get("BOOST_THAI").and_then(|v| v.parse().ok()) {
        settings.boost_thai = Some(v);
    }
    if let Some(v) = map.get("MIN_SCORE_THRESHOLD").and_then(|v| v.parse().ok()) {
        settings.min_score_threshold = Some(v);
    }
    if let Some(v) = map.get("CACHE_ENABLED").and_then(|v| v.parse().ok()) {
        settings.cache_enabled = Some(v);
    }
    if let Some(v) = map.get("CACHE_TTL_SECONDS").and_then(|v| v.parse().ok()) {
        settings.cache_ttl_seconds = Some(v);
    }
    if let Some(v) = map.get("ENABLE_HOT_RELOAD").and_then(|v| v.parse().ok()) {
        settings.enable_hot_reload = Some(v);
    }
    if let Some(v) = map.get("API_KEY_REQUIRED").and_then(|v| v.parse().ok()) {
        settings.api_key_required = Some(v);
    }
    if let Some(v) = map.get("INDEX_ENGINE_HOST") {
        settings.index_engine_host = Some(v.clone());
    }
    if let Some(v) = map.get("INDEX_ENGINE_API_KEY") {
        settings.index_engine_api_key = Some(v.clone());
    }
    if let Some(v) = map.get("DICTIONARY_PATH") {
        settings.dictionary_path = Some(v.clone());
    }
    settings
}

/// Assembles a candidate snapshot from layered settings plus the
/// current dictionary content hash and reload counter, then validates it.
pub fn build_snapshot(
    raw: &RawSettings,
    dictionary_version: u64,
    reload_count: u64,
) -> Result<ConfigSnapshot, ConfigError> {
    let mut snapshot = raw.apply_onto(ConfigSnapshot::default());
    snapshot.dictionary_version = dictionary_version;
    snapshot.reload_count = reload_count;
    snapshot.validate()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_leave_defaults_untouched() {
        let raw = RawSettings::default();
        let snapshot = raw.apply_onto(ConfigSnapshot::default());
        assert_eq!(snapshot.engines.primary, "newmm");
    }

    #[test]
    fn present_fields_override_defaults() {
        let mut raw = RawSettings::default();
        raw.primary_engine = Some("attacut".to_string());
        raw.max_concurrent_searches = Some(20);
        let snapshot = raw.apply_onto(ConfigSnapshot::default());
        assert_eq!(snapshot.engines.primary, "attacut");
        assert_eq!(snapshot.max_concurrent_searches, 20);
    }

    #[test]
    fn env_file_parsing_skips_comments_and_blank_lines() {
        let map = parse_env_file("# comment\n\nPRIMARY_ENGINE=attacut\nBOOST_EXACT=3.0\n");
        assert_eq!(map.get("PRIMARY_ENGINE").map(String::as_str), Some("attacut"));
        assert_eq!(map.get("BOOST_EXACT").map(String::as_str), Some("3.0"));
    }

    #[test]
    fn env_map_overrides_are_applied() {
        let map = parse_env_file("BOOST_COMPOUND=1.9\nFALLBACK_ENGINES=attacut,deepcut\n");
        let raw = apply_env_map(RawSettings::default(), &map);
        assert_eq!(raw.boost_compound, Some(1.9));
        assert_eq!(
            raw.fallback_engines,
            Some(vec!["attacut".to_string(), "deepcut".to_string()])
        );
    }

    #[test]
    fn build_snapshot_rejects_invalid_candidates() {
        let mut raw = RawSettings::default();
        raw.boost_exact = Some(0.0);
        let result = build_snapshot(&raw, 0, 0);
        assert!(result.is_err());
    }
}
