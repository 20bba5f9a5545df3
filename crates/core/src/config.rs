//! `ConfigSnapshot` — the immutable bundle every in-flight request reads
//! from exactly once (spec §3, §4.8, §5).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::VariantType;

/// Boost factors applied by the Result Ranker (spec §4.7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoostConfig {
    pub exact: f32,
    pub tokenized: f32,
    pub compound_split: f32,
    pub thai_or_english_only: f32,
    pub fallback: f32,
    pub thai_match: f32,
    pub compound_match: f32,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            exact: 2.0,
            tokenized: 1.5,
            compound_split: 1.3,
            thai_or_english_only: 1.0,
            fallback: 0.6,
            thai_match: 1.4,
            compound_match: 1.3,
        }
    }
}

impl BoostConfig {
    pub fn for_variant(&self, variant_type: VariantType) -> f32 {
        match variant_type {
            VariantType::Original => self.exact,
            VariantType::Tokenized => self.tokenized,
            VariantType::CompoundSplit => self.compound_split,
            VariantType::ThaiOnly | VariantType::EnglishOnly | VariantType::Phrase => {
                self.thai_or_english_only
            }
            VariantType::Fallback => self.fallback,
        }
    }

    /// Every boost factor must be > 0 (spec §4.8 validation).
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            ("exact", self.exact),
            ("tokenized", self.tokenized),
            ("compound_split", self.compound_split),
            ("thai_or_english_only", self.thai_or_english_only),
            ("fallback", self.fallback),
            ("thai_match", self.thai_match),
            ("compound_match", self.compound_match),
        ];
        for (name, value) in values {
            if !(value > 0.0) {
                return Err(format!("boost '{name}' must be > 0, got {value}"));
            }
        }
        Ok(())
    }
}

/// Tokenizer engine identifiers, in fallback-priority order (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub timeout: Duration,
}

impl EngineConfig {
    pub fn priority_order(&self) -> Vec<String> {
        std::iter::once(self.primary.clone())
            .chain(self.fallbacks.iter().cloned())
            .collect()
    }
}

/// Tunables mirroring the recognized configuration keys in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub engines: EngineConfig,
    pub max_concurrent_searches: usize,
    pub max_query_variants: usize,
    pub search_timeout: Duration,
    pub retry_attempts: u32,
    pub boosts: BoostConfig,
    pub min_score_threshold: f32,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
    pub hot_reload_enabled: bool,
    pub api_key_required: bool,
    pub index_engine_host: String,
    pub index_engine_api_key: Option<String>,
    pub dictionary_path: String,
    pub connection_pool_size: usize,
    pub admission_wait: Duration,
    pub batch_concurrency: usize,
    /// Content hash of the dictionary set this snapshot was built against,
    /// surfaced by Metrics & Health (spec §4.9 "dictionary size").
    pub dictionary_version: u64,
    /// Monotonic counter incremented on every successful reload.
    pub reload_count: u64,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            engines: EngineConfig {
                primary: "newmm".to_string(),
                fallbacks: vec!["attacut".to_string(), "deepcut".to_string()],
                timeout: Duration::from_millis(500),
            },
            max_concurrent_searches: 5,
            max_query_variants: 5,
            search_timeout: Duration::from_millis(3000),
            retry_attempts: 2,
            boosts: BoostConfig::default(),
            min_score_threshold: 0.0,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(60),
            hot_reload_enabled: true,
            api_key_required: false,
            index_engine_host: "http://127.0.0.1:7700".to_string(),
            index_engine_api_key: None,
            dictionary_path: "config/dictionary.json".to_string(),
            connection_pool_size: 10,
            admission_wait: Duration::from_millis(50),
            batch_concurrency: 10,
            dictionary_version: 0,
            reload_count: 0,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0}")]
    Invalid(String),
}

impl ConfigSnapshot {
    /// Validation rules from spec §4.8: all boosts > 0, all timeouts > 0,
    /// concurrency caps >= 1, primary engine present in the engine set.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.boosts
            .validate()
            .map_err(ConfigValidationError::Invalid)?;

        if self.engines.timeout.is_zero() {
            return Err(ConfigValidationError::Invalid(
                "tokenizer timeout must be > 0".to_string(),
            ));
        }
        if self.search_timeout.is_zero() {
            return Err(ConfigValidationError::Invalid(
                "search timeout must be > 0".to_string(),
            ));
        }
        if self.max_concurrent_searches < 1 {
            return Err(ConfigValidationError::Invalid(
                "max_concurrent_searches must be >= 1".to_string(),
            ));
        }
        if self.max_query_variants < 1 {
            return Err(ConfigValidationError::Invalid(
                "max_query_variants must be >= 1".to_string(),
            ));
        }
        if self.batch_concurrency < 1 {
            return Err(ConfigValidationError::Invalid(
                "batch_concurrency must be >= 1".to_string(),
            ));
        }
        if self.engines.primary.is_empty() {
            return Err(ConfigValidationError::Invalid(
                "primary engine must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Raw key-value view of the `PRIMARY_ENGINE`, `BOOST_EXACT`, etc.
/// environment/file keys recognized by spec §6, used by the config loader
/// before it is assembled into a `ConfigSnapshot`.
pub type RawConfigMap = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_validates() {
        assert!(ConfigSnapshot::default().validate().is_ok());
    }

    #[test]
    fn zero_boost_fails_validation() {
        let mut snap = ConfigSnapshot::default();
        snap.boosts.exact = 0.0;
        assert!(snap.validate().is_err());
    }

    #[test]
    fn zero_concurrency_fails_validation() {
        let mut snap = ConfigSnapshot::default();
        snap.max_concurrent_searches = 0;
        assert!(snap.validate().is_err());
    }

    #[test]
    fn priority_order_starts_with_primary() {
        let engines = EngineConfig {
            primary: "newmm".into(),
            fallbacks: vec!["attacut".into()],
            timeout: Duration::from_millis(100),
        };
        assert_eq!(engines.priority_order(), vec!["newmm", "attacut"]);
    }
}
