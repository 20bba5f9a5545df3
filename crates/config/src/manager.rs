//! Atomic `ConfigSnapshot` publication (spec §4.8, §5 snapshot isolation).
//!
//! Mirrors the teacher's `AppState { config: Arc<RwLock<Settings>>, .. }`
//! pattern: readers clone the `Arc` under a short-lived read lock and then
//! use their own reference for the rest of the request, so a concurrent
//! reload can never hand one request two different snapshots.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use thaisearch_core::config::ConfigSnapshot;
use thaisearch_dictionary::DictionaryStore;

use crate::error::ConfigError;
use crate::settings::{apply_env_map, build_snapshot, load_layered, parse_env_file, RawSettings};

pub struct ConfigManager {
    snapshot: RwLock<Arc<ConfigSnapshot>>,
    dictionary: Arc<DictionaryStore>,
    env_name: Option<String>,
    env_file: Option<PathBuf>,
    reload_count: AtomicU64,
    last_reload: RwLock<Option<std::time::Instant>>,
}

impl ConfigManager {
    /// Loads the initial snapshot from `config/default` (+ `env`, if any)
    /// plus an optional environment file, validates it, and fails startup
    /// if it doesn't validate — there's no "prior snapshot" to fall back
    /// to yet.
    pub fn load(
        env_name: Option<&str>,
        env_file: Option<PathBuf>,
        dictionary: Arc<DictionaryStore>,
    ) -> Result<Self, ConfigError> {
        let manager = Self {
            snapshot: RwLock::new(Arc::new(ConfigSnapshot::default())),
            dictionary,
            env_name: env_name.map(str::to_string),
            env_file,
            reload_count: AtomicU64::new(0),
            last_reload: RwLock::new(None),
        };
        let snapshot = manager.build_candidate()?;
        *manager.snapshot.write() = Arc::new(snapshot);
        Ok(manager)
    }

    /// The snapshot every in-flight request must read exactly once
    /// (spec §5 ordering guarantee #1).
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn reload_count(&self) -> u64 {
        self.reload_count.load(Ordering::SeqCst)
    }

    pub fn last_reload(&self) -> Option<std::time::Instant> {
        *self.last_reload.read()
    }

    /// Builds a fresh candidate, validates it, and swaps it in on success.
    /// On validation failure the prior snapshot stays live and the error
    /// is returned for the caller to log and surface to health (spec §4.8
    /// "A failed candidate is rejected... prior snapshot remains active").
    ///
    /// The dictionary is one of the files spec §4.8 names as hot-reload
    /// watch targets, so a reload here also re-reads it from disk (spec
    /// §4.1: on parse failure the prior set is retained and the error is
    /// only logged, never allowed to fail the surrounding config reload).
    pub fn reload(&self) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        if let Err(e) = self.dictionary.reload() {
            tracing::warn!(error = %e, "dictionary reload failed, keeping previous word set");
        }

        let candidate = self.build_candidate();
        thaisearch_metrics::record_config_reload(candidate.is_ok());
        let candidate = Arc::new(candidate?);
        *self.snapshot.write() = candidate.clone();
        self.reload_count.fetch_add(1, Ordering::SeqCst);
        *self.last_reload.write() = Some(std::time::Instant::now());
        Ok(candidate)
    }

    /// Validates a candidate built from the current file/env layers without
    /// publishing it — backs `POST /api/v1/admin/config/validate` (spec §6).
    pub fn validate_candidate(&self) -> Result<(), ConfigError> {
        self.build_candidate().map(|_| ())
    }

    /// Applies an admin-supplied partial settings patch directly onto the
    /// live snapshot and publishes it on success, without touching the
    /// file/env layers (spec §6 `PUT /api/v1/admin/config[/:type]`). A
    /// subsequent file-driven reload still wins the next time it fires,
    /// since this does not persist the patch to disk — admin edits are a
    /// live override, not a write-back.
    pub fn apply_admin_update(&self, patch: &RawSettings) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        let current = self.snapshot();
        let mut candidate = patch.apply_onto((*current).clone());
        candidate.dictionary_version = self.dictionary.version();
        candidate.reload_count = self.reload_count.load(Ordering::SeqCst);
        let validation = candidate.validate();
        thaisearch_metrics::record_config_reload(validation.is_ok());
        validation?;

        let candidate = Arc::new(candidate);
        *self.snapshot.write() = candidate.clone();
        self.reload_count.fetch_add(1, Ordering::SeqCst);
        *self.last_reload.write() = Some(std::time::Instant::now());
        Ok(candidate)
    }

    fn build_candidate(&self) -> Result<ConfigSnapshot, ConfigError> {
        let mut raw = load_layered(self.env_name.as_deref())?;

        if let Some(path) = &self.env_file {
            if let Ok(contents) = std::fs::read_to_string(path) {
                let map = parse_env_file(&contents);
                raw = apply_env_map(raw, &map);
            }
        }

        build_snapshot(
            &raw,
            self.dictionary.version(),
            self.reload_count.load(Ordering::SeqCst),
        )
    }

    pub fn dictionary_path(&self) -> &Path {
        self.dictionary.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn dictionary() -> Arc<DictionaryStore> {
        let file = tempfile::NamedTempFile::new().unwrap();
        Arc::new(DictionaryStore::load(file.path().to_path_buf()).unwrap())
    }

    #[test]
    fn load_publishes_a_validated_default_snapshot() {
        let manager = ConfigManager::load(None, None, dictionary()).unwrap();
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.engines.primary, "newmm");
        assert_eq!(manager.reload_count(), 0);
    }

    #[test]
    fn reload_picks_up_env_file_overrides() {
        let mut env_file = tempfile::NamedTempFile::new().unwrap();
        let manager = ConfigManager::load(None, Some(env_file.path().to_path_buf()), dictionary()).unwrap();

        writeln!(env_file, "PRIMARY_ENGINE=attacut").unwrap();
        writeln!(env_file, "BOOST_EXACT=3.0").unwrap();
        env_file.flush().unwrap();

        let snapshot = manager.reload().unwrap();
        assert_eq!(snapshot.engines.primary, "attacut");
        assert_eq!(snapshot.boosts.exact, 3.0);
        assert_eq!(manager.reload_count(), 1);
        assert!(manager.last_reload().is_some());
    }

    #[test]
    fn reload_with_invalid_override_keeps_prior_snapshot() {
        let mut env_file = tempfile::NamedTempFile::new().unwrap();
        let manager = ConfigManager::load(None, Some(env_file.path().to_path_buf()), dictionary()).unwrap();

        writeln!(env_file, "BOOST_EXACT=0").unwrap();
        env_file.flush().unwrap();

        let result = manager.reload();
        assert!(result.is_err());
        assert_eq!(manager.snapshot().engines.primary, "newmm");
        assert_eq!(manager.reload_count(), 0);
    }

    #[test]
    fn admin_update_overrides_live_snapshot_without_touching_files() {
        let manager = ConfigManager::load(None, None, dictionary()).unwrap();
        let mut patch = RawSettings::default();
        patch.boost_exact = Some(3.5);

        let snapshot = manager.apply_admin_update(&patch).unwrap();
        assert_eq!(snapshot.boosts.exact, 3.5);
        assert_eq!(manager.snapshot().boosts.exact, 3.5);
    }

    #[test]
    fn admin_update_rejects_invalid_patch() {
        let manager = ConfigManager::load(None, None, dictionary()).unwrap();
        let mut patch = RawSettings::default();
        patch.max_concurrent_searches = Some(0);

        assert!(manager.apply_admin_update(&patch).is_err());
        assert_eq!(manager.snapshot().max_concurrent_searches, 5);
    }

    #[test]
    fn reload_picks_up_dictionary_changes_on_disk() {
        let mut dict_file = tempfile::NamedTempFile::new().unwrap();
        write!(dict_file, r#"{{"a": ["ข้าว"]}}"#).unwrap();
        dict_file.flush().unwrap();
        let dictionary = Arc::new(DictionaryStore::load(dict_file.path()).unwrap());
        assert!(dictionary.contains("ข้าว"));

        let manager = ConfigManager::load(None, None, dictionary.clone()).unwrap();
        let version_before = manager.snapshot().dictionary_version;

        std::fs::write(dict_file.path(), r#"{"a": ["น้ำตาล"]}"#).unwrap();
        let snapshot = manager.reload().unwrap();

        assert!(dictionary.contains("น้ำตาล"));
        assert!(!dictionary.contains("ข้าว"));
        assert_ne!(snapshot.dictionary_version, version_before);
    }

    #[test]
    fn validate_candidate_does_not_publish() {
        let manager = ConfigManager::load(None, None, dictionary()).unwrap();
        assert!(manager.validate_candidate().is_ok());
        assert_eq!(manager.reload_count(), 0);
    }
}
