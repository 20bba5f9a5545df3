//! Compound word dictionary store (spec §3, §4.1).
//!
//! The dictionary is a flat set of known Thai compound words, loaded from a
//! JSON file organized by category for human editability, and exposed as a
//! single atomically-swappable set to readers.

mod error;

pub use error::DictionaryError;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

/// On-disk shape: `{"category": ["word1", "word2"], ...}`.
type CategorizedWords = HashMap<String, Vec<String>>;

fn parse_and_validate(raw: &str) -> Result<HashSet<String>, DictionaryError> {
    let categorized: CategorizedWords =
        serde_json::from_str(raw).map_err(|e| DictionaryError::Malformed(e.to_string()))?;

    let mut words = HashSet::new();
    for (category, entries) in categorized {
        for word in entries {
            if word.is_empty() {
                continue;
            }
            if !word.chars().any(thaisearch_core::is_thai_codepoint) {
                tracing::warn!(category = %category, word = %word, "skipping non-Thai dictionary entry");
                continue;
            }
            words.insert(word);
        }
    }
    Ok(words)
}

fn content_hash(words: &HashSet<String>) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut sorted: Vec<&str> = words.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    sorted.hash(&mut hasher);
    hasher.finish()
}

/// Holds the current compound-word set behind a read-mostly lock, swapped
/// atomically on reload so in-flight lookups never observe a half-loaded
/// dictionary (same pattern as `ConfigSnapshot`, spec §3).
pub struct DictionaryStore {
    path: PathBuf,
    words: RwLock<Arc<HashSet<String>>>,
}

impl DictionaryStore {
    /// Loads the dictionary from `path`. A missing file is not an error —
    /// the store starts empty and logs a warning, matching the "degrade,
    /// don't fail startup" posture used elsewhere in the proxy.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let path = path.as_ref().to_path_buf();
        let words = match std::fs::read_to_string(&path) {
            Ok(raw) => parse_and_validate(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "dictionary file not found, starting empty");
                HashSet::new()
            }
            Err(e) => return Err(DictionaryError::Io(e.to_string())),
        };

        tracing::info!(path = %path.display(), count = words.len(), "dictionary loaded");
        Ok(Self {
            path,
            words: RwLock::new(Arc::new(words)),
        })
    }

    /// Reloads from the store's configured path, publishing the new set
    /// only if it parses and validates cleanly. On failure the previous
    /// set remains live.
    pub fn reload(&self) -> Result<usize, DictionaryError> {
        self.reload_from(&self.path)
    }

    /// Reloads from an arbitrary path, used by tests and by hot-reload
    /// watchers pointed at a path different from the one passed to `load`.
    pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<usize, DictionaryError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DictionaryError::Io(e.to_string()))?;
        let words = parse_and_validate(&raw)?;
        let count = words.len();
        *self.words.write() = Arc::new(words);
        Ok(count)
    }

    /// True if `word` is a known compound word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.read().contains(word)
    }

    /// Immutable snapshot of the current word set.
    pub fn words(&self) -> Arc<HashSet<String>> {
        self.words.read().clone()
    }

    pub fn len(&self) -> usize {
        self.words.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.read().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content hash surfaced as `ConfigSnapshot::dictionary_version` so
    /// Metrics & Health can report when the dictionary last actually
    /// changed, not just when a reload was attempted (spec §4.9).
    pub fn version(&self) -> u64 {
        content_hash(&self.words.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_categorized_words() {
        let f = write_temp(r#"{"agriculture": ["เกษตรอัจฉริยะ", "ข้าวโพด"]}"#);
        let store = DictionaryStore::load(f.path()).unwrap();
        assert!(store.contains("เกษตรอัจฉริยะ"));
        assert!(store.contains("ข้าวโพด"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn missing_file_starts_empty() {
        let store = DictionaryStore::load("/nonexistent/path/dictionary.json").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let f = write_temp("not json");
        let err = DictionaryStore::load(f.path()).unwrap_err();
        assert!(matches!(err, DictionaryError::Malformed(_)));
    }

    #[test]
    fn non_thai_entries_are_skipped() {
        let f = write_temp(r#"{"misc": ["smartfarm", "ข้าว"]}"#);
        let store = DictionaryStore::load(f.path()).unwrap();
        assert!(!store.contains("smartfarm"));
        assert!(store.contains("ข้าว"));
    }

    #[test]
    fn reload_replaces_the_set_atomically() {
        let f = write_temp(r#"{"a": ["ข้าว"]}"#);
        let store = DictionaryStore::load(f.path()).unwrap();
        assert!(store.contains("ข้าว"));

        let f2 = write_temp(r#"{"a": ["น้ำตาล"]}"#);
        store.reload_from(f2.path()).unwrap();
        assert!(!store.contains("ข้าว"));
        assert!(store.contains("น้ำตาล"));
    }

    #[test]
    fn reload_on_bad_file_keeps_previous_set() {
        let f = write_temp(r#"{"a": ["ข้าว"]}"#);
        let store = DictionaryStore::load(f.path()).unwrap();

        let bad = write_temp("not json");
        assert!(store.reload_from(bad.path()).is_err());
        assert!(store.contains("ข้าว"));
    }

    #[test]
    fn version_changes_when_content_changes() {
        let f = write_temp(r#"{"a": ["ข้าว"]}"#);
        let store = DictionaryStore::load(f.path()).unwrap();
        let v1 = store.version();

        let f2 = write_temp(r#"{"a": ["น้ำตาล"]}"#);
        store.reload_from(f2.path()).unwrap();
        assert_ne!(v1, store.version());
    }
}
