use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read dictionary file: {0}")]
    Io(String),
    #[error("dictionary file is not valid JSON: {0}")]
    Malformed(String),
}
