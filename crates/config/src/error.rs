use thaisearch_core::config::ConfigValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to read environment file: {0}")]
    EnvFile(String),

    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
