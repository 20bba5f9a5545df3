//! Unified error taxonomy for the proxy, mapped to HTTP status codes at the
//! server boundary (spec §7).

use thiserror::Error;

use crate::config::ConfigValidationError;
use crate::tokenization::TokenizationError;

/// Top-level error returned by the Search Proxy Service (C10) to the
/// HTTP layer. Each variant names the component that raised it so logs
/// and metrics can attribute failures without string matching.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("query validation failed: {0}")]
    Validation(String),

    #[error("tokenization failed: {0}")]
    Tokenization(#[from] TokenizationError),

    #[error("index engine call failed: {0}")]
    IndexEngine(String),

    #[error("index engine returned an error status: {status} {body}")]
    IndexEngineStatus { status: u16, body: String },

    #[error("configuration invalid: {0}")]
    Config(#[from] ConfigValidationError),

    #[error("configuration reload failed: {0}")]
    ConfigReload(String),

    #[error("unauthorized: missing API key")]
    Unauthorized,

    #[error("forbidden: invalid API key")]
    Forbidden,

    #[error("request rejected: {0}")]
    Backpressure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// HTTP status this error maps to at the `thaisearch-server` boundary
    /// (spec §7).
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::Validation(_) => 422,
            ProxyError::Tokenization(_) => 503,
            ProxyError::IndexEngine(_) => 503,
            ProxyError::IndexEngineStatus { .. } => 503,
            ProxyError::Config(_) => 500,
            ProxyError::ConfigReload(_) => 500,
            ProxyError::Unauthorized => 401,
            ProxyError::Forbidden => 403,
            ProxyError::Backpressure(_) => 429,
            ProxyError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable tag for the `{error, message, ...}` response
    /// body (spec §6).
    pub fn error_tag(&self) -> &'static str {
        match self {
            ProxyError::Validation(_) => "validation_error",
            ProxyError::Tokenization(_) => "tokenization_error",
            ProxyError::IndexEngine(_) | ProxyError::IndexEngineStatus { .. } => {
                "index_engine_error"
            }
            ProxyError::Config(_) | ProxyError::ConfigReload(_) => "config_error",
            ProxyError::Unauthorized => "unauthorized",
            ProxyError::Forbidden => "forbidden",
            ProxyError::Backpressure(_) => "backpressure",
            ProxyError::Internal(_) => "internal_error",
        }
    }
}
