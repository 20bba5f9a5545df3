use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexEngineError {
    #[error("request to index engine timed out")]
    Timeout,
    #[error("network error talking to index engine: {0}")]
    Network(String),
    #[error("index engine returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode index engine response: {0}")]
    Decode(String),
}

impl IndexEngineError {
    /// 5xx and transport-level failures are retried; 4xx are not, matching
    /// the client error handling (spec §4.5).
    pub fn is_retryable(&self) -> bool {
        match self {
            IndexEngineError::Timeout | IndexEngineError::Network(_) => true,
            IndexEngineError::Status { status, .. } => *status >= 500,
            IndexEngineError::Decode(_) => false,
        }
    }
}
