//! HTTP-reachable tokenizer engines (`attacut`, `deepcut`).
//!
//! These model engines are not implemented in-process — the corpus has no
//! Thai ML tokenizer crate to ground a real port on — so they are treated
//! as remote services behind the same `Tokenizer` contract `newmm` exposes.
//! This keeps the fallback ladder (spec §4.3) real and testable without
//! fabricating a model.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use thaisearch_core::tokenization::{TokenizationError, TokenizationResult, Tokenizer};

#[derive(Debug, Serialize)]
struct TokenizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    tokens: Vec<String>,
    #[serde(default)]
    confidence: Option<Vec<f32>>,
}

pub struct HttpTokenizerEngine {
    engine_id: String,
    endpoint: String,
    client: Client,
}

impl HttpTokenizerEngine {
    pub fn new(engine_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            engine_id: engine_id.into(),
            endpoint: endpoint.into(),
            client: Client::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/tokenize", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Tokenizer for HttpTokenizerEngine {
    fn engine_id(&self) -> &str {
        &self.engine_id
    }

    async fn tokenize(
        &self,
        text: &str,
        timeout: Duration,
    ) -> Result<TokenizationResult, TokenizationError> {
        if text.is_empty() {
            return Ok(TokenizationResult::empty(self.engine_id()));
        }

        let start = Instant::now();
        let call = self
            .client
            .post(self.url())
            .json(&TokenizeRequest { text })
            .send();

        let response = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                return Err(TokenizationError::EngineInternal(
                    self.engine_id.clone(),
                    e.to_string(),
                ))
            }
            Err(_) => return Err(TokenizationError::Timeout(self.engine_id.clone())),
        };

        if !response.status().is_success() {
            let status = response.status();
            return Err(TokenizationError::EngineInternal(
                self.engine_id.clone(),
                format!("engine returned HTTP {status}"),
            ));
        }

        let body: TokenizeResponse = response
            .json()
            .await
            .map_err(|e| TokenizationError::EngineInternal(self.engine_id.clone(), e.to_string()))?;

        Ok(TokenizationResult {
            original_text: text.to_string(),
            tokens: body.tokens,
            confidence: body.confidence,
            engine_id: self.engine_id.clone(),
            duration: start.elapsed(),
            success: true,
            error_reason: None,
        })
    }
}
