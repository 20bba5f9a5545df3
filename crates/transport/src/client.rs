//! Pooled HTTP client to the index engine, with bearer auth and a
//! retry-with-jittered-backoff policy (spec §3, §4.5).

use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::IndexEngineError;

const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct IndexEngineClientConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub connection_pool_size: usize,
    pub retry_attempts: u32,
}

/// Talks to the external index engine (a Meilisearch-like HTTP search
/// backend). One client is built per `ConfigSnapshot` and shared across
/// requests for connection reuse (spec §3).
#[derive(Clone)]
pub struct IndexEngineClient {
    client: Client,
    host: String,
    api_key: Option<String>,
    retry_attempts: u32,
}

impl IndexEngineClient {
    pub fn new(config: IndexEngineClientConfig) -> Result<Self, IndexEngineError> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.connection_pool_size)
            .build()
            .map_err(|e| IndexEngineError::Network(e.to_string()))?;

        Ok(Self {
            client,
            host: config.host,
            api_key: config.api_key,
            retry_attempts: config.retry_attempts,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.host.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// POSTs `body` to `path` with per-call `timeout`, retrying retryable
    /// failures up to `retry_attempts` times with exponential backoff plus
    /// up-to-50% jitter: `base * 2^attempt * (1 + random[0, 0.5))`, capped
    /// at 2s. 4xx responses are returned immediately without retrying.
    pub async fn post_json<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        timeout: Duration,
    ) -> Result<Resp, IndexEngineError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=self.retry_attempts {
            if attempt > 0 {
                let delay = backoff_with_jitter(attempt - 1);
                tracing::warn!(attempt, ?delay, "retrying index engine request");
                tokio::time::sleep(delay).await;
            }

            match self.try_once(path, body, timeout).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(IndexEngineError::Timeout))
    }

    async fn try_once<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        timeout: Duration,
    ) -> Result<Resp, IndexEngineError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut request = self.client.post(self.url(path)).json(body).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Err(IndexEngineError::Timeout),
            Err(e) => return Err(IndexEngineError::Network(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexEngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| IndexEngineError::Decode(e.to_string()))
    }
}

fn backoff_with_jitter(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE.saturating_mul(1u32 << attempt.min(16));
    let jitter = 1.0 + rand::thread_rng().gen_range(0.0..0.5);
    let millis = (exp.as_millis() as f64 * jitter) as u64;
    Duration::from_millis(millis).min(BACKOFF_CAP)
}
