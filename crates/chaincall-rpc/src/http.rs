//! HTTP JSON-RPC client backed by `reqwest`, retrying transient failures.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::transport::RpcTransport;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub retry: RetryConfig,
    pub request_timeout_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout_ms: 30_000,
        }
    }
}

pub struct HttpRpcClient {
    url: String,
    http: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>, config: HttpClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
            retry: RetryPolicy::new(config.retry),
        })
    }

    pub fn default_for(url: impl Into<String>) -> Result<Self, TransportError> {
        Self::new(url, HttpClientConfig::default())
    }

    async fn post<B, R>(&self, body: &B) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let resp = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {}: {body}", status.as_u16())));
        }
        resp.json::<R>()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))
    }
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        tracing::trace!(method = %req.method, id = %req.id, url = %self.url, "rpc request");
        self.retry.retry(&self.url, || self.post(&req)).await
    }

    /// One HTTP POST carrying the whole batch as a JSON array.
    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        if reqs.is_empty() {
            return Ok(vec![]);
        }
        tracing::trace!(size = reqs.len(), url = %self.url, "rpc batch request");
        self.retry.retry(&self.url, || self.post(&reqs)).await
    }

    fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for HttpRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRpcClient")
            .field("url", &self.url)
            .field("retry", &self.retry.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_loads_partial_json() {
        let config: HttpClientConfig =
            serde_json::from_str(r#"{"retry": {"max_retries": 0}}"#).unwrap();
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.initial_backoff_ms, 100);
        assert_eq!(config.request_timeout_ms, 30_000);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_retryable_http_error() {
        let config = HttpClientConfig {
            retry: RetryConfig {
                max_retries: 0,
                ..Default::default()
            },
            request_timeout_ms: 500,
        };
        // Port 9 (discard) on localhost: connection refused without network access.
        let client = HttpRpcClient::new("http://127.0.0.1:9", config).unwrap();
        let err = client
            .send(JsonRpcRequest::new(1, "eth_chainId", vec![]))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(client.url(), "http://127.0.0.1:9");
    }
}
