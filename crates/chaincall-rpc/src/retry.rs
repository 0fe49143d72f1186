//! Exponential backoff for transient transport failures.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    /// Cap on the exponential growth.
    pub max_backoff_ms: u64,
    pub multiplier: f64,
    /// Extra `jitter_fraction / 2` of the backoff added to every delay.
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            multiplier: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(RetryConfig {
            max_retries: 0,
            ..Default::default()
        })
    }

    /// Delay before retry number `attempt` (1-based), `None` once the retry
    /// budget is spent.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.max_retries {
            return None;
        }
        let exp = self.config.multiplier.powi(attempt as i32 - 1);
        let backoff = (self.config.initial_backoff_ms as f64 * exp).min(self.config.max_backoff_ms as f64);
        let jitter = backoff * self.config.jitter_fraction / 2.0;
        Some(Duration::from_millis((backoff + jitter) as u64))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is exhausted.
    pub async fn retry<T, F, Fut>(&self, endpoint: &str, mut op: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };
            let Some(delay) = self.next_delay(attempt) else {
                tracing::error!(attempt, error = %err, url = %endpoint, "max retries exceeded");
                return Err(err);
            };
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                url = %endpoint,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
