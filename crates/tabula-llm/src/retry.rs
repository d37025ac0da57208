use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use tabula_core::config::{ModelConfig, RetryConfig};
use tabula_core::error::{Result, TabulaError};
use tabula_core::traits::LlmClient;
use tabula_core::types::*;

/// An LLM client that retries transient failures with exponential backoff.
pub struct RetryingClient {
    inner: Box<dyn LlmClient>,
    retry_config: RetryConfig,
}

impl RetryingClient {
    pub fn new(inner: Box<dyn LlmClient>, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }
}

fn is_retryable(e: &TabulaError) -> bool {
    match e {
        TabulaError::LlmRequest(msg) => {
            msg.contains("429")
                || msg.contains("500")
                || msg.contains("502")
                || msg.contains("503")
                || msg.contains("timeout")
                || msg.contains("connection")
        }
        _ => false,
    }
}

fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = (config.initial_backoff_ms * 2u64.pow(attempt)).min(config.max_backoff_ms);
    // Add jitter: 0.8x to 1.2x
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

impl LlmClient for RetryingClient {
    fn chat(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> BoxFuture<'_, Result<ChatTurn>> {
        let config = config.clone();
        let tools = tools.to_vec();

        Box::pin(async move {
            let max_retries = self.retry_config.max_retries;

            let mut last_err = None;
            for attempt in 0..=max_retries {
                match self.inner.chat(&config, messages.clone(), &tools).await {
                    Ok(turn) => return Ok(turn),
                    Err(e) => {
                        if is_retryable(&e) && attempt < max_retries {
                            let backoff = calculate_backoff(attempt, &self.retry_config);
                            warn!(
                                attempt = attempt + 1,
                                max_retries,
                                backoff_ms = backoff.as_millis() as u64,
                                error = %e,
                                "Retrying LLM request"
                            );
                            tokio::time::sleep(backoff).await;
                            last_err = Some(e);
                            continue;
                        }
                        return Err(e);
                    }
                }
            }

            Err(last_err.unwrap_or_else(|| TabulaError::LlmRequest("request failed".into())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&TabulaError::LlmRequest("HTTP 429: slow down".into())));
        assert!(is_retryable(&TabulaError::LlmRequest("connection reset".into())));
        assert!(!is_retryable(&TabulaError::LlmRequest("HTTP 401: bad key".into())));
        assert!(!is_retryable(&TabulaError::Database("down".into())));
    }

    #[test]
    fn test_backoff_is_bounded() {
        let config = RetryConfig {
            max_retries: 5,
            initial_backoff_ms: 1000,
            max_backoff_ms: 4000,
        };
        for attempt in 0..8 {
            let backoff = calculate_backoff(attempt, &config);
            // 4000ms cap plus 1.2x jitter ceiling
            assert!(backoff.as_millis() <= 4800);
        }
    }
}
