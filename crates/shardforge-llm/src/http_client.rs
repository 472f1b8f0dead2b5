//! Shared HTTP client infrastructure for HTTP-based generation providers
//!
//! A single `reqwest::Client` is configured once per backend and reused for
//! every call, with timeout and retry policies applied per request.

use reqwest::{Client, Response, StatusCode};
use shardforge_utils::redaction::redact_error_message;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::LlmError;

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Marker Google APIs put in quota-exceeded error bodies
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Longest slice of an error body carried into an error message
const MAX_ERROR_BODY_CHARS: usize = 300;

/// How many times a request may be re-sent after a 5xx or network failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Text calls: up to 2 retries, linear 1s backoff
    pub const TEXT: RetryPolicy = RetryPolicy {
        max_retries: 2,
        initial_backoff: Duration::from_secs(1),
    };

    /// Image calls: never retried, so rate limits surface on the first refusal
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        initial_backoff: Duration::ZERO,
    };
}

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .use_rustls_tls()
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout,
        })
    }

    /// Start a POST request on the shared client.
    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url)
    }

    /// Execute an HTTP request with timeout and retry policy
    ///
    /// - Per-request timeout: `min(request_timeout, max_timeout)`
    /// - 5xx and network failures retried per `policy`, linear backoff
    /// - 4xx never retried
    ///
    /// # Errors
    ///
    /// - `LlmError::ProviderAuth` for 401/403
    /// - `LlmError::RateLimited` for 429 or a `RESOURCE_EXHAUSTED` body
    /// - `LlmError::ProviderOutage` for 5xx (after retries)
    /// - `LlmError::Timeout` for timeouts
    /// - `LlmError::Transport` for other 4xx and network errors (after retries)
    pub async fn execute_with_retry(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
        policy: RetryPolicy,
    ) -> Result<Response, LlmError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = request_builder
                .try_clone()
                .ok_or_else(|| {
                    LlmError::Transport("Failed to clone request for retry".to_string())
                })?
                .timeout(effective_timeout)
                .build()
                .map_err(|e| LlmError::Transport(format!("Failed to build request: {}", e)))?;

            debug!(
                provider = provider_name,
                attempt = attempt,
                timeout_secs = effective_timeout.as_secs(),
                "Executing HTTP request"
            );

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_client_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(map_client_error(status, &body, provider_name));
                    }

                    if status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        if body.contains(RESOURCE_EXHAUSTED) {
                            return Err(map_client_error(
                                StatusCode::TOO_MANY_REQUESTS,
                                &body,
                                provider_name,
                            ));
                        }

                        if attempt <= policy.max_retries {
                            warn!(
                                provider = provider_name,
                                attempt = attempt,
                                status = status.as_u16(),
                                "Server error, will retry"
                            );
                            tokio::time::sleep(policy.initial_backoff * attempt).await;
                            continue;
                        }

                        return Err(LlmError::ProviderOutage(format!(
                            "{} returned server error: {}",
                            provider_name, status
                        )));
                    }

                    return Ok(response);
                }
                Err(e) => {
                    if e.is_timeout() {
                        return Err(LlmError::Timeout {
                            duration: effective_timeout,
                        });
                    }

                    let message = redact_error_message(&e.to_string());

                    if attempt <= policy.max_retries {
                        warn!(
                            provider = provider_name,
                            attempt = attempt,
                            error = %message,
                            "Network error, will retry"
                        );
                        tokio::time::sleep(policy.initial_backoff * attempt).await;
                        continue;
                    }

                    return Err(LlmError::Transport(format!(
                        "{} request failed: {}",
                        provider_name, message
                    )));
                }
            }
        }
    }
}

/// Map HTTP client error status codes (and body markers) to `LlmError` variants
///
/// - 429, or any body containing `RESOURCE_EXHAUSTED` → `LlmError::RateLimited`
/// - 401/403 → `LlmError::ProviderAuth`
/// - Other 4xx → `LlmError::Transport`
pub(crate) fn map_client_error(status: StatusCode, body: &str, provider_name: &str) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains(RESOURCE_EXHAUSTED) {
        return LlmError::RateLimited(format!(
            "{} rate limit exceeded: {}",
            provider_name, status
        ));
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::ProviderAuth(format!(
            "{} authentication failed: {}",
            provider_name, status
        )),
        _ => LlmError::Transport(format!(
            "{} returned client error: {}{}",
            provider_name,
            status,
            body_excerpt(body)
        )),
    }
}

fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let excerpt: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!(" ({})", redact_error_message(&excerpt))
}
