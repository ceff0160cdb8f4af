//! Shared HTTP plumbing for the bundled adapters.
//!
//! Handles timing, per-call timeouts, retry, and mapping of HTTP/transport
//! failures onto [`ProviderErrorKind`].

use std::time::{Duration, Instant};

use reqwest::{header, Client, StatusCode};
use serde::Serialize;

use super::retry::retry_transient;
use super::{GenerateOptions, ProviderError, ProviderErrorKind, ResponseRecord};
use crate::config::{ApiKey, ProviderConfig};

/// Longest error body excerpt kept in a [`ProviderError`] message.
const MAX_ERROR_BODY: usize = 300;

/// How an adapter authenticates its requests.
#[derive(Debug, Clone, Copy)]
pub enum Auth<'a> {
    None,
    /// `Authorization: Bearer <key>`
    Bearer(&'a ApiKey),
    /// Key sent verbatim in a provider-specific header.
    Header(&'static str, &'a ApiKey),
}

impl<'a> From<Option<&'a ApiKey>> for Auth<'a> {
    fn from(key: Option<&'a ApiKey>) -> Self {
        key.map_or(Auth::None, Auth::Bearer)
    }
}

/// HTTP client plus the per-provider settings every adapter needs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    provider_name: String,
    timeout: Duration,
    max_retries: u32,
    cost_per_1k_tokens: f64,
}

impl HttpTransport {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            provider_name: config.name.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            cost_per_1k_tokens: config.cost_per_1k_tokens,
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// POST `body` as JSON to `url` and parse the JSON response.
    ///
    /// Returns the parsed body and the wall-clock time of the whole exchange,
    /// retries included. The timeout bounds the whole exchange, backoff
    /// sleeps too. On failure the elapsed time is attached to the error.
    pub async fn post_json<B>(
        &self,
        url: &str,
        auth: Auth<'_>,
        body: &B,
        options: &GenerateOptions,
    ) -> Result<(serde_json::Value, Duration), ProviderError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let timeout = options.timeout.unwrap_or(self.timeout);
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + timeout;

        let attempts = retry_transient(&self.provider_name, self.max_retries, deadline, move || {
            self.send_once(url, auth, body, timeout)
        });
        let result = match tokio::time::timeout_at(deadline, attempts).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::new(
                ProviderErrorKind::Timeout,
                format!("no response within {} ms", timeout.as_millis()),
            )),
        };

        let elapsed = start.elapsed();
        match result {
            Ok(value) => {
                tracing::debug!(
                    provider = %self.provider_name,
                    latency_ms = elapsed.as_millis() as u64,
                    "Provider call succeeded"
                );
                Ok((value, elapsed))
            }
            Err(err) => {
                tracing::warn!(
                    provider = %self.provider_name,
                    kind = ?err.kind,
                    latency_ms = elapsed.as_millis() as u64,
                    error = %err.message,
                    "Provider call failed"
                );
                Err(err.with_elapsed(elapsed))
            }
        }
    }

    async fn send_once<B>(
        &self,
        url: &str,
        auth: Auth<'_>,
        body: &B,
        timeout: Duration,
    ) -> Result<serde_json::Value, ProviderError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .json(body);

        match auth {
            Auth::None => {}
            Auth::Bearer(key) => {
                request = request.header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", key.expose_secret()),
                );
            }
            Auth::Header(name, key) => {
                request = request.header(name, key.expose_secret());
            }
        }

        let response = request.send().await.map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_body));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                classify_transport(&e)
            } else {
                ProviderError::new(
                    ProviderErrorKind::InvalidResponse,
                    format!("Failed to parse response body: {}", e),
                )
            }
        })
    }

    /// Build a priced [`ResponseRecord`] for this provider.
    pub fn record(
        &self,
        model: &str,
        content: String,
        latency: Duration,
        reported_tokens: Option<u32>,
    ) -> ResponseRecord {
        ResponseRecord::new(&self.provider_name, model, content, latency)
            .with_reported_tokens(reported_tokens)
            .priced_at(self.cost_per_1k_tokens)
    }
}

/// Map a non-success HTTP status onto a provider error.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let kind = match status.as_u16() {
        401 | 403 => ProviderErrorKind::Auth,
        429 => ProviderErrorKind::RateLimit,
        408 | 504 => ProviderErrorKind::Timeout,
        500 | 502 | 503 => ProviderErrorKind::Unavailable,
        _ => ProviderErrorKind::InvalidResponse,
    };
    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    let message = if excerpt.is_empty() {
        format!("Provider returned {}", status)
    } else {
        format!("Provider returned {}: {}", status, excerpt)
    };
    ProviderError::new(kind, message)
}

/// Map a reqwest transport failure onto a provider error.
pub(crate) fn classify_transport(err: &reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        ProviderErrorKind::Timeout
    } else if err.is_connect() {
        ProviderErrorKind::Unavailable
    } else {
        ProviderErrorKind::Network
    };
    ProviderError::new(kind, format!("Failed to reach provider: {}", err))
}
