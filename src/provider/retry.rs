//! Adapter-level retry for transient failures.
//!
//! The router never retries a provider. An adapter may opt in by configuring
//! `max_retries`; retryable failures (rate limits, timeouts, network and
//! availability errors) are then repeated with exponential backoff. Permanent
//! failures such as bad credentials return immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::ProviderError;

/// Fixed exponential backoff: 1s, 2s, 4s. Retries past the last slot reuse it.
const BACKOFF_DURATIONS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Backoff before retry number `retry` (1-based).
pub fn backoff_for(retry: u32) -> Duration {
    let index = (retry.saturating_sub(1) as usize).min(BACKOFF_DURATIONS.len() - 1);
    BACKOFF_DURATIONS[index]
}

/// Run `attempt` once, then up to `max_retries` more times while it fails retryably.
///
/// A retry is only started if its backoff ends before `deadline`.
/// Returns the first success, the first non-retryable error, or the last
/// retryable error once retries or time run out.
pub async fn retry_transient<T, F, Fut>(
    provider: &str,
    max_retries: u32,
    deadline: Instant,
    attempt: F,
) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut retry = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retry < max_retries => {
                let delay = backoff_for(retry + 1);
                if Instant::now() + delay >= deadline {
                    tracing::debug!(
                        provider = %provider,
                        error = %err,
                        "No time left for another attempt"
                    );
                    return Err(err);
                }
                retry += 1;
                tracing::warn!(
                    provider = %provider,
                    error = %err,
                    retry,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Transient provider failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
