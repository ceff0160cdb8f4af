//! The standardized result of a successful generation call.

use std::time::Duration;

use serde::Serialize;

/// Immutable record of one successful generation.
///
/// Only adapters construct these, and only on success. Failures are reported
/// as [`super::ProviderError`] and never produce a partial record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    provider_name: String,
    model: String,
    content: String,
    latency_ms: u64,
    token_count: u32,
    estimated_cost: f64,
}

impl ResponseRecord {
    /// Create a record with an estimated token count and zero cost.
    pub fn new(
        provider_name: impl Into<String>,
        model: impl Into<String>,
        content: impl Into<String>,
        latency: Duration,
    ) -> Self {
        let provider_name = provider_name.into();
        debug_assert!(!provider_name.is_empty(), "provider name must be non-empty");
        let content = content.into();
        let token_count = estimate_tokens(&content);
        Self {
            provider_name,
            model: model.into(),
            content,
            latency_ms: latency.as_millis().min(u64::MAX as u128) as u64,
            token_count,
            estimated_cost: 0.0,
        }
    }

    /// Replace the estimate with a provider-reported token count, if one exists.
    pub fn with_reported_tokens(mut self, reported: Option<u32>) -> Self {
        if let Some(tokens) = reported {
            self.token_count = tokens;
        }
        self
    }

    /// Price the record at `cost_per_1k_tokens`. Negative rates are treated as free.
    pub fn priced_at(mut self, cost_per_1k_tokens: f64) -> Self {
        let rate = if cost_per_1k_tokens.is_finite() {
            cost_per_1k_tokens.max(0.0)
        } else {
            0.0
        };
        self.estimated_cost = self.token_count as f64 / 1000.0 * rate;
        self
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    pub fn token_count(&self) -> u32 {
        self.token_count
    }

    pub fn estimated_cost(&self) -> f64 {
        self.estimated_cost
    }
}

/// Narrow a provider-reported token count, saturating at `u32::MAX`.
pub(crate) fn saturating_tokens(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Rough token estimate: four tokens per three whitespace-separated words.
fn estimate_tokens(content: &str) -> u32 {
    let words = content.split_whitespace().count() as u64;
    saturating_tokens(words.saturating_mul(4).div_ceil(3))
}
