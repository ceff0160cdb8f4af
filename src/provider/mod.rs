//! Provider adapters.
//!
//! Every backend is wrapped behind [`ProviderAdapter`], which turns a prompt
//! into a [`ResponseRecord`] or a typed [`ProviderError`]. The router holds
//! adapters as `Arc<dyn ProviderAdapter>` and never looks inside them.

mod gemini;
mod huggingface;
mod ollama;
mod openai;
pub mod record;
pub mod retry;
mod transport;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{Error, Result};

pub use gemini::GeminiAdapter;
pub use huggingface::HuggingFaceAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiCompatibleAdapter;
pub use record::ResponseRecord;
pub use transport::{Auth, HttpTransport};

/// Per-call generation options forwarded to the adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Hard deadline for this call. Overrides the adapter's configured timeout.
    pub timeout: Option<Duration>,
}

/// Uniform generation capability over one backend.
///
/// Implementations must be safe to call concurrently; no per-call state may be
/// mutated beyond connection reuse inside the HTTP client.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Model identifier the adapter sends requests for.
    fn model(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> std::result::Result<ResponseRecord, ProviderError>;
}

/// Category of adapter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Auth,
    RateLimit,
    Timeout,
    Network,
    InvalidResponse,
    Unavailable,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderErrorKind::Auth => "authentication failed",
            ProviderErrorKind::RateLimit => "rate limited",
            ProviderErrorKind::Timeout => "timed out",
            ProviderErrorKind::Network => "network error",
            ProviderErrorKind::InvalidResponse => "invalid response",
            ProviderErrorKind::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// Typed failure of a single generation call.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    /// Wall-clock time spent before the call failed, when the adapter measured it.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_millis")]
    pub elapsed: Option<Duration>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            elapsed: None,
        }
    }

    /// Attach the measured duration of the failed call.
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    /// Whether a repeat of the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimit
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::Network
                | ProviderErrorKind::Unavailable
        )
    }
}

fn serialize_millis<S: serde::Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

/// Build the adapter described by `config`, sharing `client` for connection reuse.
///
/// Returns `Ok(None)` when the provider needs an API key and none was resolved
/// (a blank key counts as none); such providers cannot be registered.
pub fn build_adapter(
    config: &ProviderConfig,
    client: reqwest::Client,
) -> Result<Option<Arc<dyn ProviderAdapter>>> {
    let kind = config.kind();
    let has_key = config.api_key.as_ref().is_some_and(|key| !key.is_blank());
    if kind.requires_api_key() && !has_key {
        return Ok(None);
    }

    let transport = HttpTransport::new(client, config);
    let base_url = config.base_url().to_string();
    let model = config.model().to_string();

    let adapter: Arc<dyn ProviderAdapter> = match kind {
        ProviderKind::OpenAiCompatible => Arc::new(
            OpenAiCompatibleAdapter::new(transport, base_url, model)
                .with_api_key(config.api_key.clone()),
        ),
        ProviderKind::Ollama => Arc::new(OllamaAdapter::new(transport, base_url, model)),
        ProviderKind::Gemini => {
            let key = config.api_key.clone().ok_or_else(|| {
                Error::Internal(format!("Gemini provider '{}' has no API key", config.name))
            })?;
            Arc::new(GeminiAdapter::new(transport, base_url, model, key))
        }
        ProviderKind::HuggingFace => Arc::new(HuggingFaceAdapter::new(
            transport,
            base_url,
            model,
            config.api_key.clone(),
        )),
    };

    Ok(Some(adapter))
}
