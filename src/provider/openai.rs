//! OpenAI-compatible chat completion adapter (Groq, OpenRouter).

use async_trait::async_trait;
use serde::Serialize;

use super::record::saturating_tokens;
use super::transport::{Auth, HttpTransport};
use super::{GenerateOptions, ProviderAdapter, ProviderError, ProviderErrorKind, ResponseRecord};
use crate::config::ApiKey;

/// Adapter for any endpoint speaking the OpenAI `/chat/completions` protocol.
pub struct OpenAiCompatibleAdapter {
    transport: HttpTransport,
    base_url: String,
    model: String,
    api_key: Option<ApiKey>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl OpenAiCompatibleAdapter {
    pub fn new(transport: HttpTransport, base_url: String, model: String) -> Self {
        Self {
            transport,
            base_url,
            model,
            api_key: None,
        }
    }

    /// Send `Authorization: Bearer <key>` on every request.
    pub fn with_api_key(mut self, api_key: Option<ApiKey>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// Pull `choices[0].message.content` and `usage.total_tokens` out of a response.
fn extract_completion(
    response: &serde_json::Value,
) -> Result<(String, Option<u32>), ProviderError> {
    let content = response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::InvalidResponse,
                "Response has no choices[0].message.content",
            )
        })?;

    let total_tokens = response
        .get("usage")
        .and_then(|u| u.get("total_tokens"))
        .and_then(|t| t.as_u64())
        .map(saturating_tokens);

    Ok((content.to_string(), total_tokens))
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ResponseRecord, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let (response, latency) = self
            .transport
            .post_json(&url, Auth::from(self.api_key.as_ref()), &body, options)
            .await?;
        let (content, tokens) =
            extract_completion(&response).map_err(|e| e.with_elapsed(latency))?;

        Ok(self.transport.record(&self.model, content, latency, tokens))
    }
}
