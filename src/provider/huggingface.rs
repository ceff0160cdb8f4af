//! Hugging Face Inference API adapter.

use async_trait::async_trait;
use serde::Serialize;

use super::transport::{Auth, HttpTransport};
use super::{GenerateOptions, ProviderAdapter, ProviderError, ProviderErrorKind, ResponseRecord};
use crate::config::ApiKey;

const DEFAULT_MAX_NEW_TOKENS: u32 = 512;
const DEFAULT_TEMPERATURE: f32 = 0.7;

pub struct HuggingFaceAdapter {
    transport: HttpTransport,
    base_url: String,
    model: String,
    api_key: Option<ApiKey>,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParams,
}

#[derive(Serialize)]
struct InferenceParams {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

impl HuggingFaceAdapter {
    pub fn new(
        transport: HttpTransport,
        base_url: String,
        model: String,
        api_key: Option<ApiKey>,
    ) -> Self {
        Self {
            transport,
            base_url,
            model,
            api_key,
        }
    }
}

/// The API answers with either `[{"generated_text": ..}]` or `{"generated_text": ..}`.
fn extract_generated_text(response: &serde_json::Value) -> Result<String, ProviderError> {
    let entry = match response {
        serde_json::Value::Array(items) => items.first(),
        other => Some(other),
    };

    entry
        .and_then(|e| e.get("generated_text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::InvalidResponse,
                "Response has no generated_text",
            )
        })
}

#[async_trait]
impl ProviderAdapter for HuggingFaceAdapter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ResponseRecord, ProviderError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), self.model);
        let body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParams {
                max_new_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_NEW_TOKENS),
                temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                return_full_text: false,
            },
        };

        let (response, latency) = self
            .transport
            .post_json(&url, Auth::from(self.api_key.as_ref()), &body, options)
            .await?;
        let content = extract_generated_text(&response).map_err(|e| e.with_elapsed(latency))?;

        Ok(self.transport.record(&self.model, content, latency, None))
    }
}
