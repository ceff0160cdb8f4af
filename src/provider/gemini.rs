//! Google Gemini `generateContent` adapter.

use async_trait::async_trait;
use serde::Serialize;

use super::record::saturating_tokens;
use super::transport::{Auth, HttpTransport};
use super::{GenerateOptions, ProviderAdapter, ProviderError, ProviderErrorKind, ResponseRecord};
use crate::config::ApiKey;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiAdapter {
    transport: HttpTransport,
    base_url: String,
    model: String,
    api_key: ApiKey,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl GeminiAdapter {
    pub fn new(transport: HttpTransport, base_url: String, model: String, api_key: ApiKey) -> Self {
        Self {
            transport,
            base_url,
            model,
            api_key,
        }
    }
}

/// Concatenate every text part of the first candidate.
fn extract_candidate(
    response: &serde_json::Value,
) -> Result<(String, Option<u32>), ProviderError> {
    let parts = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::InvalidResponse,
                "Gemini response has no candidates[0].content.parts",
            )
        })?;

    let content: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    let tokens = response
        .get("usageMetadata")
        .and_then(|u| u.get("totalTokenCount"))
        .and_then(|t| t.as_u64())
        .map(saturating_tokens);

    Ok((content, tokens))
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ResponseRecord, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let generation_config = if options.max_tokens.is_some() || options.temperature.is_some() {
            Some(GenerationConfig {
                max_output_tokens: options.max_tokens,
                temperature: options.temperature,
            })
        } else {
            None
        };
        let body = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config,
        };

        let (response, latency) = self
            .transport
            .post_json(&url, Auth::Header(API_KEY_HEADER, &self.api_key), &body, options)
            .await?;
        let (content, tokens) =
            extract_candidate(&response).map_err(|e| e.with_elapsed(latency))?;

        Ok(self.transport.record(&self.model, content, latency, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_candidate_joins_parts() {
        let response = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Drink water. "}, {"text": "Rest."}]}
            }],
            "usageMetadata": {"totalTokenCount": 12}
        });
        let (content, tokens) = extract_candidate(&response).unwrap();
        assert_eq!(content, "Drink water. Rest.");
        assert_eq!(tokens, Some(12));
    }

    #[test]
    fn test_extract_candidate_blocked_prompt() {
        let response = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = extract_candidate(&response).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
    }
}
