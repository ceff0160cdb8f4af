//! Local Ollama adapter. No API key, no cost.

use async_trait::async_trait;
use serde::Serialize;

use super::record::saturating_tokens;
use super::transport::{Auth, HttpTransport};
use super::{GenerateOptions, ProviderAdapter, ProviderError, ProviderErrorKind, ResponseRecord};

pub struct OllamaAdapter {
    transport: HttpTransport,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateParams>,
}

#[derive(Serialize)]
struct GenerateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl OllamaAdapter {
    pub fn new(transport: HttpTransport, base_url: String, model: String) -> Self {
        Self {
            transport,
            base_url,
            model,
        }
    }
}

fn params(options: &GenerateOptions) -> Option<GenerateParams> {
    if options.max_tokens.is_none() && options.temperature.is_none() {
        return None;
    }
    Some(GenerateParams {
        num_predict: options.max_tokens,
        temperature: options.temperature,
    })
}

fn extract_generation(
    response: &serde_json::Value,
) -> Result<(String, Option<u32>), ProviderError> {
    let content = response
        .get("response")
        .and_then(|r| r.as_str())
        .ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::InvalidResponse,
                "Ollama response has no 'response' field",
            )
        })?;

    let count = |field: &str| response.get(field).and_then(|v| v.as_u64());
    let tokens = match (count("prompt_eval_count"), count("eval_count")) {
        (None, None) => None,
        (prompt, eval) => Some(saturating_tokens(
            prompt.unwrap_or(0).saturating_add(eval.unwrap_or(0)),
        )),
    };

    Ok((content.to_string(), tokens))
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<ResponseRecord, ProviderError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: params(options),
        };

        let (response, latency) = self
            .transport
            .post_json(&url, Auth::None, &body, options)
            .await
            .map_err(|mut e| {
                if e.kind == ProviderErrorKind::Unavailable {
                    e.message = format!("{} (is Ollama running at {}?)", e.message, self.base_url);
                }
                e
            })?;
        let (content, tokens) =
            extract_generation(&response).map_err(|e| e.with_elapsed(latency))?;

        Ok(self.transport.record(&self.model, content, latency, tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_generation_with_counts() {
        let response = json!({
            "model": "llama3",
            "response": "Walking is good.",
            "done": true,
            "prompt_eval_count": 10,
            "eval_count": 4
        });
        let (content, tokens) = extract_generation(&response).unwrap();
        assert_eq!(content, "Walking is good.");
        assert_eq!(tokens, Some(14));
    }

    #[test]
    fn test_extract_generation_huge_counts_saturate() {
        let response = json!({
            "response": "ok",
            "prompt_eval_count": u64::MAX,
            "eval_count": 5_000_000_000u64
        });
        let (_, tokens) = extract_generation(&response).unwrap();
        assert_eq!(tokens, Some(u32::MAX));
    }

    #[test]
    fn test_extract_generation_without_counts() {
        let (_, tokens) = extract_generation(&json!({"response": "ok"})).unwrap();
        assert_eq!(tokens, None);
    }

    #[test]
    fn test_extract_generation_missing_response() {
        let err = extract_generation(&json!({"done": true})).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse);
    }

    #[test]
    fn test_params_omitted_when_unset() {
        assert!(params(&GenerateOptions::default()).is_none());
        let p = params(&GenerateOptions {
            max_tokens: Some(128),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(p.num_predict, Some(128));
    }
}
