//! Gemini REST client.
//!
//! Talks to the Generative Language API directly with `reqwest`:
//! `embedContent` for both retrieval modes, `generateContent` for answers
//! and the paginated `models` listing for fallback discovery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ProviderError;
use super::provider::LlmProvider;
use super::types::{normalize_model_name, EmbeddingMode, GenerationOutcome, ProviderModel};
use crate::core::config::GeminiConfig;

const BLOCKING_FINISH_REASONS: [&str; 4] = ["SAFETY", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    embedding_model: String,
    has_api_key: bool,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty());
        if let Some(key) = api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| ProviderError::Transport(format!("invalid API key header: {}", e)))?;
            headers.insert(HeaderName::from_static("x-goog-api-key"), value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let mut base_url = config.base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            embedding_model: config.embedding_model.clone(),
            has_api_key: api_key.is_some(),
        })
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!(
            "{}models/{}:{}",
            self.base_url,
            normalize_model_name(model),
            action
        )
    }

    fn ensure_key(&self) -> Result<(), ProviderError> {
        if self.has_api_key {
            Ok(())
        } else {
            Err(ProviderError::MissingApiKey)
        }
    }

    async fn check_response(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => ProviderError::Unavailable(body),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(body),
            _ => ProviderError::Request {
                status: status.as_u16(),
                message: body,
            },
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Maps a decoded `generateContent` body onto a [`GenerationOutcome`].
pub(crate) fn outcome_from_response(response: GenerateContentResponse) -> GenerationOutcome {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return GenerationOutcome::Blocked { reason };
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return GenerationOutcome::Empty;
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return GenerationOutcome::Text(text);
    }

    match candidate.finish_reason {
        Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) => {
            GenerationOutcome::Blocked { reason }
        }
        _ => GenerationOutcome::Empty,
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, ProviderError> {
        self.ensure_key()?;
        let url = self.model_url(&self.embedding_model, "embedContent");
        let body = EmbedContentRequest {
            model: format!("models/{}", normalize_model_name(&self.embedding_model)),
            content: Content {
                role: None,
                parts: vec![TextPart { text }],
            },
            task_type: mode.task_type(),
        };

        debug!(text_len = text.len(), task_type = mode.task_type(), "embedding text");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let response = Self::check_response(response).await?;
        let payload: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(payload.embedding.map(|e| e.values).unwrap_or_default())
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<GenerationOutcome, ProviderError> {
        self.ensure_key()?;
        let url = self.model_url(model, "generateContent");
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![TextPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let response = Self::check_response(response).await?;
        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(outcome_from_response(payload))
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ProviderError> {
        self.ensure_key()?;
        let url = format!("{}models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?;
            let response = Self::check_response(response).await?;
            let page: ListModelsResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::Decode(e.to_string()))?;

            models.extend(page.models.into_iter().map(|info| ProviderModel {
                supports_generation: info
                    .supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent"),
                name: info.name,
            }));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GenerationOutcome {
        let response: GenerateContentResponse = serde_json::from_value(value).unwrap();
        outcome_from_response(response)
    }

    #[test]
    fn text_parts_are_concatenated() {
        let outcome = parse(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello, "}, {"text": "counsel."}], "role": "model"},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(outcome, GenerationOutcome::Text("Hello, counsel.".to_string()));
    }

    #[test]
    fn prompt_block_reason_is_blocked() {
        let outcome = parse(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
        assert_eq!(
            outcome,
            GenerationOutcome::Blocked {
                reason: "SAFETY".to_string()
            }
        );
    }

    #[test]
    fn safety_finish_without_text_is_blocked() {
        let outcome = parse(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }));
        assert!(matches!(outcome, GenerationOutcome::Blocked { .. }));
    }

    #[test]
    fn no_candidates_is_empty() {
        assert_eq!(parse(json!({"candidates": []})), GenerationOutcome::Empty);
        assert_eq!(parse(json!({})), GenerationOutcome::Empty);
    }

    #[test]
    fn stop_without_text_is_empty() {
        let outcome = parse(json!({
            "candidates": [{"content": {"parts": []}, "finishReason": "STOP"}]
        }));
        assert_eq!(outcome, GenerationOutcome::Empty);
    }

    #[test]
    fn model_urls_strip_resource_prefix() {
        let provider = GeminiProvider::new(&GeminiConfig {
            base_url: "https://example.test/v1beta".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();

        assert_eq!(
            provider.model_url("models/gemini-pro", "generateContent"),
            "https://example.test/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let provider = GeminiProvider::new(&GeminiConfig::default()).unwrap();
        let err = provider
            .embed("text", EmbeddingMode::Document)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));
    }
}
