//! Gemini REST backend
//!
//! Text goes through `models/{model}:generateContent` with a JSON response
//! schema; card art goes through `models/{image_model}:predict` (Imagen).
//! The API key travels in the `x-goog-api-key` header, never the URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::LlmError;
use crate::http_client::{HttpClient, RetryPolicy};
use crate::types::{
    ImageRequest, ImageResult, LlmBackend, LlmInvocation, LlmResult, Role, data_url,
};
use shardforge_config::Config;

const PROVIDER: &str = "gemini";

#[derive(Clone)]
pub(crate) struct GeminiBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
}

impl GeminiBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(
        api_key: String,
        base_url: String,
        text_model: String,
        image_model: String,
        max_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = HttpClient::with_max_timeout(max_timeout)?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            text_model,
            image_model,
        })
    }

    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key environment
    /// variable is unset or empty, or the HTTP client cannot be constructed
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let gemini = config.gemini();

        let api_key = std::env::var(&gemini.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Misconfiguration(format!(
                    "Gemini API key not found in environment variable '{}'. \
                     Please set this variable or configure a different api_key_env in [llm.gemini].",
                    gemini.api_key_env
                ))
            })?;

        Self::new(
            api_key,
            gemini.base_url,
            gemini.text_model,
            gemini.image_model,
            Duration::from_secs(gemini.timeout_secs),
        )
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn build_text_request(inv: &LlmInvocation) -> GenerateContentRequest {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in &inv.messages {
            match msg.role {
                Role::System => system_parts.push(Part {
                    text: msg.content.clone(),
                }),
                Role::User => contents.push(Content {
                    role: "user".to_string(),
                    parts: vec![Part {
                        text: msg.content.clone(),
                    }],
                }),
            }
        }

        let temperature = inv
            .metadata
            .get("temperature")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32);

        GenerateContentRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then_some(SystemInstruction {
                parts: system_parts,
            }),
            generation_config: GenerationConfig {
                response_mime_type: inv
                    .response_schema
                    .as_ref()
                    .map(|_| "application/json".to_string()),
                response_schema: inv.response_schema.clone(),
                temperature,
            },
        }
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let model = if inv.model.is_empty() {
            self.text_model.clone()
        } else {
            inv.model.clone()
        };

        debug!(
            provider = PROVIDER,
            model = %model,
            operation = %inv.operation,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Gemini text model"
        );

        let body = Self::build_text_request(&inv);
        let request = self
            .client
            .post(&self.endpoint(&model, "generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, PROVIDER, RetryPolicy::TEXT)
            .await?;

        let response_body: GenerateContentResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = response_body.text().ok_or_else(|| {
            let reason = response_body
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .unwrap_or_else(|| "no text in candidates[0]".to_string());
            LlmError::MalformedResponse(format!("Gemini returned no content: {reason}"))
        })?;

        let mut result = LlmResult::new(text.trim(), PROVIDER, model);
        if let Some(usage) = response_body.usage_metadata {
            result = result.with_tokens(
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
            );
        }

        debug!(
            provider = PROVIDER,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Gemini text invocation completed"
        );

        Ok(result)
    }

    async fn generate_image(&self, req: ImageRequest) -> Result<ImageResult, LlmError> {
        let model = if req.model.is_empty() {
            self.image_model.clone()
        } else {
            req.model.clone()
        };

        debug!(
            provider = PROVIDER,
            model = %model,
            aspect_ratio = %req.aspect_ratio,
            "Invoking Gemini image model"
        );

        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: req.prompt.clone(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: req.aspect_ratio.clone(),
                output_mime_type: req.mime_type.clone(),
            },
        };

        let request = self
            .client
            .post(&self.endpoint(&model, "predict"))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let response = self
            .client
            .execute_with_retry(request, req.timeout, PROVIDER, RetryPolicy::NONE)
            .await?;

        let response_body: PredictResponse = response.json().await.map_err(|e| {
            LlmError::MalformedResponse(format!("Failed to parse Imagen response: {}", e))
        })?;

        let prediction = response_body
            .predictions
            .into_iter()
            .find(|p| p.bytes_base64_encoded.as_deref().is_some_and(|b| !b.is_empty()))
            .ok_or_else(|| {
                LlmError::MalformedResponse(
                    "Imagen returned no image (the prompt may have been filtered)".to_string(),
                )
            })?;

        let mime_type = prediction.mime_type.unwrap_or_else(|| req.mime_type.clone());
        let bytes = prediction.bytes_base64_encoded.unwrap_or_default();

        Ok(ImageResult {
            image_url: data_url(&mime_type, &bytes),
            provider: PROVIDER.to_string(),
            model_used: model,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if any.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Clone, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
    output_mime_type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}
