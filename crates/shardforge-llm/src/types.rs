//! Core types for the generation backend abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions
    System,
    /// User input
    User,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Structured-text operations issued by the content layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOperation {
    InitialTheme,
    GameSet,
    CardText,
}

impl TextOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitialTheme => "initial_theme",
            Self::GameSet => "game_set",
            Self::CardText => "card_text",
        }
    }
}

impl std::fmt::Display for TextOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to a structured text generation call
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Which content operation this call serves
    pub operation: TextOperation,
    /// Model to use for this invocation; empty means the backend default
    pub model: String,
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    /// JSON schema the response must follow
    pub response_schema: Option<serde_json::Value>,
    /// Provider-specific metadata (e.g., temperature, card_count)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(
        operation: TextOperation,
        model: impl Into<String>,
        timeout: Duration,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            operation,
            model: model.into(),
            timeout,
            messages,
            response_schema: None,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Result from a text generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw response text (JSON when a schema was requested)
    pub raw_response: String,
    /// Provider name (e.g., "gemini", "scripted")
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }
}

/// Input to an image generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Fully composed prompt
    pub prompt: String,
    /// Model to use; empty means the backend default
    pub model: String,
    pub aspect_ratio: String,
    pub mime_type: String,
    pub timeout: Duration,
}

impl ImageRequest {
    /// Card art request: one 3:4 JPEG.
    #[must_use]
    pub fn card_art(prompt: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            aspect_ratio: "3:4".to_string(),
            mime_type: "image/jpeg".to_string(),
            timeout,
        }
    }
}

/// Result from an image generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    /// `data:<mime>;base64,<bytes>` URL
    pub image_url: String,
    pub provider: String,
    pub model_used: String,
}

/// Build a `data:` URL from a MIME type and base64 payload.
#[must_use]
pub fn data_url(mime_type: &str, base64_bytes: &str) -> String {
    format!("data:{mime_type};base64,{base64_bytes}")
}

/// Trait for generation backend implementations
///
/// Every provider implements both structured text and image generation so the
/// orchestrator can work with any provider without knowing its wire format.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate structured text.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for transport failures, provider errors (auth,
    /// rate limits, outages), timeouts, and responses without usable text.
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;

    /// Generate a single image.
    ///
    /// Implementations must not retry internally: a rate-limited image call
    /// has to surface immediately so the caller can stop its pass.
    async fn generate_image(&self, req: ImageRequest) -> Result<ImageResult, LlmError>;
}
