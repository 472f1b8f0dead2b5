//! Scripted backend for tests and offline runs.
//!
//! Test seam; not part of public API stability guarantees.
//!
//! Queued responses are replayed in order, per channel (text and image).
//! When a queue is empty a strict backend fails the call; a canned backend
//! answers with deterministic content instead, so whole CLI flows can run
//! without network access.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::LlmError;
use crate::types::{
    ImageRequest, ImageResult, LlmBackend, LlmInvocation, LlmResult, TextOperation,
};

const PROVIDER: &str = "scripted";

/// Tiny payload used for canned images ("scripted" in base64)
pub const CANNED_IMAGE_URL: &str = "data:image/jpeg;base64,c2NyaXB0ZWQ=";

/// A call the backend received, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Text {
        operation: TextOperation,
        prompt: String,
    },
    Image {
        prompt: String,
    },
}

#[derive(Default)]
struct Script {
    text: VecDeque<Result<String, LlmError>>,
    images: VecDeque<Result<String, LlmError>>,
    calls: Vec<RecordedCall>,
}

pub struct ScriptedBackend {
    script: Mutex<Script>,
    canned: bool,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    /// Strict backend: an empty queue fails the call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            canned: false,
        }
    }

    /// Backend that falls back to deterministic content when a queue is empty.
    #[must_use]
    pub fn canned() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            canned: true,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a raw text reply (usually JSON).
    pub fn push_text(&self, raw: impl Into<String>) -> &Self {
        self.lock().text.push_back(Ok(raw.into()));
        self
    }

    /// Queue a JSON value as a text reply.
    pub fn push_json(&self, value: serde_json::Value) -> &Self {
        self.push_text(value.to_string())
    }

    pub fn push_text_error(&self, err: LlmError) -> &Self {
        self.lock().text.push_back(Err(err));
        self
    }

    pub fn push_image(&self, image_url: impl Into<String>) -> &Self {
        self.lock().images.push_back(Ok(image_url.into()));
        self
    }

    pub fn push_image_error(&self, err: LlmError) -> &Self {
        self.lock().images.push_back(Err(err));
        self
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Prompts of the image calls received so far.
    #[must_use]
    pub fn image_prompts(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Image { prompt } => Some(prompt.clone()),
                RecordedCall::Text { .. } => None,
            })
            .collect()
    }

    #[must_use]
    pub fn text_call_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::Text { .. }))
            .count()
    }

    fn canned_text(inv: &LlmInvocation) -> String {
        match inv.operation {
            TextOperation::InitialTheme => json!({
                "themeTitle": "Celestial Empires",
                "themeDescription": "Star-born dynasties wage war across a shattered sky.",
                "setName": "The Astral War",
                "factions": "The Solari Federation, The Void Cult",
                "locations": "The Glimmering Spire, The Obsidian Chasm",
                "resources": "Chrono-Shards, generated each turn, pay for cards and abilities."
            })
            .to_string(),
            TextOperation::GameSet => {
                let count = inv
                    .metadata
                    .get("card_count")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(3);
                let kinds = ["Creature", "Spell", "Artifact", "Environment"];
                let cards: Vec<_> = (0..count)
                    .map(|i| {
                        let kind = kinds[(i % 4) as usize];
                        let stat = if kind == "Creature" { 1 + (i % 5) } else { 0 };
                        json!({
                            "name": format!("Scripted {kind} {}", i + 1),
                            "type": kind,
                            "attack": stat,
                            "defense": stat,
                            "health": stat * 2,
                            "ability": format!("Scripted ability {}.", i + 1),
                            "imagePrompt": format!("scripted art {}", i + 1)
                        })
                    })
                    .collect();
                json!({
                    "rules": "# Rules\n\nDraw a card each turn. Reduce your opponent to 0 health to win.",
                    "cards": cards
                })
                .to_string()
            }
            TextOperation::CardText => json!({
                "attack": 2,
                "defense": 2,
                "health": 3,
                "ability": "Regenerated ability.",
                "imagePrompt": "regenerated art"
            })
            .to_string(),
        }
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let next = {
            let mut script = self.lock();
            script.calls.push(RecordedCall::Text {
                operation: inv.operation,
                prompt: inv
                    .messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            });
            script.text.pop_front()
        };

        let raw = match next {
            Some(reply) => reply?,
            None if self.canned => Self::canned_text(&inv),
            None => {
                return Err(LlmError::Transport(format!(
                    "scripted backend has no text reply queued for {}",
                    inv.operation
                )));
            }
        };

        Ok(LlmResult::new(raw, PROVIDER, inv.model))
    }

    async fn generate_image(&self, req: ImageRequest) -> Result<ImageResult, LlmError> {
        let next = {
            let mut script = self.lock();
            script.calls.push(RecordedCall::Image {
                prompt: req.prompt.clone(),
            });
            script.images.pop_front()
        };

        let image_url = match next {
            Some(reply) => reply?,
            None if self.canned => CANNED_IMAGE_URL.to_string(),
            None => {
                return Err(LlmError::Transport(
                    "scripted backend has no image reply queued".to_string(),
                ));
            }
        };

        Ok(ImageResult {
            image_url,
            provider: PROVIDER.to_string(),
            model_used: req.model,
        })
    }
}
