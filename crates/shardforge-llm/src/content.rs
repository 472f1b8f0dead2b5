//! Prompt, schema and response layer for card-game content.
//!
//! [`ContentClient`] turns each content operation into one backend call with a
//! response schema, then parses the reply into a draft type. Anything that
//! does not match the draft (missing fields, wrong types, empty card list) is
//! a `MalformedResponse`; partial results are never returned.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::LlmError;
use crate::types::{ImageRequest, LlmBackend, LlmInvocation, Message, TextOperation};

/// Default per-call timeout when none is configured
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Card type names the service may return
pub const CARD_TYPES: &[&str] = &["Creature", "Spell", "Artifact", "Environment"];

/// A generated theme concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDraft {
    pub theme_title: String,
    pub theme_description: String,
    pub set_name: String,
    pub factions: String,
    pub locations: String,
    pub resources: String,
}

/// The world description sent with set and card requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeBrief {
    pub description: String,
    pub factions: String,
    pub locations: String,
    pub resources: String,
}

/// A generated card before it gets an id and image state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub attack: u32,
    pub defense: u32,
    pub health: u32,
    pub ability: String,
    pub image_prompt: String,
}

/// A generated rulebook and card list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetDraft {
    pub rules: String,
    pub cards: Vec<CardDraft>,
}

/// Replacement text for an existing card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTextDraft {
    pub attack: u32,
    pub defense: u32,
    pub health: u32,
    pub ability: String,
    pub image_prompt: String,
}

/// Compose the full card-art prompt from a card's image prompt.
#[must_use]
pub fn card_art_prompt(image_prompt: &str, theme_title: &str) -> String {
    format!(
        "{image_prompt}, in the art style of a modern trading card game, theme of {theme_title}."
    )
}

/// Issues content operations against a generation backend.
#[derive(Clone)]
pub struct ContentClient {
    backend: Arc<dyn LlmBackend>,
    text_model: String,
    image_model: String,
    timeout: Duration,
}

impl ContentClient {
    /// Client using the backend's default models.
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            text_model: String::new(),
            image_model: String::new(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_models(mut self, text_model: impl Into<String>, image_model: impl Into<String>) -> Self {
        self.text_model = text_model.into();
        self.image_model = image_model.into();
        self
    }

    /// Invent a theme concept from nothing.
    pub async fn initial_theme(&self) -> Result<ThemeDraft, LlmError> {
        let prompt = "You are a creative world-builder and game designer. Invent a compelling and \
            unique concept for a new trading card game. Provide a theme title, a detailed theme \
            description, a name for the first card set, two or more distinct factions, two or \
            more key locations in the world, and a description of the primary resource system \
            used to play cards. Respond with a single JSON object that follows the schema. Be \
            creative and evocative.";

        let draft: ThemeDraft = self
            .structured(TextOperation::InitialTheme, prompt.to_string(), theme_schema(), None)
            .await?;

        let fields = [
            ("themeTitle", &draft.theme_title),
            ("themeDescription", &draft.theme_description),
            ("setName", &draft.set_name),
            ("factions", &draft.factions),
            ("locations", &draft.locations),
            ("resources", &draft.resources),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(LlmError::MalformedResponse(format!(
                "theme field '{name}' is empty"
            )));
        }

        Ok(draft)
    }

    /// Generate a rulebook and exactly `card_count` cards for the brief.
    pub async fn game_set(&self, brief: &ThemeBrief, card_count: u32) -> Result<SetDraft, LlmError> {
        let prompt = format!(
            "You are an expert trading card game designer. Create a complete and playable TCG \
             based on this world concept.\n\n\
             **Theme Description:** {}\n\
             **Factions:** {}\n\
             **Key Locations:** {}\n\
             **Resource System:** {}\n\n\
             Respond with a single JSON object that follows the schema.\n\n\
             1. **Rules:** A clear, concise ruleset that integrates the world concept. Cover \
             objective, setup, turn structure, card types, combat, and how to use the resource \
             system ({}). Format with markdown.\n\n\
             2. **Cards:** Exactly {} unique and balanced cards for a starter set. Each card's \
             type is one of Creature, Spell, Artifact or Environment; non-creatures have 0 \
             attack, defense and health. Cards belong to the factions and reflect the \
             locations and lore. Abilities are concise and clear. Image prompts are evocative \
             and match the card's name and theme.",
            brief.description,
            brief.factions,
            brief.locations,
            brief.resources,
            brief.resources,
            card_count
        );

        let draft: SetDraft = self
            .structured(
                TextOperation::GameSet,
                prompt,
                game_set_schema(card_count),
                Some(card_count),
            )
            .await?;

        if draft.rules.trim().is_empty() {
            return Err(LlmError::MalformedResponse("rules text is empty".to_string()));
        }
        if draft.cards.is_empty() {
            return Err(LlmError::MalformedResponse("card list is empty".to_string()));
        }
        if let Some(card) = draft.cards.iter().find(|c| c.name.trim().is_empty()) {
            return Err(LlmError::MalformedResponse(format!(
                "card with ability '{}' has no name",
                card.ability
            )));
        }
        if draft.cards.len() != card_count as usize {
            debug!(
                requested = card_count,
                received = draft.cards.len(),
                "Service returned a different number of cards than requested"
            );
        }

        Ok(draft)
    }

    /// Produce new stats, ability and image prompt for an existing card.
    pub async fn card_text(
        &self,
        brief: &ThemeBrief,
        card_name: &str,
        card_type: &str,
    ) -> Result<CardTextDraft, LlmError> {
        let prompt = format!(
            "You are a TCG designer refreshing a card design for a game with this theme:\n\
             **Theme Description:** {}\n\
             **Factions:** {}\n\
             **Key Locations:** {}\n\
             **Resource System:** {}\n\n\
             Regenerate the stats (attack, defense, health) and ability for the card named \
             \"{}\", which is a \"{}\" type. Provide a new, balanced set of stats, a new clear \
             and concise ability that fits the world, and a new image prompt. Offer a different \
             take on the same core card concept while respecting the established lore.",
            brief.description, brief.factions, brief.locations, brief.resources, card_name, card_type
        );

        let draft: CardTextDraft = self
            .structured(TextOperation::CardText, prompt, card_text_schema(), None)
            .await?;

        if draft.ability.trim().is_empty() || draft.image_prompt.trim().is_empty() {
            return Err(LlmError::MalformedResponse(
                "regenerated card is missing its ability or image prompt".to_string(),
            ));
        }

        Ok(draft)
    }

    /// Generate card art; returns an image reference (data URL).
    pub async fn card_image(&self, image_prompt: &str, theme_title: &str) -> Result<String, LlmError> {
        let request = ImageRequest::card_art(
            card_art_prompt(image_prompt, theme_title),
            self.image_model.clone(),
            self.timeout,
        );
        let result = self.backend.generate_image(request).await?;
        Ok(result.image_url)
    }

    async fn structured<T: serde::de::DeserializeOwned>(
        &self,
        operation: TextOperation,
        prompt: String,
        schema: Value,
        card_count: Option<u32>,
    ) -> Result<T, LlmError> {
        let mut inv = LlmInvocation::new(
            operation,
            self.text_model.clone(),
            self.timeout,
            vec![Message::user(prompt)],
        )
        .with_response_schema(schema);
        if let Some(count) = card_count {
            inv = inv.with_metadata("card_count", json!(count));
        }

        let result = self.backend.invoke(inv).await?;

        debug!(
            operation = %operation,
            provider = %result.provider,
            model = %result.model_used,
            bytes = result.raw_response.len(),
            "Parsing structured response"
        );

        parse_json(&result.raw_response)
    }
}

/// Parse a JSON reply, tolerating a surrounding markdown code fence.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
        .map_err(|e| LlmError::MalformedResponse(format!("response does not match schema: {e}")))
}

fn theme_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "themeTitle": {"type": "STRING", "description": "A catchy title for the TCG theme, e.g. 'Celestial Empires'."},
            "themeDescription": {"type": "STRING", "description": "A paragraph describing the game's world, conflict, and overall feel."},
            "setName": {"type": "STRING", "description": "A name for the first card set, e.g. 'The Astral War'."},
            "factions": {"type": "STRING", "description": "A comma-separated list of at least two distinct factions."},
            "locations": {"type": "STRING", "description": "A comma-separated list of at least two key locations."},
            "resources": {"type": "STRING", "description": "A description of the primary resource system."}
        },
        "required": ["themeTitle", "themeDescription", "setName", "factions", "locations", "resources"]
    })
}

fn card_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": {"type": "STRING", "description": "The name of the card."},
            "type": {"type": "STRING", "format": "enum", "enum": CARD_TYPES, "description": "The type of card."},
            "attack": {"type": "INTEGER", "description": "Attack power. 0 for non-creatures."},
            "defense": {"type": "INTEGER", "description": "Defense value. 0 for non-creatures."},
            "health": {"type": "INTEGER", "description": "Health points. 0 for non-creatures."},
            "ability": {"type": "STRING", "description": "A brief, clear description of the card's special ability."},
            "imagePrompt": {"type": "STRING", "description": "A visually descriptive prompt for an AI image generator to create card art."}
        },
        "required": ["name", "type", "attack", "defense", "health", "ability", "imagePrompt"]
    })
}

fn game_set_schema(card_count: u32) -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "rules": {
                "type": "STRING",
                "description": "A complete rulebook covering setup, turn structure, card types, combat, and win conditions. Format with markdown."
            },
            "cards": {
                "type": "ARRAY",
                "description": format!("An array of {card_count} unique and balanced cards for a starter set."),
                "items": card_schema()
            }
        },
        "required": ["rules", "cards"]
    })
}

fn card_text_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "attack": {"type": "INTEGER", "description": "A new, balanced attack power."},
            "defense": {"type": "INTEGER", "description": "A new, balanced defense value."},
            "health": {"type": "INTEGER", "description": "A new, balanced health value."},
            "ability": {"type": "STRING", "description": "A new, brief, clear description of the card's special ability."},
            "imagePrompt": {"type": "STRING", "description": "A new, visually descriptive prompt for the card art."}
        },
        "required": ["attack", "defense", "health", "ability", "imagePrompt"]
    })
}
