//! Game data: theme, cards and the generated set.
//!
//! A card's kind is a tagged variant so that stats only exist on creatures.
//! On the wire (session file and JSON export) a card is the flat record
//! `{id, name, type, attack, defense, health, ability, imagePrompt, imageUrl?,
//! imageState}` with zero stats for non-creatures.

use serde::{Deserialize, Serialize};
use shardforge_llm::{CardDraft, LlmError, ThemeBrief, ThemeDraft};
use shardforge_utils::error::{ForgeError, ValidationError};
use std::fmt;
use uuid::Uuid;

/// The world a set is generated for. Every field must be filled in before generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Theme {
    pub title: String,
    pub description: String,
    pub set_name: String,
    pub factions: String,
    pub locations: String,
    pub resources: String,
}

impl Theme {
    /// Check that no field is blank.
    ///
    /// # Errors
    ///
    /// `ValidationError::MissingField` naming the first blank field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields: [(&'static str, &str); 6] = [
            ("title", &self.title),
            ("description", &self.description),
            ("set name", &self.set_name),
            ("factions", &self.factions),
            ("locations", &self.locations),
            ("resources", &self.resources),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ValidationError::MissingField { field: *field }),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// World context sent with set and card-text requests.
    #[must_use]
    pub fn brief(&self) -> ThemeBrief {
        ThemeBrief {
            description: self.description.clone(),
            factions: self.factions.clone(),
            locations: self.locations.clone(),
            resources: self.resources.clone(),
        }
    }
}

impl From<ThemeDraft> for Theme {
    fn from(draft: ThemeDraft) -> Self {
        Self {
            title: draft.theme_title,
            description: draft.theme_description,
            set_name: draft.set_name,
            factions: draft.factions,
            locations: draft.locations,
            resources: draft.resources,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreatureStats {
    pub attack: u32,
    pub defense: u32,
    pub health: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Creature(CreatureStats),
    Spell,
    Artifact,
    Environment,
}

impl CardKind {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Creature(_) => "Creature",
            Self::Spell => "Spell",
            Self::Artifact => "Artifact",
            Self::Environment => "Environment",
        }
    }

    /// Build a kind from its type name; stats are dropped for non-creatures.
    ///
    /// Returns `None` for a type outside the closed set.
    #[must_use]
    pub fn from_parts(type_name: &str, attack: u32, defense: u32, health: u32) -> Option<Self> {
        match type_name {
            "Creature" => Some(Self::Creature(CreatureStats {
                attack,
                defense,
                health,
            })),
            "Spell" => Some(Self::Spell),
            "Artifact" => Some(Self::Artifact),
            "Environment" => Some(Self::Environment),
            _ => None,
        }
    }

    #[must_use]
    pub fn stats(&self) -> Option<CreatureStats> {
        match self {
            Self::Creature(stats) => Some(*stats),
            _ => None,
        }
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Status of a card's most recent image attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageState {
    #[default]
    Pending,
    Loading,
    Success,
    Error,
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CardRecord", into = "CardRecord")]
pub struct Card {
    pub id: Uuid,
    pub name: String,
    pub kind: CardKind,
    pub ability: String,
    pub image_prompt: String,
    pub image_url: Option<String>,
    pub image_state: ImageState,
}

impl Card {
    /// Turn a generated draft into a card with a fresh id and a pending image.
    ///
    /// # Errors
    ///
    /// `LlmError::MalformedResponse` when the draft's type is not one of the
    /// four card types.
    pub fn from_draft(draft: CardDraft) -> Result<Self, LlmError> {
        let kind = CardKind::from_parts(&draft.card_type, draft.attack, draft.defense, draft.health)
            .ok_or_else(|| {
                LlmError::MalformedResponse(format!(
                    "card '{}' has unknown type '{}'",
                    draft.name, draft.card_type
                ))
            })?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: draft.name,
            kind,
            ability: draft.ability,
            image_prompt: draft.image_prompt,
            image_url: None,
            image_state: ImageState::Pending,
        })
    }

    /// Short id used in listings.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardRecord {
    id: Uuid,
    name: String,
    #[serde(rename = "type")]
    card_type: String,
    #[serde(default)]
    attack: u32,
    #[serde(default)]
    defense: u32,
    #[serde(default)]
    health: u32,
    ability: String,
    image_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(default)]
    image_state: ImageState,
}

impl TryFrom<CardRecord> for Card {
    type Error = String;

    fn try_from(record: CardRecord) -> Result<Self, Self::Error> {
        let kind = CardKind::from_parts(&record.card_type, record.attack, record.defense, record.health)
            .ok_or_else(|| format!("unknown card type '{}'", record.card_type))?;
        Ok(Self {
            id: record.id,
            name: record.name,
            kind,
            ability: record.ability,
            image_prompt: record.image_prompt,
            image_url: record.image_url,
            image_state: record.image_state,
        })
    }
}

impl From<Card> for CardRecord {
    fn from(card: Card) -> Self {
        let stats = card.kind.stats().unwrap_or_default();
        Self {
            id: card.id,
            name: card.name,
            card_type: card.kind.type_name().to_string(),
            attack: stats.attack,
            defense: stats.defense,
            health: stats.health,
            ability: card.ability,
            image_prompt: card.image_prompt,
            image_url: card.image_url,
            image_state: card.image_state,
        }
    }
}

/// A generated rulebook and its ordered cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSet {
    pub set_name: String,
    pub rules: String,
    pub cards: Vec<Card>,
}

impl GameSet {
    /// True when there is nothing to export: no rules or no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.trim().is_empty() || self.cards.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Locate a card by full id or by an unambiguous id prefix.
    ///
    /// # Errors
    ///
    /// `ForgeError::CardNotFound` when nothing matches or a prefix matches
    /// more than one card.
    pub fn index_of(&self, id: &str) -> Result<usize, ForgeError> {
        let needle = id.trim().to_ascii_lowercase();
        let not_found = || ForgeError::CardNotFound { id: id.to_string() };
        if needle.is_empty() {
            return Err(not_found());
        }

        if let Some(index) = self
            .cards
            .iter()
            .position(|c| c.id.to_string() == needle || c.id.simple().to_string() == needle)
        {
            return Ok(index);
        }

        let mut matches = self
            .cards
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.id.to_string().starts_with(&needle) || c.id.simple().to_string().starts_with(&needle)
            })
            .map(|(i, _)| i);
        match (matches.next(), matches.next()) {
            (Some(index), None) => Ok(index),
            _ => Err(not_found()),
        }
    }

    /// # Errors
    ///
    /// See [`GameSet::index_of`].
    pub fn card(&self, id: &str) -> Result<&Card, ForgeError> {
        let index = self.index_of(id)?;
        Ok(&self.cards[index])
    }

    #[must_use]
    pub fn count_by_state(&self, state: ImageState) -> usize {
        self.cards.iter().filter(|c| c.image_state == state).count()
    }
}

/// Everything the CLI keeps between commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub theme: Theme,
    pub game: GameSet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filled_theme() -> Theme {
        Theme {
            title: "Celestial Empires".into(),
            description: "Star-born dynasties.".into(),
            set_name: "The Astral War".into(),
            factions: "Solari, Void Cult".into(),
            locations: "The Spire".into(),
            resources: "Chrono-Shards".into(),
        }
    }

    fn creature(name: &str) -> Card {
        Card::from_draft(CardDraft {
            name: name.to_string(),
            card_type: "Creature".into(),
            attack: 3,
            defense: 2,
            health: 4,
            ability: "Flying.".into(),
            image_prompt: "a dragon".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_theme_validation_names_blank_field() {
        let mut theme = filled_theme();
        assert!(theme.validate().is_ok());

        theme.locations = "   ".into();
        assert_eq!(
            theme.validate().unwrap_err(),
            ValidationError::MissingField { field: "locations" }
        );
    }

    #[test]
    fn test_theme_from_draft_maps_fields() {
        let draft: ThemeDraft = serde_json::from_value(json!({
            "themeTitle": "T", "themeDescription": "D", "setName": "S",
            "factions": "F", "locations": "L", "resources": "R"
        }))
        .unwrap();
        let theme = Theme::from(draft);
        assert_eq!(theme.title, "T");
        assert_eq!(theme.set_name, "S");
        assert_eq!(theme.brief().resources, "R");
    }

    #[test]
    fn test_from_draft_drops_stats_for_non_creatures() {
        let card = Card::from_draft(CardDraft {
            name: "Bolt".into(),
            card_type: "Spell".into(),
            attack: 9,
            defense: 9,
            health: 9,
            ability: "Deal 3.".into(),
            image_prompt: "lightning".into(),
        })
        .unwrap();

        assert_eq!(card.kind, CardKind::Spell);
        assert_eq!(card.image_state, ImageState::Pending);
        assert!(card.image_url.is_none());
    }

    #[test]
    fn test_from_draft_rejects_unknown_type() {
        let err = Card::from_draft(CardDraft {
            name: "Odd".into(),
            card_type: "Land".into(),
            attack: 0,
            defense: 0,
            health: 0,
            ability: "".into(),
            image_prompt: "".into(),
        })
        .unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[test]
    fn test_card_wire_form_is_flat() {
        let mut card = creature("Drake");
        card.image_state = ImageState::Success;
        card.image_url = Some("data:image/jpeg;base64,AAAA".into());

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["type"], "Creature");
        assert_eq!(value["attack"], 3);
        assert_eq!(value["imagePrompt"], "a dragon");
        assert_eq!(value["imageState"], "success");
        assert_eq!(value["imageUrl"], "data:image/jpeg;base64,AAAA");

        let back: Card = serde_json::from_value(value).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn test_non_creature_serializes_zero_stats_without_url() {
        let mut card = creature("Relic");
        card.kind = CardKind::Artifact;

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["attack"], 0);
        assert_eq!(value["health"], 0);
        assert!(value.get("imageUrl").is_none());
        assert_eq!(value["imageState"], "pending");
    }

    #[test]
    fn test_deserialize_rejects_unknown_type() {
        let value = json!({
            "id": Uuid::new_v4(), "name": "X", "type": "Planeswalker",
            "attack": 0, "defense": 0, "health": 0,
            "ability": "a", "imagePrompt": "p", "imageState": "pending"
        });
        let err = serde_json::from_value::<Card>(value).unwrap_err();
        assert!(err.to_string().contains("Planeswalker"));
    }

    #[test]
    fn test_game_set_is_empty() {
        let mut game = GameSet::default();
        assert!(game.is_empty());

        game.rules = "# Rules".into();
        assert!(game.is_empty());

        game.cards.push(creature("A"));
        assert!(!game.is_empty());

        game.clear();
        assert!(game.is_empty());
    }

    #[test]
    fn test_index_of_accepts_full_id_and_unique_prefix() {
        let game = GameSet {
            set_name: "S".into(),
            rules: "R".into(),
            cards: vec![creature("A"), creature("B")],
        };
        let id = game.cards[1].id.to_string();

        assert_eq!(game.index_of(&id).unwrap(), 1);
        assert_eq!(game.index_of(&id.to_uppercase()).unwrap(), 1);
        assert_eq!(game.index_of(&game.cards[1].short_id()).unwrap(), 1);
        assert!(matches!(
            game.index_of("not-a-card"),
            Err(ForgeError::CardNotFound { .. })
        ));
        assert!(game.index_of("").is_err());
    }

    #[test]
    fn test_session_defaults_missing_sections() {
        let session: Session = serde_json::from_str("{}").unwrap();
        assert!(session.theme.is_empty());
        assert!(session.game.is_empty());
    }
}
