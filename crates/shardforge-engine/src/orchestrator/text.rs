//! Card text regeneration.

use shardforge_llm::CardTextDraft;
use shardforge_utils::error::{ForgeError, GenerationOp};
use tracing::{error, info, warn};

use super::Orchestrator;
use crate::model::{Card, CardKind, CreatureStats, GameSet, ImageState, Theme};

/// Result of regenerating a card's text and then its art.
///
/// The text change stands even when the follow-up image attempt fails.
#[derive(Debug)]
pub struct RegenerateOutcome {
    pub image_error: Option<ForgeError>,
}

impl RegenerateOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.image_error.is_none()
    }
}

impl Orchestrator {
    /// Replace a card's stats, ability and image prompt. Name and type are kept.
    ///
    /// On success the card's art is discarded and its image goes back to
    /// `pending`. The card is only modified once a valid reply has arrived,
    /// so a failure leaves it exactly as it was.
    ///
    /// # Errors
    ///
    /// - `ForgeError::CardNotFound` for an unknown id.
    /// - `ForgeError::Generation` with `GenerationOp::CardText`.
    pub async fn regenerate_card_text(
        &self,
        theme: &Theme,
        game: &mut GameSet,
        card_id: &str,
    ) -> Result<(), ForgeError> {
        let index = game.index_of(card_id)?;
        let (name, type_name) = {
            let card = &game.cards[index];
            (card.name.clone(), card.kind.type_name())
        };

        let draft = self
            .content
            .card_text(&theme.brief(), &name, type_name)
            .await
            .map_err(|e| {
                error!(card_id = %game.cards[index].id, error = %e, "Card text regeneration failed");
                ForgeError::generation(GenerationOp::CardText, e)
            })?;

        apply_text(&mut game.cards[index], draft);
        info!(card_id = %game.cards[index].id, name = %name, "Card text regenerated");
        Ok(())
    }

    /// Regenerate a card's text, then retry its art once.
    ///
    /// # Errors
    ///
    /// Only the text step's errors; an image failure is reported in the outcome.
    pub async fn regenerate_card(
        &self,
        theme: &Theme,
        game: &mut GameSet,
        card_id: &str,
    ) -> Result<RegenerateOutcome, ForgeError> {
        self.regenerate_card_text(theme, game, card_id).await?;

        match self.retry_card_image(&theme.title, game, card_id).await {
            Ok(()) => Ok(RegenerateOutcome { image_error: None }),
            Err(e) => {
                warn!(card_id, error = %e, "Card text kept but its image was not regenerated");
                Ok(RegenerateOutcome {
                    image_error: Some(e),
                })
            }
        }
    }
}

fn apply_text(card: &mut Card, draft: CardTextDraft) {
    if let CardKind::Creature(stats) = &mut card.kind {
        *stats = CreatureStats {
            attack: draft.attack,
            defense: draft.defense,
            health: draft.health,
        };
    }
    card.ability = draft.ability;
    card.image_prompt = draft.image_prompt;
    card.image_url = None;
    card.image_state = ImageState::Pending;
}

#[cfg(test)]
mod tests {
    use super::super::tests::{orchestrator, theme};
    use super::*;
    use shardforge_llm::LlmError;
    use shardforge_llm::test_support::{RecordedCall, ScriptedBackend};
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    fn card(kind: CardKind) -> Card {
        Card {
            id: Uuid::new_v4(),
            name: "Ember Drake".into(),
            kind,
            ability: "Flying.".into(),
            image_prompt: "a drake".into(),
            image_url: Some("data:image/jpeg;base64,OLD".into()),
            image_state: ImageState::Success,
        }
    }

    fn game_with(card: Card) -> GameSet {
        GameSet {
            set_name: "S".into(),
            rules: "# Rules".into(),
            cards: vec![card],
        }
    }

    fn text_reply() -> serde_json::Value {
        json!({
            "attack": 5, "defense": 1, "health": 6,
            "ability": "Burn 2.", "imagePrompt": "a burning drake"
        })
    }

    #[tokio::test]
    async fn test_regenerate_text_applies_and_resets_image() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_json(text_reply());
        let orch = orchestrator(&backend, 5);
        let mut game = game_with(card(CardKind::Creature(CreatureStats {
            attack: 1,
            defense: 1,
            health: 1,
        })));
        let id = game.cards[0].id.to_string();

        orch.regenerate_card_text(&theme(), &mut game, &id).await.unwrap();

        let card = &game.cards[0];
        assert_eq!(card.name, "Ember Drake");
        assert_eq!(
            card.kind.stats(),
            Some(CreatureStats {
                attack: 5,
                defense: 1,
                health: 6
            })
        );
        assert_eq!(card.ability, "Burn 2.");
        assert_eq!(card.image_prompt, "a burning drake");
        assert!(card.image_url.is_none());
        assert_eq!(card.image_state, ImageState::Pending);
        assert_eq!(orch.ledger().balance(), 5);

        match &backend.calls()[0] {
            RecordedCall::Text { prompt, .. } => {
                assert!(prompt.contains("\"Ember Drake\""));
                assert!(prompt.contains("\"Creature\""));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_regenerate_text_ignores_stats_for_spells() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_json(text_reply());
        let orch = orchestrator(&backend, 5);
        let mut game = game_with(card(CardKind::Spell));
        let id = game.cards[0].id.to_string();

        orch.regenerate_card_text(&theme(), &mut game, &id).await.unwrap();

        assert_eq!(game.cards[0].kind, CardKind::Spell);
        assert_eq!(game.cards[0].ability, "Burn 2.");
    }

    #[tokio::test]
    async fn test_regenerate_text_failure_leaves_card_unchanged() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_text_error(LlmError::Transport("reset".into()));
        let orch = orchestrator(&backend, 5);
        let mut game = game_with(card(CardKind::Artifact));
        let before = game.clone();
        let id = game.cards[0].id.to_string();

        let err = orch
            .regenerate_card_text(&theme(), &mut game, &id)
            .await
            .unwrap_err();

        assert_eq!(err.to_string().split(':').next(), Some("Card text regeneration failed"));
        assert_eq!(game, before);
    }

    #[tokio::test]
    async fn test_regenerate_card_runs_text_then_image() {
        let backend = Arc::new(ScriptedBackend::canned());
        backend.push_json(text_reply());
        let orch = orchestrator(&backend, 5);
        let mut game = game_with(card(CardKind::Environment));
        let id = game.cards[0].id.to_string();

        let outcome = orch.regenerate_card(&theme(), &mut game, &id).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(game.cards[0].image_state, ImageState::Success);
        assert_eq!(orch.ledger().balance(), 4);
        assert_eq!(
            backend.image_prompts(),
            vec![shardforge_llm::card_art_prompt("a burning drake", "Celestial Empires")]
        );
    }

    #[tokio::test]
    async fn test_regenerate_card_keeps_text_when_out_of_shards() {
        let backend = Arc::new(ScriptedBackend::canned());
        backend.push_json(text_reply());
        let orch = orchestrator(&backend, 0);
        let mut game = game_with(card(CardKind::Spell));
        let id = game.cards[0].id.to_string();

        let outcome = orch.regenerate_card(&theme(), &mut game, &id).await.unwrap();

        assert!(matches!(
            outcome.image_error,
            Some(ForgeError::InsufficientShards { .. })
        ));
        assert_eq!(game.cards[0].ability, "Burn 2.");
        assert_eq!(game.cards[0].image_state, ImageState::Pending);
        assert!(backend.image_prompts().is_empty());
    }
}
