//! Shard-gated card art generation.
//!
//! Every image attempt costs one shard, debited before the call and credited
//! back when the call fails. The bulk pass walks pending cards strictly in
//! order with one request outstanding; a rate-limited response stops it and
//! leaves later cards pending for the next pass.

use shardforge_ledger::IMAGE_COST;
use shardforge_llm::LlmError;
use shardforge_utils::error::{
    ForgeError, GenerationOp, OUT_OF_SHARDS_MESSAGE, RATE_LIMIT_MESSAGE,
};
use std::fmt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::Orchestrator;
use crate::model::{Card, GameSet, ImageState};

/// A user-facing message raised during an image pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassNotice {
    /// Raised once per pass, at the first card that could not be paid for
    OutOfShards,
    /// The pass stopped early
    RateLimited,
    ImageFailed { card_id: Uuid, card_name: String },
}

impl fmt::Display for PassNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfShards => f.write_str(OUT_OF_SHARDS_MESSAGE),
            Self::RateLimited => f.write_str(RATE_LIMIT_MESSAGE),
            Self::ImageFailed { card_name, .. } => {
                write!(f, "Failed to generate image for \"{card_name}\".")
            }
        }
    }
}

/// Outcome of one image pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePassReport {
    pub generated: usize,
    pub failed: usize,
    /// Cards marked `error` because the balance could not cover them
    pub starved: usize,
    pub halted_by_rate_limit: bool,
    pub notices: Vec<PassNotice>,
}

impl ImagePassReport {
    /// Cards the pass touched.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.generated + self.failed + self.starved
    }
}

impl Orchestrator {
    /// Generate art for one image prompt. No retries.
    ///
    /// # Errors
    ///
    /// `ForgeError::Generation` with `GenerationOp::CardImage`.
    pub async fn generate_card_image(
        &self,
        image_prompt: &str,
        theme_title: &str,
    ) -> Result<String, ForgeError> {
        self.content
            .card_image(image_prompt, theme_title)
            .await
            .map_err(|e| ForgeError::generation(GenerationOp::CardImage, e))
    }

    /// Generate art for every pending card, in order.
    ///
    /// Never fails as a whole: per-card outcomes are recorded on the cards
    /// and summarised in the report.
    pub async fn run_image_pass(&self, theme_title: &str, game: &mut GameSet) -> ImagePassReport {
        let mut report = ImagePassReport::default();
        let pending = game.count_by_state(ImageState::Pending);
        info!(pending, balance = self.ledger.balance(), "Starting image pass");

        for card in game.cards.iter_mut() {
            if card.image_state != ImageState::Pending {
                continue;
            }

            if let Err(e) = self.ledger.try_debit(IMAGE_COST) {
                debug!(card_id = %card.id, error = %e, "No shards left for card image");
                card.image_state = ImageState::Error;
                report.starved += 1;
                if !report.notices.contains(&PassNotice::OutOfShards) {
                    warn!(card_id = %card.id, "Out of shards, remaining pending cards will be marked as errors");
                    report.notices.push(PassNotice::OutOfShards);
                }
                continue;
            }

            match self.attempt_image(theme_title, card).await {
                Ok(()) => report.generated += 1,
                Err(e) if e.is_rate_limit() => {
                    report.failed += 1;
                    report.halted_by_rate_limit = true;
                    report.notices.push(PassNotice::RateLimited);
                    warn!(card_id = %card.id, "Rate limited, stopping image pass");
                    break;
                }
                Err(_) => {
                    report.failed += 1;
                    report.notices.push(PassNotice::ImageFailed {
                        card_id: card.id,
                        card_name: card.name.clone(),
                    });
                }
            }
        }

        info!(
            generated = report.generated,
            failed = report.failed,
            starved = report.starved,
            halted = report.halted_by_rate_limit,
            balance = self.ledger.balance(),
            "Image pass finished"
        );
        report
    }

    /// Retry the art for one card, whatever its current state.
    ///
    /// # Errors
    ///
    /// - `ForgeError::CardNotFound` for an unknown id.
    /// - `ForgeError::InsufficientShards` when the balance is empty; nothing
    ///   is debited and no call is made.
    /// - `ForgeError::Generation` with `GenerationOp::CardImage` when the
    ///   call fails (the card is marked `error` and the shard refunded).
    pub async fn retry_card_image(
        &self,
        theme_title: &str,
        game: &mut GameSet,
        card_id: &str,
    ) -> Result<(), ForgeError> {
        let index = game.index_of(card_id)?;
        self.ledger.try_debit(IMAGE_COST)?;

        let card = &mut game.cards[index];
        self.attempt_image(theme_title, card)
            .await
            .map_err(|e| ForgeError::generation(GenerationOp::CardImage, e))
    }

    /// One paid attempt; the shard must already be debited.
    async fn attempt_image(&self, theme_title: &str, card: &mut Card) -> Result<(), LlmError> {
        card.image_state = ImageState::Loading;
        debug!(card_id = %card.id, name = %card.name, "Generating card image");

        match self.content.card_image(&card.image_prompt, theme_title).await {
            Ok(image_url) => {
                card.image_url = Some(image_url);
                card.image_state = ImageState::Success;
                Ok(())
            }
            Err(e) => {
                card.image_state = ImageState::Error;
                let balance = self.ledger.credit(IMAGE_COST);
                error!(card_id = %card.id, name = %card.name, error = %e, "Card image generation failed");
                warn!(card_id = %card.id, balance, "Refunded shard for failed image");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{orchestrator, theme};
    use super::*;
    use crate::model::CardKind;
    use shardforge_llm::test_support::{CANNED_IMAGE_URL, ScriptedBackend};
    use std::sync::Arc;

    fn game(n: usize) -> GameSet {
        let cards = (0..n)
            .map(|i| Card {
                id: Uuid::new_v4(),
                name: format!("Card {i}"),
                kind: CardKind::Spell,
                ability: "Do a thing.".into(),
                image_prompt: format!("art {i}"),
                image_url: None,
                image_state: ImageState::Pending,
            })
            .collect();
        GameSet {
            set_name: "The Astral War".into(),
            rules: "# Rules".into(),
            cards,
        }
    }

    fn states(game: &GameSet) -> Vec<ImageState> {
        game.cards.iter().map(|c| c.image_state).collect()
    }

    #[tokio::test]
    async fn test_pass_generates_all_pending_in_order() {
        let backend = Arc::new(ScriptedBackend::canned());
        let orch = orchestrator(&backend, 10);
        let mut game = game(3);

        let report = orch.run_image_pass(&theme().title, &mut game).await;

        assert_eq!(report.generated, 3);
        assert!(report.notices.is_empty());
        assert_eq!(orch.ledger().balance(), 7);
        assert!(
            game.cards
                .iter()
                .all(|c| c.image_url.as_deref() == Some(CANNED_IMAGE_URL))
        );
        assert_eq!(
            backend.image_prompts(),
            vec![
                "art 0, in the art style of a modern trading card game, theme of Celestial Empires.",
                "art 1, in the art style of a modern trading card game, theme of Celestial Empires.",
                "art 2, in the art style of a modern trading card game, theme of Celestial Empires.",
            ]
        );
    }

    #[tokio::test]
    async fn test_pass_with_two_shards_starves_the_rest() {
        let backend = Arc::new(ScriptedBackend::canned());
        let orch = orchestrator(&backend, 2);
        let mut game = game(5);

        let report = orch.run_image_pass("T", &mut game).await;

        assert_eq!(
            states(&game),
            vec![
                ImageState::Success,
                ImageState::Success,
                ImageState::Error,
                ImageState::Error,
                ImageState::Error,
            ]
        );
        assert_eq!(report.generated, 2);
        assert_eq!(report.starved, 3);
        assert_eq!(report.notices, vec![PassNotice::OutOfShards]);
        assert_eq!(backend.image_prompts().len(), 2);
        assert_eq!(orch.ledger().balance(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_halts_pass_and_refunds() {
        let backend = Arc::new(ScriptedBackend::canned());
        backend
            .push_image("data:image/jpeg;base64,AAAA")
            .push_image_error(LlmError::RateLimited("RESOURCE_EXHAUSTED".into()));
        let orch = orchestrator(&backend, 10);
        let mut game = game(4);

        let report = orch.run_image_pass("T", &mut game).await;

        assert_eq!(
            states(&game),
            vec![
                ImageState::Success,
                ImageState::Error,
                ImageState::Pending,
                ImageState::Pending,
            ]
        );
        assert!(report.halted_by_rate_limit);
        assert_eq!(report.notices, vec![PassNotice::RateLimited]);
        assert_eq!(
            report.notices[0].to_string(),
            "API rate limit reached. Image generation paused. You can retry individual cards later."
        );
        assert_eq!(backend.image_prompts().len(), 2);
        assert_eq!(orch.ledger().balance(), 9);
    }

    #[tokio::test]
    async fn test_other_failure_continues_pass() {
        let backend = Arc::new(ScriptedBackend::canned());
        backend.push_image_error(LlmError::ProviderOutage("500".into()));
        let orch = orchestrator(&backend, 10);
        let mut game = game(3);

        let report = orch.run_image_pass("T", &mut game).await;

        assert_eq!(
            states(&game),
            vec![ImageState::Error, ImageState::Success, ImageState::Success]
        );
        assert_eq!(report.failed, 1);
        assert!(!report.halted_by_rate_limit);
        assert!(matches!(report.notices[0], PassNotice::ImageFailed { .. }));
        assert_eq!(orch.ledger().balance(), 8);
    }

    #[tokio::test]
    async fn test_pass_skips_non_pending_cards() {
        let backend = Arc::new(ScriptedBackend::canned());
        let orch = orchestrator(&backend, 10);
        let mut game = game(3);
        game.cards[0].image_state = ImageState::Success;
        game.cards[1].image_state = ImageState::Error;

        let report = orch.run_image_pass("T", &mut game).await;

        assert_eq!(report.attempted(), 1);
        assert_eq!(game.cards[1].image_state, ImageState::Error);
        assert_eq!(backend.image_prompts(), vec![card_prompt("art 2")]);
    }

    fn card_prompt(p: &str) -> String {
        shardforge_llm::card_art_prompt(p, "T")
    }

    #[tokio::test]
    async fn test_retry_error_card_succeeds() {
        let backend = Arc::new(ScriptedBackend::canned());
        let orch = orchestrator(&backend, 3);
        let mut game = game(1);
        game.cards[0].image_state = ImageState::Error;
        let id = game.cards[0].id.to_string();

        orch.retry_card_image("T", &mut game, &id).await.unwrap();

        assert_eq!(game.cards[0].image_state, ImageState::Success);
        assert_eq!(orch.ledger().balance(), 2);
    }

    #[tokio::test]
    async fn test_retry_with_empty_balance_is_rejected_upfront() {
        let backend = Arc::new(ScriptedBackend::canned());
        let orch = orchestrator(&backend, 0);
        let mut game = game(1);
        game.cards[0].image_state = ImageState::Error;
        let id = game.cards[0].id.to_string();

        let err = orch.retry_card_image("T", &mut game, &id).await.unwrap_err();

        assert!(matches!(
            err,
            ForgeError::InsufficientShards {
                balance: 0,
                requested: 1
            }
        ));
        assert_eq!(game.cards[0].image_state, ImageState::Error);
        assert!(backend.image_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_retry_failure_keeps_previous_image_and_refunds() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_image_error(LlmError::Timeout {
            duration: std::time::Duration::from_secs(120),
        });
        let orch = orchestrator(&backend, 5);
        let mut game = game(1);
        game.cards[0].image_state = ImageState::Success;
        game.cards[0].image_url = Some("data:image/jpeg;base64,OLD".into());
        let id = game.cards[0].id.to_string();

        let err = orch.retry_card_image("T", &mut game, &id).await.unwrap_err();

        assert!(matches!(
            err,
            ForgeError::Generation {
                operation: GenerationOp::CardImage,
                ..
            }
        ));
        assert_eq!(game.cards[0].image_state, ImageState::Error);
        assert_eq!(
            game.cards[0].image_url.as_deref(),
            Some("data:image/jpeg;base64,OLD")
        );
        assert_eq!(orch.ledger().balance(), 5);
    }

    #[tokio::test]
    async fn test_retry_unknown_card() {
        let backend = Arc::new(ScriptedBackend::canned());
        let orch = orchestrator(&backend, 5);
        let mut game = game(1);

        let err = orch
            .retry_card_image("T", &mut game, "ffffffff")
            .await
            .unwrap_err();

        assert!(matches!(err, ForgeError::CardNotFound { .. }));
        assert_eq!(orch.ledger().balance(), 5);
    }
}
