//! Content orchestrator
//!
//! Drives every generation flow against the current session: theme
//! suggestion, set generation, the shard-gated image pass, single-card image
//! retries and card text regeneration. Mutating operations take the game set
//! by `&mut`, so a running pass has exclusive access to it.
//!
//! Failures come back as one `ForgeError` per operation. Compensation
//! happens before returning: a set that failed to generate stays cleared, a
//! failed image attempt refunds its shard, and a failed text regeneration
//! leaves the card exactly as it was.

mod images;
mod text;

pub use images::{ImagePassReport, PassNotice};
pub use text::RegenerateOutcome;

use shardforge_config::{Config, DEFAULT_MAX_CARDS};
use shardforge_ledger::ShardLedger;
use shardforge_llm::{ContentClient, LlmError};
use shardforge_utils::error::{ForgeError, GenerationOp, ValidationError};
use std::sync::Arc;
use tracing::{error, info};

use crate::model::{Card, GameSet, Theme};

/// Local checks run before a set is generated: every theme field filled in
/// and `card_count` within `1..=max_cards`.
///
/// # Errors
///
/// The first failing check as a `ValidationError`.
pub fn validate_set_request(
    theme: &Theme,
    card_count: u32,
    max_cards: u32,
) -> Result<(), ValidationError> {
    theme.validate()?;
    if card_count == 0 || card_count > max_cards {
        return Err(ValidationError::CardCountOutOfRange {
            count: card_count,
            max: max_cards,
        });
    }
    Ok(())
}

pub struct Orchestrator {
    content: ContentClient,
    ledger: Arc<ShardLedger>,
    max_cards: u32,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("ledger", &self.ledger)
            .field("max_cards", &self.max_cards)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    #[must_use]
    pub fn new(content: ContentClient, ledger: Arc<ShardLedger>) -> Self {
        Self {
            content,
            ledger,
            max_cards: DEFAULT_MAX_CARDS,
        }
    }

    /// Orchestrator for the configured provider, sharing the given ledger.
    ///
    /// # Errors
    ///
    /// Returns the backend construction error (unknown provider, missing API key).
    pub fn from_config(config: &Config, ledger: Arc<ShardLedger>) -> Result<Self, LlmError> {
        let content = shardforge_llm::content_client_from_config(config)?;
        Ok(Self::new(content, ledger).with_max_cards(config.max_cards()))
    }

    #[must_use]
    pub fn with_max_cards(mut self, max_cards: u32) -> Self {
        self.max_cards = max_cards;
        self
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<ShardLedger> {
        &self.ledger
    }

    #[must_use]
    pub fn max_cards(&self) -> u32 {
        self.max_cards
    }

    /// Ask the service for a fresh theme concept.
    ///
    /// # Errors
    ///
    /// `ForgeError::Generation` with `GenerationOp::InitialTheme`.
    pub async fn fetch_initial_theme(&self) -> Result<Theme, ForgeError> {
        match self.content.initial_theme().await {
            Ok(draft) => {
                let theme = Theme::from(draft);
                info!(title = %theme.title, set_name = %theme.set_name, "Initial theme generated");
                Ok(theme)
            }
            Err(e) => {
                error!(error = %e, "Initial theme generation failed");
                Err(ForgeError::generation(GenerationOp::InitialTheme, e))
            }
        }
    }

    /// Replace `theme` with a suggested one.
    ///
    /// The fields are cleared before the call and stay empty when it fails.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::fetch_initial_theme`].
    pub async fn load_initial_theme(&self, theme: &mut Theme) -> Result<(), ForgeError> {
        theme.clear();
        *theme = self.fetch_initial_theme().await?;
        Ok(())
    }

    /// Generate rules and `card_count` cards for `theme` into `game`.
    ///
    /// Inputs are checked before anything changes. After that the set is
    /// cleared, and on failure it stays cleared.
    ///
    /// # Errors
    ///
    /// - `ForgeError::Validation` for a blank theme field or a card count
    ///   outside `1..=max_cards`; no call is made and `game` is untouched.
    /// - `ForgeError::Generation` with `GenerationOp::GameSet` for service
    ///   failures and malformed responses.
    pub async fn generate_game_set(
        &self,
        theme: &Theme,
        card_count: u32,
        game: &mut GameSet,
    ) -> Result<(), ForgeError> {
        validate_set_request(theme, card_count, self.max_cards)?;

        game.clear();
        info!(card_count, set_name = %theme.set_name, "Generating game set");

        let draft = match self.content.game_set(&theme.brief(), card_count).await {
            Ok(draft) => draft,
            Err(e) => {
                error!(error = %e, "Game set generation failed");
                return Err(ForgeError::generation(GenerationOp::GameSet, e));
            }
        };

        let cards = draft
            .cards
            .into_iter()
            .map(Card::from_draft)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                error!(error = %e, "Game set contained an invalid card");
                ForgeError::generation(GenerationOp::GameSet, e)
            })?;

        *game = GameSet {
            set_name: theme.set_name.clone(),
            rules: draft.rules,
            cards,
        };
        info!(cards = game.cards.len(), "Game set generated");
        Ok(())
    }
}
