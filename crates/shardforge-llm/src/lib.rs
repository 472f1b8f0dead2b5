//! Generation backend abstraction
//!
//! Every provider implements the [`LlmBackend`] trait (structured text plus
//! image generation), so the orchestrator works with any provider without
//! knowing its wire format. [`ContentClient`] layers the card-game prompts
//! and response schemas on top.

pub mod content;
mod gemini_backend;
pub(crate) mod http_client;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use content::{
    CardDraft, CardTextDraft, ContentClient, SetDraft, ThemeBrief, ThemeDraft, card_art_prompt,
};
pub use shardforge_utils::error::LlmError;
pub use types::{
    ImageRequest, ImageResult, LlmBackend, LlmInvocation, LlmResult, Message, Role,
    TextOperation, data_url,
};

pub(crate) use gemini_backend::GeminiBackend;

use shardforge_config::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Construct a backend for a specific provider.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` if the provider is unknown.
/// Returns `LlmError::Misconfiguration` if provider-specific configuration is invalid.
fn construct_backend_for_provider(
    provider: &str,
    config: &Config,
) -> Result<Arc<dyn LlmBackend>, LlmError> {
    match provider {
        "gemini" => {
            let backend = GeminiBackend::new_from_config(config)?;
            Ok(Arc::new(backend))
        }
        #[cfg(feature = "test-utils")]
        "scripted" => Ok(Arc::new(test_support::ScriptedBackend::canned())),
        #[cfg(not(feature = "test-utils"))]
        "scripted" => Err(LlmError::Unsupported(
            "The 'scripted' provider is only available in builds with the test-utils feature."
                .to_string(),
        )),
        unknown => Err(LlmError::Unsupported(format!(
            "Unknown LLM provider '{}'. Supported providers: gemini.",
            unknown
        ))),
    }
}

/// Create a generation backend from configuration.
///
/// # Errors
///
/// Returns `LlmError::Unsupported` for unknown providers and
/// `LlmError::Misconfiguration` when the provider cannot be set up (for
/// example, a missing API key).
pub fn from_config(config: &Config) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let provider = config.provider();
    debug!(provider, "Constructing generation backend");
    construct_backend_for_provider(provider, config)
}

/// Create a [`ContentClient`] wired to the configured backend, models and timeout.
///
/// # Errors
///
/// Same as [`from_config`].
pub fn content_client_from_config(config: &Config) -> Result<ContentClient, LlmError> {
    let backend = from_config(config)?;
    let gemini = config.gemini();
    let client = ContentClient::new(backend).with_timeout(Duration::from_secs(gemini.timeout_secs));
    if config.provider() == "gemini" {
        Ok(client.with_models(gemini.text_model, gemini.image_model))
    } else {
        Ok(client)
    }
}
