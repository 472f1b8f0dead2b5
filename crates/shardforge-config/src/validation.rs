use shardforge_utils::error::ConfigError;

use super::Config;

/// Providers the factory knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["gemini", "scripted"];

impl Config {
    /// Validate configuration values, collecting every problem found.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let max_cards = self.max_cards();
        if max_cards == 0 {
            errors.push("max_cards must be greater than 0".to_string());
        } else if max_cards > 500 {
            errors.push("max_cards exceeds maximum limit of 500".to_string());
        }

        let card_count = self.card_count();
        if card_count == 0 {
            errors.push("card_count must be at least 1".to_string());
        } else if card_count > max_cards {
            errors.push(format!(
                "card_count {card_count} exceeds max_cards {max_cards}"
            ));
        }

        if let Some(state_dir) = &self.defaults.state_dir {
            if state_dir.as_str().trim().is_empty() {
                errors.push("state_dir must not be empty".to_string());
            }
        }

        let provider = self.provider();
        if !KNOWN_PROVIDERS.contains(&provider) {
            errors.push(format!(
                "unknown llm provider '{provider}' (expected one of: {})",
                KNOWN_PROVIDERS.join(", ")
            ));
        }

        let gemini = self.gemini();
        if gemini.api_key_env.trim().is_empty() {
            errors.push("llm.gemini.api_key_env must not be empty".to_string());
        }
        if !(gemini.base_url.starts_with("https://") || gemini.base_url.starts_with("http://")) {
            errors.push(format!(
                "llm.gemini.base_url must be an http(s) URL, got '{}'",
                gemini.base_url
            ));
        }
        if gemini.timeout_secs == 0 {
            errors.push("llm.gemini.timeout_secs must be greater than 0".to_string());
        } else if gemini.timeout_secs > 600 {
            errors.push("llm.gemini.timeout_secs exceeds maximum limit of 600".to_string());
        }

        let storage_key = self.storage_key();
        if storage_key.trim().is_empty() {
            errors.push("shards.storage_key must not be empty".to_string());
        } else if storage_key.contains(['/', '\\']) || storage_key == "." || storage_key == ".." {
            errors.push(format!(
                "shards.storage_key must be a plain file name, got '{storage_key}'"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed {
                error_count: errors.len(),
                errors,
            })
        }
    }
}
