use std::collections::BTreeMap;

use super::{Config, ConfigSource, DEFAULT_SHARD_BALANCE};

fn stable_source_label(source: &ConfigSource) -> &'static str {
    match source {
        ConfigSource::Cli => "cli",
        ConfigSource::ConfigFile(_) => "config",
        ConfigSource::Defaults => "defaults",
    }
}

fn source_label(source: Option<&ConfigSource>) -> String {
    match source {
        Some(src) => stable_source_label(src).to_string(),
        None => stable_source_label(&ConfigSource::Defaults).to_string(),
    }
}

impl Config {
    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add_config = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        add_config("card_count", self.card_count().to_string());
        add_config("max_cards", self.max_cards().to_string());
        add_config("state_dir", self.state_dir().to_string());
        add_config("verbose", self.verbose().to_string());
        add_config("provider", self.provider().to_string());

        let gemini = self.gemini();
        add_config("gemini.api_key_env", gemini.api_key_env);
        add_config("gemini.base_url", gemini.base_url);
        add_config("gemini.text_model", gemini.text_model);
        add_config("gemini.image_model", gemini.image_model);
        add_config("gemini.timeout_secs", gemini.timeout_secs.to_string());

        add_config(
            "default_balance",
            self.default_balance()
                .unwrap_or(DEFAULT_SHARD_BALANCE)
                .to_string(),
        );
        add_config("storage_key", self.storage_key().to_string());

        config
    }
}
