use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use shardforge_utils::error::ConfigError;

use super::{CliArgs, Config, ConfigSource, Defaults, LlmConfig, ShardsConfig};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    llm: Option<LlmConfig>,
    shards: Option<ShardsConfig>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("Failed to get current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// Path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut source_attribution = HashMap::new();

        let mut defaults = Defaults::default();
        let mut llm = LlmConfig::default();
        let mut shards = ShardsConfig::default();

        for key in [
            "card_count",
            "max_cards",
            "state_dir",
            "verbose",
            "provider",
            "default_balance",
            "storage_key",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Defaults);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading config file");
            let file_config = Self::load_config_file(path)
                .map_err(|e| ConfigError::InvalidFile(format!("{e:#}")))?;

            let config_source = ConfigSource::ConfigFile(path.clone());

            if let Some(file_defaults) = file_config.defaults {
                if file_defaults.card_count.is_some() {
                    defaults.card_count = file_defaults.card_count;
                    source_attribution.insert("card_count".to_string(), config_source.clone());
                }
                if file_defaults.max_cards.is_some() {
                    defaults.max_cards = file_defaults.max_cards;
                    source_attribution.insert("max_cards".to_string(), config_source.clone());
                }
                if file_defaults.state_dir.is_some() {
                    defaults.state_dir = file_defaults.state_dir;
                    source_attribution.insert("state_dir".to_string(), config_source.clone());
                }
                if file_defaults.verbose.is_some() {
                    defaults.verbose = file_defaults.verbose;
                    source_attribution.insert("verbose".to_string(), config_source.clone());
                }
            }

            if let Some(file_llm) = file_config.llm {
                if file_llm.provider.is_some() {
                    llm.provider = file_llm.provider;
                    source_attribution.insert("provider".to_string(), config_source.clone());
                }
                if let Some(gemini) = file_llm.gemini {
                    for (key, set) in [
                        ("gemini.api_key_env", gemini.api_key_env.is_some()),
                        ("gemini.base_url", gemini.base_url.is_some()),
                        ("gemini.text_model", gemini.text_model.is_some()),
                        ("gemini.image_model", gemini.image_model.is_some()),
                        ("gemini.timeout_secs", gemini.timeout_secs.is_some()),
                    ] {
                        if set {
                            source_attribution.insert(key.to_string(), config_source.clone());
                        }
                    }
                    llm.gemini = Some(gemini);
                }
            }

            if let Some(file_shards) = file_config.shards {
                if file_shards.default_balance.is_some() {
                    shards.default_balance = file_shards.default_balance;
                    source_attribution
                        .insert("default_balance".to_string(), config_source.clone());
                }
                if file_shards.storage_key.is_some() {
                    shards.storage_key = file_shards.storage_key;
                    source_attribution.insert("storage_key".to_string(), config_source.clone());
                }
            }
        }

        // CLI overrides
        if let Some(state_dir) = &cli_args.state_dir {
            defaults.state_dir = Some(state_dir.clone());
            source_attribution.insert("state_dir".to_string(), ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            defaults.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }
        if let Some(card_count) = cli_args.card_count {
            defaults.card_count = Some(card_count);
            source_attribution.insert("card_count".to_string(), ConfigSource::Cli);
        }
        if let Some(provider) = &cli_args.llm_provider {
            llm.provider = Some(provider.clone());
            source_attribution.insert("provider".to_string(), ConfigSource::Cli);
        }

        let config = Self {
            defaults,
            llm,
            shards,
            config_path,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Find a config file.
    ///
    /// `$SHARDFORGE_HOME/config.toml` wins when it exists; otherwise search
    /// upward from `start_dir` for `.shardforge/config.toml`, stopping at a
    /// repository root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        if let Ok(home) = std::env::var("SHARDFORGE_HOME") {
            let candidate = PathBuf::from(home).join("config.toml");
            if candidate.exists() {
                return Some(candidate);
            }
        }

        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".shardforge").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        None
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: TomlConfig = toml::from_str(&content).with_context(|| {
                    format!("Failed to parse TOML config file: {}", path.display())
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        }
    }
}
