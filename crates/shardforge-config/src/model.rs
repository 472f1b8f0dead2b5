use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Cards requested by `generate` when `--cards` is not given.
pub const DEFAULT_CARD_COUNT: u32 = 10;

/// Upper bound on cards per set.
pub const DEFAULT_MAX_CARDS: u32 = 50;

/// Provider used when none is configured.
pub const DEFAULT_PROVIDER: &str = "gemini";

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Starting shard balance when nothing is stored or configured.
pub const DEFAULT_SHARD_BALANCE: u64 = 200;

/// Storage key of the shard balance; also its file name in the state directory.
pub const DEFAULT_STORAGE_KEY: &str = "tcg_shard_balance";

/// Configuration for shardforge operations.
///
/// Built by [`Config::discover`] with precedence CLI > config file > defaults.
/// Every section keeps `Option` fields so a file can set any subset; the
/// accessor methods apply the built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub llm: LlmConfig,
    pub shards: ShardsConfig,
    /// The config file that was loaded, if any.
    pub config_path: Option<PathBuf>,
    /// Source attribution for each setting (for `shardforge config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    pub card_count: Option<u32>,
    pub max_cards: Option<u32>,
    pub state_dir: Option<Utf8PathBuf>,
    pub verbose: Option<bool>,
}

/// `[llm]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// "gemini", or "scripted" in builds with test seams enabled.
    pub provider: Option<String>,
    pub gemini: Option<GeminiConfig>,
}

/// `[llm.gemini]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[shards]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShardsConfig {
    pub default_balance: Option<u64>,
    pub storage_key: Option<String>,
}

/// CLI values that participate in configuration precedence.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub state_dir: Option<Utf8PathBuf>,
    pub verbose: Option<bool>,
    pub card_count: Option<u32>,
    pub llm_provider: Option<String>,
}

/// Source of a configuration value for attribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::ConfigFile(path) => write!(f, "config file ({})", path.display()),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

impl Config {
    #[must_use]
    pub fn card_count(&self) -> u32 {
        self.defaults.card_count.unwrap_or(DEFAULT_CARD_COUNT)
    }

    #[must_use]
    pub fn max_cards(&self) -> u32 {
        self.defaults.max_cards.unwrap_or(DEFAULT_MAX_CARDS)
    }

    /// Directory holding the shard balance file, the session and its lock.
    #[must_use]
    pub fn state_dir(&self) -> Utf8PathBuf {
        self.defaults
            .state_dir
            .clone()
            .unwrap_or_else(shardforge_utils::paths::shardforge_home)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    #[must_use]
    pub fn provider(&self) -> &str {
        self.llm.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    /// Gemini settings with defaults applied.
    #[must_use]
    pub fn gemini(&self) -> ResolvedGemini {
        let g = self.llm.gemini.clone().unwrap_or_default();
        ResolvedGemini {
            api_key_env: g.api_key_env.unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            base_url: g
                .base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            text_model: g.text_model.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: g
                .image_model
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            timeout_secs: g.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Configured starting balance; `None` lets the ledger apply its own default.
    #[must_use]
    pub fn default_balance(&self) -> Option<u64> {
        self.shards.default_balance
    }

    #[must_use]
    pub fn storage_key(&self) -> &str {
        self.shards
            .storage_key
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_KEY)
    }

    /// A config that ignores the environment and filesystem, for tests and embedding.
    #[must_use]
    pub fn minimal_for_testing() -> Self {
        Self {
            defaults: Defaults::default(),
            llm: LlmConfig::default(),
            shards: ShardsConfig::default(),
            config_path: None,
            source_attribution: HashMap::new(),
        }
    }
}

/// Gemini provider settings after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGemini {
    pub api_key_env: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub timeout_secs: u64,
}
