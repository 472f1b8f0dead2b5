use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `ForgeError` is the primary error type returned by shardforge library operations.
/// It provides:
/// - Detailed error information for programmatic handling
/// - User-friendly messages with context and suggestions
/// - Mapping to CLI exit codes for consistent error reporting
///
/// # Error Categories
///
/// | Category | Variants |
/// |----------|----------|
/// | Local validation | `Validation`, `InsufficientShards`, `CardNotFound`, `NoGameData` |
/// | External service | `Generation` (rate limits are a distinguished `LlmError`) |
/// | Concurrency | `Busy` |
/// | Environment | `Config`, `Io`, `Session`, `Export` |
///
/// Library code returns `ForgeError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not enough shards: balance is {balance}, {requested} required")]
    InsufficientShards { balance: u64, requested: u64 },

    #[error("Card not found: {id}")]
    CardNotFound { id: String },

    #[error("No game data to export")]
    NoGameData,

    #[error("Another operation is in progress (session lock held at {path})")]
    Busy { path: String },

    #[error("{operation} failed: {source}")]
    Generation {
        operation: GenerationOp,
        #[source]
        source: LlmError,
    },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ForgeError {
    /// Wrap a backend failure with the operation that triggered it.
    #[must_use]
    pub fn generation(operation: GenerationOp, source: LlmError) -> Self {
        Self::Generation { operation, source }
    }

    /// True when the failure came from the provider's rate limiter.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Generation { source, .. } if source.is_rate_limit())
    }

    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error: {}\n", self.user_message()));

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {}\n", ctx));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {}\n", suggestion));
            }
        }

        crate::redaction::redact_error_message(&output)
    }
}

/// The generation service operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOp {
    InitialTheme,
    GameSet,
    CardImage,
    CardText,
}

impl GenerationOp {
    /// The single message surfaced to the user when this operation fails.
    #[must_use]
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::InitialTheme => "Failed to generate initial game theme.",
            Self::GameSet => {
                "Failed to generate game content. Please check the theme and try again."
            }
            Self::CardImage => "Failed to regenerate image. API limits may have been reached.",
            Self::CardText => "Failed to regenerate card text.",
        }
    }
}

impl fmt::Display for GenerationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitialTheme => write!(f, "Initial theme generation"),
            Self::GameSet => write!(f, "Game set generation"),
            Self::CardImage => write!(f, "Card image generation"),
            Self::CardText => write!(f, "Card text regeneration"),
        }
    }
}

/// Message shown when the image provider's rate limit stops generation.
pub const RATE_LIMIT_MESSAGE: &str =
    "API rate limit reached. Image generation paused. You can retry individual cards later.";

/// Message shown when a card is skipped because the shard balance is exhausted.
pub const OUT_OF_SHARDS_MESSAGE: &str =
    "Out of shards. Remaining card images were not generated; add shards and retry.";

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Shards,
    Generation,
    RateLimit,
    FileSystem,
    Concurrency,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Validation => write!(f, "Validation"),
            Self::Shards => write!(f, "Shards"),
            Self::Generation => write!(f, "Generation"),
            Self::RateLimit => write!(f, "Rate Limit"),
            Self::FileSystem => write!(f, "File System"),
            Self::Concurrency => write!(f, "Concurrency"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },
}

/// Local input validation failures, raised before any service call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field '{field}' is empty")]
    MissingField { field: &'static str },

    #[error("Card count {count} is outside the allowed range 1..={max}")]
    CardCountOutOfRange { count: u32, max: u32 },
}

/// Errors from generation service backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, request construction)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider rate limit exceeded (429 / RESOURCE_EXHAUSTED)
    #[error("Provider rate limit exceeded: {0}")]
    RateLimited(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Response did not match the requested schema
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl LlmError {
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Generation service transport error: {msg}"),
            Self::ProviderAuth(msg) => format!("Generation service authentication failed: {msg}"),
            Self::RateLimited(_) => RATE_LIMIT_MESSAGE.to_string(),
            Self::ProviderOutage(msg) => format!("Generation service outage: {msg}"),
            Self::Timeout { duration } => {
                format!("Generation request timed out after {:?}", duration)
            }
            Self::MalformedResponse(msg) => {
                format!("Generation service returned malformed data: {msg}")
            }
            Self::Misconfiguration(msg) => format!("Generation service configuration error: {msg}"),
            Self::Unsupported(msg) => format!("Generation feature not supported: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Transport(_) => {
                Some("The generation service could not be reached.".to_string())
            }
            Self::ProviderAuth(_) => Some(
                "Authentication errors indicate a missing or invalid API key.".to_string(),
            ),
            Self::RateLimited(_) => Some(
                "The image provider limits how many requests can be made per minute.".to_string(),
            ),
            Self::ProviderOutage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            Self::Timeout { .. } => None,
            Self::MalformedResponse(_) => Some(
                "Responses missing required fields are rejected rather than partially applied."
                    .to_string(),
            ),
            Self::Misconfiguration(_) | Self::Unsupported(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Transport(_) | Self::ProviderOutage(_) | Self::Timeout { .. } => vec![
                "Check your network connection".to_string(),
                "Wait a few minutes and try again".to_string(),
            ],
            Self::ProviderAuth(_) => vec![
                "Check that the API key environment variable is set (default: GEMINI_API_KEY)"
                    .to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::RateLimited(_) => vec![
                "Wait a minute, then run 'shardforge images' or 'shardforge retry <card-id>'"
                    .to_string(),
            ],
            Self::MalformedResponse(_) => vec!["Run the command again".to_string()],
            Self::Misconfiguration(_) | Self::Unsupported(_) => vec![
                "Review the [llm] section of .shardforge/config.toml".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::RateLimited(_) => ErrorCategory::RateLimit,
            Self::Misconfiguration(_) | Self::Unsupported(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Generation,
        }
    }
}

impl UserFriendlyError for ForgeError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Validation(ValidationError::MissingField { .. })
            | Self::Validation(ValidationError::CardCountOutOfRange { .. }) => {
                "Please fill out all fields and set card count to at least 1.".to_string()
            }
            Self::InsufficientShards { .. } => "Not enough shards to generate an image.".to_string(),
            Self::CardNotFound { id } => format!("No card with id '{id}' in the current set."),
            Self::NoGameData => "No game data to export.".to_string(),
            Self::Busy { .. } => "Another operation is already in progress.".to_string(),
            Self::Generation { operation, source } => {
                if source.is_rate_limit() {
                    RATE_LIMIT_MESSAGE.to_string()
                } else {
                    operation.failure_message().to_string()
                }
            }
            Self::Export(msg) => format!("Export failed: {msg}"),
            Self::Session(msg) => format!("Could not load or save the session: {msg}"),
            Self::Io(e) => format!("File system error: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Validation(e) => Some(e.to_string()),
            Self::InsufficientShards { balance, requested } => Some(format!(
                "Each image attempt costs {requested} shard(s); current balance is {balance}."
            )),
            Self::Busy { path } => Some(format!("Session lock held at {path}")),
            Self::Generation { source, .. } => Some(source.to_string()),
            Self::Config(ConfigError::ValidationFailed { errors, .. }) => Some(errors.join("; ")),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(_) => vec![
                "Check .shardforge/config.toml for typos".to_string(),
                "Run 'shardforge config' to see the effective configuration".to_string(),
            ],
            Self::Validation(_) => vec![
                "Run 'shardforge theme' to generate defaults, or 'shardforge theme set ...'"
                    .to_string(),
            ],
            Self::InsufficientShards { .. } => {
                vec!["Add shards with 'shardforge shards add <n>'".to_string()]
            }
            Self::CardNotFound { .. } => {
                vec!["Run 'shardforge show' to list card ids".to_string()]
            }
            Self::NoGameData => vec!["Run 'shardforge generate' first".to_string()],
            Self::Busy { .. } => {
                vec!["Wait for the other shardforge command to finish".to_string()]
            }
            Self::Generation { source, .. } => source.suggestions(),
            Self::Export(_) | Self::Session(_) | Self::Io(_) => {
                vec!["Check that the state and output directories are writable".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Validation(_) | Self::CardNotFound { .. } | Self::NoGameData => {
                ErrorCategory::Validation
            }
            Self::InsufficientShards { .. } => ErrorCategory::Shards,
            Self::Busy { .. } => ErrorCategory::Concurrency,
            Self::Generation { source, .. } => source.category(),
            Self::Export(_) | Self::Session(_) | Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}
