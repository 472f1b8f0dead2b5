//! Exit code constants and error mapping for shardforge.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments, configuration or input |
//! | 9 | `BUSY` | Another process holds the session lock |
//! | 11 | `OUT_OF_SHARDS` | Shard balance too low for the requested operation |
//! | 12 | `NO_GAME_DATA` | Export requested with no generated set |
//! | 70 | `GENERATION_FAILURE` | Generation service call failed |
//! | 75 | `RATE_LIMITED` | Generation service rate limit reached |

use crate::error::{ForgeError, LlmError};

/// Exit codes matching the documented exit code table.
///
/// The numeric values are part of the public CLI contract.
///
/// ```rust
/// use shardforge_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::BUSY, ExitCode::from_i32(9));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, configuration or theme input
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Busy - another shardforge process holds the session lock
    pub const BUSY: ExitCode = ExitCode(9);

    /// Out of shards - balance below the cost of the requested image attempt
    pub const OUT_OF_SHARDS: ExitCode = ExitCode(11);

    /// No game data - export requested before a set was generated
    pub const NO_GAME_DATA: ExitCode = ExitCode(12);

    /// Generation failure - the generation service call failed
    pub const GENERATION_FAILURE: ExitCode = ExitCode(70);

    /// Rate limited - the generation service refused further requests for now
    pub const RATE_LIMITED: ExitCode = ExitCode(75);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl ForgeError {
    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::CardNotFound { .. } => {
                ExitCode::CLI_ARGS
            }
            Self::InsufficientShards { .. } => ExitCode::OUT_OF_SHARDS,
            Self::NoGameData => ExitCode::NO_GAME_DATA,
            Self::Busy { .. } => ExitCode::BUSY,
            Self::Generation { source, .. } => match source {
                LlmError::RateLimited(_) => ExitCode::RATE_LIMITED,
                LlmError::Misconfiguration(_) | LlmError::Unsupported(_) => ExitCode::CLI_ARGS,
                _ => ExitCode::GENERATION_FAILURE,
            },
            Self::Export(_) | Self::Session(_) | Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}
