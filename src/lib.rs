//! shardforge - trading card game generator
//!
//! shardforge turns a theme into a playable trading card game: a markdown
//! rulebook, a set of cards, and generated art for each card. Image
//! generation is metered by shards, an in-app balance persisted in the
//! state directory.
//!
//! shardforge can be used in two ways:
//! - **CLI**: run `shardforge theme`, `shardforge generate`, `shardforge export pdf`
//! - **Library**: drive an [`Orchestrator`] against your own [`Session`]
//!
//! # Quick Start (Library)
//!
//! ```ignore
//! use std::sync::Arc;
//! use shardforge::{Config, GameSet, Orchestrator, ShardLedger};
//!
//! let config = Config::discover(&Default::default())?;
//! let ledger = Arc::new(ShardLedger::open_from_config(&config));
//! let orchestrator = Orchestrator::from_config(&config, ledger)?;
//!
//! let theme = orchestrator.fetch_initial_theme().await?;
//! let mut game = GameSet::default();
//! orchestrator.generate_game_set(&theme, 10, &mut game).await?;
//! let report = orchestrator.run_image_pass(&theme.title, &mut game).await;
//! ```
//!
//! # Stable Public API
//!
//! - [`Config`] and [`CliArgs`] - Configuration management
//! - [`ForgeError`] - Library error type
//! - [`ExitCode`] - CLI exit codes
//! - [`Orchestrator`], [`ShardLedger`] - Generation flows and the shard balance
//! - [`Session`], [`GameSet`], [`Card`], [`Theme`] - Game data

pub use shardforge_config::{CliArgs, Config, ConfigSource};
pub use shardforge_engine::{
    Card, CardKind, CreatureStats, ExportFormat, GameSet, ImagePassReport, ImageState,
    Orchestrator, PassNotice, RegenerateOutcome, Session, SessionLock, SessionStore, Theme,
    export, export_filename,
};
pub use shardforge_llm::{ContentClient, LlmBackend};
pub use shardforge_ledger::{FileShardStore, MemoryShardStore, ShardLedger, ShardStore};
pub use shardforge_utils::error::{ForgeError, GenerationOp, LlmError, UserFriendlyError};
pub use shardforge_utils::exit_codes::ExitCode;
pub use shardforge_utils::logging::init_tracing;

pub mod cli;
