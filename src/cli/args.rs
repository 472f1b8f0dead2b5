//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and all subcommand enums.

use clap::{Parser, Subcommand, ValueEnum};
use shardforge_engine::ExportFormat;
use std::path::PathBuf;

/// shardforge - generate playable trading card games from a theme
#[derive(Parser, Debug)]
#[command(name = "shardforge")]
#[command(about = "Generate trading card game rules, cards and card art from a theme")]
#[command(long_about = r#"
shardforge turns a theme (title, description, factions, locations and a
resource system) into a playable trading card game: a rulebook, a set of
balanced cards, and generated art for every card.

Image generation costs shards. Each attempt debits one shard; failed attempts
are refunded.

EXAMPLES:
  # Let the service suggest a theme
  shardforge theme

  # Adjust it
  shardforge theme set --set-name "The Astral War"

  # Generate 12 cards and their art
  shardforge generate --cards 12

  # Retry art for one card (full id or unique prefix)
  shardforge retry 3f2a9c1e

  # Export the set
  shardforge export pdf --out ./print

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .shardforge/config.toml
  Use --config to specify an explicit config file path
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the session and shard balance
    #[arg(long, global = true)]
    pub state_dir: Option<String>,

    /// Generation provider (overrides config)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the service for a new theme, or edit the current one
    Theme {
        #[command(subcommand)]
        action: Option<ThemeCommands>,
    },

    /// Generate rules and cards for the current theme, then their art
    Generate {
        /// Number of cards (defaults to the configured card_count)
        #[arg(long)]
        cards: Option<u32>,

        /// Skip the image pass
        #[arg(long)]
        no_images: bool,
    },

    /// Generate art for every pending card
    Images,

    /// Retry the art for one card
    Retry {
        /// Card id or unique id prefix
        card_id: String,
    },

    /// Regenerate a card's stats, ability and art
    Regenerate {
        /// Card id or unique id prefix
        card_id: String,
    },

    /// Show the current theme, rules and cards
    Show {
        /// Output the session as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or top up the shard balance
    Shards {
        #[command(subcommand)]
        action: Option<ShardsCommands>,
    },

    /// Export the current set
    Export {
        #[arg(value_enum)]
        format: ExportKind,

        /// Output directory (defaults to the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show the effective configuration and where each value came from
    Config,
}

#[derive(Subcommand, Debug)]
pub enum ThemeCommands {
    /// Set theme fields; omitted fields are kept
    Set {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        set_name: Option<String>,
        #[arg(long)]
        factions: Option<String>,
        #[arg(long)]
        locations: Option<String>,
        #[arg(long)]
        resources: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShardsCommands {
    /// Add promotional shards
    Add {
        /// Number of shards to add
        amount: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    Json,
    Pdf,
}

impl From<ExportKind> for ExportFormat {
    fn from(kind: ExportKind) -> Self {
        match kind {
            ExportKind::Json => Self::Json,
            ExportKind::Pdf => Self::Pdf,
        }
    }
}

/// Build the clap command (used for help output checks).
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
