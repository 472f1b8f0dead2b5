//! CLI command implementations (facade).
//!
//! This module re-exports the command surface used by `run.rs` and CLI tests.
//! Implementations live in `commands/*`.

mod cards;
mod common;
mod config_cmd;
mod export;
mod generate;
mod shards;
mod show;
mod theme;

pub use cards::{execute_images_command, execute_regenerate_command, execute_retry_command};
pub use common::AppContext;
pub use config_cmd::execute_config_command;
pub use export::execute_export_command;
pub use generate::execute_generate_command;
pub use shards::{execute_shards_add_command, execute_shards_command};
pub use show::{execute_show_command, render_session};
pub use theme::{ThemeEdits, execute_theme_command, execute_theme_set_command};
