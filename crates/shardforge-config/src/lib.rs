//! Configuration management for shardforge
//!
//! Hierarchical configuration with discovery and precedence CLI > file >
//! defaults. Supports TOML configuration files with `[defaults]`, `[llm]`
//! (plus `[llm.gemini]`) and `[shards]` sections.

mod discovery;
mod model;
mod sources;
mod validation;

pub use model::*;
pub use validation::KNOWN_PROVIDERS;
