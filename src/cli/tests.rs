//! CLI tests module
//!
//! Argument parsing, early-exit paths of `run_from`, and command handlers run
//! against a context built in a temp directory.

use super::commands::{AppContext, execute_generate_command, execute_shards_add_command};
use super::*;
use crate::{CliArgs, Config, ExitCode, ForgeError};
use clap::Parser;
use shardforge_utils::error::ValidationError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Context over a temp state dir, configured for the Gemini provider with a
/// key variable that is never set.
fn gemini_context(dir: &Path) -> AppContext {
    let config_path = dir.join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            "[defaults]\nstate_dir = '{}'\n\n\
             [llm]\nprovider = \"gemini\"\n\n\
             [llm.gemini]\napi_key_env = \"SHARDFORGE_TEST_KEY_NEVER_SET\"\n",
            dir.join("state").display()
        ),
    )
    .unwrap();
    let cli = CliArgs {
        config_path: Some(config_path),
        ..CliArgs::default()
    };
    AppContext::open(Config::discover(&cli).unwrap())
}

fn balance_path(dir: &Path) -> PathBuf {
    dir.join("state").join("tcg_shard_balance")
}

#[test]
fn test_cli_definition_is_consistent() {
    build_cli().debug_assert();
}

#[test]
fn test_parse_generate_flags() {
    let cli = Cli::try_parse_from(["shardforge", "generate", "--cards", "12", "--no-images"]).unwrap();
    match cli.command {
        Commands::Generate { cards, no_images } => {
            assert_eq!(cards, Some(12));
            assert!(no_images);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "shardforge",
        "show",
        "--json",
        "--state-dir",
        "/tmp/sf",
        "--verbose",
        "--log-json",
    ])
    .unwrap();

    assert_eq!(cli.state_dir.as_deref(), Some("/tmp/sf"));
    assert!(cli.verbose);
    assert!(cli.log_json);
    assert!(matches!(cli.command, Commands::Show { json: true }));
}

#[test]
fn test_parse_theme_set_and_shards_add() {
    let cli = Cli::try_parse_from([
        "shardforge",
        "theme",
        "set",
        "--set-name",
        "The Astral War",
    ])
    .unwrap();
    match cli.command {
        Commands::Theme {
            action: Some(ThemeCommands::Set { set_name, title, .. }),
        } => {
            assert_eq!(set_name.as_deref(), Some("The Astral War"));
            assert!(title.is_none());
        }
        other => panic!("unexpected command {other:?}"),
    }

    let cli = Cli::try_parse_from(["shardforge", "shards", "add", "500"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Shards {
            action: Some(ShardsCommands::Add { amount: 500 })
        }
    ));
}

#[test]
fn test_parse_export_format() {
    let cli = Cli::try_parse_from(["shardforge", "export", "pdf", "--out", "print"]).unwrap();
    match cli.command {
        Commands::Export { format, out } => {
            assert_eq!(format, ExportKind::Pdf);
            assert_eq!(out.unwrap().to_str(), Some("print"));
        }
        other => panic!("unexpected command {other:?}"),
    }

    assert!(Cli::try_parse_from(["shardforge", "export", "csv"]).is_err());
}

#[test]
fn test_run_from_rejects_bad_arguments() {
    assert_eq!(
        run_from(["shardforge", "shards", "add", "-3"]),
        Err(ExitCode::CLI_ARGS)
    );
}

#[test]
fn test_run_from_missing_explicit_config_is_config_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let result = run_from([
        "shardforge".into(),
        "--config".into(),
        missing.into_os_string(),
        "config".into(),
    ]);

    assert_eq!(result, Err(ExitCode::CLI_ARGS));
}

#[test]
fn test_shards_add_applies_to_balance_written_after_startup() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("state")).unwrap();
    std::fs::write(balance_path(dir.path()), "10").unwrap();
    let ctx = gemini_context(dir.path());

    // Another command spent 8 shards after this one started.
    std::fs::write(balance_path(dir.path()), "2").unwrap();
    execute_shards_add_command(&ctx, 1).unwrap();

    assert_eq!(std::fs::read_to_string(balance_path(dir.path())).unwrap(), "3");
    assert_eq!(ctx.ledger.balance(), 3);
}

#[tokio::test]
async fn test_generate_reports_blank_theme_before_backend_setup() {
    let dir = TempDir::new().unwrap();
    let ctx = gemini_context(dir.path());

    let err = execute_generate_command(&ctx, Some(3), true).await.unwrap_err();

    assert!(
        matches!(err, ForgeError::Validation(ValidationError::MissingField { field: "title" })),
        "unexpected error {err:?}"
    );
}

#[tokio::test]
async fn test_generate_reports_card_count_before_backend_setup() {
    let dir = TempDir::new().unwrap();
    let ctx = gemini_context(dir.path());
    let mut session = ctx.store.load().unwrap();
    session.theme = shardforge_engine::Theme {
        title: "Celestial Empires".into(),
        description: "Star-spanning dynasties".into(),
        set_name: "The Astral War".into(),
        factions: "Solar Court, Void Syndicate".into(),
        locations: "Dyson Halo".into(),
        resources: "Starlight".into(),
    };
    ctx.store.save(&session).unwrap();

    let err = execute_generate_command(&ctx, Some(0), true).await.unwrap_err();

    assert!(
        matches!(
            err,
            ForgeError::Validation(ValidationError::CardCountOutOfRange { count: 0, max: 50 })
        ),
        "unexpected error {err:?}"
    );
}
