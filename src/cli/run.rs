//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Installs tracing and creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use camino::Utf8PathBuf;
use clap::Parser;
use std::ffi::OsString;
use tracing::debug;

use super::args::{Cli, Commands, ShardsCommands, ThemeCommands};
use super::commands::{self, AppContext, ThemeEdits};
use crate::{CliArgs, Config, ExitCode, ForgeError, init_tracing};

/// Main CLI execution function.
///
/// This function handles ALL output including errors. It returns `Result<(), ExitCode>`:
/// - On success: returns `Ok(())` after printing any output
/// - On error: prints the user-facing report to stderr, returns `Err(ExitCode)`
///
/// main.rs only calls `std::process::exit(code.as_i32())` on error - it does NOT print.
pub fn run() -> Result<(), ExitCode> {
    run_cli(Cli::parse())
}

/// Same as [`run`] with explicit arguments (the first is the binary name).
pub fn run_from<I, T>(args: I) -> Result<(), ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => run_cli(cli),
        Err(e) => {
            let _ = e.print();
            if e.use_stderr() {
                Err(ExitCode::CLI_ARGS)
            } else {
                Ok(())
            }
        }
    }
}

fn run_cli(cli: Cli) -> Result<(), ExitCode> {
    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        state_dir: cli.state_dir.clone().map(Utf8PathBuf::from),
        verbose: cli.verbose.then_some(true),
        card_count: None,
        llm_provider: cli.provider.clone(),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report(ForgeError::Config(err))),
    };

    // A subscriber may already be installed when running in-process (tests).
    if let Err(e) = init_tracing(config.verbose(), cli.log_json) {
        debug!(error = %e, "Tracing already initialized");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let ctx = AppContext::open(config);
    rt.block_on(dispatch(&ctx, cli.command)).map_err(report)
}

async fn dispatch(ctx: &AppContext, command: Commands) -> Result<(), ForgeError> {
    match command {
        Commands::Theme { action: None } => commands::execute_theme_command(ctx).await,
        Commands::Theme {
            action:
                Some(ThemeCommands::Set {
                    title,
                    description,
                    set_name,
                    factions,
                    locations,
                    resources,
                }),
        } => commands::execute_theme_set_command(
            ctx,
            ThemeEdits {
                title,
                description,
                set_name,
                factions,
                locations,
                resources,
            },
        ),
        Commands::Generate { cards, no_images } => {
            commands::execute_generate_command(ctx, cards, no_images).await
        }
        Commands::Images => commands::execute_images_command(ctx).await,
        Commands::Retry { card_id } => commands::execute_retry_command(ctx, &card_id).await,
        Commands::Regenerate { card_id } => {
            commands::execute_regenerate_command(ctx, &card_id).await
        }
        Commands::Show { json } => commands::execute_show_command(ctx, json),
        Commands::Shards { action: None } => commands::execute_shards_command(ctx),
        Commands::Shards {
            action: Some(ShardsCommands::Add { amount }),
        } => commands::execute_shards_add_command(ctx, amount),
        Commands::Export { format, out } => {
            commands::execute_export_command(ctx, format.into(), out)
        }
        Commands::Config => commands::execute_config_command(ctx),
    }
}

/// Print the user-facing report and pick the exit code.
fn report(err: ForgeError) -> ExitCode {
    debug!(error = %err, "Command failed");
    eprint!("{}", err.display_for_user());
    err.to_exit_code()
}
