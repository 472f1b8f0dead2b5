//! Tracing setup for the shardforge binary.
//!
//! Library crates only emit `tracing` events; the binary installs the
//! subscriber once, before any command runs.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the env filter: `RUST_LOG` wins, otherwise a verbosity-dependent default.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("shardforge=debug,info")
            } else {
                EnvFilter::try_new("shardforge=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
/// * `verbose` - debug-level output for shardforge crates, with targets
/// * `json` - emit newline-delimited JSON instead of the compact format
///
/// Logs go to stderr so that `show --json` output on stdout stays parseable.
pub fn init_tracing(verbose: bool, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = env_filter(verbose);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(verbose)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}
