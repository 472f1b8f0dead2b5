use shardforge_utils::error::ForgeError;

use super::common::AppContext;

/// `config`: effective values with their sources.
pub fn execute_config_command(ctx: &AppContext) -> Result<(), ForgeError> {
    match &ctx.config.config_path {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none found, using defaults)"),
    }

    println!("\nEffective configuration:");
    for (key, (value, source)) in ctx.config.effective_config() {
        println!("  {key} = {value} (from {source})");
    }
    Ok(())
}
