use camino::Utf8PathBuf;
use shardforge_engine::{ExportFormat, export};
use shardforge_utils::error::ForgeError;
use std::path::PathBuf;

use super::common::AppContext;

/// `export json|pdf`: write the current set to `out` (default: CWD).
pub fn execute_export_command(
    ctx: &AppContext,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> Result<(), ForgeError> {
    let out_dir = match out {
        Some(dir) => Utf8PathBuf::from_path_buf(dir).map_err(|dir| {
            ForgeError::Export(format!("output path is not valid UTF-8: {}", dir.display()))
        })?,
        None => Utf8PathBuf::from("."),
    };

    let session = ctx.store.load()?;
    let path = export(&session.game, format, &out_dir)?;
    println!("✓ Exported {format}: {path}");
    Ok(())
}
