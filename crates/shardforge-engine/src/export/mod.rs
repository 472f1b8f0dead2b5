//! Set exports (JSON and PDF).
//!
//! Both formats refuse to run without rules and at least one card, and both
//! write atomically to `<out_dir>/<derived name>.<ext>`.

mod json;
mod pdf;

pub use json::{render_json, write_json};
pub use pdf::{
    CARD_HEIGHT_MM, CARD_WIDTH_MM, CARDS_PER_PAGE, CardSlot, GUTTER_MM, MARGIN_MM, card_slot,
    paginate_rules, render_pdf, write_pdf,
};

use camino::{Utf8Path, Utf8PathBuf};
use shardforge_utils::error::ForgeError;
use std::fmt;
use std::str::FromStr;

use crate::model::GameSet;

/// Used when the set has no usable name
pub const FALLBACK_FILE_STEM: &str = "tcg_set";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Pdf,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unknown export format '{other}' (expected json or pdf)")),
        }
    }
}

/// Derive the export file name: whitespace runs become `_`, a blank name
/// becomes `tcg_set`.
///
/// Path separators are also replaced so the file always lands in the
/// output directory.
#[must_use]
pub fn export_filename(set_name: &str, extension: &str) -> String {
    if set_name.trim().is_empty() {
        return format!("{FALLBACK_FILE_STEM}.{extension}");
    }

    let mut stem = String::with_capacity(set_name.len());
    let mut in_whitespace = false;
    for c in set_name.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                stem.push('_');
            }
            in_whitespace = true;
        } else {
            stem.push(if matches!(c, '/' | '\\') { '_' } else { c });
            in_whitespace = false;
        }
    }
    format!("{stem}.{extension}")
}

/// # Errors
///
/// `ForgeError::NoGameData` when the set has no rules or no cards.
pub fn ensure_exportable(game: &GameSet) -> Result<(), ForgeError> {
    if game.is_empty() {
        return Err(ForgeError::NoGameData);
    }
    Ok(())
}

/// Write `game` in `format` into `out_dir`, returning the file path.
///
/// # Errors
///
/// `ForgeError::NoGameData` for an empty set, `ForgeError::Export` when
/// rendering or writing fails.
pub fn export(game: &GameSet, format: ExportFormat, out_dir: &Utf8Path) -> Result<Utf8PathBuf, ForgeError> {
    match format {
        ExportFormat::Json => write_json(game, out_dir),
        ExportFormat::Pdf => write_pdf(game, out_dir),
    }
}
