use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use shardforge_utils::atomic_write::write_file_atomic;
use shardforge_utils::error::ForgeError;
use tracing::info;

use super::{ExportFormat, ensure_exportable, export_filename};
use crate::model::{Card, GameSet};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GameExport<'a> {
    set_name: &'a str,
    rules: &'a str,
    cards: &'a [Card],
}

/// Pretty JSON document `{setName, rules, cards}`.
///
/// # Errors
///
/// `ForgeError::NoGameData` for an empty set.
pub fn render_json(game: &GameSet) -> Result<String, ForgeError> {
    ensure_exportable(game)?;
    let doc = GameExport {
        set_name: &game.set_name,
        rules: &game.rules,
        cards: &game.cards,
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|e| ForgeError::Export(format!("failed to serialize set: {e}")))
}

/// # Errors
///
/// See [`render_json`]; write failures are `ForgeError::Export`.
pub fn write_json(game: &GameSet, out_dir: &Utf8Path) -> Result<Utf8PathBuf, ForgeError> {
    let json = render_json(game)?;
    let path = out_dir.join(export_filename(&game.set_name, ExportFormat::Json.extension()));
    let result = write_file_atomic(&path, &json).map_err(|e| ForgeError::Export(format!("{e:#}")))?;
    info!(path = %path, bytes = result.bytes_written, "Exported set as JSON");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardKind, CreatureStats, ImageState};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn game() -> GameSet {
        GameSet {
            set_name: "The Astral War".into(),
            rules: "# Rules\n\nWin.".into(),
            cards: vec![Card {
                id: Uuid::new_v4(),
                name: "Star Knight".into(),
                kind: CardKind::Creature(CreatureStats {
                    attack: 2,
                    defense: 3,
                    health: 4,
                }),
                ability: "Vigilance.".into(),
                image_prompt: "a knight".into(),
                image_url: None,
                image_state: ImageState::Error,
            }],
        }
    }

    #[test]
    fn test_write_json_uses_derived_name_and_shape() {
        let dir = TempDir::new().unwrap();
        let out = Utf8Path::from_path(dir.path()).unwrap();

        let path = write_json(&game(), out).unwrap();

        assert_eq!(path.file_name(), Some("The_Astral_War.json"));
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["setName"], "The Astral War");
        assert_eq!(value["rules"], "# Rules\n\nWin.");
        assert_eq!(value["cards"][0]["type"], "Creature");
        assert_eq!(value["cards"][0]["health"], 4);
        assert_eq!(value["cards"][0]["imageState"], "error");
    }

    #[test]
    fn test_write_json_refuses_empty_set_without_creating_file() {
        let dir = TempDir::new().unwrap();
        let out = Utf8Path::from_path(dir.path()).unwrap();
        let mut game = game();
        game.rules.clear();

        assert!(matches!(write_json(&game, out), Err(ForgeError::NoGameData)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
