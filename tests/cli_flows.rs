//! Whole-command flows through `cli::run_from` with the scripted provider.
//!
//! Each test gets its own state directory and an explicit config file, so
//! nothing is discovered from the surrounding checkout.

use shardforge::cli::run_from;
use shardforge::{CliArgs, Config, ConfigSource, ExitCode, ImageState, Session, SessionLock};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new(starting_balance: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state");
        let config = dir.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                "[defaults]\nstate_dir = '{}'\ncard_count = 3\n\n\
                 [llm]\nprovider = \"scripted\"\n\n\
                 [shards]\ndefault_balance = {starting_balance}\n",
                state.display()
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn state_dir(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn run(&self, args: &[&str]) -> Result<(), ExitCode> {
        let mut argv = vec![
            "shardforge".to_string(),
            "--config".to_string(),
            self.config.display().to_string(),
        ];
        argv.extend(args.iter().map(|s| s.to_string()));
        run_from(argv)
    }

    fn session(&self) -> Session {
        let raw = std::fs::read_to_string(self.state_dir().join("session.json")).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn balance_file(&self) -> String {
        std::fs::read_to_string(self.state_dir().join("tcg_shard_balance")).unwrap()
    }
}

fn states(session: &Session) -> Vec<ImageState> {
    session.game.cards.iter().map(|c| c.image_state).collect()
}

fn dir_is_empty_or_missing(path: &Path) -> bool {
    std::fs::read_dir(path).map(|mut d| d.next().is_none()).unwrap_or(true)
}

#[test]
fn theme_then_generate_produces_set_with_art() {
    let ws = Workspace::new(200);

    ws.run(&["theme"]).unwrap();
    ws.run(&["generate"]).unwrap();

    let session = ws.session();
    assert_eq!(session.theme.title, "Celestial Empires");
    assert_eq!(session.game.set_name, "The Astral War");
    assert_eq!(session.game.cards.len(), 3);
    assert_eq!(states(&session), vec![ImageState::Success; 3]);
    assert_eq!(ws.balance_file(), "197");
}

#[test]
fn low_balance_starves_cards_and_retry_recovers_one() {
    let ws = Workspace::new(2);
    ws.run(&["theme"]).unwrap();

    ws.run(&["generate"]).unwrap();

    let session = ws.session();
    assert_eq!(
        states(&session),
        vec![ImageState::Success, ImageState::Success, ImageState::Error]
    );
    assert_eq!(ws.balance_file(), "0");

    let starved = session.game.cards[2].id.to_string();
    assert_eq!(ws.run(&["retry", &starved]), Err(ExitCode::OUT_OF_SHARDS));

    ws.run(&["shards", "add", "5"]).unwrap();
    assert_eq!(ws.balance_file(), "5");

    ws.run(&["retry", &starved[..8]]).unwrap();
    assert_eq!(ws.session().game.cards[2].image_state, ImageState::Success);
    assert_eq!(ws.balance_file(), "4");
}

#[test]
fn generate_without_theme_is_a_validation_error() {
    let ws = Workspace::new(10);

    assert_eq!(ws.run(&["generate"]), Err(ExitCode::CLI_ARGS));
    assert!(!ws.state_dir().join("session.json").exists() || ws.session().game.is_empty());
}

#[test]
fn generate_rejects_card_count_above_max() {
    let ws = Workspace::new(10);
    ws.run(&["theme"]).unwrap();

    assert_eq!(ws.run(&["generate", "--cards", "51"]), Err(ExitCode::CLI_ARGS));
    assert_eq!(ws.run(&["generate", "--cards", "0"]), Err(ExitCode::CLI_ARGS));
}

#[test]
fn regenerate_replaces_text_and_art() {
    let ws = Workspace::new(10);
    ws.run(&["theme"]).unwrap();
    ws.run(&["generate", "--no-images"]).unwrap();
    let id = ws.session().game.cards[0].id.to_string();

    ws.run(&["regenerate", &id]).unwrap();

    let card = ws.session().game.cards[0].clone();
    assert_eq!(card.ability, "Regenerated ability.");
    assert_eq!(card.image_state, ImageState::Success);
    assert_eq!(ws.balance_file(), "9");
}

#[test]
fn unknown_card_id_is_reported() {
    let ws = Workspace::new(10);
    ws.run(&["theme"]).unwrap();
    ws.run(&["generate", "--no-images"]).unwrap();

    assert_eq!(ws.run(&["retry", "zzzz"]), Err(ExitCode::CLI_ARGS));
}

#[test]
fn export_requires_game_data() {
    let ws = Workspace::new(10);
    let out = ws.out_dir();
    let out_str = out.display().to_string();

    assert_eq!(
        ws.run(&["export", "json", "--out", &out_str]),
        Err(ExitCode::NO_GAME_DATA)
    );
    assert_eq!(
        ws.run(&["export", "pdf", "--out", &out_str]),
        Err(ExitCode::NO_GAME_DATA)
    );
    assert!(dir_is_empty_or_missing(&out));
}

#[test]
fn export_writes_named_files() {
    let ws = Workspace::new(10);
    ws.run(&["theme"]).unwrap();
    ws.run(&["generate"]).unwrap();
    let out = ws.out_dir();
    let out_str = out.display().to_string();

    ws.run(&["export", "json", "--out", &out_str]).unwrap();
    ws.run(&["export", "pdf", "--out", &out_str]).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("The_Astral_War.json")).unwrap())
            .unwrap();
    assert_eq!(json["setName"], "The Astral War");
    assert_eq!(json["cards"].as_array().unwrap().len(), 3);

    let pdf = std::fs::read(out.join("The_Astral_War.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
}

#[test]
fn mutating_command_is_busy_while_session_is_locked() {
    let ws = Workspace::new(10);
    let state = camino::Utf8PathBuf::from_path_buf(ws.state_dir()).unwrap();
    let mut lock = SessionLock::open(&state).unwrap();
    let _guard = lock.try_acquire().unwrap();

    assert_eq!(ws.run(&["theme"]), Err(ExitCode::BUSY));
    assert_eq!(ws.run(&["shards", "add", "1"]), Err(ExitCode::BUSY));
    // Reads do not need the lock.
    ws.run(&["show"]).unwrap();
}

#[test]
fn ledger_balance_survives_between_commands() {
    let ws = Workspace::new(7);
    ws.run(&["shards"]).unwrap();
    ws.run(&["shards", "add", "3"]).unwrap();

    ws.run(&["shards"]).unwrap();
    assert_eq!(ws.balance_file(), "10");

    std::fs::write(ws.state_dir().join("tcg_shard_balance"), "not a number").unwrap();
    ws.run(&["shards", "add", "1"]).unwrap();
    assert_eq!(ws.balance_file(), "8");
}

#[test]
fn cli_flags_override_config_file() {
    let ws = Workspace::new(10);
    let cli = CliArgs {
        config_path: Some(ws.config.clone()),
        state_dir: Some("elsewhere".into()),
        llm_provider: Some("gemini".to_string()),
        ..CliArgs::default()
    };

    let config = Config::discover(&cli).unwrap();

    assert_eq!(config.provider(), "gemini");
    assert_eq!(config.state_dir().as_str(), "elsewhere");
    assert_eq!(config.card_count(), 3);
    assert_eq!(config.source_attribution.get("provider"), Some(&ConfigSource::Cli));
    assert!(matches!(
        config.source_attribution.get("card_count"),
        Some(ConfigSource::ConfigFile(_))
    ));
    assert_eq!(config.max_cards(), 50);
    assert_eq!(
        config.source_attribution.get("max_cards"),
        Some(&ConfigSource::Defaults)
    );
}
