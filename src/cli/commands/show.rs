use shardforge_engine::{CardKind, Session};
use shardforge_utils::error::ForgeError;
use std::fmt::Write as _;

use super::common::AppContext;
use super::theme::print_theme;

/// `show`: print the session, as text or JSON.
pub fn execute_show_command(ctx: &AppContext, json: bool) -> Result<(), ForgeError> {
    let session = ctx.store.load()?;

    if json {
        let out = serde_json::to_string_pretty(&session)
            .map_err(|e| ForgeError::Session(format!("failed to serialize session: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    println!("Theme:");
    print_theme(&session.theme);
    println!();
    print!("{}", render_session(&session));
    println!("\nShards: {}", ctx.ledger.balance());
    Ok(())
}

/// Human-readable listing of the current set.
#[must_use]
pub fn render_session(session: &Session) -> String {
    let game = &session.game;
    let mut out = String::new();

    if game.cards.is_empty() && game.rules.trim().is_empty() {
        out.push_str("No game set yet. Run 'shardforge generate'.\n");
        return out;
    }

    let _ = writeln!(out, "Set: {}\n", game.set_name);
    let _ = writeln!(out, "{}\n", game.rules.trim_end());
    let _ = writeln!(out, "Cards ({}):", game.cards.len());
    for card in &game.cards {
        let stats = match card.kind {
            CardKind::Creature(s) => format!(" {}/{}/{}", s.attack, s.defense, s.health),
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "  {}  {} [{}{}] art: {}",
            card.short_id(),
            card.name,
            card.kind,
            stats,
            card.image_state
        );
        let _ = writeln!(out, "            {}", card.ability);
    }
    out
}
